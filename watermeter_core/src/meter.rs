//! The meter: flow model and counter composed into one measuring unit.

use crate::counter::VolumeCounter;
use crate::error::MeterError;
use crate::flow::{FlowDirection, FlowModel};
use serde::{Deserialize, Serialize};

/// Constant flow attributed to air being pushed through the line (m3/s).
pub const AIR_EQUIVALENT_RATE_M3_PER_S: f64 = 0.001;

/// A point-in-time reading handed to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Accumulated volume on the counter (m3)
    pub volume_m3: f64,

    /// Inlet pressure at the time of the reading (bar)
    pub pressure_bar: f64,
}

/// A water meter owning its inlet model and its counter.
#[derive(Debug, Clone)]
pub struct Meter {
    inlet: FlowModel,
    counter: VolumeCounter,
}

impl Meter {
    /// Builds a meter at rest with an empty counter.
    pub fn new(bore_diameter_mm: f64, max_volume_m3: f64) -> Result<Self, MeterError> {
        if !bore_diameter_mm.is_finite() || bore_diameter_mm <= 0.0 {
            return Err(MeterError::InvalidBore(bore_diameter_mm));
        }
        if !max_volume_m3.is_finite() || max_volume_m3 <= 0.0 {
            return Err(MeterError::InvalidMaxVolume(max_volume_m3));
        }
        Ok(Self {
            inlet: FlowModel::new(bore_diameter_mm),
            counter: VolumeCounter::new(max_volume_m3),
        })
    }

    /// Advances the meter by `delta_t_secs` and returns the volume computed
    /// for the step.
    ///
    /// When air is passing, the air-equivalent flow scaled by `air_factor`
    /// replaces the water-flow formula for this step.
    pub fn step(&mut self, delta_t_secs: f64, air_factor: f64) -> Result<f64, MeterError> {
        if !delta_t_secs.is_finite() || delta_t_secs < 0.0 {
            return Err(MeterError::InvalidTimeStep(delta_t_secs));
        }
        if !air_factor.is_finite() || air_factor < 0.0 {
            return Err(MeterError::InvalidAirFactor(air_factor));
        }

        let volume = if self.inlet.is_air_passing() {
            AIR_EQUIVALENT_RATE_M3_PER_S * delta_t_secs * air_factor
        } else {
            self.inlet.flow_rate_m3_per_s() * delta_t_secs
        };

        self.counter.register_volume(volume);
        Ok(volume)
    }

    pub fn reading(&self) -> Reading {
        Reading {
            volume_m3: self.counter.current_volume(),
            pressure_bar: self.inlet.pressure_bar(),
        }
    }

    pub fn set_inlet_pressure(&mut self, pressure_bar: f64) {
        self.inlet.set_pressure_bar(pressure_bar);
    }

    pub fn set_flow_direction(&mut self, direction: FlowDirection) {
        self.inlet.set_direction(direction);
    }

    /// Read-only view of the inlet.
    pub fn inlet(&self) -> &FlowModel {
        &self.inlet
    }

    pub fn counter(&self) -> &VolumeCounter {
        &self.counter
    }
}
