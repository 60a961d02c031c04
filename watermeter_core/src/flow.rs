//! Inlet flow model.
//!
//! Flow is a simplified laminar approximation, quadratic in the bore and
//! square-root in the pressure:
//!
//! ```text
//! Q = k * d^2 * sqrt(p)      k = 1e-4, d in mm, p in bar, Q in m3/s
//! ```
//!
//! It is deterministic and cheap to evaluate every tick; it makes no claim to
//! physical fidelity.

use serde::{Deserialize, Serialize};

/// Flow constant folding viscosity, friction and unit conversion.
pub const FLOW_CONSTANT: f64 = 1e-4;

/// Upper bound (exclusive) of the pressure band read as air in the line.
pub const AIR_PRESSURE_THRESHOLD_BAR: f64 = 0.1;

/// Direction of the water column through the meter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FlowDirection {
    Forward,
    Reverse,
    #[default]
    None,
}

/// Inlet connection: bore, current pressure and flow direction.
#[derive(Debug, Clone)]
pub struct FlowModel {
    bore_diameter_mm: f64,
    pressure_bar: f64,
    direction: FlowDirection,
}

impl FlowModel {
    /// Creates a model at rest (zero pressure, no direction).
    ///
    /// The bore is validated by [`crate::Meter::new`].
    pub fn new(bore_diameter_mm: f64) -> Self {
        Self {
            bore_diameter_mm,
            pressure_bar: 0.0,
            direction: FlowDirection::None,
        }
    }

    /// Instantaneous flow rate in m3/s.
    ///
    /// Zero unless the direction is forward and the pressure positive.
    pub fn flow_rate_m3_per_s(&self) -> f64 {
        if self.pressure_bar <= 0.0 || self.direction != FlowDirection::Forward {
            return 0.0;
        }
        FLOW_CONSTANT * self.bore_diameter_mm.powi(2) * self.pressure_bar.sqrt()
    }

    /// True while some pressure remains but too little to be a water column.
    pub fn is_air_passing(&self) -> bool {
        self.pressure_bar > 0.0 && self.pressure_bar < AIR_PRESSURE_THRESHOLD_BAR
    }

    pub fn set_pressure_bar(&mut self, pressure_bar: f64) {
        self.pressure_bar = pressure_bar;
    }

    pub fn set_direction(&mut self, direction: FlowDirection) {
        self.direction = direction;
    }

    pub fn pressure_bar(&self) -> f64 {
        self.pressure_bar
    }

    pub fn direction(&self) -> FlowDirection {
        self.direction
    }

    pub fn bore_diameter_mm(&self) -> f64 {
        self.bore_diameter_mm
    }
}
