//! One simulation step: outage controller, then meter.

use crate::error::MeterError;
use crate::meter::{Meter, Reading};
use crate::outage::{OutageController, OutagePlan, OutageState, OutageTransition};
use watermeter_env::RandomSource;

/// Per-tick inputs, resolved from the latest configuration snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickParams {
    pub outage: OutagePlan,

    /// Simulated time covered by the tick (s)
    pub step_secs: f64,

    /// Multiplier applied to air counted during air return
    pub air_factor: f64,
}

/// What a tick did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    pub state: OutageState,
    pub transition: Option<OutageTransition>,

    /// Volume computed for this step (m3), before rollover
    pub volume_m3: f64,
}

/// The complete mutable simulation state.
///
/// Meter and outage controller change together, so callers guard this
/// whole struct with one lock.
#[derive(Debug, Clone)]
pub struct Simulation {
    meter: Meter,
    outage: OutageController,
    ticks: u64,
    episodes: u64,
}

impl Simulation {
    pub fn new(meter: Meter) -> Self {
        Self {
            meter,
            outage: OutageController::new(),
            ticks: 0,
            episodes: 0,
        }
    }

    /// Runs the outage controller, then steps the meter.
    ///
    /// Parameters are validated before anything is mutated.
    pub fn tick(
        &mut self,
        params: &TickParams,
        rng: &mut dyn RandomSource,
    ) -> Result<TickReport, MeterError> {
        if !params.step_secs.is_finite() || params.step_secs < 0.0 {
            return Err(MeterError::InvalidTimeStep(params.step_secs));
        }
        if !params.air_factor.is_finite() || params.air_factor < 0.0 {
            return Err(MeterError::InvalidAirFactor(params.air_factor));
        }

        let transition = self.outage.advance(&mut self.meter, &params.outage, rng);
        if transition == Some(OutageTransition::OutageStarted) {
            self.episodes += 1;
        }
        let volume_m3 = self.meter.step(params.step_secs, params.air_factor)?;
        self.ticks += 1;

        Ok(TickReport {
            tick: self.ticks,
            state: self.outage.state(),
            transition,
            volume_m3,
        })
    }

    pub fn reading(&self) -> Reading {
        self.meter.reading()
    }

    pub fn state(&self) -> OutageState {
        self.outage.state()
    }

    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    /// Number of outage episodes started so far.
    pub fn episodes(&self) -> u64 {
        self.episodes
    }

    pub fn meter(&self) -> &Meter {
        &self.meter
    }
}
