//! Supply-outage state machine.
//!
//! Re-evaluated once per simulation tick. An episode runs in two stages:
//!
//! ```text
//!   NORMAL --draw < p--> OUTAGE_TOTAL --steps_total--> OUTAGE_AIR_RETURN --steps_air--> NORMAL
//!   (base pressure)      (0 bar)                       (0.05 bar)
//! ```
//!
//! A single elapsed-tick counter covers both stages. While an episode is
//! running no probability draw is taken, so episodes never overlap.

use crate::error::MeterError;
use crate::flow::FlowDirection;
use crate::meter::Meter;
use serde::{Deserialize, Serialize};
use watermeter_env::RandomSource;

/// Inlet pressure while returning water pushes air through the line.
pub const AIR_RETURN_PRESSURE_BAR: f64 = 0.05;

/// Stage of the current outage episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutageState {
    #[default]
    Normal,
    OutageTotal,
    OutageAirReturn,
}

/// Stage change produced by one [`OutageController::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutageTransition {
    OutageStarted,
    AirReturnStarted,
    OutageEnded,
}

/// Outage settings as configured, in wall-clock units.
#[derive(Debug, Clone, PartialEq)]
pub struct OutageParams {
    /// Per-tick probability that an outage starts
    pub probability: f64,

    /// Duration of the zero-pressure stage (ms)
    pub total_outage_ms: u64,

    /// Duration of the air-return stage (ms)
    pub air_return_ms: u64,

    /// Simulation step (ms)
    pub step_ms: u64,

    /// Pressure restored outside outages (bar)
    pub base_pressure_bar: f64,
}

impl OutageParams {
    /// Converts durations to step counts.
    ///
    /// Integer division truncates, so an episode may be up to one step
    /// shorter than the configured wall-clock duration.
    pub fn plan(&self) -> Result<OutagePlan, MeterError> {
        if self.step_ms == 0 {
            return Err(MeterError::ZeroStepDuration);
        }
        if !(0.0..=1.0).contains(&self.probability) {
            return Err(MeterError::InvalidProbability(self.probability));
        }
        if !self.base_pressure_bar.is_finite() {
            return Err(MeterError::InvalidBasePressure(self.base_pressure_bar));
        }
        Ok(OutagePlan {
            probability: self.probability,
            steps_total: self.total_outage_ms / self.step_ms,
            steps_air: self.air_return_ms / self.step_ms,
            base_pressure_bar: self.base_pressure_bar,
        })
    }
}

/// Outage settings converted to ticks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutagePlan {
    pub probability: f64,
    pub steps_total: u64,
    pub steps_air: u64,
    pub base_pressure_bar: f64,
}

/// Drives the meter inlet through outage episodes.
#[derive(Debug, Clone, Default)]
pub struct OutageController {
    state: OutageState,
    elapsed_ticks: u64,
}

impl OutageController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decides this tick's inlet pressure (and direction) and applies it.
    pub fn advance(
        &mut self,
        meter: &mut Meter,
        plan: &OutagePlan,
        rng: &mut dyn RandomSource,
    ) -> Option<OutageTransition> {
        if self.state != OutageState::Normal {
            return self.continue_episode(meter, plan);
        }

        if rng.next_unit() < plan.probability {
            self.state = OutageState::OutageTotal;
            self.elapsed_ticks = 0;
            meter.set_inlet_pressure(0.0);
            return Some(OutageTransition::OutageStarted);
        }

        meter.set_inlet_pressure(plan.base_pressure_bar);
        meter.set_flow_direction(FlowDirection::Forward);
        None
    }

    fn continue_episode(&mut self, meter: &mut Meter, plan: &OutagePlan) -> Option<OutageTransition> {
        self.elapsed_ticks += 1;

        if self.elapsed_ticks <= plan.steps_total {
            self.state = OutageState::OutageTotal;
            meter.set_inlet_pressure(0.0);
            None
        } else if self.elapsed_ticks <= plan.steps_total + plan.steps_air {
            let entered = self.state != OutageState::OutageAirReturn;
            self.state = OutageState::OutageAirReturn;
            meter.set_inlet_pressure(AIR_RETURN_PRESSURE_BAR);
            entered.then_some(OutageTransition::AirReturnStarted)
        } else {
            self.state = OutageState::Normal;
            self.elapsed_ticks = 0;
            meter.set_inlet_pressure(plan.base_pressure_bar);
            Some(OutageTransition::OutageEnded)
        }
    }

    pub fn state(&self) -> OutageState {
        self.state
    }

    /// Ticks elapsed in the current episode (0 while normal).
    pub fn elapsed_ticks(&self) -> u64 {
        self.elapsed_ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use watermeter_env::ScriptedRandom;

    const BASE: f64 = 2.5;

    fn plan(steps_total: u64, steps_air: u64) -> OutagePlan {
        OutagePlan {
            probability: 0.5,
            steps_total,
            steps_air,
            base_pressure_bar: BASE,
        }
    }

    fn meter() -> Meter {
        Meter::new(15.0, 9999.0).unwrap()
    }

    #[test]
    fn test_plan_truncates_toward_zero() {
        let params = OutageParams {
            probability: 0.01,
            total_outage_ms: 1000,
            air_return_ms: 599,
            step_ms: 300,
            base_pressure_bar: 2.0,
        };
        let plan = params.plan().unwrap();

        assert_eq!(plan.steps_total, 3);
        assert_eq!(plan.steps_air, 1);
    }

    #[test]
    fn test_plan_rejects_zero_step() {
        let params = OutageParams {
            probability: 0.01,
            total_outage_ms: 1000,
            air_return_ms: 500,
            step_ms: 0,
            base_pressure_bar: 2.0,
        };
        assert_eq!(params.plan().unwrap_err(), MeterError::ZeroStepDuration);
    }

    #[test]
    fn test_plan_rejects_bad_probability() {
        let params = OutageParams {
            probability: 1.5,
            total_outage_ms: 0,
            air_return_ms: 0,
            step_ms: 100,
            base_pressure_bar: 2.0,
        };
        assert_eq!(params.plan().unwrap_err(), MeterError::InvalidProbability(1.5));
    }

    #[test]
    fn test_normal_tick_restores_base_and_forward() {
        let mut controller = OutageController::new();
        let mut meter = meter();
        let mut rng = ScriptedRandom::constant(0.9);

        assert_eq!(controller.advance(&mut meter, &plan(3, 2), &mut rng), None);
        assert_eq!(controller.state(), OutageState::Normal);
        assert_eq!(meter.inlet().pressure_bar(), BASE);
        assert_eq!(meter.inlet().direction(), FlowDirection::Forward);
    }

    #[test]
    fn test_episode_shape() {
        let mut controller = OutageController::new();
        let mut meter = meter();
        // normal, start, then draws that would start an outage every tick
        let mut rng = ScriptedRandom::new(vec![0.9, 0.1, 0.0]).unwrap();
        let plan = plan(3, 2);

        controller.advance(&mut meter, &plan, &mut rng);
        assert_eq!(
            controller.advance(&mut meter, &plan, &mut rng),
            Some(OutageTransition::OutageStarted)
        );
        assert_eq!(meter.inlet().pressure_bar(), 0.0);
        assert_eq!(controller.elapsed_ticks(), 0);

        let mut pressures = Vec::new();
        let mut transitions = Vec::new();
        for _ in 0..6 {
            transitions.push(controller.advance(&mut meter, &plan, &mut rng));
            pressures.push(meter.inlet().pressure_bar());
        }

        assert_eq!(pressures, vec![0.0, 0.0, 0.0, 0.05, 0.05, BASE]);
        assert_eq!(
            transitions,
            vec![
                None,
                None,
                None,
                Some(OutageTransition::AirReturnStarted),
                None,
                Some(OutageTransition::OutageEnded),
            ]
        );
        assert_eq!(controller.state(), OutageState::Normal);
        assert_eq!(controller.elapsed_ticks(), 0);

        // Only the two draws before the episode were consumed
        assert_eq!(rng.draws(), 2);

        // Back to normal: the next tick draws again and may start a new episode
        assert_eq!(
            controller.advance(&mut meter, &plan, &mut rng),
            Some(OutageTransition::OutageStarted)
        );
        assert_eq!(rng.draws(), 3);
    }

    #[test]
    fn test_no_overlapping_outages() {
        let mut controller = OutageController::new();
        let mut meter = meter();
        let mut rng = ScriptedRandom::constant(0.0);
        let plan = plan(10, 5);

        controller.advance(&mut meter, &plan, &mut rng);
        for _ in 0..15 {
            assert_ne!(
                controller.advance(&mut meter, &plan, &mut rng),
                Some(OutageTransition::OutageStarted)
            );
            assert_ne!(controller.state(), OutageState::Normal);
        }
        assert_eq!(rng.draws(), 1);
    }

    #[test]
    fn test_zero_length_stages_end_next_tick() {
        let mut controller = OutageController::new();
        let mut meter = meter();
        let mut rng = ScriptedRandom::constant(0.0);
        let plan = plan(0, 0);

        controller.advance(&mut meter, &plan, &mut rng);
        assert_eq!(
            controller.advance(&mut meter, &plan, &mut rng),
            Some(OutageTransition::OutageEnded)
        );
        assert_eq!(meter.inlet().pressure_bar(), BASE);
    }

    #[test]
    fn test_outage_on_first_tick_keeps_direction_unset() {
        let mut controller = OutageController::new();
        let mut meter = meter();
        let mut rng = ScriptedRandom::constant(0.0);

        controller.advance(&mut meter, &plan(1, 0), &mut rng);
        controller.advance(&mut meter, &plan(1, 0), &mut rng);
        controller.advance(&mut meter, &plan(1, 0), &mut rng);

        // The episode ending restores pressure only; direction follows on the next normal tick
        assert_eq!(meter.inlet().pressure_bar(), BASE);
        assert_eq!(meter.inlet().direction(), FlowDirection::None);
    }
}
