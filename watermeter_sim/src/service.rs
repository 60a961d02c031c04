//! The shared simulation object driven by the periodic tasks.
//!
//! One `MeterService` owns the meter, the outage controller and the outage
//! random stream behind a single lock. The simulation task is the only
//! writer; the publication task takes an atomic `(reading, state)` snapshot
//! under the same lock, so it never sees a torn update.

use crate::config::{ConfigProvider, MeterSettings};
use crate::display::{ReadingSink, ReadingStamp};
use crate::error::SimError;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};
use watermeter_core::{Meter, OutageState, OutageTransition, Reading, Simulation, TickReport};
use watermeter_env::{MeterContext, RandomSource};

/// Random stream used for outage draws.
pub const OUTAGE_STREAM: u64 = 0;

struct Engine {
    simulation: Simulation,
    rng: Box<dyn RandomSource>,
}

/// Simulation state plus its collaborators (clock, config, sinks).
pub struct MeterService<Ctx: MeterContext> {
    context: Arc<Ctx>,
    config: Arc<dyn ConfigProvider>,
    engine: Mutex<Engine>,
    sink: Mutex<Box<dyn ReadingSink>>,
}

impl<Ctx: MeterContext> MeterService<Ctx> {
    /// Builds the meter from the current configuration snapshot.
    pub fn new(
        context: Arc<Ctx>,
        config: Arc<dyn ConfigProvider>,
        sink: Box<dyn ReadingSink>,
    ) -> Result<Self, SimError> {
        let snapshot = config.current();
        let settings = snapshot.settings();
        let meter = Meter::new(settings.bore_mm, settings.max_volume_m3)?;
        let rng = context.random_source(OUTAGE_STREAM);

        info!(
            seed = context.seed(),
            bore_mm = settings.bore_mm,
            max_volume_m3 = settings.max_volume_m3,
            step_ms = settings.step_ms,
            "Meter initialised"
        );

        Ok(Self {
            context,
            config,
            engine: Mutex::new(Engine {
                simulation: Simulation::new(meter),
                rng,
            }),
            sink: Mutex::new(sink),
        })
    }

    /// Runs one simulation step with the latest configuration.
    pub fn simulation_tick(&self) -> Result<TickReport, SimError> {
        let snapshot = self.config.current();
        let params = snapshot.settings().tick_params()?;

        let report = {
            let mut engine = lock(&self.engine);
            let Engine { simulation, rng } = &mut *engine;
            simulation.tick(&params, &mut **rng)?
        };

        match report.transition {
            Some(OutageTransition::OutageStarted) => {
                info!(tick = report.tick, "Water outage started")
            }
            Some(OutageTransition::AirReturnStarted) => {
                info!(tick = report.tick, "Water returning, air passing through the meter")
            }
            Some(OutageTransition::OutageEnded) => {
                info!(tick = report.tick, "Water supply restored")
            }
            None => {}
        }
        debug!(tick = report.tick, volume_m3 = report.volume_m3, state = ?report.state, "Tick");

        Ok(report)
    }

    /// Atomic snapshot of the reading and the outage stage.
    pub fn reading(&self) -> (Reading, OutageState) {
        let engine = lock(&self.engine);
        (engine.simulation.reading(), engine.simulation.state())
    }

    /// Hands the current reading to the sinks.
    pub fn publish_reading(&self) -> Result<Reading, SimError> {
        let (reading, state) = self.reading();
        let stamp = ReadingStamp {
            elapsed: self.context.now(),
            taken_at: self.context.system_time(),
            state,
        };
        lock(&self.sink).publish(&reading, &stamp)?;
        Ok(reading)
    }

    /// Asks the configuration source to reload if its file changed.
    ///
    /// Returns true when a new snapshot was published.
    pub fn check_config(&self) -> Result<bool, SimError> {
        let previous = self.config.current();
        let Some(snapshot) = self.config.maybe_reload()? else {
            return Ok(false);
        };

        let (old, new) = (previous.settings(), snapshot.settings());
        if old.bore_mm != new.bore_mm || old.max_volume_m3 != new.max_volume_m3 {
            warn!("Bore and counter capacity changes take effect on restart");
        }
        if old.step_ms != new.step_ms || old.display_interval_ms != new.display_interval_ms {
            warn!("Task periods are fixed at startup; only per-tick values follow the new config");
        }
        info!(
            outage_probability = new.outage_probability,
            base_pressure_bar = new.base_pressure_bar,
            "Configuration reloaded"
        );
        Ok(true)
    }

    /// Settings from the latest snapshot.
    pub fn settings(&self) -> MeterSettings {
        self.config.current().settings().clone()
    }

    pub fn context(&self) -> &Arc<Ctx> {
        &self.context
    }

    pub fn tick_count(&self) -> u64 {
        lock(&self.engine).simulation.tick_count()
    }

    pub fn outage_episodes(&self) -> u64 {
        lock(&self.engine).simulation.episodes()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
