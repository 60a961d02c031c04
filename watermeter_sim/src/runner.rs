//! Virtual-time runner: drives a service without the wall clock.
//!
//! The three cadences of the realtime scheduler are interleaved on the
//! virtual clock of a [`SimContext`]. At equal timestamps the order is
//! config check, then simulation tick, then publication. With a fixed seed
//! the run is fully reproducible.

use crate::config::CONFIG_CHECK_PERIOD;
use crate::context::SimContext;
use crate::service::MeterService;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use watermeter_core::Reading;
use watermeter_env::MeterContext;

/// Results from a virtual run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    /// Seed used
    pub seed: u64,

    /// Simulation ticks executed
    pub total_ticks: u64,

    /// Ticks rejected by the engine
    pub failed_ticks: u64,

    /// Readings handed to the sinks
    pub published: u64,

    /// Outage episodes started during the run
    pub outage_episodes: u64,

    /// Final virtual time in seconds
    pub final_time_secs: f64,

    pub final_reading: Reading,
}

/// Runs a service on virtual time.
pub struct VirtualRunner {
    service: Arc<MeterService<SimContext>>,
    config_check_period: Duration,
}

impl VirtualRunner {
    pub fn new(service: Arc<MeterService<SimContext>>) -> Self {
        Self {
            service,
            config_check_period: CONFIG_CHECK_PERIOD,
        }
    }

    /// Sets the configuration check period.
    pub fn with_config_check_period(mut self, period: Duration) -> Self {
        self.config_check_period = period.max(Duration::from_millis(1));
        self
    }

    /// Simulates `duration` of virtual time from the context's current time.
    pub fn run(&self, duration: Duration) -> RunSummary {
        let context = Arc::clone(self.service.context());
        let settings = self.service.settings();
        let step = settings.step_period();
        let display = settings.display_period();

        let start = context.now();
        let end = start + duration;
        let mut next_tick = start;
        let mut next_display = start;
        let mut next_check = start + self.config_check_period;

        let episodes_before = self.service.outage_episodes();
        let mut total_ticks = 0;
        let mut failed_ticks = 0;
        let mut published = 0;

        info!(seed = context.seed(), duration_secs = duration.as_secs_f64(), "Starting virtual run");

        loop {
            let now = next_tick.min(next_display).min(next_check);
            if now >= end {
                break;
            }
            context.set_time(now);

            if next_check == now {
                if let Err(e) = self.service.check_config() {
                    warn!(error = %e, "Config check failed");
                }
                next_check += self.config_check_period;
            }

            if next_tick == now {
                match self.service.simulation_tick() {
                    Ok(_) => total_ticks += 1,
                    Err(e) => {
                        failed_ticks += 1;
                        warn!(error = %e, "Simulation tick failed");
                    }
                }
                next_tick += step;
            }

            if next_display == now {
                match self.service.publish_reading() {
                    Ok(_) => published += 1,
                    Err(e) => warn!(error = %e, "Publishing reading failed"),
                }
                next_display += display;
            }
        }

        context.set_time(end);
        let (final_reading, _) = self.service.reading();

        let summary = RunSummary {
            seed: context.seed(),
            total_ticks,
            failed_ticks,
            published,
            outage_episodes: self.service.outage_episodes() - episodes_before,
            final_time_secs: end.as_secs_f64(),
            final_reading,
        };
        debug!(?summary, "Virtual run complete");
        summary
    }
}
