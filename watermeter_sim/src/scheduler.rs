//! Realtime scheduler: three independent periodic tasks.
//!
//! ```text
//!   simulation  every delta_t_simulacao_ms         -> MeterService::simulation_tick
//!   display     every intervalo_update_display_ms  -> MeterService::publish_reading
//!   config      every 5 s (first check after 5 s)  -> MeterService::check_config
//! ```
//!
//! Each task owns its own interval, so a slow publication never delays a
//! simulation tick. A failed invocation is logged and the task carries on
//! with its next period.

use crate::config::CONFIG_CHECK_PERIOD;
use crate::error::SimError;
use crate::service::MeterService;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{info, info_span, warn, Instrument};
use watermeter_env::MeterContext;

/// Starts the periodic tasks for a service.
pub struct Scheduler<Ctx: MeterContext> {
    service: Arc<MeterService<Ctx>>,
    config_check_period: Duration,
}

impl<Ctx: MeterContext> Scheduler<Ctx> {
    pub fn new(service: Arc<MeterService<Ctx>>) -> Self {
        Self {
            service,
            config_check_period: CONFIG_CHECK_PERIOD,
        }
    }

    /// Overrides the configuration check period.
    pub fn with_config_check_period(mut self, period: Duration) -> Self {
        self.config_check_period = period.max(Duration::from_millis(1));
        self
    }

    /// Spawns the three tasks on the current tokio runtime.
    ///
    /// Task periods come from the configuration at start time.
    pub fn start(&self) -> SchedulerHandle {
        let settings = self.service.settings();
        let behavior = settings.overrun_policy.missed_tick_behavior();

        info!(
            step_ms = settings.step_ms,
            display_interval_ms = settings.display_interval_ms,
            overrun_policy = ?settings.overrun_policy,
            "Starting scheduler"
        );

        let simulation = Arc::clone(&self.service);
        let display = Arc::clone(&self.service);
        let config = Arc::clone(&self.service);

        let tasks = vec![
            spawn_periodic(
                "simulation",
                settings.step_period(),
                Duration::ZERO,
                behavior,
                move || simulation.simulation_tick().map(drop),
            ),
            spawn_periodic(
                "display",
                settings.display_period(),
                Duration::ZERO,
                behavior,
                move || display.publish_reading().map(drop),
            ),
            spawn_periodic(
                "config",
                self.config_check_period,
                self.config_check_period,
                MissedTickBehavior::Skip,
                move || config.check_config().map(drop),
            ),
        ];

        SchedulerHandle { tasks }
    }
}

/// Running tasks; dropping the handle stops them.
pub struct SchedulerHandle {
    tasks: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Stops all tasks.
    pub fn shutdown(self) {
        drop(self);
    }

    /// True while every task is still running.
    pub fn is_running(&self) -> bool {
        self.tasks.iter().all(|task| !task.is_finished())
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

fn spawn_periodic<F>(
    name: &'static str,
    period: Duration,
    first_delay: Duration,
    behavior: MissedTickBehavior,
    mut body: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Result<(), SimError> + Send + 'static,
{
    let span = info_span!("task", name);
    tokio::spawn(
        async move {
            let mut interval = tokio::time::interval_at(Instant::now() + first_delay, period);
            interval.set_missed_tick_behavior(behavior);
            loop {
                interval.tick().await;
                if let Err(e) = body() {
                    warn!(error = %e, "Periodic task failed; retrying next period");
                }
            }
        }
        .instrument(span),
    )
}
