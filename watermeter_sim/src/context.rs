//! Virtual clock for reproducible runs.
//!
//! Nothing here reads the wall clock or OS entropy: time moves only when the
//! runner sets it, and outage draws come from the run seed.

use async_trait::async_trait;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use watermeter_env::{MeterContext, RandomSource};

/// 2024-01-01T00:00:00Z
const RUN_EPOCH: Duration = Duration::from_secs(1_704_067_200);

/// [`MeterContext`] on a shared virtual clock with seeded ChaCha8 streams.
///
/// Clones share the clock.
pub struct SimContext {
    seed: u64,

    /// Nanoseconds since the start of the run
    virtual_time_ns: Arc<AtomicU64>,

    /// Wall-clock time reported at virtual time zero
    epoch: SystemTime,
}

impl SimContext {
    /// Clock at zero, streams derived from `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            virtual_time_ns: Arc::new(AtomicU64::new(0)),
            epoch: UNIX_EPOCH + RUN_EPOCH,
        }
    }

    pub fn shared(seed: u64) -> Arc<Self> {
        Arc::new(Self::new(seed))
    }

    /// Moves the clock forward.
    pub fn advance_time(&self, duration: Duration) {
        self.virtual_time_ns
            .fetch_add(duration.as_nanos() as u64, Ordering::SeqCst);
    }

    /// Jumps the clock to `time` since the start of the run.
    pub fn set_time(&self, time: Duration) {
        self.virtual_time_ns
            .store(time.as_nanos() as u64, Ordering::SeqCst);
    }
}

impl Clone for SimContext {
    fn clone(&self) -> Self {
        Self {
            seed: self.seed,
            virtual_time_ns: Arc::clone(&self.virtual_time_ns),
            epoch: self.epoch,
        }
    }
}

#[async_trait]
impl MeterContext for SimContext {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.virtual_time_ns.load(Ordering::SeqCst))
    }

    fn system_time(&self) -> SystemTime {
        self.epoch + self.now()
    }

    async fn sleep(&self, duration: Duration) {
        self.advance_time(duration);
    }

    fn random_source(&self, stream: u64) -> Box<dyn RandomSource> {
        let combined_seed = self.seed.wrapping_mul(0x517cc1b727220a95) ^ stream;
        Box::new(ChaCha8Rng::seed_from_u64(combined_seed))
    }

    fn seed(&self) -> u64 {
        self.seed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_moves_only_when_told() {
        let ctx = SimContext::new(42);
        assert_eq!(ctx.now(), Duration::ZERO);

        ctx.advance_time(Duration::from_millis(100));
        ctx.advance_time(Duration::from_millis(100));
        assert_eq!(ctx.now(), Duration::from_millis(200));

        ctx.set_time(Duration::from_secs(7));
        assert_eq!(ctx.now(), Duration::from_secs(7));
        assert_eq!(ctx.system_time(), UNIX_EPOCH + RUN_EPOCH + Duration::from_secs(7));
    }

    #[test]
    fn test_streams_follow_seed() {
        let first = SimContext::new(42);
        let second = SimContext::new(42);

        let draws = |ctx: &SimContext, stream| {
            let mut rng = ctx.random_source(stream);
            (0..10).map(|_| rng.next_unit()).collect::<Vec<_>>()
        };

        assert_eq!(draws(&first, 1), draws(&second, 1));
        assert_ne!(draws(&first, 1), draws(&first, 2));
        assert_ne!(draws(&first, 1), draws(&SimContext::new(43), 1));
        assert!(draws(&first, 0).iter().all(|v| (0.0..1.0).contains(v)));
    }

    #[tokio::test]
    async fn test_sleep_is_instant_in_virtual_time() {
        let ctx = SimContext::shared(1);
        ctx.sleep(Duration::from_secs(3600)).await;
        assert_eq!(ctx.now(), Duration::from_secs(3600));
    }

    #[test]
    fn test_clones_share_the_clock() {
        let runner_view = SimContext::new(5);
        let sink_view = runner_view.clone();

        runner_view.set_time(Duration::from_millis(1500));

        assert_eq!(sink_view.now(), Duration::from_millis(1500));
        assert_eq!(sink_view.seed(), 5);
    }
}
