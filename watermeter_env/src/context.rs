//! Core environment context trait for the meter runtime.

use crate::random::RandomSource;
use async_trait::async_trait;
use std::time::{Duration, SystemTime};

/// The central interface for Environment Interaction.
///
/// This trait abstracts the "real world" so that the meter engine can run
/// either against the wall clock (tokio) or against a virtual clock.
///
/// # Implementations
///
/// - **Realtime**: `TokioContext` - wraps `tokio::time`, entropy-seeded RNG
/// - **Virtual**: `SimContext` (in `watermeter_sim`) - manual clock, `ChaCha8Rng(seed)`
///
/// # Determinism
///
/// All methods that would normally introduce non-determinism
/// (time, randomness) are controlled by the implementation.
#[async_trait]
pub trait MeterContext: Send + Sync + 'static {
    /// Returns the monotonic time elapsed since context creation.
    fn now(&self) -> Duration;

    /// Returns the wall-clock time used to stamp persisted snapshots.
    ///
    /// In virtual time this is derived from the virtual clock plus a fixed epoch.
    fn system_time(&self) -> SystemTime;

    /// Suspends execution for the given duration.
    ///
    /// Realtime: wraps `tokio::time::sleep`
    /// Virtual: advances the virtual clock
    async fn sleep(&self, duration: Duration);

    /// Creates an independent random stream.
    ///
    /// Seeded contexts combine the master seed with `stream` so that
    /// separate consumers get unique but reproducible sequences.
    fn random_source(&self, stream: u64) -> Box<dyn RandomSource>;

    /// Returns the context's seed (for logging/debugging).
    ///
    /// Unseeded contexts return 0.
    fn seed(&self) -> u64;
}
