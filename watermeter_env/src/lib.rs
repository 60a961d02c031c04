//! Water Meter Environment Abstraction Layer
//!
//! This crate provides the "Sans-IO" abstraction allowing the meter engine
//! to run in both **Realtime** (tokio) and **Virtual-time** environments.
//!
//! # Core Concept
//!
//! Everything that would make a run non-reproducible is intercepted:
//! - Time (`now()`, `sleep()`)
//! - Randomness (`random_source()`)
//!
//! By deriving all entropy from a single 64-bit seed, any outage sequence
//! becomes reproducible via its seed number.
//!
//! # Example
//!
//! ```ignore
//! use watermeter_env::{MeterContext, RandomSource};
//!
//! async fn tick_loop<Ctx: MeterContext>(ctx: &Ctx) {
//!     let mut rng = ctx.random_source(0);
//!     loop {
//!         let draw = rng.next_unit();
//!         ctx.sleep(Duration::from_millis(100)).await;
//!     }
//! }
//! ```

mod context;
mod error;
mod random;
mod tokio_impl;

pub use context::MeterContext;
pub use error::EnvError;
pub use random::{RandomSource, ScriptedRandom};
pub use tokio_impl::TokioContext;
