//! Water Meter Simulator Runtime
//!
//! Drives the `watermeter_core` engine in two environments:
//!
//! - **Realtime**: a [`Scheduler`] runs the simulation, publication and
//!   config-check cadences as tokio tasks on the wall clock.
//! - **Virtual time**: a [`VirtualRunner`] interleaves the same cadences on
//!   the clock of a [`SimContext`], so a seed reproduces a whole run.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                       MeterService                        │
//! │  ┌─────────────────────────────────────────────────────┐  │
//! │  │  Mutex<Simulation + outage RandomSource>            │  │
//! │  └─────────────────────────────────────────────────────┘  │
//! │        ▲ tick               ▲ snapshot          ▲ reload  │
//! │   ┌────┴─────┐        ┌─────┴──────┐      ┌─────┴──────┐  │
//! │   │ sim task │        │display task│      │config task │  │
//! │   └──────────┘        └─────┬──────┘      └────────────┘  │
//! │                             ▼                             │
//! │               SinkChain (log, snapshots, frames)          │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use watermeter_sim::{FileConfig, LogDisplay, MeterService, Scheduler};
//! use watermeter_env::TokioContext;
//!
//! let config = Arc::new(FileConfig::load("resources/config.txt")?);
//! let service = MeterService::new(TokioContext::shared(), config, Box::new(LogDisplay::new()))?;
//! let handle = Scheduler::new(Arc::new(service)).start();
//! ```

pub mod config;
mod context;
pub mod display;
mod error;
pub mod exporter;
mod runner;
mod scheduler;
mod service;
pub mod snapshots;

pub use config::{ConfigProvider, ConfigSnapshot, FileConfig, MeterSettings, OverrunPolicy};
pub use context::SimContext;
pub use display::{DialFace, LogDisplay, ReadingSink, ReadingStamp, SinkChain};
pub use error::{ConfigError, SimError};
pub use exporter::{FrameLog, FrameRecorder, ReadingFrame, SimExport};
pub use runner::{RunSummary, VirtualRunner};
pub use scheduler::{Scheduler, SchedulerHandle};
pub use service::{MeterService, OUTAGE_STREAM};
pub use snapshots::{MeterSnapshot, SnapshotRecorder};
