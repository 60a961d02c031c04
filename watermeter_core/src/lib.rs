//! Water Meter Core - Simulation Engine
//!
//! The engine reproduces the observable behaviour of a domestic water meter:
//! 1. **Flow**: instantaneous flow rate from inlet pressure and pipe bore
//! 2. **Counter**: volume accumulation with odometer-style rollover
//! 3. **Outages**: a tick-driven state machine emulating supply interruptions
//!    and the air pushed through the line when water returns

pub mod counter;
pub mod error;
pub mod flow;
pub mod meter;
pub mod outage;
pub mod simulation;

// Re-export key types for convenience
pub use counter::VolumeCounter;
pub use error::MeterError;
pub use flow::{FlowDirection, FlowModel};
pub use meter::{Meter, Reading};
pub use outage::{OutageController, OutageParams, OutagePlan, OutageState, OutageTransition};
pub use simulation::{Simulation, TickParams, TickReport};
