//! Error types for the simulation engine.

use thiserror::Error;

/// Contract violations rejected by the engine.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MeterError {
    #[error("Bore diameter must be positive and finite, got {0} mm")]
    InvalidBore(f64),

    #[error("Maximum counter volume must be positive and finite, got {0} m3")]
    InvalidMaxVolume(f64),

    #[error("Time step must be non-negative and finite, got {0} s")]
    InvalidTimeStep(f64),

    #[error("Air factor must be non-negative and finite, got {0}")]
    InvalidAirFactor(f64),

    /// Outage durations cannot be converted to step counts
    #[error("Simulation step duration is zero; cannot convert outage durations to steps")]
    ZeroStepDuration,

    #[error("Outage probability must lie in [0, 1], got {0}")]
    InvalidProbability(f64),

    #[error("Base pressure must be finite, got {0} bar")]
    InvalidBasePressure(f64),
}
