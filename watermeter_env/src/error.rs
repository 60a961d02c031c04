//! Error types for the environment abstraction.

use thiserror::Error;

/// Errors that can occur in the environment abstraction layer.
#[derive(Debug, Error)]
pub enum EnvError {
    /// A scripted draw lies outside the unit interval [0, 1)
    #[error("Scripted draw {0} is outside [0, 1)")]
    DrawOutOfRange(f64),

    /// A scripted random source needs at least one value
    #[error("Scripted random source is empty")]
    EmptyScript,
}
