//! Error types shared by the sculpt engine and the water simulation.

use thiserror::Error;

/// Errors raised synchronously by simulation construction and mutation calls.
///
/// Numerical trouble during a step is never reported here: passes clamp
/// heights, flux and velocity instead of propagating bad values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    /// Construction parameters cannot produce a working simulation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A call received an argument it cannot apply. Nothing was modified.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

pub type SimResult<T> = Result<T, SimError>;
