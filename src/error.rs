//! Error types for multi-precision operations.
//!
//! Every fallible routine returns `Result<_, MpError>`. When a call fails its
//! output operand is left in an unspecified (but memory-safe) state; callers
//! should not read it.

use std::fmt;

/// Errors that can occur while computing with multi-precision numbers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MpError {
    /// Division by a zero integer or reciprocal of zero.
    DivideByZero,
    /// Input is outside the domain of the operation (e.g. square root of a
    /// negative number).
    InvalidDomain,
    /// A working buffer could not be allocated.
    AllocationFailure { requested: usize },
    /// The requested transform length is zero or too large to represent.
    InvalidTransformLength { requested: usize },
    /// The arithmetic window is empty or longer than an operand's digits.
    InvalidWindow { window: usize, capacity: usize },
    /// The rounding error margin must lie strictly between 0 and 0.5.
    InvalidErrorMargin,
    /// The decimal text contains no digits.
    InvalidDecimal,
    /// A Newton schedule stopped gaining precision.
    NoConvergence { steps: usize },
    /// A benchmark worker thread panicked.
    WorkerPanicked,
}

impl fmt::Display for MpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DivideByZero => write!(f, "division by zero"),
            Self::InvalidDomain => write!(f, "input outside the domain of the operation"),
            Self::AllocationFailure { requested } => {
                write!(f, "failed to allocate {requested} elements")
            }
            Self::InvalidTransformLength { requested } => {
                write!(f, "invalid transform length {requested}")
            }
            Self::InvalidWindow { window, capacity } => {
                write!(f, "window of {window} digits does not fit {capacity} digits")
            }
            Self::InvalidErrorMargin => write!(f, "error margin must be in (0, 0.5)"),
            Self::InvalidDecimal => write!(f, "decimal text contains no digits"),
            Self::NoConvergence { steps } => {
                write!(f, "newton iteration stalled after {steps} steps")
            }
            Self::WorkerPanicked => write!(f, "benchmark worker panicked"),
        }
    }
}

impl std::error::Error for MpError {}
