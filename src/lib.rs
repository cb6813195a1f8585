#![warn(
    clippy::shadow_reuse,
    clippy::shadow_same,
    clippy::shadow_unrelated,
    clippy::dbg_macro,
    clippy::expect_used,
    clippy::panic,
    clippy::print_stderr,
    clippy::print_stdout,
    clippy::todo,
    clippy::unimplemented,
    clippy::unwrap_used
)]

//! Multi-precision pi from the arithmetic-geometric mean, with transform-based
//! multiplication, Newton reciprocal and square root, and a decimal radix
//! chosen per transform length.
//!
//! ```no_run
//! use fft_pi::{ContextConfig, PrecisionContext};
//!
//! # fn main() -> Result<(), fft_pi::MpError> {
//! let mut context = PrecisionContext::new(ContextConfig::with_transform_length(1024))?;
//! context.compute_pi()?;
//! let digits = context.format(context.result());
//! assert!(digits.starts_with("3.14159"));
//! # Ok(())
//! # }
//! ```

mod arith;
mod bench;
mod concurrency;
mod config;
mod context;
mod convert;
mod decimal;
mod error;
mod multiply;
mod newton;
mod number;
mod pi;
mod transform;

#[cfg(test)]
mod test_utils;

pub use bench::{BenchReport, TABLE_HEADER, reference_index, run_benchmark, sweep_lengths};
pub use concurrency::{ActiveWorker, Cancellation, StopFlag, Uncancellable, WorkerGauge};
pub use config::{
    BenchConfig, ContextConfig, DEFAULT_ERROR_MARGIN, MAX_TRANSFORM_LENGTH, MIN_TRANSFORM_LENGTH,
};
pub use context::PrecisionContext;
pub use convert::ScaledInteger;
pub use decimal::DecimalView;
pub use error::MpError;
pub use multiply::FftMultiplier;
pub use newton::{NewtonSolver, initial_transform_length};
pub use number::{MAX_RADIX_LOG10, MpNumber, Precision, Radix};
pub use pi::{PiOutcome, PiSummary};
pub use transform::RealTransform;
