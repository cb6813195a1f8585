//! Tuning knobs for precision contexts and the benchmark harness.

use std::time::Duration;

use crate::error::MpError;

/// Default bound on the worst-case rounding error of one convolution.
pub const DEFAULT_ERROR_MARGIN: f64 = 0.3;

/// Smallest transform length a context will use.
pub const MIN_TRANSFORM_LENGTH: usize = 16;

/// Largest transform length a context will accept. Digit indices and
/// exponents are `i32`, so lengths stay well inside that range.
pub const MAX_TRANSFORM_LENGTH: usize = 1 << 26;

/// Settings for building a [`PrecisionContext`](crate::PrecisionContext).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContextConfig {
    /// Requested transform length; rounded up to a power of two.
    pub transform_length: usize,
    /// Upper bound on the measured rounding error used when choosing the radix.
    pub error_margin: f64,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            transform_length: 512,
            error_margin: DEFAULT_ERROR_MARGIN,
        }
    }
}

impl ContextConfig {
    pub fn with_transform_length(transform_length: usize) -> Self {
        Self {
            transform_length,
            ..Self::default()
        }
    }

    /// Checks the settings and returns the power-of-two transform length.
    pub fn validate(&self) -> Result<usize, MpError> {
        if !(self.error_margin > 0.0 && self.error_margin < 0.5) {
            return Err(MpError::InvalidErrorMargin);
        }
        if self.transform_length == 0 || self.transform_length > MAX_TRANSFORM_LENGTH {
            return Err(MpError::InvalidTransformLength {
                requested: self.transform_length,
            });
        }
        Ok(self
            .transform_length
            .next_power_of_two()
            .max(MIN_TRANSFORM_LENGTH))
    }
}

/// Settings for [`run_benchmark`](crate::run_benchmark).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BenchConfig {
    /// Number of worker threads, each with a private context.
    pub threads: usize,
    /// Minimum time each worker keeps timing before it leaves.
    pub min_duration: Duration,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            threads: 1,
            min_duration: Duration::from_secs(5),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn transform_length_rounds_up_to_power_of_two() {
        let config = ContextConfig::with_transform_length(600);
        assert_eq!(config.validate(), Ok(1024));
        let tiny = ContextConfig::with_transform_length(3);
        assert_eq!(tiny.validate(), Ok(MIN_TRANSFORM_LENGTH));
    }

    #[test]
    fn rejects_bad_settings() {
        let zero = ContextConfig::with_transform_length(0);
        assert_eq!(
            zero.validate(),
            Err(MpError::InvalidTransformLength { requested: 0 })
        );
        let margin = ContextConfig {
            error_margin: 0.5,
            ..ContextConfig::default()
        };
        assert_eq!(margin.validate(), Err(MpError::InvalidErrorMargin));
        let nan = ContextConfig {
            error_margin: f64::NAN,
            ..ContextConfig::default()
        };
        assert_eq!(nan.validate(), Err(MpError::InvalidErrorMargin));
    }
}
