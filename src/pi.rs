//! Pi from the arithmetic-geometric mean.
//!
//! A modified Gauss-Legendre iteration: with `C = sqrt(1/8)`,
//! `A = 1 + 3C`, `B = sqrt(A)`, `E = B - 5/8`, `B = 2B`, `C = E - C`,
//! `A = A + E`, each step sets `E = (A + B)/2`, `B = sqrt(A * B)`,
//! `E = E - B`, `B = 2B`, `C = C - E`, `A = E + B`. The size of `E` tells how
//! many limbs are settled; precision roughly doubles per step. Then
//! `E = (E/2)^2`, `A = A + B` and
//!
//! ```text
//! pi = (A^2 - E - E/2) / (A*C - E) / 2^(k+2)
//! ```
//!
//! after `k` steps.

use std::mem;

use crate::concurrency::{Cancellation, Uncancellable};
use crate::context::PrecisionContext;
use crate::error::MpError;

/// Statistics of a completed computation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PiSummary {
    /// AGM steps run.
    pub iterations: usize,
    /// The power of two pi is divided by at the end.
    pub npow: i32,
    /// Decimal digits the last step vouched for.
    pub estimated_digits: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PiOutcome {
    Complete(PiSummary),
    /// Stopped at a check point; the accumulators hold partial values.
    Cancelled,
}

impl PrecisionContext {
    /// Computes pi into [`PrecisionContext::result`].
    pub fn compute_pi(&mut self) -> Result<PiSummary, MpError> {
        match self.compute_pi_cancellable(&Uncancellable)? {
            PiOutcome::Complete(summary) => Ok(summary),
            PiOutcome::Cancelled => Err(MpError::NoConvergence { steps: 0 }),
        }
    }

    /// Like [`PrecisionContext::compute_pi`], polling `cancel` after set-up
    /// and after every AGM step.
    pub fn compute_pi_cancellable<C: Cancellation + ?Sized>(
        &mut self,
        cancel: &C,
    ) -> Result<PiOutcome, MpError> {
        let prec = self.precision();
        let n = prec.len();
        let nfft = self.transform_length();
        let log10 = prec.radix().log10() as usize;
        let Self {
            multiplier: mul,
            solver,
            a,
            b,
            c,
            e,
            spare,
            ..
        } = self;

        prec.parse_into("0.125", spare)?;
        solver.square_root(mul, prec, spare, c)?;
        prec.mul_small(c, 3, e);
        prec.load_one(spare);
        prec.add(spare, e, a);
        solver.square_root(mul, prec, a, b)?;
        prec.parse_into("0.625", spare)?;
        prec.sub(b, spare, e);
        prec.add(b, b, spare);
        mem::swap(b, spare);
        prec.sub(e, c, spare);
        mem::swap(c, spare);
        prec.add(a, e, spare);
        mem::swap(a, spare);
        if cancel.is_cancelled() {
            return Ok(PiOutcome::Cancelled);
        }

        let mut npow: i32 = 4;
        let mut iterations = 0;
        let settled = loop {
            npow = npow
                .checked_mul(2)
                .ok_or(MpError::NoConvergence { steps: iterations })?;
            iterations += 1;
            prec.add(a, b, e);
            prec.halve_in_place(e);
            mul.multiply(prec, a, b, spare)?;
            mem::swap(a, spare);
            solver.square_root(mul, prec, a, b)?;
            prec.sub(e, b, spare);
            mem::swap(e, spare);
            prec.add(b, b, spare);
            mem::swap(b, spare);
            prec.sub(c, e, spare);
            mem::swap(c, spare);
            prec.add(e, b, a);

            let limbs = if e.is_zero() {
                n
            } else {
                usize::try_from(-i64::from(e.exponent)).unwrap_or(0)
            };
            tracing::debug!(
                iteration = iterations,
                digits = 4 * limbs * log10,
                "agm step"
            );
            if cancel.is_cancelled() {
                return Ok(PiOutcome::Cancelled);
            }
            if 4 * limbs > n {
                break limbs;
            }
        };

        // E = (E/2)^2 needs only half precision.
        prec.halve_in_place(e);
        mul.square_half(prec, nfft, e, spare)?;
        mem::swap(e, spare);
        prec.add(a, b, spare);
        mem::swap(a, spare);
        // B = 1 / (A*C - E)
        mul.multiply(prec, a, c, spare)?;
        prec.sub(spare, e, c);
        solver.reciprocal(mul, prec, c, b)?;
        // A = A^2 - E - E/2
        mul.square(prec, a, spare)?;
        prec.sub(spare, e, a);
        prec.halve_in_place(e);
        prec.sub(a, e, spare);
        mem::swap(a, spare);
        mul.multiply(prec, a, b, spare)?;
        prec.div_small(spare, npow, a)?;

        Ok(PiOutcome::Complete(PiSummary {
            iterations,
            npow,
            estimated_digits: 4 * settled * log10,
        }))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::panic)]

    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::concurrency::StopFlag;
    use crate::config::ContextConfig;
    use crate::convert::ScaledInteger;
    use crate::test_utils::{assert_agrees, machin_pi};

    const PI_100: &str = "3.14159265358979323846264338327950288419716939937510582097494459230781640628620899862803482534211706";

    /// Reports cancellation from the poll numbered `limit` (counting from
    /// zero) onwards.
    struct CancelAfter {
        polls: AtomicUsize,
        limit: usize,
    }

    impl CancelAfter {
        fn new(limit: usize) -> Self {
            Self {
                polls: AtomicUsize::new(0),
                limit,
            }
        }

        fn polls(&self) -> usize {
            self.polls.load(Ordering::Relaxed)
        }
    }

    impl Cancellation for CancelAfter {
        fn is_cancelled(&self) -> bool {
            self.polls.fetch_add(1, Ordering::Relaxed) >= self.limit
        }
    }

    fn context(nfft: usize) -> PrecisionContext {
        PrecisionContext::new(ContextConfig::with_transform_length(nfft)).expect("context")
    }

    #[test]
    fn leading_digits_of_pi() {
        let mut ctx = context(512);
        let summary = ctx.compute_pi().expect("pi");
        assert!(summary.iterations > 0);
        assert_eq!(summary.npow, 4 << summary.iterations);
        let text = ctx.format(ctx.result());
        assert!(text.starts_with(PI_100), "{}", &text[..120.min(text.len())]);
        assert!(text.ends_with("e0"));
    }

    #[test]
    fn matches_machin_reference() {
        for nfft in [64, 1024] {
            let mut ctx = context(nfft);
            let summary = ctx.compute_pi().expect("pi");
            let prec = ctx.precision();
            let log10 = prec.radix().log10();
            let limbs = prec.len() - 6;
            let guard_limbs = prec.len() as u32 + 4;
            let expected = ScaledInteger {
                mantissa: machin_pi(log10 * guard_limbs),
                exponent: -i64::from(guard_limbs),
            };
            assert_agrees(prec, ctx.result(), &expected, limbs);
            assert!(summary.estimated_digits > 0);
        }
    }

    #[test]
    fn repeated_runs_are_identical() {
        let mut first = context(256);
        first.compute_pi().expect("pi");
        let mut second = first.sibling().expect("sibling");
        second.compute_pi().expect("pi");
        first.compute_pi().expect("pi again");
        assert_eq!(first.result(), second.result());
    }

    #[test]
    fn stopped_flag_cancels_before_iterating() {
        let mut ctx = context(64);
        let flag = StopFlag::new();
        flag.stop();
        assert_eq!(
            ctx.compute_pi_cancellable(&flag).expect("pi"),
            PiOutcome::Cancelled
        );
        let fresh = StopFlag::new();
        assert!(matches!(
            ctx.compute_pi_cancellable(&fresh).expect("pi"),
            PiOutcome::Complete(_)
        ));
    }

    #[test]
    fn cancellation_between_steps_stops_at_the_next_poll() {
        let mut ctx = context(1024);
        let cancel = CancelAfter::new(3);
        assert_eq!(
            ctx.compute_pi_cancellable(&cancel).expect("pi"),
            PiOutcome::Cancelled
        );
        // One poll after set-up, then one per step.
        assert_eq!(cancel.polls(), 4);

        let summary = ctx.compute_pi().expect("pi after cancel");
        assert!(summary.iterations > 3);
        assert!(ctx.format(ctx.result()).starts_with(&PI_100[..40]));
    }

    #[test]
    fn iterations_grow_with_log_of_length() {
        let mut previous = 0;
        for nfft in [16, 128, 4096] {
            let mut ctx = context(nfft);
            let iterations = ctx.compute_pi().expect("pi").iterations;
            let log2 = nfft.trailing_zeros() as usize;
            assert!(
                (log2 / 2..=log2).contains(&iterations),
                "nfft {nfft}: {iterations} iterations"
            );
            assert!(iterations > previous);
            previous = iterations;
        }
    }
}
