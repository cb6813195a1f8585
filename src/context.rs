//! Per-run state: transform length, calibrated radix and every buffer the
//! pi computation touches.

use std::io;

use crate::config::ContextConfig;
use crate::error::MpError;
use crate::multiply::FftMultiplier;
use crate::newton::NewtonSolver;
use crate::number::{MpNumber, Precision, Radix};

/// A transform length with its calibrated radix and working storage.
///
/// Contexts are not shared between threads; give each worker its own with
/// [`PrecisionContext::sibling`].
#[derive(Debug)]
pub struct PrecisionContext {
    nfft: usize,
    radix: Radix,
    error_bound: f64,
    error_margin: f64,
    pub(crate) multiplier: FftMultiplier,
    pub(crate) solver: NewtonSolver,
    pub(crate) a: MpNumber,
    pub(crate) b: MpNumber,
    pub(crate) c: MpNumber,
    pub(crate) e: MpNumber,
    pub(crate) spare: MpNumber,
}

impl PrecisionContext {
    /// Allocates a context and picks the largest radix whose rounding error
    /// stays under the configured margin.
    pub fn new(config: ContextConfig) -> Result<Self, MpError> {
        let nfft = config.validate()?;
        let mut context = Self::allocate(nfft, Radix::DECIMAL, 0.0, config.error_margin)?;
        let (radix, error_bound) =
            select_radix(&mut context.multiplier, nfft + 2, config.error_margin)?;
        context.radix = radix;
        context.error_bound = error_bound;
        tracing::info!(
            transform_length = nfft,
            radix = radix.value(),
            error_bound,
            "precision context ready"
        );
        Ok(context)
    }

    /// A fresh context with the same transform length and radix, skipping
    /// calibration.
    pub fn sibling(&self) -> Result<Self, MpError> {
        Self::allocate(self.nfft, self.radix, self.error_bound, self.error_margin)
    }

    fn allocate(
        nfft: usize,
        radix: Radix,
        error_bound: f64,
        error_margin: f64,
    ) -> Result<Self, MpError> {
        let capacity = nfft + 2;
        Ok(Self {
            nfft,
            radix,
            error_bound,
            error_margin,
            multiplier: FftMultiplier::new(nfft, capacity)?,
            solver: NewtonSolver::new(capacity)?,
            a: MpNumber::zero(capacity)?,
            b: MpNumber::zero(capacity)?,
            c: MpNumber::zero(capacity)?,
            e: MpNumber::zero(capacity)?,
            spare: MpNumber::zero(capacity)?,
        })
    }

    pub fn transform_length(&self) -> usize {
        self.nfft
    }

    pub fn radix(&self) -> Radix {
        self.radix
    }

    /// Measured worst-case rounding error at the chosen radix.
    pub fn error_bound(&self) -> f64 {
        self.error_bound
    }

    /// Digits per number, `nfft + 2`.
    pub fn capacity(&self) -> usize {
        self.nfft + 2
    }

    /// The full working window.
    pub fn precision(&self) -> Precision {
        Precision::new(self.radix, self.capacity())
    }

    /// The value left by the last completed pi computation.
    pub fn result(&self) -> &MpNumber {
        &self.a
    }

    /// A zero sized for this context.
    pub fn zero(&self) -> Result<MpNumber, MpError> {
        MpNumber::zero(self.capacity())
    }

    pub fn parse(&self, text: &str) -> Result<MpNumber, MpError> {
        self.precision().parse(text, self.capacity())
    }

    pub fn format(&self, x: &MpNumber) -> String {
        self.precision().format(x)
    }

    pub fn write_decimal<W: io::Write>(&self, x: &MpNumber, writer: W) -> io::Result<()> {
        self.precision().write_decimal(x, writer)
    }

    pub fn multiply(
        &mut self,
        x: &MpNumber,
        y: &MpNumber,
        out: &mut MpNumber,
    ) -> Result<(), MpError> {
        let prec = self.precision();
        self.multiplier.multiply(prec, x, y, out)
    }

    pub fn square(&mut self, x: &MpNumber, out: &mut MpNumber) -> Result<(), MpError> {
        let prec = self.precision();
        self.multiplier.square(prec, x, out)
    }

    pub fn reciprocal(&mut self, x: &MpNumber, out: &mut MpNumber) -> Result<(), MpError> {
        let prec = self.precision();
        self.solver.reciprocal(&mut self.multiplier, prec, x, out)
    }

    pub fn square_root(&mut self, x: &MpNumber, out: &mut MpNumber) -> Result<(), MpError> {
        let prec = self.precision();
        self.solver.square_root(&mut self.multiplier, prec, x, out)
    }
}

/// Worst-case error of one full-length product at `radix`: the measured
/// carry error plus the accumulated floating-point error of the convolution.
fn estimated_error(mul: &mut FftMultiplier, radix: Radix, n: usize) -> Result<f64, MpError> {
    let base = f64::from(radix.value());
    let measured = mul.radix_error(radix, n)?;
    Ok(measured + f64::EPSILON * (n as f64 * base * base / 4.0))
}

/// Extrapolates from radix ten (each decade costs a factor of 100 in error),
/// then checks the pick directly and backs off while it is over the margin.
fn select_radix(
    mul: &mut FftMultiplier,
    n: usize,
    margin: f64,
) -> Result<(Radix, f64), MpError> {
    let mut radix = Radix::DECIMAL;
    let mut error = estimated_error(mul, radix, n)?;
    while 100.0 * error < margin && radix.value() <= i32::MAX / 20 {
        let Some(next) = radix.next_decade() else {
            break;
        };
        error *= 100.0;
        radix = next;
    }

    let mut measured = estimated_error(mul, radix, n)?;
    while measured > margin {
        let Some(previous) = radix.previous_decade() else {
            tracing::warn!(
                error = measured,
                margin,
                "rounding error exceeds the margin even at radix 10"
            );
            break;
        };
        tracing::debug!(radix = radix.value(), error = measured, "radix too large");
        radix = previous;
        measured = estimated_error(mul, radix, n)?;
    }
    Ok((radix, measured))
}
