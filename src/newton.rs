//! Newton iterations for the reciprocal and the square root.
//!
//! Both start from a double-precision seed and double the transform length
//! each step, so every step costs about twice the previous one and the total
//! stays within a small multiple of one full-length product. A step returns
//! the number of limbs its residual shows to be correct; the [`Schedule`]
//! uses that to decide whether the next length may double or has to repeat.

use crate::error::MpError;
use crate::multiply::{FftMultiplier, half_window};
use crate::number::{MpNumber, Precision, Radix, fill_from_f64, leading_value};

/// A schedule that re-runs one transform length this many times in a row
/// has stopped gaining precision.
const MAX_REPEATS: usize = 16;

/// Smallest power of two `len` for which squaring a `len`-digit seed already
/// exceeds double precision, capped at `nfft_max`.
pub fn initial_transform_length(radix: Radix, nfft_max: usize) -> usize {
    let mut power = f64::from(radix.value());
    let mut len = 1;
    loop {
        power *= power;
        len <<= 1;
        if f64::EPSILON * power >= 1.0 || len >= nfft_max {
            return len;
        }
    }
}

/// Chooses the transform length of each Newton step.
#[derive(Debug)]
struct Schedule {
    nfft_max: usize,
    step: usize,
    threshold: usize,
    repeats: usize,
    steps: usize,
}

impl Schedule {
    fn new(radix: Radix, nfft_max: usize) -> Self {
        Self {
            nfft_max,
            step: initial_transform_length(radix, nfft_max),
            threshold: 8,
            repeats: 0,
            steps: 0,
        }
    }

    /// Transform length of the current step.
    fn step(&self) -> usize {
        self.step
    }

    /// Limbs the current step works on.
    fn window(&self, n: usize) -> usize {
        (self.step + 2).min(n)
    }

    /// Records the precision reached by a step and moves to the next length.
    /// Returns `false` once the full length has been run.
    fn advance(&mut self, precision: i64, window: usize) -> Result<bool, MpError> {
        let previous = self.step;
        let usable = window as i64 - 2;
        self.steps += 1;
        if self.threshold * self.step >= self.nfft_max {
            self.threshold = 0;
            if 2 * precision <= usable {
                self.step >>= 1;
            }
        } else if 3 * precision < usable {
            self.step >>= 1;
        }
        self.step <<= 1;
        tracing::debug!(
            transform_length = previous,
            precision,
            next = self.step,
            "newton step"
        );
        if self.step == previous {
            self.repeats += 1;
            if self.repeats > MAX_REPEATS {
                tracing::warn!(
                    transform_length = previous,
                    steps = self.steps,
                    "newton schedule stalled"
                );
                return Err(MpError::NoConvergence { steps: self.steps });
            }
        } else {
            self.repeats = 0;
        }
        Ok(self.step <= self.nfft_max)
    }
}

/// Scratch numbers shared by the Newton routines. All three must have the
/// capacity of the numbers they work on.
#[derive(Debug)]
pub struct NewtonSolver {
    t1: MpNumber,
    t2: MpNumber,
    t3: MpNumber,
}

impl NewtonSolver {
    pub fn new(capacity: usize) -> Result<Self, MpError> {
        Ok(Self {
            t1: MpNumber::zero(capacity)?,
            t2: MpNumber::zero(capacity)?,
            t3: MpNumber::zero(capacity)?,
        })
    }

    /// `out = 1 / x`.
    pub fn reciprocal(
        &mut self,
        mul: &mut FftMultiplier,
        prec: Precision,
        x: &MpNumber,
        out: &mut MpNumber,
    ) -> Result<(), MpError> {
        self.check(prec, x, out)?;
        if x.is_zero() {
            return Err(MpError::DivideByZero);
        }
        let n = prec.len();
        let mut schedule = Schedule::new(prec.radix(), mul.transform_length());
        seed_reciprocal(prec.with_len(schedule.window(n)), x, out);
        loop {
            let window = schedule.window(n);
            let precision =
                self.reciprocal_step(mul, prec.with_len(window), schedule.step(), x, out)?;
            if !schedule.advance(precision, window)? {
                return Ok(());
            }
        }
    }

    /// `out = sqrt(x)`.
    pub fn square_root(
        &mut self,
        mul: &mut FftMultiplier,
        prec: Precision,
        x: &MpNumber,
        out: &mut MpNumber,
    ) -> Result<(), MpError> {
        self.check(prec, x, out)?;
        if x.sign < 0 {
            return Err(MpError::InvalidDomain);
        }
        if x.is_zero() {
            prec.load_zero(out);
            return Ok(());
        }
        let n = prec.len();
        let mut schedule = Schedule::new(prec.radix(), mul.transform_length());
        seed_square_root(prec.with_len(schedule.window(n)), x, out, &mut self.t1);
        let mut held = None;
        loop {
            let window = schedule.window(n);
            let precision = self.square_root_step(
                mul,
                prec.with_len(window),
                schedule.step(),
                x,
                out,
                &mut held,
            )?;
            if !schedule.advance(precision, window)? {
                return Ok(());
            }
        }
    }

    fn check(&self, prec: Precision, x: &MpNumber, out: &MpNumber) -> Result<(), MpError> {
        prec.check_capacity(&[x, out, &self.t1, &self.t2, &self.t3])
    }

    /// One step of `r += r * (1 - x * r)`.
    fn reciprocal_step(
        &mut self,
        mul: &mut FftMultiplier,
        prec: Precision,
        nfft: usize,
        x: &MpNumber,
        out: &mut MpNumber,
    ) -> Result<i64, MpError> {
        let shift = nfft / 2 + 1;
        let hp = prec.with_len(half_window(prec.len(), shift));

        // t3 = 1 - r * upper(x)
        prec.round(shift, out);
        mul.multiply_half(prec, nfft, out, x, &mut self.t1)?;
        prec.load_one(&mut self.t2);
        prec.sub(&self.t2, &self.t1, &mut self.t3);
        // t2 = t3 - r * lower(x)
        mul.multiply_held(prec, nfft, shift, x, &mut self.t1)?;
        hp.sub(&self.t3, &self.t1, &mut self.t2);

        let precision = if self.t2.is_zero() {
            nfft as i64 + 1
        } else {
            -i64::from(self.t2.exponent)
        };

        mul.multiply_held(hp, nfft, 0, &self.t2, &mut self.t3)?;
        if !self.t3.is_zero() {
            prec.add(out, &self.t3, &mut self.t1);
            prec.copy(&self.t1, out);
        }
        Ok(precision)
    }

    /// One step of the coupled iteration `t += t * (1 - s * t)`,
    /// `s += t * (x - s^2) / 2` with `t1` holding `t ~ 1/sqrt(x)`.
    fn square_root_step(
        &mut self,
        mul: &mut FftMultiplier,
        prec: Precision,
        nfft: usize,
        x: &MpNumber,
        out: &mut MpNumber,
        held: &mut Option<usize>,
    ) -> Result<i64, MpError> {
        let shift = nfft / 2 + 1;
        let half = (nfft / 2).max(2);
        let hp = prec.with_len(half_window(prec.len(), shift));

        // t2 = t^2 at quarter precision; the previous step may have left the
        // image of t at exactly this length.
        hp.round(half / 2 + 1, &mut self.t1);
        if *held == Some(half) {
            mul.square_half_held(hp, half, &mut self.t2)?;
        } else {
            mul.square_half(hp, half, &self.t1, &mut self.t2)?;
        }
        // t = t + (t - s * t^2)
        prec.round(shift, out);
        mul.multiply_half(hp, nfft, out, &self.t2, &mut self.t3)?;
        hp.sub(&self.t1, &self.t3, &mut self.t2);
        hp.add(&self.t1, &self.t2, &mut self.t3);
        hp.copy(&self.t3, &mut self.t1);
        // t2 = x - s^2, reusing the image of s
        mul.square_half_held(prec, nfft, &mut self.t3)?;
        prec.sub(x, &self.t3, &mut self.t2);

        let precision = if self.t2.is_zero() {
            nfft as i64 + 1
        } else {
            let gained = i64::from(x.exponent) - i64::from(self.t2.exponent);
            gained + i64::from(x.digits[0] > self.t2.digits[0])
        };

        hp.round(shift, &mut self.t1);
        mul.multiply_half(hp, nfft, &self.t1, &self.t2, &mut self.t3)?;
        *held = Some(nfft);
        prec.halve(&self.t3, &mut self.t2);
        if !self.t2.is_zero() {
            prec.add(out, &self.t2, &mut self.t3);
            prec.copy(&self.t3, out);
        }
        Ok(precision)
    }
}

fn seed_reciprocal(prec: Precision, x: &MpNumber, out: &mut MpNumber) {
    let radix = prec.radix();
    let base = f64::from(radix.value());
    let mut exponent = -x.exponent;
    let mut value = 1.0 / leading_value(radix, &x.digits[..prec.len()]);
    while value < 1.0 {
        value *= base;
        exponent -= 1;
    }
    out.sign = x.sign;
    out.exponent = exponent;
    out.digits.fill(0);
    fill_from_f64(radix, value, &mut out.digits[..prec.len()]);
}

/// Seeds `out ~ sqrt(x)` and `rev ~ 1/sqrt(x)`.
fn seed_square_root(prec: Precision, x: &MpNumber, out: &mut MpNumber, rev: &mut MpNumber) {
    let radix = prec.radix();
    let base = f64::from(radix.value());
    let mut exponent = x.exponent;
    let mut value = leading_value(radix, &x.digits[..prec.len()]);
    if exponent % 2 != 0 {
        value *= base;
        exponent -= 1;
    }
    exponent /= 2;
    value = value.sqrt();
    if value < 1.0 {
        value *= base;
        exponent -= 1;
    }
    out.sign = 1;
    out.exponent = exponent;
    out.digits.fill(0);
    fill_from_f64(radix, value, &mut out.digits[..prec.len()]);

    let mut rev_exponent = -exponent;
    let mut rev_value = 1.0 / value;
    while rev_value < 1.0 {
        rev_value *= base;
        rev_exponent -= 1;
    }
    rev.sign = 1;
    rev.exponent = rev_exponent;
    rev.digits.fill(0);
    fill_from_f64(radix, rev_value, &mut rev.digits[..prec.len()]);
}
