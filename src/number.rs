//! Multi-precision floating-point numbers in a decimal radix.
//!
//! A number is `sign * radix^exponent * (d0 + d1/radix + d2/radix^2 + ...)`
//! with every digit in `[0, radix)`. Nonzero numbers have `d0 != 0`; zero is
//! canonical (`sign == 0`, `exponent == 0`, all digits zero).
//!
//! Operations never look at the whole digit vector. They work on a leading
//! window described by a [`Precision`], which lets Newton iterations and
//! half-precision products run on short prefixes of full-size numbers.

use std::cmp::Ordering;

use crate::error::MpError;

/// Largest supported `log10` of a radix; `10^9` is the last power of ten that
/// fits an `i32` digit.
pub const MAX_RADIX_LOG10: u32 = 9;

/// Allocates a zero-filled buffer, reporting failure instead of aborting.
pub(crate) fn zeroed_buffer<T: Copy + Default>(len: usize) -> Result<Vec<T>, MpError> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|_| MpError::AllocationFailure { requested: len })?;
    buffer.resize(len, T::default());
    Ok(buffer)
}

/// A power-of-ten digit base.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Radix {
    value: i32,
    log10: u32,
}

impl Radix {
    /// Radix ten, where calibration starts.
    pub const DECIMAL: Self = Self {
        value: 10,
        log10: 1,
    };

    /// Returns `10^log10`, or `None` outside `1..=9`.
    pub fn from_log10(log10: u32) -> Option<Self> {
        if !(1..=MAX_RADIX_LOG10).contains(&log10) {
            return None;
        }
        Some(Self {
            value: 10_i32.pow(log10),
            log10,
        })
    }

    pub fn value(self) -> i32 {
        self.value
    }

    pub fn log10(self) -> u32 {
        self.log10
    }

    /// The next decade up, if it still fits.
    pub fn next_decade(self) -> Option<Self> {
        Self::from_log10(self.log10 + 1)
    }

    /// The next decade down, if any.
    pub fn previous_decade(self) -> Option<Self> {
        self.log10.checked_sub(1).and_then(Self::from_log10)
    }
}

/// A sign/exponent/digits multi-precision number.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MpNumber {
    pub(crate) sign: i32,
    pub(crate) exponent: i32,
    pub(crate) digits: Vec<i32>,
}

impl MpNumber {
    /// Allocates a zero with room for `capacity` digits.
    pub fn zero(capacity: usize) -> Result<Self, MpError> {
        Ok(Self {
            sign: 0,
            exponent: 0,
            digits: zeroed_buffer(capacity)?,
        })
    }

    pub fn sign(&self) -> i32 {
        self.sign
    }

    pub fn exponent(&self) -> i32 {
        self.exponent
    }

    pub fn digits(&self) -> &[i32] {
        &self.digits
    }

    pub fn capacity(&self) -> usize {
        self.digits.len()
    }

    pub fn is_zero(&self) -> bool {
        self.sign == 0
    }

    pub fn negate(&mut self) {
        self.sign = -self.sign;
    }

    /// Approximates the number as an `f64` from its leading `len` digits.
    pub fn to_f64(&self, radix: Radix, len: usize) -> f64 {
        if self.sign == 0 {
            return 0.0;
        }
        let leading = leading_value(radix, &self.digits[..len.min(self.digits.len())]);
        f64::from(self.sign) * leading * f64::from(radix.value()).powi(self.exponent)
    }

    /// Zeroes sign, exponent and every digit in the window.
    pub(crate) fn clear(&mut self, len: usize) {
        self.sign = 0;
        self.exponent = 0;
        self.digits[..len].fill(0);
    }
}

/// Evaluates `d0 + d1/radix + ...` over the given digits.
pub(crate) fn leading_value(radix: Radix, digits: &[i32]) -> f64 {
    let inverse = 1.0 / f64::from(radix.value());
    digits
        .iter()
        .rev()
        .fold(0.0, |acc, &digit| inverse * acc + f64::from(digit))
}

/// Writes the radix expansion of `value` (expected in `[1, radix)`) into
/// `digits`, saturating at `radix - 1` if rounding pushed it out of range.
pub(crate) fn fill_from_f64(radix: Radix, mut value: f64, digits: &mut [i32]) {
    let base = f64::from(radix.value());
    for slot in digits.iter_mut() {
        let mut digit = value as i32;
        if digit >= radix.value() {
            digit = radix.value() - 1;
            value = base;
        }
        value = base * (value - f64::from(digit));
        *slot = digit;
    }
}

/// The arithmetic window every digit routine runs over.
///
/// Routines that return a `Result` check that every operand holds the
/// window and fail with [`MpError::InvalidWindow`] otherwise. The infallible
/// ones index the digits directly; callers can validate operands up front
/// with [`Precision::check_capacity`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Precision {
    radix: Radix,
    len: usize,
}

impl Precision {
    pub fn new(radix: Radix, len: usize) -> Self {
        Self { radix, len }
    }

    /// Same radix, different window.
    pub fn with_len(self, len: usize) -> Self {
        Self { len, ..self }
    }

    pub fn radix(self) -> Radix {
        self.radix
    }

    pub fn len(self) -> usize {
        self.len
    }

    /// Fails unless the window is nonempty and every number holds it.
    pub fn check_capacity(self, numbers: &[&MpNumber]) -> Result<(), MpError> {
        let capacity = numbers
            .iter()
            .map(|number| number.capacity())
            .min()
            .unwrap_or(usize::MAX);
        if self.len == 0 || capacity < self.len {
            return Err(MpError::InvalidWindow {
                window: self.len,
                capacity,
            });
        }
        Ok(())
    }

    /// # Panics
    ///
    /// If `out` holds fewer digits than the window.
    pub fn load_zero(self, out: &mut MpNumber) {
        out.clear(self.len);
    }

    /// # Panics
    ///
    /// If the window is empty or longer than `out`.
    pub fn load_one(self, out: &mut MpNumber) {
        out.clear(self.len);
        out.sign = 1;
        out.digits[0] = 1;
    }

    /// # Panics
    ///
    /// If either number holds fewer digits than the window.
    pub fn copy(self, x: &MpNumber, out: &mut MpNumber) {
        out.sign = x.sign;
        out.exponent = x.exponent;
        out.digits[..self.len].copy_from_slice(&x.digits[..self.len]);
    }

    /// Keeps the leading `keep` digits, rounding half up on the next one.
    ///
    /// # Panics
    ///
    /// If `x` holds fewer digits than the window.
    pub fn round(self, keep: usize, x: &mut MpNumber) {
        if keep >= self.len {
            return;
        }
        let radix = self.radix.value;
        x.digits[keep + 1..self.len].fill(0);
        let mut value = 2 * x.digits[keep];
        x.digits[keep] = 0;
        if value < radix {
            return;
        }
        for digit in x.digits[..keep].iter_mut().rev() {
            value = *digit + 1;
            if value < radix {
                *digit = value;
                return;
            }
            *digit = 0;
        }
        x.digits[0] = 1;
        x.exponent += 1;
    }

    /// Orders by sign, then exponent, then digits.
    ///
    /// # Panics
    ///
    /// If either number holds fewer digits than the window.
    pub fn compare(self, x: &MpNumber, y: &MpNumber) -> Ordering {
        match x.sign.cmp(&y.sign) {
            Ordering::Equal => {}
            unequal => return unequal,
        }
        let magnitude = self.compare_magnitude(x, y);
        if x.sign < 0 {
            magnitude.reverse()
        } else if x.sign == 0 {
            Ordering::Equal
        } else {
            magnitude
        }
    }

    pub(crate) fn compare_magnitude(self, x: &MpNumber, y: &MpNumber) -> Ordering {
        x.exponent
            .cmp(&y.exponent)
            .then_with(|| x.digits[..self.len].cmp(&y.digits[..self.len]))
    }
}
