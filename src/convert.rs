//! Exact conversion between multi-precision numbers and `num-bigint`
//! integers.

use std::iter;

use num_bigint::{BigInt, Sign};
use num_traits::{Signed, Zero};

use crate::error::MpError;
use crate::number::{MpNumber, Precision, Radix};

/// An exact value `mantissa * radix^exponent`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScaledInteger {
    pub mantissa: BigInt,
    pub exponent: i64,
}

impl ScaledInteger {
    /// Multiplies two scaled integers exactly.
    pub fn mul(&self, other: &Self) -> Self {
        Self {
            mantissa: &self.mantissa * &other.mantissa,
            exponent: self.exponent + other.exponent,
        }
    }

    /// Rewrites both values over a common exponent and returns their
    /// mantissas.
    pub fn aligned(&self, other: &Self, radix: Radix) -> (BigInt, BigInt) {
        let base = BigInt::from(radix.value());
        let exponent = self.exponent.min(other.exponent);
        let lift = |value: &Self| {
            let steps = usize::try_from(value.exponent - exponent).unwrap_or(0);
            &value.mantissa * num_traits::pow(base.clone(), steps)
        };
        (lift(self), lift(other))
    }
}

impl MpNumber {
    /// The value of the leading `len` digits as an exact scaled integer.
    /// Digits past the capacity count as zero.
    pub fn to_scaled_integer(&self, radix: Radix, len: usize) -> ScaledInteger {
        let base = BigInt::from(radix.value());
        let magnitude = self
            .digits
            .iter()
            .copied()
            .chain(iter::repeat(0))
            .take(len)
            .fold(BigInt::zero(), |acc, digit| acc * &base + digit);
        let mantissa = if self.sign < 0 { -magnitude } else { magnitude };
        ScaledInteger {
            mantissa,
            exponent: i64::from(self.exponent) - (len as i64 - 1),
        }
    }
}

impl Precision {
    /// Loads an integer, keeping its leading digits if it is longer than the
    /// window.
    pub fn load_bigint(self, value: &BigInt, out: &mut MpNumber) -> Result<(), MpError> {
        self.parse_into(&value.abs().to_string(), out)?;
        if value.sign() == Sign::Minus {
            out.negate();
        }
        Ok(())
    }

    /// Whether `value` agrees with `expected` to a relative error of at most
    /// `radix^(1 - limbs)`.
    pub fn agrees_with(self, value: &MpNumber, expected: &ScaledInteger, limbs: u32) -> bool {
        let radix = self.radix();
        let actual = value.to_scaled_integer(radix, self.len());
        let (lhs, rhs) = actual.aligned(expected, radix);
        let difference = (lhs - &rhs).abs();
        let bound = num_traits::pow(BigInt::from(radix.value()), limbs.saturating_sub(1) as usize);
        difference * bound <= rhs.abs()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::panic)]

    use super::*;
    use crate::test_utils::{number, radix};

    #[test]
    fn scaled_integer_of_digits() {
        let r = radix(2);
        let x = number(-1, 1, &[3, 14, 15]);
        let scaled = x.to_scaled_integer(r, 3);
        assert_eq!(scaled.mantissa, BigInt::from(-31_415));
        assert_eq!(scaled.exponent, -1);
        let padded = x.to_scaled_integer(r, 5);
        assert_eq!(padded.mantissa, BigInt::from(-314_150_000));
        assert_eq!(padded.exponent, -3);
    }

    #[test]
    fn bigint_loads_with_truncation() {
        let prec = Precision::new(radix(3), 3);
        let mut out = MpNumber::zero(3).expect("alloc");
        let value: BigInt = "-123456789012".parse().expect("literal");
        prec.load_bigint(&value, &mut out).expect("load");
        assert_eq!(out, number(-1, 3, &[123, 456, 789]));
        assert!(prec.agrees_with(&out, &out.to_scaled_integer(prec.radix(), 3), 3));
    }

    #[test]
    fn agreement_is_relative() {
        let prec = Precision::new(radix(1), 4);
        let x = number(1, 0, &[1, 0, 0, 1]);
        let expected = ScaledInteger {
            mantissa: BigInt::from(1),
            exponent: 0,
        };
        assert!(prec.agrees_with(&x, &expected, 3));
        assert!(!prec.agrees_with(&x, &expected, 5));
    }
}
