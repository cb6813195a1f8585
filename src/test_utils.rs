//! Shared helpers for the unit tests.

use num_bigint::BigInt;
use num_traits::{Signed, Zero};
use rand::Rng;

use crate::convert::ScaledInteger;
use crate::number::{MpNumber, Precision, Radix};

/// Builds a number from its parts; capacity is the digit count.
pub fn number(sign: i32, exponent: i32, digits: &[i32]) -> MpNumber {
    MpNumber {
        sign,
        exponent,
        digits: digits.to_vec(),
    }
}

/// Radix `10^log10`, panicking outside `1..=9`.
pub fn radix(log10: u32) -> Radix {
    match Radix::from_log10(log10) {
        Some(radix) => radix,
        None => panic!("unsupported radix 10^{log10}"),
    }
}

/// A random normalized number filling the window of `prec`.
pub fn random_number<R: Rng>(rng: &mut R, prec: Precision, capacity: usize) -> MpNumber {
    let base = prec.radix().value();
    let mut digits = vec![0; capacity];
    digits[0] = rng.gen_range(1..base);
    for digit in &mut digits[1..prec.len()] {
        *digit = rng.gen_range(0..base);
    }
    MpNumber {
        sign: if rng.gen_bool(0.5) { 1 } else { -1 },
        exponent: rng.gen_range(-3..=3),
        digits,
    }
}

/// The exact product of the windows of `x` and `y`.
pub fn exact_product(prec: Precision, x: &MpNumber, y: &MpNumber) -> ScaledInteger {
    let radix = prec.radix();
    x.to_scaled_integer(radix, prec.len())
        .mul(&y.to_scaled_integer(radix, prec.len()))
}

/// Asserts `|actual - expected| <= |expected| * radix^(1 - limbs)`.
pub fn assert_scaled_close(
    radix: Radix,
    actual: &ScaledInteger,
    expected: &ScaledInteger,
    limbs: usize,
) {
    let (lhs, rhs) = actual.aligned(expected, radix);
    let difference = (&lhs - &rhs).abs();
    let bound = num_traits::pow(BigInt::from(radix.value()), limbs.saturating_sub(1));
    assert!(
        difference * bound <= rhs.abs(),
        "values differ within the leading {limbs} limbs:\n  actual   {lhs}\n  expected {rhs}"
    );
}

/// Asserts that `actual` matches `expected` to `limbs` leading limbs.
pub fn assert_agrees(prec: Precision, actual: &MpNumber, expected: &ScaledInteger, limbs: usize) {
    assert_scaled_close(
        prec.radix(),
        &actual.to_scaled_integer(prec.radix(), prec.len()),
        expected,
        limbs,
    );
}

/// `floor(pi * 10^digits)` from Machin's formula.
pub fn machin_pi(digits: u32) -> BigInt {
    let guard = 10;
    let scale = num_traits::pow(BigInt::from(10), (digits + guard) as usize);
    let pi = arctan_inverse(5, &scale) * 16_u32 - arctan_inverse(239, &scale) * 4_u32;
    pi / num_traits::pow(BigInt::from(10), guard as usize)
}

/// `atan(1 / x) * scale`, truncated.
fn arctan_inverse(x: u32, scale: &BigInt) -> BigInt {
    let square = BigInt::from(x) * x;
    let mut power = scale / x;
    let mut sum = power.clone();
    let mut k = 1_u32;
    while !power.is_zero() {
        power /= &square;
        let term = &power / (2 * k + 1);
        if k % 2 == 1 {
            sum -= term;
        } else {
            sum += term;
        }
        k += 1;
    }
    sum
}
