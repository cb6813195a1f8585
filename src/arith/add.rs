use std::cmp::Ordering;

use crate::number::{MpNumber, Precision};

impl Precision {
    /// `out = x + y`.
    ///
    /// # Panics
    ///
    /// If any operand holds fewer digits than the window.
    pub fn add(self, x: &MpNumber, y: &MpNumber, out: &mut MpNumber) {
        self.combine(x, y, y.sign, out);
    }

    /// `out = x - y`.
    ///
    /// # Panics
    ///
    /// If any operand holds fewer digits than the window.
    pub fn sub(self, x: &MpNumber, y: &MpNumber, out: &mut MpNumber) {
        self.combine(x, y, -y.sign, out);
    }

    /// `out = x + y_sign * |y|`.
    fn combine(self, x: &MpNumber, y: &MpNumber, y_sign: i32, out: &mut MpNumber) {
        let n = self.len();
        let radix = self.radix().value();
        let mut gap = i64::from(x.exponent) - i64::from(y.exponent);
        let mut exponent = i64::from(x.exponent.max(y.exponent));
        let mut sign = x.sign * y_sign;
        let (xd, yd, od) = (&x.digits[..n], &y.digits[..n], &mut out.digits[..n]);

        if sign >= 0 {
            if sign > 0 {
                sign = x.sign;
            } else {
                // One side is zero, so its exponent is zero too.
                sign = x.sign + y_sign;
                exponent = i64::from(x.exponent) + i64::from(y.exponent);
                gap = 0;
            }
            let carry = if gap >= 0 {
                add_aligned(radix, clamp_gap(gap, n), xd, yd, od)
            } else {
                add_aligned(radix, clamp_gap(-gap, n), yd, xd, od)
            };
            exponent += i64::from(carry);
        } else {
            let order = self.compare_magnitude(x, y);
            let cancelled = if order == Ordering::Less {
                sub_aligned(radix, clamp_gap(-gap, n), yd, xd, od)
            } else {
                sub_aligned(radix, clamp_gap(gap, n), xd, yd, od)
            };
            exponent -= cancelled as i64;
            sign = match order {
                Ordering::Less => -x.sign,
                Ordering::Equal => 0,
                Ordering::Greater => x.sign,
            };
            if cancelled == n {
                sign = 0;
            }
        }
        if sign == 0 {
            exponent = 0;
        }
        out.sign = sign;
        out.exponent = exponent as i32;
    }
}

fn clamp_gap(gap: i64, n: usize) -> usize {
    usize::try_from(gap).map_or(n, |gap| gap.min(n))
}

/// Adds `b` shifted right by `gap` limbs to `a`. Returns 1 when the sum grew
/// by a limb (the result is then shifted right and starts with a 1).
fn add_aligned(radix: i32, gap: usize, a: &[i32], b: &[i32], out: &mut [i32]) -> i32 {
    let n = out.len();
    // carry is 0 or -1 so that `radix & carry` selects the correction.
    let mut carry = 0;
    if gap == 0 && a[0] + b[0] >= radix {
        let last = a[n - 1] + b[n - 1];
        carry = if last >= radix { -1 } else { 0 };
        for j in (1..n).rev() {
            let sum = a[j - 1] + b[j - 1] - carry;
            carry = if sum >= radix { -1 } else { 0 };
            out[j] = sum - (radix & carry);
        }
        out[0] = -carry;
    } else {
        for j in (gap..n).rev() {
            let sum = a[j] + b[j - gap] - carry;
            carry = if sum >= radix { -1 } else { 0 };
            out[j] = sum - (radix & carry);
        }
        for j in (0..gap).rev() {
            let sum = a[j] - carry;
            carry = if sum >= radix { -1 } else { 0 };
            out[j] = sum - (radix & carry);
        }
        if carry != 0 {
            out.copy_within(0..n - 1, 1);
            out[0] = -carry;
        }
    }
    -carry
}

/// Subtracts `b` shifted right by `gap` limbs from the larger `a`, then
/// normalizes. Returns the number of cancelled leading limbs (`n` if the
/// difference is zero).
fn sub_aligned(radix: i32, gap: usize, a: &[i32], b: &[i32], out: &mut [i32]) -> usize {
    let n = out.len();
    let mut borrow = 0;
    for j in (gap..n).rev() {
        let diff = a[j] - b[j - gap] + borrow;
        borrow = if diff < 0 { -1 } else { 0 };
        out[j] = diff + (radix & borrow);
    }
    for j in (0..gap).rev() {
        let diff = a[j] + borrow;
        borrow = if diff < 0 { -1 } else { 0 };
        out[j] = diff + (radix & borrow);
    }
    let cancelled = out.iter().take_while(|&&digit| digit == 0).count();
    if cancelled > 0 && cancelled < n {
        out.copy_within(cancelled..n, 0);
        out[n - cancelled..].fill(0);
    }
    cancelled
}
