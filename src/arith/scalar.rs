use crate::error::MpError;
use crate::number::{MpNumber, Precision};

impl Precision {
    /// `out = x * factor`. Carries are formed in floating point, so
    /// `factor * radix` must stay well inside the `f64` mantissa.
    ///
    /// # Panics
    ///
    /// If either number holds fewer digits than the window.
    pub fn mul_small(self, x: &MpNumber, factor: i32, out: &mut MpNumber) {
        let n = self.len();
        let base = f64::from(self.radix().value());
        let inverse = 1.0 / base;
        out.sign = x.sign * factor.signum();
        let multiplier = f64::from(factor.unsigned_abs());

        let mut carry = 0_i32;
        for j in (0..n).rev() {
            let value = multiplier * f64::from(x.digits[j]) + f64::from(carry) + 0.5;
            carry = (inverse * value) as i32;
            out.digits[j] = (value - base * f64::from(carry)) as i32;
        }

        let mut shift = 0_usize;
        let mut rest = f64::from(carry) + 0.5;
        while rest > 1.0 {
            rest *= inverse;
            shift += 1;
        }
        out.exponent = x.exponent + shift as i32;
        if shift > 0 {
            while shift > n {
                carry = (inverse * f64::from(carry) + 0.5) as i32;
                shift -= 1;
            }
            out.digits.copy_within(0..n - shift, shift);
            for j in (0..shift).rev() {
                let value = f64::from(carry) + 0.5;
                carry = (inverse * value) as i32;
                out.digits[j] = (value - base * f64::from(carry)) as i32;
            }
        }
        if out.sign == 0 {
            out.clear(n);
        }
    }

    /// `out = x / divisor`, truncated to the window.
    pub fn div_small(self, x: &MpNumber, divisor: i32, out: &mut MpNumber) -> Result<(), MpError> {
        if divisor == 0 {
            return Err(MpError::DivideByZero);
        }
        self.check_capacity(&[x, &*out])?;
        if x.sign == 0 {
            self.load_zero(out);
            return Ok(());
        }
        let n = self.len();
        let base = f64::from(self.radix().value());
        let d = f64::from(divisor.unsigned_abs());
        let inverse = 1.0 / d;
        out.sign = x.sign * divisor.signum();

        // Pull in leading limbs until the partial dividend reaches the divisor.
        let mut consumed = 0_usize;
        let mut partial = 0.0;
        loop {
            consumed += 1;
            partial *= base;
            if consumed <= n {
                partial += f64::from(x.digits[consumed - 1]);
            }
            if partial >= d - 0.5 {
                break;
            }
        }
        partial += 0.5;
        let quotient = (inverse * partial) as i32;
        let mut remainder = (partial - d * f64::from(quotient)) as i32;
        out.digits[0] = quotient;

        let lag = consumed - 1;
        out.exponent = x.exponent - lag as i32;
        let offset = lag.min(n - 1);
        for j in 1..n {
            let incoming = if j + offset < n {
                f64::from(x.digits[j + offset])
            } else {
                0.0
            };
            let value = incoming + base * f64::from(remainder) + 0.5;
            let digit = (inverse * value) as i32;
            remainder = (value - d * f64::from(digit)) as i32;
            out.digits[j] = digit;
        }
        Ok(())
    }

    /// `out = x / 2`.
    ///
    /// # Panics
    ///
    /// If either number holds fewer digits than the window.
    pub fn halve(self, x: &MpNumber, out: &mut MpNumber) {
        out.sign = x.sign;
        out.exponent = x.exponent;
        out.digits[..self.len()].copy_from_slice(&x.digits[..self.len()]);
        self.halve_in_place(out);
    }

    /// `x /= 2`, shifting a limb out when the leading digit is 1.
    ///
    /// # Panics
    ///
    /// If the window is empty or longer than `x`.
    pub fn halve_in_place(self, x: &mut MpNumber) {
        let n = self.len();
        let radix = self.radix().value();
        let shift = usize::from(x.digits[0] == 1);
        x.exponent -= shift as i32;
        // carry is 0 or -1; a set carry adds one radix to the next limb.
        let mut carry = -(shift as i32);
        for j in 0..n - shift {
            let value = x.digits[j + shift] + (radix & carry);
            carry = -(value & 1);
            x.digits[j] = value >> 1;
        }
        if shift > 0 {
            x.digits[n - 1] = (radix & carry) >> 1;
        }
    }
}
