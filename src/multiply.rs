//! Transform-based multiplication and squaring of multi-precision numbers.
//!
//! Operands are packed into transform buffers of `nfft + 2` reals:
//!
//! * slot `0` holds the exponent of the packed limbs,
//! * slots `1..=nfft` hold the transform payload (up to `nfft/2 + 1` digits
//!   balanced into `[-radix/2, radix/2]`, except the leading one),
//! * slot `nfft + 1` holds the signed leading digit.
//!
//! A product of two `nfft/2 + 1`-digit blocks fits a cyclic convolution of
//! length `nfft` except for its last coefficient, which folds onto the first;
//! the leading-digit slot is what lets [`decode`] separate the two again.
//!
//! Full-precision products split each operand into an upper block and a
//! lower block starting at `shift`, compute `upper * upper` plus the two cross
//! terms, and drop `lower * lower`, which lies below the result window.

use crate::error::MpError;
use crate::number::{MpNumber, Precision, Radix, zeroed_buffer};
use crate::transform::RealTransform;

/// Owns the transform, its three working buffers and the digit scratch
/// needed to combine partial products.
#[derive(Debug)]
pub struct FftMultiplier {
    transform: RealTransform,
    nfft: usize,
    /// `spectra[0]` keeps the image of the first operand of the last
    /// half-precision product so later products can reuse it.
    spectra: [Vec<f64>; 3],
    upper: MpNumber,
    cross: MpNumber,
    doubled: MpNumber,
}

impl FftMultiplier {
    /// Allocates buffers for transforms up to `nfft` and numbers of
    /// `capacity` digits.
    pub fn new(nfft: usize, capacity: usize) -> Result<Self, MpError> {
        Ok(Self {
            transform: RealTransform::new(nfft)?,
            nfft,
            spectra: [
                zeroed_buffer(nfft + 2)?,
                zeroed_buffer(nfft + 2)?,
                zeroed_buffer(nfft + 2)?,
            ],
            upper: MpNumber::zero(capacity)?,
            cross: MpNumber::zero(capacity)?,
            doubled: MpNumber::zero(capacity)?,
        })
    }

    pub fn transform_length(&self) -> usize {
        self.nfft
    }

    /// Fails unless `nfft` is a power of two this multiplier can run and
    /// every operand holds the window.
    fn check(&self, prec: Precision, nfft: usize, operands: &[&MpNumber]) -> Result<(), MpError> {
        if nfft < 2 || nfft > self.nfft || !nfft.is_power_of_two() {
            return Err(MpError::InvalidTransformLength { requested: nfft });
        }
        prec.check_capacity(operands)
    }

    /// `out = x * y` over the full window.
    pub fn multiply(
        &mut self,
        prec: Precision,
        x: &MpNumber,
        y: &MpNumber,
        out: &mut MpNumber,
    ) -> Result<(), MpError> {
        let nfft = self.nfft;
        self.check(prec, nfft, &[x, y, &*out, &self.upper])?;
        let n = prec.len();
        let radix = prec.radix().value();
        let mut shift = nfft / 2 + 1;
        while n > shift && x.digits[shift] + y.digits[shift] == 0 {
            shift += 1;
        }
        let n_half = half_window(n, shift);
        let Self {
            transform,
            spectra,
            upper,
            cross,
            ..
        } = self;
        let [first, second, third] = spectra;
        let (s1, s2, s3) = (
            &mut first[..nfft + 2],
            &mut second[..nfft + 2],
            &mut third[..nfft + 2],
        );

        // s3 = upper(x) * lower(y)
        encode(radix, n, nfft, 0, x, s1);
        transform.forward(payload(s1))?;
        encode(radix, n, nfft, shift, y, s3);
        transform.forward(payload(s3))?;
        multiply_spectra(nfft, s1, s3);
        // upper = upper(x) * upper(y)
        encode(radix, n, nfft, 0, y, s2);
        transform.forward(payload(s2))?;
        multiply_spectra(nfft, s2, s1);
        transform.inverse(payload(s1))?;
        decode(radix, n, nfft, s1, upper);
        // s3 += lower(x) * upper(y)
        encode(radix, n, nfft, shift, x, s1);
        transform.forward(payload(s1))?;
        accumulate_product(nfft, s1, s2, s3);
        transform.inverse(payload(s3))?;
        decode(radix, n_half, nfft, s3, cross);

        if cross.sign != 0 {
            prec.add(cross, upper, out);
        } else {
            prec.copy(upper, out);
        }
        Ok(())
    }

    /// `out = x * x` over the full window.
    pub fn square(
        &mut self,
        prec: Precision,
        x: &MpNumber,
        out: &mut MpNumber,
    ) -> Result<(), MpError> {
        let nfft = self.nfft;
        self.check(prec, nfft, &[x, &*out, &self.upper])?;
        let n = prec.len();
        let radix = prec.radix().value();
        let mut shift = nfft / 2 + 1;
        while n > shift && x.digits[shift] == 0 {
            shift += 1;
        }
        let n_half = half_window(n, shift);
        let Self {
            transform,
            spectra,
            upper,
            cross,
            doubled,
            ..
        } = self;
        let [first, second, _] = spectra;
        let (s1, s2) = (&mut first[..nfft + 2], &mut second[..nfft + 2]);

        // cross = upper(x) * lower(x)
        encode(radix, n, nfft, 0, x, s1);
        transform.forward(payload(s1))?;
        encode(radix, n, nfft, shift, x, s2);
        transform.forward(payload(s2))?;
        multiply_spectra(nfft, s1, s2);
        transform.inverse(payload(s2))?;
        decode(radix, n_half, nfft, s2, cross);
        // upper = upper(x)^2
        square_spectrum(nfft, s1);
        transform.inverse(payload(s1))?;
        decode(radix, n, nfft, s1, upper);

        if cross.sign != 0 {
            prec.with_len(n_half).add(cross, cross, doubled);
            doubled.digits[n_half..n].fill(0);
            prec.add(upper, doubled, out);
        } else {
            prec.copy(upper, out);
        }
        Ok(())
    }

    /// `out = upper(x) * upper(y)` with transform length `nfft`. The image of
    /// `x` stays held for [`FftMultiplier::multiply_held`] and
    /// [`FftMultiplier::square_half_held`].
    pub fn multiply_half(
        &mut self,
        prec: Precision,
        nfft: usize,
        x: &MpNumber,
        y: &MpNumber,
        out: &mut MpNumber,
    ) -> Result<(), MpError> {
        self.check(prec, nfft, &[x, y, &*out])?;
        let n = prec.len();
        let radix = prec.radix().value();
        let Self {
            transform, spectra, ..
        } = self;
        let [first, second, _] = spectra;
        let (held, s2) = (&mut first[..nfft + 2], &mut second[..nfft + 2]);

        encode(radix, n, nfft, 0, x, held);
        transform.forward(payload(held))?;
        encode(radix, n, nfft, 0, y, s2);
        transform.forward(payload(s2))?;
        multiply_spectra(nfft, held, s2);
        transform.inverse(payload(s2))?;
        decode(radix, n, nfft, s2, out);
        Ok(())
    }

    /// `out = held * y[shift..]`: the held image times the block of `y`
    /// starting at limb `shift` (moved past any zero limbs).
    pub fn multiply_held(
        &mut self,
        prec: Precision,
        nfft: usize,
        shift: usize,
        y: &MpNumber,
        out: &mut MpNumber,
    ) -> Result<(), MpError> {
        self.check(prec, nfft, &[y, &*out])?;
        let n = prec.len();
        let radix = prec.radix().value();
        let mut start = shift;
        while n > start && y.digits[start] == 0 {
            start += 1;
        }
        let n_half = half_window(n, start);
        let Self {
            transform, spectra, ..
        } = self;
        let [first, second, _] = spectra;
        let (held, s2) = (&first[..nfft + 2], &mut second[..nfft + 2]);

        encode(radix, n, nfft, start, y, s2);
        transform.forward(payload(s2))?;
        multiply_spectra(nfft, held, s2);
        transform.inverse(payload(s2))?;
        decode(radix, n_half, nfft, s2, out);
        Ok(())
    }

    /// `out = upper(x)^2` with transform length `nfft`.
    pub fn square_half(
        &mut self,
        prec: Precision,
        nfft: usize,
        x: &MpNumber,
        out: &mut MpNumber,
    ) -> Result<(), MpError> {
        self.check(prec, nfft, &[x, &*out])?;
        let radix = prec.radix().value();
        let held = &mut self.spectra[0][..nfft + 2];
        encode(radix, prec.len(), nfft, 0, x, held);
        self.transform.forward(payload(held))?;
        self.square_half_held(prec, nfft, out)
    }

    /// Squares the held image in place and decodes it; the image is consumed.
    pub fn square_half_held(
        &mut self,
        prec: Precision,
        nfft: usize,
        out: &mut MpNumber,
    ) -> Result<(), MpError> {
        self.check(prec, nfft, &[&*out])?;
        let held = &mut self.spectra[0][..nfft + 2];
        square_spectrum(nfft, held);
        self.transform.inverse(payload(held))?;
        decode(prec.radix().value(), prec.len(), nfft, held, out);
        Ok(())
    }

    /// Worst-case rounding error of a full-length square at `radix` for
    /// `n`-digit numbers: a synthetic operand with maximal digits is squared
    /// and the largest distance of a carried limb from an integer is doubled.
    pub fn radix_error(&mut self, radix: Radix, n: usize) -> Result<f64, MpError> {
        let radix = radix.value();
        let nfft = self.nfft;
        let buf = &mut self.spectra[0][..nfft + 2];
        let filled = (nfft / 2 + 1).min(n);
        buf[nfft + 1] = f64::from(radix - 1);
        buf[filled + 1..=nfft].fill(0.0);
        buf[3..=filled].fill(f64::from((radix + 1) / 2));
        buf[2] = f64::from(radix);
        buf[1] = f64::from(radix - 1);
        buf[0] = 0.0;
        self.transform.forward(payload(buf))?;
        square_spectrum(nfft, buf);
        self.transform.inverse(payload(buf))?;
        Ok(2.0 * carry_error(radix, nfft, buf))
    }
}

/// Window of the cross terms: they start `shift` limbs down, but never less
/// than half the full window is kept.
pub(crate) fn half_window(n: usize, shift: usize) -> usize {
    (n / 2 + 1).max(n.saturating_sub(shift))
}

fn payload(buf: &mut [f64]) -> &mut [f64] {
    let end = buf.len() - 1;
    &mut buf[1..end]
}

/// Packs up to `nfft/2 + 1` digits of `x` starting at limb `shift`.
fn encode(radix: i32, n: usize, nfft: usize, shift: usize, x: &MpNumber, buf: &mut [f64]) {
    let (top, count) = if n > shift {
        (x.digits[shift], (nfft / 2 + 1).min(n - shift))
    } else {
        (0, 0)
    };
    buf[nfft + 1] = f64::from(x.sign * top);
    buf[count + 1..=nfft].fill(0.0);
    if count > 1 {
        // Balance digits into [-radix/2, radix/2) to keep the convolution small.
        let half = radix / 2;
        let mut carry = 0;
        for j in (3..=count).rev() {
            let value = x.digits[shift + j - 1] - carry;
            carry = if value >= half { -1 } else { 0 };
            buf[j] = f64::from(value - (radix & carry));
        }
        buf[2] = f64::from(x.digits[shift + 1] - carry);
    }
    buf[1] = f64::from(top);
    buf[0] = f64::from(x.exponent) - shift as f64;
}

/// `dst *= src` pointwise in the packed spectrum; exponents add.
fn multiply_spectra(nfft: usize, src: &[f64], dst: &mut [f64]) {
    dst[0] += src[0];
    dst[1] *= src[1];
    dst[2] *= src[2];
    for j in (3..nfft).step_by(2) {
        let (xr, xi) = (src[j], src[j + 1]);
        let (yr, yi) = (dst[j], dst[j + 1]);
        dst[j] = xr * yr - xi * yi;
        dst[j + 1] = xr * yi + xi * yr;
    }
    dst[nfft + 1] *= src[nfft + 1];
}

/// `dst += a * b` pointwise; `dst` keeps its exponent.
fn accumulate_product(nfft: usize, a: &[f64], b: &[f64], dst: &mut [f64]) {
    dst[1] += a[1] * b[1];
    dst[2] += a[2] * b[2];
    for j in (3..nfft).step_by(2) {
        let (xr, xi) = (a[j], a[j + 1]);
        let (yr, yi) = (b[j], b[j + 1]);
        dst[j] += xr * yr - xi * yi;
        dst[j + 1] += xr * yi + xi * yr;
    }
    dst[nfft + 1] += a[nfft + 1] * b[nfft + 1];
}

fn square_spectrum(nfft: usize, buf: &mut [f64]) {
    buf[0] *= 2.0;
    buf[1] *= buf[1];
    buf[2] *= buf[2];
    for j in (3..nfft).step_by(2) {
        let (xr, xi) = (buf[j], buf[j + 1]);
        buf[j] = xr * xr - xi * xi;
        buf[j + 1] = 2.0 * xr * xi;
    }
    buf[nfft + 1] *= buf[nfft + 1];
}

/// Rounds an inverse-transformed product into `n` digits of `out`.
///
/// The folded last coefficient is moved out of slot 1 using the leading-digit
/// product, the coefficients below the window are summed into one rounding
/// carry, and the rest are carried limb by limb through two carry stages so
/// that every intermediate stays exactly representable.
fn decode(radix: i32, n: usize, nfft: usize, buf: &mut [f64], out: &mut MpNumber) {
    let scale = 2.0 / nfft as f64;
    let base = f64::from(radix);
    let inverse = 1.0 / base;
    let inverse_sq = inverse * inverse;

    let top = buf[nfft + 1];
    let mut shift = usize::from(top.abs() + 0.5 >= base);
    let leading = top.abs() * nfft as f64 * 0.5;
    buf[nfft + 1] = buf[1] - leading;
    buf[1] = leading;

    let count = n.min(nfft + 1 + shift);
    out.digits[count..].fill(0);

    let mut tail = 0.0;
    let mut weight = 1.0;
    for &coefficient in &buf[count + 1 - shift..=nfft + 1] {
        tail += weight * coefficient;
        weight *= inverse;
        if weight < f64::EPSILON {
            break;
        }
    }
    let scaled_tail = inverse_sq * (scale * tail + 0.5);
    let mut carry2 = scaled_tail as i32 - 1;
    let mut carry = (base * (scaled_tail - f64::from(carry2)) + 0.5) as i32;
    for j in (2..=count).rev() {
        let value = inverse_sq * (scale * buf[j - shift] + f64::from(carry) + 0.5);
        carry = carry2;
        carry2 = value as i32 - 1;
        let high = base * (value - f64::from(carry2));
        let carry1 = high as i32;
        out.digits[j - 1] = (base * (high - f64::from(carry1))) as i32;
        carry += carry1;
    }
    let mut lead = f64::from(carry) + base * f64::from(carry2) + 0.5;
    if shift == 0 {
        lead += scale * buf[1];
    }
    let overflow = (inverse * lead) as i32;
    out.digits[0] = (lead - base * f64::from(overflow)) as i32;
    if overflow > 0 {
        out.digits.copy_within(0..n - 1, 1);
        out.digits[0] = overflow;
        shift += 1;
    }

    let exponent = buf[0] + shift as f64 + 0.5;
    let floor = exponent as i32 - 1;
    out.exponent = floor + (exponent - f64::from(floor)) as i32;
    out.sign = if top > 0.5 { 1 } else { -1 };
    if out.digits[0] == 0 {
        out.clear(n);
    }
}

/// Largest distance from an integer seen while carrying a calibration
/// product.
fn carry_error(radix: i32, nfft: usize, buf: &mut [f64]) -> f64 {
    let scale = 2.0 / nfft as f64;
    let base = f64::from(radix);
    let inverse_sq = 1.0 / (base * base);
    let leading = (buf[nfft + 1] * nfft as f64 * 0.5).abs();
    buf[nfft + 1] = buf[1] - leading;

    let mut worst: f64 = 0.0;
    let mut carry = 0_i32;
    let mut carry2 = 0_i32;
    for j in (2..=nfft + 1).rev() {
        let value = inverse_sq * (scale * buf[j] + f64::from(carry) + 0.5);
        carry = carry2;
        carry2 = value as i32 - 1;
        let high = base * (value - f64::from(carry2));
        let carry1 = high as i32;
        let low = base * (high - f64::from(carry1));
        carry += carry1;
        let deviation = low - 0.5 - f64::from(low as i32);
        worst = worst.max(deviation.abs());
    }
    worst
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::panic)]

    use super::*;
    use crate::test_utils::{assert_agrees, exact_product, number, radix, random_number};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const NFFT: usize = 64;
    const N: usize = NFFT + 2;

    fn setup(log10: u32) -> (FftMultiplier, Precision) {
        let multiplier = FftMultiplier::new(NFFT, N).expect("multiplier");
        (multiplier, Precision::new(radix(log10), N))
    }

    #[test]
    fn small_exact_product() {
        let (mut mul, prec) = setup(4);
        let mut x = MpNumber::zero(N).expect("alloc");
        let mut y = MpNumber::zero(N).expect("alloc");
        x.sign = 1;
        x.digits[..2].copy_from_slice(&[12, 3456]);
        y.sign = -1;
        y.exponent = 1;
        y.digits[0] = 3;
        let mut out = MpNumber::zero(N).expect("alloc");
        mul.multiply(prec, &x, &y, &mut out).expect("multiply");
        // 12.3456 * -30000 = -370368
        let mut expected = number(-1, 1, &[37, 368]);
        expected.digits.resize(N, 0);
        assert_eq!(out, expected);
    }

    #[test]
    fn multiply_matches_exact_product() {
        let (mut mul, prec) = setup(4);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..8 {
            let x = random_number(&mut rng, prec, N);
            let y = random_number(&mut rng, prec, N);
            let mut out = MpNumber::zero(N).expect("alloc");
            mul.multiply(prec, &x, &y, &mut out).expect("multiply");
            assert_agrees(prec, &out, &exact_product(prec, &x, &y), N - 2);
        }
    }

    #[test]
    fn square_matches_multiply() {
        let (mut mul, prec) = setup(3);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..6 {
            let x = random_number(&mut rng, prec, N);
            let mut squared = MpNumber::zero(N).expect("alloc");
            mul.square(prec, &x, &mut squared).expect("square");
            assert_agrees(prec, &squared, &exact_product(prec, &x, &x), N - 2);
        }
    }

    #[test]
    fn product_with_zero_is_zero() {
        let (mut mul, prec) = setup(4);
        let mut rng = StdRng::seed_from_u64(3);
        let x = random_number(&mut rng, prec, N);
        let zero = MpNumber::zero(N).expect("alloc");
        let mut out = MpNumber::zero(N).expect("alloc");
        mul.multiply(prec, &x, &zero, &mut out).expect("multiply");
        assert!(out.is_zero());
        assert_eq!(out.exponent(), 0);
        mul.square(prec, &zero, &mut out).expect("square");
        assert!(out.is_zero());
    }

    #[test]
    fn held_image_reproduces_split_product() {
        let (mut mul, prec) = setup(4);
        let mut rng = StdRng::seed_from_u64(21);
        let x = random_number(&mut rng, prec, N);
        let y = random_number(&mut rng, prec, N);
        let half = 32;
        let hp = prec.with_len(half + 2);
        let mut high = MpNumber::zero(N).expect("alloc");
        let mut low = MpNumber::zero(N).expect("alloc");
        let mut rounded = x.clone();
        hp.round(half / 2 + 1, &mut rounded);
        mul.multiply_half(hp, half, &rounded, &y, &mut high)
            .expect("half multiply");
        mul.multiply_held(hp, half, half / 2 + 1, &y, &mut low)
            .expect("held multiply");
        let mut sum = MpNumber::zero(N).expect("alloc");
        hp.add(&high, &low, &mut sum);
        let mut truncated_y = y.clone();
        truncated_y.digits[half + 2..].fill(0);
        assert_agrees(hp, &sum, &exact_product(hp, &rounded, &truncated_y), half - 1);
    }

    #[test]
    fn square_half_matches_held_square() {
        let (mut mul, prec) = setup(4);
        let mut rng = StdRng::seed_from_u64(5);
        let x = random_number(&mut rng, prec, N);
        let mut direct = MpNumber::zero(N).expect("alloc");
        let mut held = MpNumber::zero(N).expect("alloc");
        let mut scratch = MpNumber::zero(N).expect("alloc");
        mul.square_half(prec, NFFT, &x, &mut direct).expect("square");
        mul.multiply_half(prec, NFFT, &x, &x, &mut scratch)
            .expect("multiply");
        mul.square_half_held(prec, NFFT, &mut held).expect("square held");
        assert_eq!(direct, held);
        assert_eq!(direct, scratch);
    }

    #[test]
    fn radix_error_grows_with_radix() {
        let mut mul = FftMultiplier::new(1024, 1026).expect("multiplier");
        let small = mul.radix_error(radix(1), 1026).expect("calibrate");
        let large = mul.radix_error(radix(4), 1026).expect("calibrate");
        assert!(small < large);
        assert!(large < 0.5);
        // The largest radix must not overflow while building its operand.
        let widest = mul.radix_error(radix(9), 1026).expect("calibrate");
        assert!(widest.is_finite());
    }

    #[test]
    fn half_products_reject_unsupported_lengths() {
        let (mut mul, prec) = setup(4);
        let x = MpNumber::zero(N).expect("alloc");
        let mut out = MpNumber::zero(N).expect("alloc");
        for nfft in [0, 48, 2 * NFFT] {
            assert_eq!(
                mul.multiply_half(prec, nfft, &x, &x, &mut out),
                Err(MpError::InvalidTransformLength { requested: nfft })
            );
            assert_eq!(
                mul.multiply_held(prec, nfft, 0, &x, &mut out),
                Err(MpError::InvalidTransformLength { requested: nfft })
            );
            assert_eq!(
                mul.square_half(prec, nfft, &x, &mut out),
                Err(MpError::InvalidTransformLength { requested: nfft })
            );
            assert_eq!(
                mul.square_half_held(prec, nfft, &mut out),
                Err(MpError::InvalidTransformLength { requested: nfft })
            );
        }
    }

    #[test]
    fn products_reject_operands_shorter_than_the_window() {
        let (mut mul, prec) = setup(4);
        let x = MpNumber::zero(N).expect("alloc");
        let short = MpNumber::zero(N - 1).expect("alloc");
        let mut out = MpNumber::zero(N).expect("alloc");
        let expected = Err(MpError::InvalidWindow {
            window: N,
            capacity: N - 1,
        });
        assert_eq!(mul.multiply(prec, &x, &short, &mut out), expected);
        assert_eq!(mul.square(prec, &short, &mut out), expected);
        assert_eq!(mul.multiply_half(prec, NFFT, &short, &x, &mut out), expected);
        let mut short_out = MpNumber::zero(N - 1).expect("alloc");
        assert_eq!(mul.square(prec, &x, &mut short_out), expected);
        // A window wider than the multiplier's own scratch is refused too.
        let wide = Precision::new(prec.radix(), N + 1);
        let big = MpNumber::zero(N + 1).expect("alloc");
        let mut big_out = MpNumber::zero(N + 1).expect("alloc");
        assert_eq!(
            mul.multiply(wide, &big, &big, &mut big_out),
            Err(MpError::InvalidWindow {
                window: N + 1,
                capacity: N
            })
        );
    }
}
