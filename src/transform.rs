//! Real-valued discrete Fourier transform in packed layout.
//!
//! For a real sequence `x` of power-of-two length `n`, [`RealTransform::forward`]
//! overwrites it with
//!
//! ```text
//! a[0]    = sum x[j]
//! a[1]    = sum x[j] * (-1)^j
//! a[2k]   = sum x[j] * cos(2 pi j k / n)    0 < k < n/2
//! a[2k+1] = sum x[j] * sin(2 pi j k / n)    0 < k < n/2
//! ```
//!
//! and [`RealTransform::inverse`] maps that layout back to `(n / 2) * x`; the
//! caller applies the `2 / n` scale. Internally the real sequence is viewed
//! as `n/2` complex points, transformed with an iterative radix-2 FFT, and
//! split into the real spectrum.

use std::f64::consts::TAU;

use crate::error::MpError;
use crate::number::zeroed_buffer;

/// Bit-reversal permutation and twiddle factors for the largest length.
/// Shorter lengths read them with a stride.
#[derive(Debug)]
struct Tables {
    /// Largest real length served.
    capacity: usize,
    /// `log2(capacity / 2)`, the bit width of `bitrev` entries.
    complex_bits: u32,
    bitrev: Vec<u32>,
    /// `cos(2 pi k / capacity)` for `k < capacity / 2`.
    cos: Vec<f64>,
    /// `sin(2 pi k / capacity)` for `k < capacity / 2`.
    sin: Vec<f64>,
}

impl Tables {
    fn build(capacity: usize) -> Result<Self, MpError> {
        let points = capacity / 2;
        let complex_bits = points.trailing_zeros();
        let mut bitrev = zeroed_buffer::<u32>(points)?;
        for (i, slot) in bitrev.iter_mut().enumerate() {
            *slot = (i as u32)
                .reverse_bits()
                .checked_shr(u32::BITS - complex_bits)
                .unwrap_or(0);
        }
        let mut cos = zeroed_buffer::<f64>(points)?;
        let mut sin = zeroed_buffer::<f64>(points)?;
        let step = TAU / capacity as f64;
        for k in 0..points {
            let angle = step * k as f64;
            cos[k] = angle.cos();
            sin[k] = angle.sin();
        }
        Ok(Self {
            capacity,
            complex_bits,
            bitrev,
            cos,
            sin,
        })
    }

    /// In-place complex FFT over interleaved `(re, im)` pairs. Unnormalized;
    /// `inverse` selects the `e^{+i...}` kernel.
    fn complex_fft(&self, data: &mut [f64], inverse: bool) {
        let points = data.len() / 2;
        if points < 2 {
            return;
        }
        let drop = self.complex_bits - points.trailing_zeros();
        for i in 0..points {
            let j = (self.bitrev[i] >> drop) as usize;
            if i < j {
                data.swap(2 * i, 2 * j);
                data.swap(2 * i + 1, 2 * j + 1);
            }
        }
        let direction = if inverse { 1.0 } else { -1.0 };
        let mut span = 2;
        while span <= points {
            let half = span / 2;
            let stride = self.capacity / span;
            for start in (0..points).step_by(span) {
                for j in 0..half {
                    let wr = self.cos[j * stride];
                    let wi = direction * self.sin[j * stride];
                    let p = 2 * (start + j);
                    let q = 2 * (start + j + half);
                    let tr = wr * data[q] - wi * data[q + 1];
                    let ti = wr * data[q + 1] + wi * data[q];
                    data[q] = data[p] - tr;
                    data[q + 1] = data[p + 1] - ti;
                    data[p] += tr;
                    data[p + 1] += ti;
                }
            }
            span *= 2;
        }
    }

    /// Turns the FFT of the packed complex sequence into the real spectrum.
    fn split(&self, data: &mut [f64]) {
        let n = data.len();
        let m = n / 2;
        let stride = self.capacity / n;
        let (r0, i0) = (data[0], data[1]);
        data[0] = r0 + i0;
        data[1] = r0 - i0;
        for k in 1..=m / 2 {
            let c = self.cos[k * stride];
            let s = self.sin[k * stride];
            let mirror = m - k;
            let (zr, zi) = (data[2 * k], data[2 * k + 1]);
            let (yr, yi) = (data[2 * mirror], data[2 * mirror + 1]);
            let even_re = 0.5 * (zr + yr);
            let even_im = 0.5 * (zi - yi);
            let odd_re = 0.5 * (zi + yi);
            let odd_im = -0.5 * (zr - yr);
            let twisted_re = c * odd_re + s * odd_im;
            let twisted_im = c * odd_im - s * odd_re;
            data[2 * k] = even_re + twisted_re;
            data[2 * k + 1] = -(even_im + twisted_im);
            data[2 * mirror] = even_re - twisted_re;
            data[2 * mirror + 1] = even_im - twisted_im;
        }
    }

    /// Undoes [`Tables::split`], leaving the packed complex spectrum.
    fn merge(&self, data: &mut [f64]) {
        let n = data.len();
        let m = n / 2;
        let stride = self.capacity / n;
        let (first, middle) = (data[0], data[1]);
        data[0] = 0.5 * (first + middle);
        data[1] = 0.5 * (first - middle);
        for k in 1..=m / 2 {
            let c = self.cos[k * stride];
            let s = self.sin[k * stride];
            let mirror = m - k;
            let (xr, xi) = (data[2 * k], -data[2 * k + 1]);
            let (yr, yi) = (data[2 * mirror], -data[2 * mirror + 1]);
            let even_re = 0.5 * (xr + yr);
            let even_im = 0.5 * (xi - yi);
            let diff_re = 0.5 * (xr - yr);
            let diff_im = 0.5 * (xi + yi);
            let odd_re = diff_re * c - diff_im * s;
            let odd_im = diff_re * s + diff_im * c;
            data[2 * k] = even_re - odd_im;
            data[2 * k + 1] = even_im + odd_re;
            data[2 * mirror] = even_re + odd_im;
            data[2 * mirror + 1] = odd_re - even_im;
        }
    }
}

/// Packed real FFT whose tables are built on first use and sized for the
/// largest length it will be asked to transform.
#[derive(Debug)]
pub struct RealTransform {
    capacity: usize,
    tables: Option<Tables>,
}

impl RealTransform {
    /// Prepares a transform for lengths up to `capacity` (a power of two, at
    /// least 2). No tables are allocated yet.
    pub fn new(capacity: usize) -> Result<Self, MpError> {
        if capacity < 2 || !capacity.is_power_of_two() {
            return Err(MpError::InvalidTransformLength {
                requested: capacity,
            });
        }
        Ok(Self {
            capacity,
            tables: None,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn forward(&mut self, data: &mut [f64]) -> Result<(), MpError> {
        let tables = self.prepare(data.len())?;
        tables.complex_fft(data, false);
        tables.split(data);
        Ok(())
    }

    /// Inverse of [`RealTransform::forward`], scaled by `n / 2`.
    pub fn inverse(&mut self, data: &mut [f64]) -> Result<(), MpError> {
        let tables = self.prepare(data.len())?;
        tables.merge(data);
        tables.complex_fft(data, true);
        Ok(())
    }

    fn prepare(&mut self, len: usize) -> Result<&Tables, MpError> {
        if len < 2 || len > self.capacity || !len.is_power_of_two() {
            return Err(MpError::InvalidTransformLength { requested: len });
        }
        if self.tables.is_none() {
            tracing::debug!(capacity = self.capacity, "building transform tables");
            self.tables = Some(Tables::build(self.capacity)?);
        }
        self.tables
            .as_ref()
            .ok_or(MpError::InvalidTransformLength { requested: len })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::panic)]

    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn naive_spectrum(x: &[f64]) -> Vec<f64> {
        let n = x.len();
        let mut out = vec![0.0; n];
        for (j, &value) in x.iter().enumerate() {
            out[0] += value;
            out[1] += if j % 2 == 0 { value } else { -value };
            for k in 1..n / 2 {
                let angle = TAU * (j * k) as f64 / n as f64;
                out[2 * k] += value * angle.cos();
                out[2 * k + 1] += value * angle.sin();
            }
        }
        out
    }

    fn random_signal(len: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..len).map(|_| rng.gen_range(-500.0..500.0)).collect()
    }

    fn assert_close(actual: &[f64], expected: &[f64], tolerance: f64) {
        assert_eq!(actual.len(), expected.len());
        for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
            assert!((a - e).abs() <= tolerance, "index {i}: {a} vs {e}");
        }
    }

    #[test]
    fn forward_matches_direct_sums() {
        let mut transform = RealTransform::new(64).expect("transform");
        for len in [2, 4, 8, 32, 64] {
            let signal = random_signal(len, 7 + len as u64);
            let mut data = signal.clone();
            transform.forward(&mut data).expect("forward");
            assert_close(&data, &naive_spectrum(&signal), 1e-8);
        }
    }

    #[test]
    fn inverse_returns_half_length_multiple() {
        let mut transform = RealTransform::new(256).expect("transform");
        for len in [2, 16, 256] {
            let signal = random_signal(len, 11);
            let mut data = signal.clone();
            transform.forward(&mut data).expect("forward");
            transform.inverse(&mut data).expect("inverse");
            let scaled: Vec<f64> = signal.iter().map(|v| v * (len / 2) as f64).collect();
            assert_close(&data, &scaled, 1e-7);
        }
    }

    #[test]
    fn rejects_unsupported_lengths() {
        assert!(RealTransform::new(24).is_err());
        let mut transform = RealTransform::new(16).expect("transform");
        let mut too_long = vec![0.0; 32];
        assert_eq!(
            transform.forward(&mut too_long),
            Err(MpError::InvalidTransformLength { requested: 32 })
        );
        let mut odd = vec![0.0; 12];
        assert!(transform.inverse(&mut odd).is_err());
    }
}
