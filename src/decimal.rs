//! Decimal text input and output.
//!
//! Numbers print as `[-]d.ddd...e<exp>`: the leading limb loses its leading
//! zeros, every later limb prints zero-padded to the radix width, and the
//! exponent counts decimal places. Parsing accepts an optional sign, digits
//! with at most one `.`, and an optional exponent introduced by `e`, `E`,
//! `d` or `D`; spaces inside the digits are skipped.

use std::fmt;
use std::io;

use num_integer::Integer;

use crate::error::MpError;
use crate::number::{MpNumber, Precision, Radix};

/// Decimal rendering of the leading `len` digits of a number.
#[derive(Clone, Copy, Debug)]
pub struct DecimalView<'a> {
    number: &'a MpNumber,
    radix: Radix,
    len: usize,
}

impl MpNumber {
    pub fn decimal(&self, radix: Radix, len: usize) -> DecimalView<'_> {
        DecimalView {
            number: self,
            radix,
            len: len.min(self.digits.len()),
        }
    }
}

impl fmt::Display for DecimalView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.radix.log10() as usize;
        if self.number.sign < 0 {
            f.write_str("-")?;
        }
        let lead = self.number.digits.first().copied().unwrap_or(0).to_string();
        let (first, rest) = lead.split_at(1);
        write!(f, "{first}.{rest}")?;
        let tail = self.number.digits.get(1..self.len).unwrap_or_default();
        for digit in tail {
            write!(f, "{digit:0width$}")?;
        }
        let exponent = rest.len() as i64 + width as i64 * i64::from(self.number.exponent);
        write!(f, "e{exponent}")
    }
}

impl Precision {
    /// Formats the window as decimal text.
    pub fn format(self, x: &MpNumber) -> String {
        x.decimal(self.radix(), self.len()).to_string()
    }

    /// Streams the window as decimal text.
    pub fn write_decimal<W: io::Write>(self, x: &MpNumber, mut writer: W) -> io::Result<()> {
        write!(writer, "{}", x.decimal(self.radix(), self.len()))
    }

    /// Parses decimal text into the window of `out`. Digits beyond the
    /// window are dropped without rounding.
    pub fn parse_into(self, text: &str, out: &mut MpNumber) -> Result<(), MpError> {
        self.check_capacity(&[&*out])?;
        let n = self.len();
        let log10 = i64::from(self.radix().log10());
        let bytes = text.as_bytes();
        let mut pos = skip_spaces(bytes, 0);
        let mut sign = 1;
        match bytes.get(pos) {
            Some(b'-') => {
                sign = -1;
                pos += 1;
            }
            Some(b'+') => pos += 1,
            _ => {}
        }
        let mut saw_digit = false;
        while let Some(&byte @ (b' ' | b'0')) = bytes.get(pos) {
            saw_digit |= byte == b'0';
            pos += 1;
        }
        let body = &bytes[pos..];

        let mut exponent: i64 = body
            .iter()
            .position(|byte| matches!(byte, b'e' | b'E' | b'd' | b'D'))
            .map_or(0, |mark| parse_exponent(&body[mark + 1..]));

        // Locate the leading significant digit and fold its position into
        // the exponent.
        let mut start = 0;
        if body.first() == Some(&b'.') {
            loop {
                exponent -= 1;
                start = skip_spaces(body, start + 1);
                if body.get(start) != Some(&b'0') {
                    break;
                }
                saw_digit = true;
            }
        } else if !body.is_empty() {
            let mut cursor = skip_spaces(body, 1);
            while body.get(cursor).is_some_and(u8::is_ascii_digit) {
                exponent += 1;
                cursor = skip_spaces(body, cursor + 1);
            }
        }

        let (limb_exponent, offset) = exponent.div_mod_floor(&log10);
        out.exponent = i32::try_from(limb_exponent).map_err(|_| MpError::InvalidDecimal)?;
        let mut remaining = offset;
        let mut limb = 0;
        let mut filled = 0;
        for &byte in &body[start..] {
            if byte == b'.' || byte == b' ' {
                continue;
            }
            if !byte.is_ascii_digit() {
                break;
            }
            saw_digit = true;
            limb = 10 * limb + i32::from(byte - b'0');
            remaining -= 1;
            if remaining < 0 {
                if filled >= n {
                    break;
                }
                out.digits[filled] = limb;
                filled += 1;
                limb = 0;
                remaining = log10 - 1;
            }
        }
        if !saw_digit {
            return Err(MpError::InvalidDecimal);
        }
        while remaining >= 0 {
            limb *= 10;
            remaining -= 1;
        }
        for slot in &mut out.digits[filled..n] {
            *slot = limb;
            limb = 0;
        }
        out.sign = sign;
        if out.digits[0] == 0 {
            out.clear(n);
        }
        Ok(())
    }

    /// Parses decimal text into a fresh number with `capacity` digits.
    pub fn parse(self, text: &str, capacity: usize) -> Result<MpNumber, MpError> {
        let mut out = MpNumber::zero(capacity.max(self.len()))?;
        self.parse_into(text, &mut out)?;
        Ok(out)
    }
}

fn skip_spaces(bytes: &[u8], mut pos: usize) -> usize {
    while bytes.get(pos) == Some(&b' ') {
        pos += 1;
    }
    pos
}

/// Reads an optionally signed integer after leading whitespace; anything
/// unparsable counts as zero.
fn parse_exponent(bytes: &[u8]) -> i64 {
    let mut pos = 0;
    while bytes.get(pos).is_some_and(u8::is_ascii_whitespace) {
        pos += 1;
    }
    let negative = match bytes.get(pos) {
        Some(b'-') => {
            pos += 1;
            true
        }
        Some(b'+') => {
            pos += 1;
            false
        }
        _ => false,
    };
    let magnitude = bytes[pos..]
        .iter()
        .take_while(|byte| byte.is_ascii_digit())
        .fold(0_i64, |acc, byte| {
            acc.saturating_mul(10).saturating_add(i64::from(byte - b'0'))
        });
    if negative { -magnitude } else { magnitude }
}
