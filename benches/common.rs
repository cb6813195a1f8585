#![allow(dead_code)]

use fft_pi::{ContextConfig, MpNumber, PrecisionContext};
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

/// Transform lengths shared by the arithmetic benchmarks.
pub const LENGTHS: &[usize] = &[1024, 8192, 65536];

pub fn context(nfft: usize) -> PrecisionContext {
    PrecisionContext::new(ContextConfig::with_transform_length(nfft))
        .expect("context should calibrate")
}

/// A random operand in `[1, 10)` filling the context's digits.
pub fn random_operand(context: &PrecisionContext, seed: u64) -> MpNumber {
    let mut rng = StdRng::seed_from_u64(seed);
    let digits = context.capacity() * context.radix().log10() as usize;
    let mut text = String::with_capacity(digits + 1);
    text.push(char::from(b'1' + rng.gen_range(0..9)));
    text.push('.');
    for _ in 1..digits {
        text.push(char::from(b'0' + rng.gen_range(0..10)));
    }
    context.parse(&text).expect("random operand should parse")
}
