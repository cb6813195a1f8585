//! Pi digits and benchmark sweep.
//!
//! `benchmarks [N]` with `N >= 128` computes pi at transform length `N` and
//! writes it to `pi.dat`; a smaller `N` (default 1) runs the benchmark sweep
//! on `N` threads and prints one table row per transform length.

use std::env;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::process::ExitCode;

use fft_pi::{
    BenchConfig, ContextConfig, PrecisionContext, TABLE_HEADER, run_benchmark, sweep_lengths,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Arguments at or above this are transform lengths, below it thread counts.
const DIGITS_THRESHOLD: usize = 128;

const OUTPUT_PATH: &str = "pi.dat";

fn print_usage() {
    println!("Usage: benchmarks [N]");
    println!();
    println!("  N >= {DIGITS_THRESHOLD}   compute pi with transform length N into {OUTPUT_PATH}");
    println!("  N <  {DIGITS_THRESHOLD}   run the benchmark sweep on N threads (default 1)");
}

fn write_pi(nfft: usize) -> Result<(), Box<dyn std::error::Error>> {
    let mut context = PrecisionContext::new(ContextConfig::with_transform_length(nfft))?;
    tracing::info!(
        transform_length = context.transform_length(),
        radix = context.radix().value(),
        "computing pi"
    );
    let summary = context.compute_pi()?;
    tracing::info!(
        iterations = summary.iterations,
        digits = summary.estimated_digits,
        "writing {OUTPUT_PATH}"
    );
    let limbs = context.transform_length() + 1;
    let mut out = BufWriter::new(File::create(OUTPUT_PATH)?);
    context
        .precision()
        .with_len(limbs)
        .write_decimal(context.result(), &mut out)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

fn run_sweep(threads: usize) -> Result<(), Box<dyn std::error::Error>> {
    let config = BenchConfig {
        threads,
        ..BenchConfig::default()
    };
    println!("{TABLE_HEADER}");
    for nfft in sweep_lengths() {
        let report = run_benchmark(nfft, &config)?;
        println!("{report}");
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "benchmarks=info,fft_pi=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        print_usage();
        return ExitCode::SUCCESS;
    }
    let value = match args.first().map(|arg| arg.parse::<usize>()) {
        None => 1,
        Some(Ok(value)) => value,
        Some(Err(err)) => {
            eprintln!("invalid argument: {err}");
            print_usage();
            return ExitCode::FAILURE;
        }
    };

    let outcome = if value >= DIGITS_THRESHOLD {
        write_pi(value)
    } else {
        run_sweep(value.max(1))
    };
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(%err, "run failed");
            ExitCode::FAILURE
        }
    }
}
