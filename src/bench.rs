//! Multi-threaded pi benchmark.
//!
//! Every worker owns a context cloned from one calibrated context, computes
//! pi in doubling batches until the minimum duration has passed, then keeps
//! the machine loaded with cancellable runs until the last worker finishes
//! timing. That keeps every timed run under the same contention.

use std::fmt;
use std::thread;
use std::time::{Duration, Instant};

use crate::concurrency::{ActiveWorker, WorkerGauge};
use crate::config::{BenchConfig, ContextConfig};
use crate::context::PrecisionContext;
use crate::error::MpError;
use crate::pi::PiOutcome;

/// Column headings matching the [`BenchReport`] `Display` row.
pub const TABLE_HEADER: &str = "mt  nfft   run_cnt     nops  duration     rate     mflops   index";

/// Reference throughput per `log2(nfft)`, starting at 7.
const REFERENCE_INDICES: [f64; 15] = [
    1.348e7, 1.519e7, 1.651e7, 1.685e7, 1.672e7, 1.768e7, 1.745e7, 1.729e7, 1.677e7, 1.623e7,
    1.596e7, 1.568e7, 1.551e7, 1.443e7, 1.428e7,
];

/// Reference operation rate for a transform of length `2^log2`, if tabulated.
pub fn reference_index(log2: u32) -> Option<f64> {
    let offset = log2.checked_sub(7)?;
    REFERENCE_INDICES.get(offset as usize).copied()
}

/// Transform lengths of the standard sweep: 512 up to 2097152.
pub fn sweep_lengths() -> impl Iterator<Item = usize> {
    (9..=21).map(|log2| 1_usize << log2)
}

/// Aggregate timing of one benchmark run.
#[derive(Clone, Debug, PartialEq)]
pub struct BenchReport {
    pub threads: usize,
    pub transform_length: usize,
    pub radix_log10: u32,
    /// Timed pi computations summed over workers.
    pub runs: usize,
    /// Nominal operation count of one computation, `50 n log2(n)^2`.
    pub operations: f64,
    /// Timed duration averaged over workers.
    pub mean_duration: Duration,
    /// Computations per second summed over workers.
    pub rate: f64,
    pub mflops: f64,
    /// `operations * rate` relative to the reference table.
    pub index: Option<f64>,
}

impl fmt::Display for BenchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:2} {:7} {} {:5} {:.3e} {:8.3} {:.4e} {:.4e} ",
            self.threads,
            self.transform_length,
            self.radix_log10,
            self.runs,
            self.operations,
            self.mean_duration.as_secs_f64(),
            self.rate,
            self.mflops,
        )?;
        match self.index {
            Some(index) => write!(f, "{index:.3}"),
            None => f.write_str("-"),
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct WorkerTiming {
    runs: usize,
    duration: Duration,
}

/// Benchmarks pi at transform length `nfft` on `config.threads` workers.
pub fn run_benchmark(nfft: usize, config: &BenchConfig) -> Result<BenchReport, MpError> {
    let threads = config.threads.max(1);
    let min_duration = config.min_duration;
    let base = PrecisionContext::new(ContextConfig::with_transform_length(nfft))?;
    let transform_length = base.transform_length();
    let radix_log10 = base.radix().log10();
    let mut contexts = Vec::with_capacity(threads);
    for _ in 1..threads {
        contexts.push(base.sibling()?);
    }
    contexts.push(base);

    let gauge = WorkerGauge::new();
    let (sender, receiver) = crossbeam_channel::unbounded();
    thread::scope(|scope| {
        let gauge = &gauge;
        // Register every worker before the first one starts.
        let registrations = register_workers(gauge, contexts.len());
        let handles: Vec<_> = contexts
            .into_iter()
            .zip(registrations)
            .map(|(mut context, registration)| {
                let sender = sender.clone();
                scope.spawn(move || {
                    let result = run_worker(&mut context, registration, gauge, min_duration);
                    if sender.send(result).is_err() {
                        tracing::warn!("benchmark result receiver dropped");
                    }
                })
            })
            .collect();
        let mut joined = Ok(());
        for handle in handles {
            if handle.join().is_err() {
                joined = Err(MpError::WorkerPanicked);
            }
        }
        joined
    })?;
    drop(sender);

    let timings = receiver
        .iter()
        .collect::<Result<Vec<WorkerTiming>, MpError>>()?;
    let log2 = transform_length.trailing_zeros();
    let operations = 50.0 * transform_length as f64 * f64::from(log2) * f64::from(log2);
    let runs = timings.iter().map(|timing| timing.runs).sum();
    let total: Duration = timings.iter().map(|timing| timing.duration).sum();
    let rate: f64 = timings
        .iter()
        .map(|timing| timing.runs as f64 / timing.duration.as_secs_f64())
        .sum();
    let report = BenchReport {
        threads,
        transform_length,
        radix_log10,
        runs,
        operations,
        mean_duration: total / threads as u32,
        rate,
        mflops: operations * rate * 1e-6,
        index: reference_index(log2).map(|reference| operations * rate / reference),
    };
    tracing::info!(
        threads,
        transform_length,
        runs,
        rate,
        "benchmark finished"
    );
    Ok(report)
}

fn register_workers(gauge: &WorkerGauge, count: usize) -> Vec<ActiveWorker<'_>> {
    (0..count).map(|_| gauge.enter()).collect()
}

fn run_worker(
    context: &mut PrecisionContext,
    mut registration: ActiveWorker<'_>,
    gauge: &WorkerGauge,
    min_duration: Duration,
) -> Result<WorkerTiming, MpError> {
    let start = Instant::now();
    context.compute_pi()?;
    let mut runs = 1;
    let mut batch = 1;
    let mut elapsed = start.elapsed();
    while elapsed < min_duration {
        for _ in 0..batch {
            context.compute_pi()?;
        }
        elapsed = start.elapsed();
        runs += batch;
        batch *= 2;
    }
    registration.leave();

    while let PiOutcome::Complete(_) = context.compute_pi_cancellable(gauge)? {}
    Ok(WorkerTiming {
        runs,
        duration: elapsed,
    })
}
