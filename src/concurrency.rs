use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Cooperative cancellation polled between long-running steps.
pub trait Cancellation: Sync {
    fn is_cancelled(&self) -> bool;
}

/// Never cancels.
#[derive(Clone, Copy, Debug, Default)]
pub struct Uncancellable;

impl Cancellation for Uncancellable {
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Monotonic stop flag that can only transition from false to true.
#[derive(Debug, Default)]
pub struct StopFlag {
    inner: AtomicBool,
}

impl StopFlag {
    pub fn new() -> Self {
        Self {
            inner: AtomicBool::new(false),
        }
    }

    pub fn stop(&self) {
        self.inner.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.load(Ordering::Relaxed)
    }
}

impl Cancellation for StopFlag {
    fn is_cancelled(&self) -> bool {
        self.is_stopped()
    }
}

/// Count of workers still in their timed phase.
///
/// Once the count drops to zero every worker that is merely keeping the
/// machine loaded sees itself as cancelled.
#[derive(Debug, Default)]
pub struct WorkerGauge {
    active: AtomicUsize,
}

impl WorkerGauge {
    pub fn new() -> Self {
        Self {
            active: AtomicUsize::new(0),
        }
    }

    /// Registers a worker. The returned guard unregisters it on drop.
    pub fn enter(&self) -> ActiveWorker<'_> {
        self.active.fetch_add(1, Ordering::AcqRel);
        ActiveWorker {
            gauge: self,
            left: false,
        }
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    pub fn is_idle(&self) -> bool {
        self.active() == 0
    }
}

impl Cancellation for WorkerGauge {
    fn is_cancelled(&self) -> bool {
        self.is_idle()
    }
}

/// Registration handed out by [`WorkerGauge::enter`].
#[derive(Debug)]
pub struct ActiveWorker<'a> {
    gauge: &'a WorkerGauge,
    left: bool,
}

impl ActiveWorker<'_> {
    /// Unregisters now instead of at drop.
    pub fn leave(&mut self) {
        if !self.left {
            self.left = true;
            self.gauge.active.fetch_sub(1, Ordering::AcqRel);
        }
    }
}

impl Drop for ActiveWorker<'_> {
    fn drop(&mut self) {
        self.leave();
    }
}
