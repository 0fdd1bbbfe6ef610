//! The `PROGRESS:` stdout protocol for external monitors.
//!
//! Milestones: 0 at start, proportional per-document values up to 90, 95
//! before the compiler hand-off, 100 on success, -1 on failure. Values are
//! monotonic and deduplicated; -1 always goes through.

use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};

const DOCUMENT_PHASE_CEILING: i32 = 90;
pub const BEFORE_COMPILE: i32 = 95;
pub const DONE: i32 = 100;
pub const FAILED: i32 = -1;

/// Where progress lines go. The batch binary writes to stdout; library
/// callers and tests use the null sink.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, value: i32);
}

pub struct StdoutSink;

impl ProgressSink for StdoutSink {
    fn emit(&self, value: i32) {
        println!("PROGRESS: {value}");
    }
}

pub struct NullSink;

impl ProgressSink for NullSink {
    fn emit(&self, _value: i32) {}
}

/// Tracks per-document completion across concurrently running units and
/// reports milestone values. Totals grow as units discover their documents,
/// so early percentages are conservative rather than wrong.
pub struct ProgressReporter {
    sink: Box<dyn ProgressSink>,
    total: AtomicUsize,
    done: AtomicUsize,
    last: AtomicI32,
}

impl ProgressReporter {
    pub fn new(sink: Box<dyn ProgressSink>) -> Self {
        Self {
            sink,
            total: AtomicUsize::new(0),
            done: AtomicUsize::new(0),
            last: AtomicI32::new(i32::MIN),
        }
    }

    pub fn start(&self) {
        self.report(0);
    }

    /// Register documents discovered by one unit's scan.
    pub fn add_documents(&self, count: usize) {
        self.total.fetch_add(count, Ordering::SeqCst);
    }

    /// One document finished processing (organized or skipped).
    pub fn document_done(&self) {
        let done = self.done.fetch_add(1, Ordering::SeqCst) + 1;
        let total = self.total.load(Ordering::SeqCst).max(done);
        let value = (DOCUMENT_PHASE_CEILING as usize * done / total) as i32;
        self.report(value.min(DOCUMENT_PHASE_CEILING));
    }

    /// The compiler hand-off point.
    pub fn before_compile(&self) {
        self.report(BEFORE_COMPILE);
    }

    pub fn finish(&self) {
        self.report(DONE);
    }

    pub fn fail(&self) {
        self.last.store(FAILED, Ordering::SeqCst);
        self.sink.emit(FAILED);
    }

    fn report(&self, value: i32) {
        // Monotonic: concurrent units may compute stale percentages.
        let previous = self.last.fetch_max(value, Ordering::SeqCst);
        if value > previous {
            self.sink.emit(value);
        }
    }
}
