//! Deterministic captures for tests and reproducible output.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::call_site::{CallSite, StackTrace};
use crate::capture::TraceCapture;

/// Always returns the same trace.
#[derive(Debug, Clone, Default)]
pub struct FixedCapture {
    trace: StackTrace,
}

impl FixedCapture {
    /// Create a capture returning `trace`.
    pub fn new(trace: StackTrace) -> Self {
        Self { trace }
    }

    /// Create a capture returning an empty trace.
    pub fn empty() -> Self {
        Self::default()
    }
}

impl TraceCapture for FixedCapture {
    fn capture(&self, skip: usize) -> StackTrace {
        StackTrace::new(self.trace.frames.iter().skip(skip).cloned().collect())
    }
}

/// Returns a distinct single-frame trace on every call: `capture#1`,
/// `capture#2`, and so on.
#[derive(Debug, Default)]
pub struct SequenceCapture {
    calls: AtomicU64,
}

impl SequenceCapture {
    /// Create a new sequence starting at 1.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of captures taken so far.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TraceCapture for SequenceCapture {
    fn capture(&self, _skip: usize) -> StackTrace {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        StackTrace::new(vec![CallSite::new(format!("capture#{}", n))])
    }
}
