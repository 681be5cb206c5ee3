//! Lock-free view of a running system for other threads.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tlm_components::AbortFlag;
use tlm_core::Real;

#[derive(Debug, Default)]
struct Span {
    time: AtomicU64,
    start: AtomicU64,
    stop: AtomicU64,
}

/// Current simulation time and abort flag of one system.
///
/// Clones share state; the system publishes its time after every step.
#[derive(Debug, Clone, Default)]
pub struct ProgressHandle {
    span: Arc<Span>,
    abort: AbortFlag,
}

impl ProgressHandle {
    pub(crate) fn with_abort(abort: AbortFlag) -> Self {
        Self {
            span: Arc::default(),
            abort,
        }
    }

    pub(crate) fn begin(&self, start: Real, stop: Real) {
        self.span.start.store(start.to_bits(), Ordering::Relaxed);
        self.span.stop.store(stop.to_bits(), Ordering::Relaxed);
        self.span.time.store(start.to_bits(), Ordering::Relaxed);
    }

    pub(crate) fn publish(&self, time: Real) {
        self.span.time.store(time.to_bits(), Ordering::Relaxed);
    }

    pub fn time(&self) -> Real {
        Real::from_bits(self.span.time.load(Ordering::Relaxed))
    }

    pub fn stop_time(&self) -> Real {
        Real::from_bits(self.span.stop.load(Ordering::Relaxed))
    }

    /// Fraction of the current run completed, in `[0, 1]`.
    pub fn fraction(&self) -> Real {
        let start = Real::from_bits(self.span.start.load(Ordering::Relaxed));
        let span = self.stop_time() - start;
        if span <= 0.0 {
            return 1.0;
        }
        ((self.time() - start) / span).clamp(0.0, 1.0)
    }

    /// Ask the system to stop after its current step.
    pub fn abort(&self) {
        self.abort.set();
    }

    pub fn is_aborted(&self) -> bool {
        self.abort.is_set()
    }

    pub fn abort_flag(&self) -> &AbortFlag {
        &self.abort
    }
}
