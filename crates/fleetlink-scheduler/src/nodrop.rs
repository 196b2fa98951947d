//! # No-Drop Queue
//!
//! Strict FIFO for messages that must eventually reach the downstream
//! transport. Entries are never coalesced and never discarded; delivery order
//! is the enqueue order.
//!
//! ## Key design decision
//!
//! `drain_all` performs **no per-item credit check**. The scheduling engine
//! checks capacity once before the drain and once after it completes, so a
//! deep queue can push the credit window past its ceiling by up to
//! (queue length − 1). That overshoot trades strict credit enforcement for
//! the guarantee that no-drop messages are never delayed indefinitely by
//! ordinary credit pressure — preserve it.

use std::collections::VecDeque;
use tracing::trace;

use crate::credit::CreditController;
use crate::scheduler::DispatchSink;

// ─── No-Drop Queue ──────────────────────────────────────────────────────────

/// Unbounded FIFO of guaranteed-delivery messages.
///
/// The queue applies no backpressure to its producers; callers must bound
/// their own no-drop production rate relative to the credit window.
#[derive(Debug)]
pub struct NoDropQueue<T> {
    entries: VecDeque<T>,
}

impl<T> NoDropQueue<T> {
    pub fn new() -> Self {
        NoDropQueue {
            entries: VecDeque::new(),
        }
    }

    /// Append a message to the tail.
    pub fn push(&mut self, payload: T) {
        self.entries.push_back(payload);
    }

    /// Dispatch every queued entry oldest-first, consuming one credit each.
    ///
    /// A sink failure propagates immediately; entries dispatched earlier in
    /// the same drain are not rolled back, and the entry the sink was invoked
    /// with is consumed. Remaining entries stay queued for the next pass.
    pub fn drain_all<S: DispatchSink<T>>(
        &mut self,
        sink: &mut S,
        credit: &mut CreditController,
    ) -> anyhow::Result<u64> {
        let mut drained = 0u64;
        while let Some(payload) = self.entries.pop_front() {
            sink.dispatch(payload)?;
            credit.record_sent();
            drained += 1;
        }
        if drained > 0 {
            trace!(drained, credit_used = credit.used(), "no-drop queue drained");
        }
        Ok(drained)
    }

    /// Number of queued entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the queue holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for NoDropQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
