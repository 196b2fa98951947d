//! # Scheduler Statistics
//!
//! Counters kept by the scheduling engine, designed for JSON serialization
//! and operator polling alongside the snapshot accessors on the scheduler.

use serde::Serialize;

// ─── Scheduler Stats ────────────────────────────────────────────────────────

/// Aggregate counters for one scheduler instance.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchedulerStats {
    /// Topic messages handed to the sink.
    pub topic_dispatched: u64,
    /// No-drop messages handed to the sink.
    pub nodrop_dispatched: u64,
    /// Topic enqueues accepted (coalesced or not).
    pub topic_enqueued: u64,
    /// No-drop enqueues accepted.
    pub nodrop_enqueued: u64,
    /// Topic enqueues that replaced an un-sent message.
    pub coalesced_overwrites: u64,
    /// Scheduling passes that sent nothing for lack of credit.
    pub starved_passes: u64,
    /// Backpressure feedback events processed.
    pub feedback_updates: u64,
    /// Dispatch budget available on the most recent selection pass.
    pub last_budget: u64,
}

impl SchedulerStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fraction of topic enqueues that overwrote un-sent data.
    pub fn coalesce_ratio(&self) -> f64 {
        if self.topic_enqueued == 0 {
            0.0
        } else {
            self.coalesced_overwrites as f64 / self.topic_enqueued as f64
        }
    }

    /// Total messages handed to the sink.
    pub fn total_dispatched(&self) -> u64 {
        self.topic_dispatched + self.nodrop_dispatched
    }
}
