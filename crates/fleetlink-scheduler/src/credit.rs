//! # Credit Controller
//!
//! Sliding credit window against the downstream transport. The scheduler may
//! have at most `ceiling` dispatched-but-unacknowledged messages outstanding,
//! independent of message priority.
//!
//! The used count is not a forever-running counter: every feedback event
//! *recomputes* it as `sent_index − acked_index`, clamped to zero when the
//! transport reports acked ahead of sent (malformed input, recovered locally).

use tracing::warn;

// ─── Credit Controller ──────────────────────────────────────────────────────

/// Tracks outstanding-message credit against a configured ceiling.
#[derive(Debug, Clone)]
pub struct CreditController {
    /// Dispatched messages not yet acknowledged.
    used: u64,
    /// Maximum outstanding messages before the scheduler must wait.
    ceiling: u64,
}

impl CreditController {
    /// Create a controller with the given ceiling (must be at least 1).
    pub fn new(ceiling: u64) -> Self {
        assert!(ceiling >= 1, "credit ceiling must be at least 1");
        CreditController { used: 0, ceiling }
    }

    /// Whether at least one more message may be dispatched.
    pub fn has_capacity(&self) -> bool {
        self.used < self.ceiling
    }

    /// Record one dispatched message. Called once per sink invocation.
    pub fn record_sent(&mut self) {
        self.used = self.used.saturating_add(1);
    }

    /// Recompute the used count from transport feedback.
    ///
    /// `sent_index ≥ acked_index` holds under normal operation; the clamp
    /// exists purely to prevent underflow on malformed input.
    pub fn update_from_ack(&mut self, sent_index: u64, acked_index: u64) {
        if acked_index > sent_index {
            warn!(
                sent_index,
                acked_index, "ack feedback ahead of sent index, clamping credit to zero"
            );
        }
        self.used = sent_index.saturating_sub(acked_index);
    }

    /// Messages currently outstanding.
    pub fn used(&self) -> u64 {
        self.used
    }

    /// Configured ceiling.
    pub fn ceiling(&self) -> u64 {
        self.ceiling
    }

    /// Remaining dispatch budget. Zero when the window is overshot.
    pub fn budget(&self) -> u64 {
        self.ceiling.saturating_sub(self.used)
    }
}
