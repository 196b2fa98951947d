//! # Candidate Selection Policy
//!
//! Ordering applied to eligible topic slots before the dispatch budget is
//! spent. The default dispatches candidates with the *smallest* weighted wait
//! first — counter-intuitive relative to typical starvation-avoidance
//! scheduling, but it is the relay's defining admission policy and is kept
//! exactly as-is. The comparator is a replaceable policy so the opposite
//! ordering stays testable.

use std::cmp::Ordering;

use serde::Serialize;

// ─── Selection Order ────────────────────────────────────────────────────────

/// Comparator for the candidate sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionOrder {
    /// Smallest weighted wait dispatched first (ascending sort).
    #[default]
    ShortestWeightedWait,
    /// Largest weighted wait dispatched first (descending sort).
    LongestWeightedWait,
}

impl SelectionOrder {
    /// Compare two candidate weights under this policy.
    ///
    /// Uses total ordering so a NaN priority cannot poison the sort.
    pub fn compare(self, a: f64, b: f64) -> Ordering {
        match self {
            SelectionOrder::ShortestWeightedWait => a.total_cmp(&b),
            SelectionOrder::LongestWeightedWait => b.total_cmp(&a),
        }
    }
}
