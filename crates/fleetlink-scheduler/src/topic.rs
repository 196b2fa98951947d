//! # Topic Slot Table
//!
//! One coalescing slot per topic name. A slot holds only the most recent
//! un-sent message for its topic plus scheduling metadata; enqueueing a newer
//! message for the same topic overwrites the pending payload, priority, and
//! rate limit instead of queueing twice.
//!
//! Slots are created lazily on first enqueue and persist for the lifetime of
//! the scheduler — the table grows monotonically with the number of distinct
//! topic names seen and never shrinks.

use std::collections::HashMap;
use std::time::Duration;

use quanta::Instant;

// ─── Topic Slot ─────────────────────────────────────────────────────────────

/// Scheduling state for a single topic.
#[derive(Debug)]
pub struct TopicSlot<T> {
    /// Latest un-sent message, if any.
    pending: Option<T>,
    /// Caller-supplied weighting factor.
    priority: f64,
    /// Minimum gap between dispatches (zero = unlimited).
    min_interval: Duration,
    /// Last successful dispatch (initialized to slot-creation time).
    last_send: Instant,
}

impl<T> TopicSlot<T> {
    fn new(now: Instant) -> Self {
        TopicSlot {
            pending: None,
            priority: 0.0,
            min_interval: Duration::ZERO,
            last_send: now,
        }
    }

    /// Whether an un-sent message is waiting.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Take the pending payload, leaving the slot idle.
    pub fn take_pending(&mut self) -> Option<T> {
        self.pending.take()
    }

    /// Stamp a successful dispatch.
    pub fn mark_sent(&mut self, now: Instant) {
        self.last_send = now;
    }

    /// Whether the slot may be offered to the selection pass: pending, and
    /// past its rate-limit window (if one is set).
    pub fn eligible(&self, now: Instant) -> bool {
        self.pending.is_some()
            && (self.min_interval.is_zero()
                || now.duration_since(self.last_send) > self.min_interval)
    }

    /// Weighted wait: elapsed time since the last dispatch times priority.
    /// Measured against `last_send`, not slot-creation time.
    pub fn weight(&self, now: Instant) -> f64 {
        now.duration_since(self.last_send).as_secs_f64() * self.priority
    }

    /// Current weighting factor.
    pub fn priority(&self) -> f64 {
        self.priority
    }

    /// Current rate-limit window.
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}

// ─── Candidate ──────────────────────────────────────────────────────────────

/// A slot offered to the selection pass, with its weight precomputed.
pub struct Candidate<'a, T> {
    pub topic: &'a str,
    pub weight: f64,
    pub slot: &'a mut TopicSlot<T>,
}

// ─── Topic Table ────────────────────────────────────────────────────────────

/// Slot table keyed by topic name.
#[derive(Debug, Default)]
pub struct TopicTable<T> {
    slots: HashMap<String, TopicSlot<T>>,
}

impl<T> TopicTable<T> {
    pub fn new() -> Self {
        TopicTable {
            slots: HashMap::new(),
        }
    }

    /// Coalescing write: overwrite the topic's pending payload, priority, and
    /// rate limit, creating the slot on first use.
    ///
    /// Returns true when an un-sent message was replaced.
    pub fn set_pending(
        &mut self,
        topic: &str,
        payload: T,
        priority: f64,
        rate_limit_hz: f64,
        now: Instant,
    ) -> bool {
        let min_interval = if rate_limit_hz > 0.0 {
            Duration::from_secs_f64(1.0 / rate_limit_hz)
        } else {
            Duration::ZERO
        };

        if let Some(slot) = self.slots.get_mut(topic) {
            let coalesced = slot.pending.is_some();
            slot.pending = Some(payload);
            slot.priority = priority;
            slot.min_interval = min_interval;
            return coalesced;
        }

        // First enqueue for this topic: create the slot lazily.
        let mut slot = TopicSlot::new(now);
        slot.pending = Some(payload);
        slot.priority = priority;
        slot.min_interval = min_interval;
        self.slots.insert(topic.to_owned(), slot);
        false
    }

    /// Collect every eligible slot with its weight. Order follows table
    /// iteration and is otherwise unspecified.
    pub fn candidates(&mut self, now: Instant) -> Vec<Candidate<'_, T>> {
        self.slots
            .iter_mut()
            .filter(|(_, slot)| slot.eligible(now))
            .map(|(topic, slot)| Candidate {
                topic: topic.as_str(),
                weight: slot.weight(now),
                slot,
            })
            .collect()
    }

    /// Number of slots (distinct topics ever seen).
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no topic has ever been enqueued.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of slots currently holding an un-sent message.
    pub fn pending_count(&self) -> usize {
        self.slots.values().filter(|s| s.is_pending()).count()
    }

    /// Look up a slot by topic.
    pub fn get(&self, topic: &str) -> Option<&TopicSlot<T>> {
        self.slots.get(topic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quanta::Clock;

    #[test]
    fn coalescing_overwrites_everything() {
        let (clock, _mock) = Clock::mock();
        let now = clock.now();
        let mut table = TopicTable::new();

        assert!(!table.set_pending("status", 1u32, 1.0, 0.0, now));
        assert!(table.set_pending("status", 2, 5.0, 10.0, now));

        assert_eq!(table.len(), 1);
        assert_eq!(table.pending_count(), 1);
        let slot = table.get("status").unwrap();
        assert_eq!(slot.priority(), 5.0);
        assert_eq!(slot.min_interval(), Duration::from_millis(100));
    }

    #[test]
    fn slots_persist_after_dispatch() {
        let (clock, _mock) = Clock::mock();
        let now = clock.now();
        let mut table = TopicTable::new();
        table.set_pending("odom", 7u32, 1.0, 0.0, now);

        let mut candidates = table.candidates(now);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].slot.take_pending(), Some(7));
        drop(candidates);

        assert_eq!(table.len(), 1);
        assert_eq!(table.pending_count(), 0);
        assert!(table.candidates(now).is_empty());
    }

    #[test]
    fn rate_limited_slot_waits_out_its_window() {
        let (clock, mock) = Clock::mock();
        let mut table = TopicTable::new();
        table.set_pending("lidar", 0u32, 1.0, 2.0, clock.now()); // 500ms window

        // Just created: elapsed since last_send is zero.
        assert!(table.candidates(clock.now()).is_empty());

        mock.increment(Duration::from_millis(400));
        assert!(table.candidates(clock.now()).is_empty());

        mock.increment(Duration::from_millis(200));
        assert_eq!(table.candidates(clock.now()).len(), 1);
    }

    #[test]
    fn unlimited_slot_is_immediately_eligible() {
        let (clock, _mock) = Clock::mock();
        let now = clock.now();
        let mut table = TopicTable::new();
        table.set_pending("cmd", 0u32, 1.0, 0.0, now);
        assert_eq!(table.candidates(now).len(), 1);
    }

    #[test]
    fn weight_scales_with_elapsed_and_priority() {
        let (clock, mock) = Clock::mock();
        let mut table = TopicTable::new();
        table.set_pending("a", 0u32, 2.0, 0.0, clock.now());

        mock.increment(Duration::from_secs(3));
        let now = clock.now();
        let slot = table.get("a").unwrap();
        assert!((slot.weight(now) - 6.0).abs() < 1e-9);
    }
}
