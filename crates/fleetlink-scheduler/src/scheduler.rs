//! # Scheduling Engine
//!
//! Pure logic — no I/O, no timers, no threads. Orchestrates the credit
//! window, the no-drop FIFO, and the topic slot table, and is the only
//! component that invokes the injected dispatch sink.
//!
//! ## Scheduling pass
//!
//! ```text
//! 1. No credit capacity → send nothing (not even no-drop)
//! 2. Drain the no-drop FIFO unconditionally (may overshoot the window)
//! 3. Re-check capacity; exhausted → stop before the slot table
//! 4. Collect eligible slots (pending + past their rate-limit window)
//! 5. Sort by weighted wait under the selection policy
//! 6. Dispatch the first min(budget, candidates), consuming credit each
//! ```
//!
//! A pass runs only in response to an enqueue or a feedback event — an idle
//! scheduler never self-wakes, so a rate-limit window expiring with no new
//! traffic is not observed until the next event arrives. Callers that need
//! timely re-evaluation must drive events periodically (in practice the
//! transport's keep-alive feedback does this).
//!
//! All operations run to completion synchronously and the sink is called
//! inline; a slow sink stalls the caller. The `&mut self` API leaves external
//! serialization to the owning event loop.

use anyhow::Result;
use quanta::Clock;
use serde::Serialize;
use tracing::{debug, trace};

use crate::credit::CreditController;
use crate::nodrop::NoDropQueue;
use crate::policy::SelectionOrder;
use crate::stats::SchedulerStats;
use crate::topic::TopicTable;

// ─── Dispatch Sink ──────────────────────────────────────────────────────────

/// Downstream hand-off for scheduled messages.
///
/// The sink is invoked synchronously, once per dispatched message. That
/// inline contract is load-bearing for the credit model: a queued or async
/// sink would change the meaning of "credit used". A returned error
/// propagates out of the scheduling pass; messages dispatched earlier in the
/// same pass are not rolled back and there is no internal retry.
pub trait DispatchSink<T> {
    fn dispatch(&mut self, message: T) -> Result<()>;
}

impl<T, F> DispatchSink<T> for F
where
    F: FnMut(T) -> Result<()>,
{
    fn dispatch(&mut self, message: T) -> Result<()> {
        (self)(message)
    }
}

// ─── Configuration ──────────────────────────────────────────────────────────

/// Scheduler configuration parameters.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerConfig {
    /// Maximum dispatched-but-unacknowledged messages (must be at least 1).
    pub credit_ceiling: u64,
    /// Candidate ordering policy for the selection pass.
    pub selection: SelectionOrder,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            credit_ceiling: 1,
            selection: SelectionOrder::default(),
        }
    }
}

// ─── Message Scheduler ──────────────────────────────────────────────────────

/// Credit-windowed outbound message scheduler.
///
/// Generic over the payload type `T`, which is only ever moved — the
/// scheduler never inspects payload bytes. Owns its slot table and no-drop
/// queue exclusively; all operations take `&mut self` and are intended to be
/// driven from one logical thread of control.
pub struct MessageScheduler<T, S> {
    config: SchedulerConfig,
    clock: Clock,
    credit: CreditController,
    topics: TopicTable<T>,
    nodrop: NoDropQueue<T>,
    sink: S,
    stats: SchedulerStats,
}

impl<T, S: DispatchSink<T>> MessageScheduler<T, S> {
    /// Create a scheduler dispatching into `sink` under `config`.
    pub fn new(config: SchedulerConfig, sink: S) -> Self {
        Self::with_clock(config, sink, Clock::new())
    }

    /// Create a scheduler with an explicit clock (tests use `Clock::mock()`
    /// to step rate-limit windows deterministically).
    pub fn with_clock(config: SchedulerConfig, sink: S, clock: Clock) -> Self {
        let credit = CreditController::new(config.credit_ceiling);
        MessageScheduler {
            config,
            clock,
            credit,
            topics: TopicTable::new(),
            nodrop: NoDropQueue::new(),
            sink,
            stats: SchedulerStats::new(),
        }
    }

    /// Submit a message for the given topic.
    ///
    /// With `no_drop` set the message joins the guaranteed-delivery FIFO and
    /// `priority`/`rate_limit_hz` are ignored. Otherwise the topic's slot is
    /// overwritten (coalescing: older un-sent data for the topic is
    /// discarded, never queued twice). Either way a scheduling pass runs
    /// before returning, so a sink failure surfaces here.
    pub fn enqueue(
        &mut self,
        topic: &str,
        payload: T,
        priority: f64,
        rate_limit_hz: f64,
        no_drop: bool,
    ) -> Result<()> {
        if no_drop {
            self.nodrop.push(payload);
            self.stats.nodrop_enqueued += 1;
        } else {
            let now = self.clock.now();
            if self
                .topics
                .set_pending(topic, payload, priority, rate_limit_hz, now)
            {
                self.stats.coalesced_overwrites += 1;
                debug!(topic, "coalesced un-sent topic message");
            }
            self.stats.topic_enqueued += 1;
        }
        self.schedule()
    }

    /// Apply flow-control feedback from the downstream transport.
    ///
    /// Recomputes the credit window from the transport's sent/acked indices
    /// and runs a scheduling pass. Acked ahead of sent is recovered locally
    /// by clamping to zero, never surfaced as an error.
    pub fn on_backpressure_feedback(&mut self, sent_index: u64, acked_index: u64) -> Result<()> {
        self.credit.update_from_ack(sent_index, acked_index);
        self.stats.feedback_updates += 1;
        trace!(
            sent_index,
            acked_index,
            credit_used = self.credit.used(),
            "backpressure feedback applied"
        );
        self.schedule()
    }

    /// Run one scheduling pass now.
    ///
    /// Invoked automatically after every enqueue and feedback event; callers
    /// may also invoke it directly to re-evaluate rate-limit eligibility.
    /// Deterministic and synchronous — dispatch decisions made within a pass
    /// are final.
    pub fn schedule(&mut self) -> Result<()> {
        if !self.credit.has_capacity() {
            self.stats.starved_passes += 1;
            return Ok(());
        }

        // Guaranteed-delivery drain: no per-item credit check, so a deep
        // queue overshoots the window. Capacity is re-assessed afterward.
        if !self.nodrop.is_empty() {
            let drained = self.nodrop.drain_all(&mut self.sink, &mut self.credit)?;
            self.stats.nodrop_dispatched += drained;
            if !self.credit.has_capacity() {
                return Ok(());
            }
        }

        if self.topics.is_empty() {
            return Ok(());
        }

        let now = self.clock.now();
        let order = self.config.selection;
        let mut candidates = self.topics.candidates(now);
        if candidates.is_empty() {
            return Ok(());
        }

        let budget = self.credit.budget() as usize;
        self.stats.last_budget = budget as u64;
        candidates.sort_by(|a, b| order.compare(a.weight, b.weight));

        let to_send = budget.min(candidates.len());
        for cand in candidates.into_iter().take(to_send) {
            if let Some(payload) = cand.slot.take_pending() {
                self.sink.dispatch(payload)?;
                cand.slot.mark_sent(now);
                self.credit.record_sent();
                self.stats.topic_dispatched += 1;
                trace!(
                    topic = cand.topic,
                    weight = cand.weight,
                    "topic message dispatched"
                );
            }
        }

        Ok(())
    }

    // ─── Snapshot accessors ─────────────────────────────────────────────

    /// Dispatched-but-unacknowledged message count.
    pub fn credit_used(&self) -> u64 {
        self.credit.used()
    }

    /// Configured credit ceiling.
    pub fn credit_ceiling(&self) -> u64 {
        self.credit.ceiling()
    }

    /// Remaining dispatch budget (zero when the window is overshot).
    pub fn dispatch_budget(&self) -> u64 {
        self.credit.budget()
    }

    /// Topics currently holding an un-sent message.
    pub fn pending_topics(&self) -> usize {
        self.topics.pending_count()
    }

    /// Distinct topics ever seen (slots are never removed).
    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }

    /// Depth of the no-drop FIFO.
    pub fn nodrop_backlog(&self) -> usize {
        self.nodrop.len()
    }

    /// Counters accumulated since construction.
    pub fn stats(&self) -> &SchedulerStats {
        &self.stats
    }

    /// Active configuration.
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    type Sent = Rc<RefCell<Vec<&'static str>>>;

    fn recording(
        ceiling: u64,
    ) -> (
        MessageScheduler<&'static str, impl DispatchSink<&'static str>>,
        Sent,
        std::sync::Arc<quanta::Mock>,
    ) {
        let (clock, mock) = Clock::mock();
        let sent: Sent = Rc::default();
        let sink = {
            let sent = sent.clone();
            move |m: &'static str| {
                sent.borrow_mut().push(m);
                anyhow::Ok(())
            }
        };
        let config = SchedulerConfig {
            credit_ceiling: ceiling,
            ..Default::default()
        };
        (MessageScheduler::with_clock(config, sink, clock), sent, mock)
    }

    #[test]
    fn enqueue_dispatches_when_credit_is_free() {
        let (mut sched, sent, _mock) = recording(3);
        sched.enqueue("status", "s0", 1.0, 0.0, false).unwrap();
        assert_eq!(*sent.borrow(), vec!["s0"]);
        assert_eq!(sched.credit_used(), 1);
        assert_eq!(sched.pending_topics(), 0);
    }

    #[test]
    fn saturated_scheduler_sends_nothing() {
        let (mut sched, sent, _mock) = recording(2);
        sched.on_backpressure_feedback(5, 3).unwrap();
        assert_eq!(sched.credit_used(), 2);

        sched.enqueue("status", "s0", 1.0, 0.0, false).unwrap();
        sched.enqueue("cmd", "c0", 1.0, 0.0, true).unwrap();
        assert!(sent.borrow().is_empty());
        assert_eq!(sched.pending_topics(), 1);
        assert_eq!(sched.nodrop_backlog(), 1);
        assert!(sched.stats().starved_passes >= 2);
    }

    #[test]
    fn feedback_releases_held_messages() {
        let (mut sched, sent, _mock) = recording(1);
        sched.on_backpressure_feedback(1, 0).unwrap();
        sched.enqueue("status", "s0", 1.0, 0.0, false).unwrap();
        assert!(sent.borrow().is_empty());

        sched.on_backpressure_feedback(1, 1).unwrap();
        assert_eq!(*sent.borrow(), vec!["s0"]);
    }

    #[test]
    fn coalescing_keeps_only_the_newest() {
        let (mut sched, sent, _mock) = recording(1);
        sched.on_backpressure_feedback(1, 0).unwrap();
        sched.enqueue("pose", "old", 1.0, 0.0, false).unwrap();
        sched.enqueue("pose", "new", 2.0, 0.0, false).unwrap();
        assert_eq!(sched.pending_topics(), 1);
        assert_eq!(sched.stats().coalesced_overwrites, 1);

        sched.on_backpressure_feedback(1, 1).unwrap();
        assert_eq!(*sent.borrow(), vec!["new"]);
    }

    #[test]
    fn nodrop_drain_overshoots_then_blocks_topics() {
        let (mut sched, sent, _mock) = recording(1);
        // Hold the window shut while the queues fill.
        sched.on_backpressure_feedback(1, 0).unwrap();
        sched.enqueue("cmd", "x", 0.0, 0.0, true).unwrap();
        sched.enqueue("cmd", "y", 0.0, 0.0, true).unwrap();
        sched.enqueue("pose", "z", 1.0, 0.0, false).unwrap();
        assert!(sent.borrow().is_empty());

        // Window opens: both no-drop entries go out (overshooting the
        // ceiling of 1), the topic message stays blocked.
        sched.on_backpressure_feedback(1, 1).unwrap();
        assert_eq!(*sent.borrow(), vec!["x", "y"]);
        assert_eq!(sched.credit_used(), 2);
        assert_eq!(sched.pending_topics(), 1);
    }

    #[test]
    fn ascending_weight_sends_smallest_first() {
        let (mut sched, sent, mock) = recording(3);
        sched.on_backpressure_feedback(3, 0).unwrap();
        sched.enqueue("a", "a0", 1.0, 0.0, false).unwrap();
        sched.enqueue("b", "b0", 2.0, 0.0, false).unwrap();

        mock.increment(Duration::from_secs(1));
        sched.on_backpressure_feedback(3, 3).unwrap();
        assert_eq!(*sent.borrow(), vec!["a0", "b0"]);
    }

    #[test]
    fn longest_wait_policy_inverts_dispatch_order() {
        let (clock, mock) = Clock::mock();
        let sent: Sent = Rc::default();
        let sink = {
            let sent = sent.clone();
            move |m: &'static str| {
                sent.borrow_mut().push(m);
                anyhow::Ok(())
            }
        };
        let config = SchedulerConfig {
            credit_ceiling: 1,
            selection: SelectionOrder::LongestWeightedWait,
        };
        let mut sched = MessageScheduler::with_clock(config, sink, clock);

        sched.on_backpressure_feedback(1, 0).unwrap();
        sched.enqueue("a", "a0", 1.0, 0.0, false).unwrap();
        sched.enqueue("b", "b0", 2.0, 0.0, false).unwrap();
        mock.increment(Duration::from_secs(1));

        // Budget of one: the heavier wait ("b0") wins under this policy.
        sched.on_backpressure_feedback(1, 1).unwrap();
        assert_eq!(*sent.borrow(), vec!["b0"]);
        assert_eq!(sched.pending_topics(), 1);
    }

    #[test]
    fn rate_limited_topic_waits_for_its_window() {
        let (mut sched, sent, mock) = recording(10);
        // 10 Hz → 100ms window; the slot was just created so elapsed is zero.
        sched.enqueue("lidar", "l0", 1.0, 10.0, false).unwrap();
        assert!(sent.borrow().is_empty());

        mock.increment(Duration::from_millis(50));
        sched.schedule().unwrap();
        assert!(sent.borrow().is_empty());

        mock.increment(Duration::from_millis(60));
        sched.schedule().unwrap();
        assert_eq!(*sent.borrow(), vec!["l0"]);
    }

    #[test]
    fn sink_failure_propagates_from_enqueue() {
        let attempts = Rc::new(RefCell::new(0u32));
        let sink = {
            let attempts = attempts.clone();
            move |_m: &'static str| -> Result<()> {
                *attempts.borrow_mut() += 1;
                anyhow::bail!("transport closed")
            }
        };
        let mut sched = MessageScheduler::new(
            SchedulerConfig {
                credit_ceiling: 4,
                ..Default::default()
            },
            sink,
        );

        let err = sched.enqueue("status", "s0", 1.0, 0.0, false);
        assert!(err.is_err());
        assert_eq!(*attempts.borrow(), 1);
    }

    #[test]
    fn stats_track_both_message_classes() {
        let (mut sched, _sent, _mock) = recording(10);
        sched.enqueue("a", "a0", 1.0, 0.0, false).unwrap();
        sched.enqueue("cmd", "c0", 0.0, 0.0, true).unwrap();

        let stats = sched.stats();
        assert_eq!(stats.topic_dispatched, 1);
        assert_eq!(stats.nodrop_dispatched, 1);
        assert_eq!(stats.total_dispatched(), 2);
        assert_eq!(stats.topic_enqueued, 1);
        assert_eq!(stats.nodrop_enqueued, 1);
    }
}
