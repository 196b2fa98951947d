//! # Scripted Scheduler Scenarios
//!
//! A scenario is a timeline of events played against a scheduler with a mock
//! clock and a recording sink. Feedback can be scripted with explicit
//! sent/acked indices, or derived at runtime with [`SimEvent::Keepalive`],
//! which models the transport acknowledging everything but a fixed lag —
//! the shape real keep-alive exchanges produce.
//!
//! Advancing the clock deliberately does NOT run a scheduling pass: the
//! scheduler only re-evaluates on events, and scenarios that want timely
//! dispatch must script keep-alives the way a live transport would.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use anyhow::Result;
use bytes::Bytes;
use quanta::Clock;
use rand::rngs::SmallRng;
use rand::{RngExt, SeedableRng};
use serde::Serialize;
use tracing::info;

use fleetlink_scheduler::{MessageScheduler, SchedulerConfig, SchedulerStats};

// ─── Events ─────────────────────────────────────────────────────────────────

/// One step in a scenario timeline.
#[derive(Debug, Clone)]
pub enum SimEvent {
    /// Submit a message to the scheduler.
    Enqueue {
        topic: String,
        payload: Bytes,
        priority: f64,
        rate_limit_hz: f64,
        no_drop: bool,
    },
    /// Transport feedback with explicit indices.
    Feedback { sent_index: u64, acked_index: u64 },
    /// Transport keep-alive: acknowledges all dispatches so far except
    /// `ack_lag` of them.
    Keepalive { ack_lag: u64 },
    /// Step the mock clock forward. Does not wake the scheduler.
    Advance(Duration),
}

// ─── Scenario ───────────────────────────────────────────────────────────────

/// A named, replayable event timeline.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: String,
    pub config: SchedulerConfig,
    pub events: Vec<SimEvent>,
}

impl Scenario {
    pub fn new(name: impl Into<String>, config: SchedulerConfig) -> Self {
        Scenario {
            name: name.into(),
            config,
            events: Vec::new(),
        }
    }

    pub fn enqueue(
        mut self,
        topic: &str,
        payload: impl Into<Bytes>,
        priority: f64,
        rate_limit_hz: f64,
    ) -> Self {
        self.events.push(SimEvent::Enqueue {
            topic: topic.to_owned(),
            payload: payload.into(),
            priority,
            rate_limit_hz,
            no_drop: false,
        });
        self
    }

    pub fn enqueue_no_drop(mut self, topic: &str, payload: impl Into<Bytes>) -> Self {
        self.events.push(SimEvent::Enqueue {
            topic: topic.to_owned(),
            payload: payload.into(),
            priority: 0.0,
            rate_limit_hz: 0.0,
            no_drop: true,
        });
        self
    }

    pub fn feedback(mut self, sent_index: u64, acked_index: u64) -> Self {
        self.events.push(SimEvent::Feedback {
            sent_index,
            acked_index,
        });
        self
    }

    pub fn keepalive(mut self, ack_lag: u64) -> Self {
        self.events.push(SimEvent::Keepalive { ack_lag });
        self
    }

    pub fn advance(mut self, by: Duration) -> Self {
        self.events.push(SimEvent::Advance(by));
        self
    }
}

// ─── Report ─────────────────────────────────────────────────────────────────

/// What came out of a scenario run.
pub struct ScenarioReport {
    pub name: String,
    pub dispatched: Vec<Bytes>,
    pub credit_used: u64,
    pub pending_topics: usize,
    pub nodrop_backlog: usize,
    pub stats: SchedulerStats,
}

/// JSON-friendly view of a report.
#[derive(Debug, Serialize)]
pub struct ReportSummary {
    pub name: String,
    pub dispatched: usize,
    pub dispatched_bytes: usize,
    pub credit_used: u64,
    pub pending_topics: usize,
    pub nodrop_backlog: usize,
    pub stats: SchedulerStats,
}

impl ScenarioReport {
    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            name: self.name.clone(),
            dispatched: self.dispatched.len(),
            dispatched_bytes: self.dispatched.iter().map(|b| b.len()).sum(),
            credit_used: self.credit_used,
            pending_topics: self.pending_topics,
            nodrop_backlog: self.nodrop_backlog,
            stats: self.stats.clone(),
        }
    }
}

// ─── Runner ─────────────────────────────────────────────────────────────────

type RecordingSink = Box<dyn FnMut(Bytes) -> Result<()>>;

/// Play a scenario to completion and report what was dispatched.
pub fn run(scenario: Scenario) -> Result<ScenarioReport> {
    let (clock, mock) = Clock::mock();
    let dispatched: Rc<RefCell<Vec<Bytes>>> = Rc::default();
    let sink: RecordingSink = Box::new({
        let dispatched = dispatched.clone();
        move |m| {
            dispatched.borrow_mut().push(m);
            Ok(())
        }
    });

    let mut sched = MessageScheduler::with_clock(scenario.config.clone(), sink, clock);

    for event in &scenario.events {
        match event {
            SimEvent::Enqueue {
                topic,
                payload,
                priority,
                rate_limit_hz,
                no_drop,
            } => {
                sched.enqueue(topic, payload.clone(), *priority, *rate_limit_hz, *no_drop)?;
            }
            SimEvent::Feedback {
                sent_index,
                acked_index,
            } => {
                sched.on_backpressure_feedback(*sent_index, *acked_index)?;
            }
            SimEvent::Keepalive { ack_lag } => {
                let sent_index = dispatched.borrow().len() as u64;
                let acked_index = sent_index.saturating_sub(*ack_lag);
                sched.on_backpressure_feedback(sent_index, acked_index)?;
            }
            SimEvent::Advance(by) => {
                mock.increment(*by);
            }
        }
    }

    let report = ScenarioReport {
        name: scenario.name.clone(),
        dispatched: dispatched.borrow().clone(),
        credit_used: sched.credit_used(),
        pending_topics: sched.pending_topics(),
        nodrop_backlog: sched.nodrop_backlog(),
        stats: sched.stats().clone(),
    };
    info!(
        scenario = %report.name,
        dispatched = report.dispatched.len(),
        credit_used = report.credit_used,
        "scenario complete"
    );
    Ok(report)
}

// ─── Canned Scenarios ───────────────────────────────────────────────────────

/// A fleet of sensor topics bursting faster than the link drains, with
/// periodic keep-alives. Coalescing should absorb most of the burst.
pub fn telemetry_burst(seed: u64) -> Scenario {
    let mut rng = SmallRng::seed_from_u64(seed);
    let topics = ["pose", "battery", "scan", "status", "imu"];

    let mut scenario = Scenario::new(
        "telemetry_burst",
        SchedulerConfig {
            credit_ceiling: 4,
            ..Default::default()
        },
    );

    // The link starts congested; the first keep-alive opens it.
    scenario = scenario.feedback(4, 0);

    for round in 0..20 {
        for (i, topic) in topics.iter().enumerate() {
            let size = rng.random_range(32..256);
            let payload = Bytes::from(vec![round as u8; size]);
            scenario = scenario.enqueue(topic, payload, 1.0 + i as f64, 0.0);
        }
        scenario = scenario
            .advance(Duration::from_millis(50))
            .keepalive(rng.random_range(0..4));
    }
    scenario.keepalive(0)
}

/// A congested link: the window stays shut while commands (no-drop) and
/// telemetry pile up, then opens once. Commands must all get through.
pub fn congested_link() -> Scenario {
    let mut scenario = Scenario::new(
        "congested_link",
        SchedulerConfig {
            credit_ceiling: 2,
            ..Default::default()
        },
    );

    scenario = scenario.feedback(2, 0); // shut the window
    for i in 0..5u8 {
        scenario = scenario
            .enqueue_no_drop("cmd", Bytes::from(vec![i; 16]))
            .enqueue("pose", Bytes::from(vec![i; 64]), 1.0, 0.0);
    }
    scenario
        .advance(Duration::from_millis(100))
        .feedback(2, 2) // open: no-drop drain overshoots the ceiling
        .feedback(7, 7) // transport catches up
        .keepalive(0)
}
