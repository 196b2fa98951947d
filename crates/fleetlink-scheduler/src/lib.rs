//! # fleetlink-scheduler
//!
//! Outbound message scheduler for the Fleetlink robot-fleet telemetry relay.
//!
//! Given a continuous stream of per-topic status/command messages plus
//! periodic flow-control feedback from the downstream transport, the
//! scheduler decides which pending messages may be emitted now and in what
//! order: a bandwidth-limited link is never overrun while important messages
//! are not starved.
//!
//! Three contracts hold simultaneously:
//! - **Backpressure** — at most `credit_ceiling` dispatched-but-unacked
//!   messages outstanding, recomputed from transport feedback
//! - **Fairness** — per-topic coalescing slots ranked by priority-weighted
//!   wait, with optional per-topic rate limits
//! - **Guaranteed delivery** — a strict-FIFO no-drop class that is never
//!   coalesced or discarded, and may overshoot the credit window
//!
//! Wire encoding, the transport's ack/keep-alive protocol, topic routing, and
//! network I/O live outside this crate; payloads are opaque to the scheduler.
//!
//! ## Crate structure
//!
//! - [`credit`] — sliding credit window against the transport
//! - [`nodrop`] — guaranteed-delivery FIFO
//! - [`topic`] — per-topic coalescing slot table
//! - [`policy`] — replaceable candidate-ordering comparator
//! - [`scheduler`] — the scheduling engine and dispatch sink seam
//! - [`stats`] — serializable scheduler counters

pub mod credit;
pub mod nodrop;
pub mod policy;
pub mod scheduler;
pub mod stats;
pub mod topic;

pub use policy::SelectionOrder;
pub use scheduler::{DispatchSink, MessageScheduler, SchedulerConfig};
pub use stats::SchedulerStats;
