//! Scenario toolkit for exercising the relay scheduler.
//!
//! Provides scripted event timelines (enqueue, transport feedback, mock-clock
//! advancement) and deterministic canned scenarios for testing scheduler
//! behaviour under controlled credit pressure — no network, no wall clock.

pub mod scenario;

pub use scenario::{run, Scenario, ScenarioReport, SimEvent};
