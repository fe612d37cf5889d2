//! Observability for Ruckus.
//!
//! Two pieces: the tracing-subscriber bootstrap (`tracing_setup`) and the
//! event log sink (`event_log`) that drains the reconciler's schedule
//! events into the tracing pipeline. The controller bootstrap in
//! `ruckus-infra` wires both in.

pub mod event_log;
pub mod tracing_setup;
