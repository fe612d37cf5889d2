//! Reconciliation core for Ruckus.
//!
//! This crate defines the "ports" (the `ClusterClient` trait) that the
//! infrastructure layer implements, and everything that turns a
//! ChaosSchedule into a time-ordered stream of ChaosEngine creations:
//! calendar windows, cron derivation, next-fire resolution, and the
//! reconcile state machine. It depends only on `ruckus-types` -- never on
//! `ruckus-infra` or any IO crate.

pub mod calendar;
pub mod cluster;
pub mod event;
pub mod firing;
pub mod reconcile;
