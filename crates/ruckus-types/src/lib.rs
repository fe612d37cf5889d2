//! Shared domain types for Ruckus.
//!
//! This crate contains the resource types the scheduler reconciles:
//! ChaosSchedule, ChaosEngine, their object metadata, the typed events the
//! controller emits, and the error taxonomy.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror,
//! schemars.

pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod meta;
pub mod schedule;

/// API group the resources belong to.
pub const API_GROUP: &str = "litmuschaos.io";
/// API version of the resource schemas.
pub const API_VERSION: &str = "v1alpha1";
