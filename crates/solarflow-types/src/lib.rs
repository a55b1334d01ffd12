//! Shared domain types for Solarflow.
//!
//! This crate contains the core domain types used across the Solarflow
//! automation platform: Workflow, StepDefinition, AlertRule, Schedule, and
//! their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod alert;
pub mod config;
pub mod error;
pub mod notification;
pub mod schedule;
pub mod workflow;
