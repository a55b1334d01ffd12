//! Automation engine and collaborator trait definitions for Solarflow.
//!
//! This crate defines the "ports" (record store, notification dispatcher,
//! predicate evaluator, action registry) that the infrastructure layer
//! implements, plus the engine built on top of them: condition evaluation,
//! the sequential workflow runner, the alert evaluator, and the automation
//! service facade. It depends only on `solarflow-types` -- never on
//! `solarflow-infra` or any network/IO crate.

pub mod action;
pub mod alert;
pub mod catalog;
pub mod notify;
pub mod predicate;
pub mod service;
pub mod store;
pub mod workflow;

#[cfg(test)]
pub(crate) mod test_support;
