//! Infrastructure layer for Solarflow.
//!
//! Contains implementations of the collaborator traits defined in
//! `solarflow-core`: the in-memory record store, the channel notifier
//! (log and webhook senders), the JEXL alert predicate, the distributor
//! sync clients, the standard action set, configuration loading, and the
//! cron scheduler host.

pub mod actions;
pub mod config;
pub mod distributor;
pub mod memory_store;
pub mod notifier;
pub mod predicate;
pub mod scheduler;

#[cfg(test)]
pub(crate) mod test_support;
