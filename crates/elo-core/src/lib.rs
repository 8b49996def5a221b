//! Core domain + application logic for the ELO watch bot.
//!
//! This crate is intentionally framework-agnostic. Telegram and the FACEIT API
//! live behind ports (traits) implemented in adapter crates.

pub mod commands;
pub mod config;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod logging;
pub mod messaging;
pub mod migration;
pub mod notifier;
pub mod ports;
pub mod reconcile;
pub mod report;
pub mod roster;

#[cfg(test)]
mod test_support;

pub use errors::{Error, Result};
