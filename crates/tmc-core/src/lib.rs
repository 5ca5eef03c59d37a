//! Core of the Telegram mentions crawler.
//!
//! Framework-agnostic: the message transport lives behind [`ports::TransportPort`] and is
//! implemented in adapter crates. This crate owns discovery, the term search traversal,
//! aggregation and export.

pub mod aggregator;
pub mod config;
pub mod discovery;
pub mod domain;
pub mod errors;
pub mod export;
pub mod logging;
pub mod orchestrator;
pub mod pipeline;
pub mod ports;
pub mod stats;

#[cfg(test)]
mod testing;

pub use errors::{Error, Result};
