//! mysqlglot-core - shared library for the mysqlglot exporter.
//!
//! Provides:
//! - `collector` - per-view MySQL collectors, metric descriptors, samples and sinks
//! - `exporter` - one scrape pass across all enabled collectors, encoded for Prometheus
//! - `config` - connection settings from environment variables

pub mod collector;
pub mod config;
pub mod exporter;

pub use mysql;

/// Crate version, shared by the daemon's `--version` output.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
