//! Storage infrastructure: configuration file persistence.
//!
//! The `config` sub-module reads the handheld's TOML configuration from the
//! platform-appropriate directory (or an explicit `--config` path), writes a
//! starter file on request, and supplies defaults when no file exists yet.

pub mod config;
