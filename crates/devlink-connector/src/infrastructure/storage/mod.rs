//! Storage infrastructure: configuration file persistence.
//!
//! The `config` sub-module reads and writes the connector's TOML file and
//! supplies defaults for everything but the device identity.

pub mod config;
