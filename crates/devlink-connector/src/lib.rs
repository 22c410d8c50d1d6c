//! devlink-connector library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the simulator binary in `main.rs` share the same module tree.

pub mod application;
pub mod infrastructure;

pub use application::connector::{Connector, ConnectorBuilder, ConnectorError};
pub use application::firmware_update::{FirmwareOutput, FirmwareState, FirmwareUpdate};
