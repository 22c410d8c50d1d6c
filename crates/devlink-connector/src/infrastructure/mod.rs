//! Infrastructure layer for the connector.
//!
//! Contains adapters: the in-memory transport, the tokio keep-alive
//! scheduler, TOML configuration storage, and simulated device
//! collaborators.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `devlink_core`, but MUST NOT be imported by the `application` layer.

pub mod keep_alive;
pub mod simulated;
pub mod storage;
pub mod transport;
