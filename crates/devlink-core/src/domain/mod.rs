//! Domain entities for the devlink connector.
//!
//! This module contains plain data types with no infrastructure
//! dependencies.  Outer layers (the codec, the connector, transports) depend
//! on these types; the types never depend on them.
//!
//! # Sub-modules
//!
//! - **`device`** – Device identity and its fixed set of actuator references.
//! - **`value`** – The closed [`value::Value`] / [`value::Scalar`] variants
//!   used for every dynamically typed platform value.
//! - **`events`** – Telemetry, actuator, and configuration entities.
//! - **`firmware`** – Firmware update commands, packets, and status codes.

pub mod device;
pub mod events;
pub mod firmware;
pub mod value;
