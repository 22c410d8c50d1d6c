//! # devlink-core
//!
//! Shared library for the devlink device connector containing the wire
//! protocol codec, the domain entities exchanged with the IoT platform, and
//! the store-and-forward outbound queue.
//!
//! It has zero dependencies on network sockets, timers, or device drivers,
//! so everything here can be unit-tested on any host.
//!
//! # Architecture overview
//!
//! A device talks to the platform over a publish/subscribe transport.  Every
//! unit on the wire is a [`WireMessage`]: a topic string plus an optional
//! payload.  This crate defines:
//!
//! - **`domain`** – Typed entities: sensor readings, alarms, actuator
//!   status and commands, configuration, and the firmware update vocabulary.
//!   Dynamic platform values are modelled as the closed [`Value`] variant.
//!
//! - **`protocol`** – The topic grammar and the [`Codec`] that turns domain
//!   entities into wire messages and inbound wire messages back into typed
//!   commands.
//!
//! - **`queue`** – The bounded FIFO that buffers outbound messages while the
//!   transport is unavailable.

pub mod domain;
pub mod protocol;
pub mod queue;

// Re-export the most-used types at the crate root so callers can write
// `devlink_core::Codec` instead of `devlink_core::protocol::codec::Codec`.
pub use domain::device::Device;
pub use domain::events::{
    ActuatorCommand, ActuatorCommandType, ActuatorState, ActuatorStatus, Alarm,
    ConfigurationCommand, ConfigurationCommandType, SensorReading,
};
pub use domain::firmware::{
    ChunkRequest, FirmwareCommand, FirmwareCommandType, FirmwareErrorCode, FirmwarePacket,
    FirmwareStatus,
};
pub use domain::value::{Scalar, Value};
pub use protocol::codec::{Codec, ProtocolError};
pub use protocol::messages::{Payload, WireMessage};
pub use protocol::topics::InboundKind;
pub use queue::OutboundQueue;
