//! Telemetry, actuator, and configuration entities.

use std::collections::BTreeMap;

use crate::domain::value::{Scalar, Value};

/// A single sensor sample.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    pub reference: String,
    pub value: Value,
    /// Epoch milliseconds.  When absent the platform stamps the reading on
    /// reception.
    pub timestamp: Option<u64>,
}

impl SensorReading {
    pub fn new(reference: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            reference: reference.into(),
            value: value.into(),
            timestamp: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// An alarm state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alarm {
    pub reference: String,
    pub active: bool,
    /// Epoch milliseconds, see [`SensorReading::timestamp`].
    pub timestamp: Option<u64>,
}

impl Alarm {
    pub fn new(reference: impl Into<String>, active: bool) -> Self {
        Self {
            reference: reference.into(),
            active,
            timestamp: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// Operational state reported alongside an actuator's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorState {
    Ready,
    Busy,
    Error,
}

impl ActuatorState {
    /// State name as used on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            ActuatorState::Ready => "READY",
            ActuatorState::Busy => "BUSY",
            ActuatorState::Error => "ERROR",
        }
    }
}

/// Current state and value of one actuator.
#[derive(Debug, Clone, PartialEq)]
pub struct ActuatorStatus {
    pub reference: String,
    pub state: ActuatorState,
    pub value: Scalar,
}

impl ActuatorStatus {
    pub fn new(reference: impl Into<String>, state: ActuatorState, value: impl Into<Scalar>) -> Self {
        Self {
            reference: reference.into(),
            state,
            value: value.into(),
        }
    }
}

/// Kind of an inbound actuator command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorCommandType {
    Set,
    Status,
    Unknown,
}

impl From<&str> for ActuatorCommandType {
    fn from(raw: &str) -> Self {
        match raw {
            "SET" => ActuatorCommandType::Set,
            "STATUS" => ActuatorCommandType::Status,
            _ => ActuatorCommandType::Unknown,
        }
    }
}

/// A decoded `p2d/actuator_set` message.
#[derive(Debug, Clone, PartialEq)]
pub struct ActuatorCommand {
    pub reference: String,
    pub command: ActuatorCommandType,
    pub value: Option<Scalar>,
}

/// Kind of an inbound configuration command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigurationCommandType {
    Set,
    Current,
    Unknown,
}

impl From<&str> for ConfigurationCommandType {
    fn from(raw: &str) -> Self {
        match raw {
            "SET" => ConfigurationCommandType::Set,
            "CURRENT" => ConfigurationCommandType::Current,
            _ => ConfigurationCommandType::Unknown,
        }
    }
}

/// A decoded `p2d/configuration_set` message.
///
/// Values decoded from the wire are never [`Value::Tuple`]: a comma-joined
/// tuple arrives as a plain string and stays one.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigurationCommand {
    pub command: ConfigurationCommandType,
    pub values: BTreeMap<String, Value>,
}
