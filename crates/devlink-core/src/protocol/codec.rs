//! JSON codec mapping domain entities to wire messages and back.
//!
//! Outbound payloads:
//!
//! ```text
//! sensor reading / alarm   {"utc"?: <ms>, "data": "<coerced>"}
//! actuator status          {"status": "READY|BUSY|ERROR", "value": "<coerced>"}
//! configuration            {"values": {"<ref>": "<coerced>", ...}}
//! firmware status          {"status": "<STATUS>", "error"?: <code>}
//! chunk request            {"fileName": "...", "chunkIndex": n, "chunkSize": n}
//! keep-alive / last will   no payload
//! ```
//!
//! Every outbound value is coerced to a string exactly once (see
//! [`coerce_value`]).  Inbound values go the other way through
//! [`infer_scalar`], which is the only place wire strings acquire a type.

use std::collections::BTreeMap;

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

use crate::domain::device::Device;
use crate::domain::events::{
    ActuatorCommand, ActuatorCommandType, ActuatorStatus, Alarm, ConfigurationCommand,
    ConfigurationCommandType, SensorReading,
};
use crate::domain::firmware::{
    ChunkRequest, FirmwareCommand, FirmwareCommandType, FirmwarePacket, FirmwareStatus, HASH_SIZE,
};
use crate::domain::value::{Scalar, Value};
use crate::protocol::messages::{
    ActuatorCommandPayload, ActuatorStatusPayload, ChunkRequestPayload,
    ConfigurationCommandPayload, ConfigurationPayload, FirmwareCommandPayload,
    FirmwareStatusPayload, KeepAliveResponsePayload, ReadingPayload, WireMessage,
};
use crate::protocol::topics::{self, InboundKind};

/// Separator used when flattening a tuple into one wire string.
///
/// Elements are not escaped, so an element containing a comma cannot be
/// told apart from two elements.  Platform parsers depend on this exact
/// format.
pub const TUPLE_DELIMITER: &str = ",";

/// Errors that can occur while encoding or decoding a wire message.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// An outbound payload could not be serialized.
    #[error("failed to serialize payload for {topic}: {source}")]
    Serialize {
        topic: String,
        #[source]
        source: serde_json::Error,
    },

    /// An inbound message that requires a payload arrived without one.
    #[error("message on {0} has no payload")]
    MissingPayload(String),

    /// The payload is not valid JSON of the expected shape.
    #[error("malformed JSON payload on {topic}: {source}")]
    MalformedJson {
        topic: String,
        #[source]
        source: serde_json::Error,
    },

    /// The topic is not this device's actuator topic with a single-segment
    /// reference.
    #[error("topic does not end in a reference: {0}")]
    MissingReference(String),

    /// A firmware chunk frame is shorter than its two digests.
    #[error("firmware chunk too short: need at least {needed} bytes, got {available}")]
    TruncatedChunk { needed: usize, available: usize },
}

/// Message factory and deserializer for one device.
///
/// Created once at startup from the device key and used for the lifetime of
/// the process.
#[derive(Debug, Clone)]
pub struct Codec {
    device_key: String,
}

impl Codec {
    pub fn new(device_key: impl Into<String>) -> Self {
        Self {
            device_key: device_key.into(),
        }
    }

    pub fn for_device(device: &Device) -> Self {
        Self::new(device.key())
    }

    pub fn device_key(&self) -> &str {
        &self.device_key
    }

    // ── Outbound ──────────────────────────────────────────────────────────────

    /// Encodes a sensor reading onto `d2p/sensor_reading/d/{key}/r/{ref}`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Serialize`] if serialization fails.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use devlink_core::{Codec, SensorReading};
    ///
    /// let codec = Codec::new("dev1");
    /// let msg = codec
    ///     .encode_sensor_reading(&SensorReading::new("T", 21.5).with_timestamp(1000))
    ///     .unwrap();
    /// assert_eq!(msg.topic(), "d2p/sensor_reading/d/dev1/r/T");
    /// assert_eq!(msg.payload_text(), Some(r#"{"utc":1000,"data":"21.5"}"#));
    /// ```
    pub fn encode_sensor_reading(&self, reading: &SensorReading) -> Result<WireMessage, ProtocolError> {
        let topic = topics::reference_topic(topics::SENSOR_READING, &self.device_key, &reading.reference);
        let payload = ReadingPayload {
            utc: reading.timestamp,
            data: coerce_value(&reading.value),
        };
        json_message(topic, &payload)
    }

    /// Encodes an alarm onto `d2p/events/d/{key}/r/{ref}`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Serialize`] if serialization fails.
    pub fn encode_alarm(&self, alarm: &Alarm) -> Result<WireMessage, ProtocolError> {
        let topic = topics::reference_topic(topics::ALARM, &self.device_key, &alarm.reference);
        let payload = ReadingPayload {
            utc: alarm.timestamp,
            data: format_bool(alarm.active).to_string(),
        };
        json_message(topic, &payload)
    }

    /// Encodes an actuator status onto `d2p/actuator_status/d/{key}/r/{ref}`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Serialize`] if serialization fails.
    pub fn encode_actuator_status(&self, status: &ActuatorStatus) -> Result<WireMessage, ProtocolError> {
        let topic = topics::reference_topic(topics::ACTUATOR_STATUS, &self.device_key, &status.reference);
        let payload = ActuatorStatusPayload {
            status: status.state.as_str(),
            value: coerce_scalar(&status.value),
        };
        json_message(topic, &payload)
    }

    /// Encodes the full device configuration onto `d2p/configuration_get/d/{key}`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Serialize`] if serialization fails.
    pub fn encode_configuration(
        &self,
        configuration: &BTreeMap<String, Value>,
    ) -> Result<WireMessage, ProtocolError> {
        let topic = topics::device_topic(topics::CONFIGURATION_STATUS, &self.device_key);
        let payload = ConfigurationPayload {
            values: configuration
                .iter()
                .map(|(reference, value)| (reference.clone(), coerce_value(value)))
                .collect(),
        };
        json_message(topic, &payload)
    }

    /// Encodes a firmware status onto `service/status/firmware/{key}`.
    ///
    /// The `error` key is present only for [`FirmwareStatus::Error`].
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Serialize`] if serialization fails.
    pub fn encode_firmware_status(&self, status: FirmwareStatus) -> Result<WireMessage, ProtocolError> {
        let topic = topics::service_topic(topics::FIRMWARE_STATUS, &self.device_key);
        let payload = FirmwareStatusPayload {
            status: status.as_str(),
            error: status.error().map(|code| code.code()),
        };
        json_message(topic, &payload)
    }

    /// Encodes a firmware chunk request onto `service/binary/request/{key}`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Serialize`] if serialization fails.
    pub fn encode_chunk_request(&self, request: &ChunkRequest) -> Result<WireMessage, ProtocolError> {
        let topic = topics::service_topic(topics::CHUNK_REQUEST, &self.device_key);
        let payload = ChunkRequestPayload {
            file_name: &request.file_name,
            chunk_index: request.chunk_index,
            chunk_size: request.chunk_size,
        };
        json_message(topic, &payload)
    }

    /// Keep-alive ping on `ping/{key}` with no payload.
    pub fn encode_keep_alive(&self) -> WireMessage {
        WireMessage::empty(topics::service_topic(topics::KEEP_ALIVE, &self.device_key))
    }

    /// Last-will message on `lastwill/{key}` with no payload, for transports
    /// that register one with the broker.
    pub fn encode_last_will(&self) -> WireMessage {
        WireMessage::empty(topics::service_topic(topics::LAST_WILL, &self.device_key))
    }

    // ── Inbound ───────────────────────────────────────────────────────────────

    /// Topics the transport must subscribe to for `device`.
    pub fn inbound_topics(&self, device: &Device) -> Vec<String> {
        let mut subscriptions = vec![
            topics::service_topic(topics::KEEP_ALIVE_RESPONSE, &self.device_key),
            topics::device_topic(topics::CONFIGURATION_SET, &self.device_key),
            topics::service_topic(topics::FIRMWARE_COMMAND, &self.device_key),
            topics::service_topic(topics::FIRMWARE_BINARY, &self.device_key),
        ];
        subscriptions.extend(
            device
                .actuator_references()
                .map(|reference| topics::reference_topic(topics::ACTUATOR_SET, &self.device_key, reference)),
        );
        subscriptions
    }

    /// Classifies an inbound topic; `None` for topics this device does not handle.
    pub fn classify(&self, topic: &str) -> Option<InboundKind> {
        topics::classify(topic, &self.device_key)
    }

    /// Decodes an actuator command.  The reference is the last topic segment.
    ///
    /// An unknown or missing `command` yields [`ActuatorCommandType::Unknown`].
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError`] if the topic has no reference or the payload
    /// is missing or not a JSON object.
    pub fn decode_actuator_command(&self, msg: &WireMessage) -> Result<ActuatorCommand, ProtocolError> {
        let reference = topics::actuator_reference(msg.topic(), &self.device_key)
            .ok_or_else(|| ProtocolError::MissingReference(msg.topic().to_string()))?
            .to_string();
        let payload: ActuatorCommandPayload = parse_json(msg)?;
        Ok(ActuatorCommand {
            reference,
            command: ActuatorCommandType::from(command_name(payload.command.as_ref())),
            value: payload.value.and_then(scalar_from_json),
        })
    }

    /// Decodes a configuration command, inferring each value independently.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError`] if the payload is missing or malformed.
    pub fn decode_configuration_command(
        &self,
        msg: &WireMessage,
    ) -> Result<ConfigurationCommand, ProtocolError> {
        let payload: ConfigurationCommandPayload = parse_json(msg)?;
        let values = payload
            .values
            .into_iter()
            .filter_map(|(reference, raw)| scalar_from_json(raw).map(|v| (reference, Value::from(v))))
            .collect();
        Ok(ConfigurationCommand {
            command: ConfigurationCommandType::from(command_name(payload.command.as_ref())),
            values,
        })
    }

    /// Decodes a firmware command.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError`] if the payload is missing or malformed.
    pub fn decode_firmware_command(&self, msg: &WireMessage) -> Result<FirmwareCommand, ProtocolError> {
        let payload: FirmwareCommandPayload = parse_json(msg)?;
        Ok(FirmwareCommand {
            command: FirmwareCommandType::from(command_name(payload.command.as_ref())),
            file_name: payload.file_name,
            file_size: payload.file_size,
            file_hash: payload.file_hash,
            auto_install: payload.auto_install.unwrap_or(false),
            file_url: payload.file_url,
        })
    }

    /// Splits a binary chunk frame into its digests and data, byte for byte.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError`] if the payload is missing or shorter than
    /// two digests.
    pub fn decode_firmware_chunk(&self, msg: &WireMessage) -> Result<FirmwarePacket, ProtocolError> {
        let bytes = msg
            .payload_bytes()
            .ok_or_else(|| ProtocolError::MissingPayload(msg.topic().to_string()))?;
        let needed = 2 * HASH_SIZE;
        if bytes.len() < needed {
            return Err(ProtocolError::TruncatedChunk {
                needed,
                available: bytes.len(),
            });
        }
        let (previous_hash, rest) = bytes.split_at(HASH_SIZE);
        let (data, current_hash) = rest.split_at(rest.len() - HASH_SIZE);
        Ok(FirmwarePacket {
            previous_hash: previous_hash.to_vec(),
            data: data.to_vec(),
            current_hash: current_hash.to_vec(),
        })
    }

    /// Extracts the platform timestamp (epoch milliseconds) from a pong.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError`] if the payload is missing or malformed.
    pub fn decode_keep_alive_response(&self, msg: &WireMessage) -> Result<Option<u64>, ProtocolError> {
        let payload: KeepAliveResponsePayload = parse_json(msg)?;
        Ok(payload.value)
    }
}

// ── Value coercion (outbound) ─────────────────────────────────────────────────

/// Converts a value to its wire string.
///
/// Booleans become `"true"`/`"false"`, carriage returns are stripped from
/// strings, and tuples are joined with [`TUPLE_DELIMITER`] after coercing
/// each element.  Newlines and quotes are left as-is here: the JSON writer
/// escapes them to `\n` and `\"`, so they are escaped exactly once.
pub fn coerce_value(value: &Value) -> String {
    match value {
        Value::Int(v) => v.to_string(),
        Value::Float(v) => format_float(*v),
        Value::Bool(v) => format_bool(*v).to_string(),
        Value::Str(s) => strip_carriage_returns(s),
        Value::Tuple(elements) => elements
            .iter()
            .map(coerce_scalar)
            .collect::<Vec<_>>()
            .join(TUPLE_DELIMITER),
    }
}

/// Scalar counterpart of [`coerce_value`].
pub fn coerce_scalar(scalar: &Scalar) -> String {
    match scalar {
        Scalar::Int(v) => v.to_string(),
        Scalar::Float(v) => format_float(*v),
        Scalar::Bool(v) => format_bool(*v).to_string(),
        Scalar::Str(s) => strip_carriage_returns(s),
    }
}

fn format_bool(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

/// Integral floats keep a trailing `.0` so they stay floats on the platform.
fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

fn strip_carriage_returns(s: &str) -> String {
    s.replace('\r', "")
}

// ── Value inference (inbound) ─────────────────────────────────────────────────

/// Infers a typed scalar from a wire string.
///
/// Order: integer, finite float, `"true"`/`"false"`, otherwise a string with
/// the `\n` and `\"` escape sequences restored.
///
/// Integer comes first on every inbound path, actuator values included, so
/// `"1"` is `Int(1)` and its status reply echoes `"1"`.  A connector that
/// parses actuator values float-first answers `"1.0"` for the same command.
///
/// # Examples
///
/// ```rust
/// use devlink_core::protocol::codec::infer_scalar;
/// use devlink_core::Scalar;
///
/// assert_eq!(infer_scalar("42"), Scalar::Int(42));
/// assert_eq!(infer_scalar("0.5"), Scalar::Float(0.5));
/// assert_eq!(infer_scalar("true"), Scalar::Bool(true));
/// assert_eq!(infer_scalar("INFO"), Scalar::Str("INFO".to_string()));
/// ```
pub fn infer_scalar(raw: &str) -> Scalar {
    if let Ok(v) = raw.parse::<i64>() {
        return Scalar::Int(v);
    }
    if let Ok(v) = raw.parse::<f64>() {
        if v.is_finite() {
            return Scalar::Float(v);
        }
    }
    match raw {
        "true" => Scalar::Bool(true),
        "false" => Scalar::Bool(false),
        _ => Scalar::Str(unescape(raw)),
    }
}

fn unescape(raw: &str) -> String {
    raw.replace("\\n", "\n").replace('\r', "").replace("\\\"", "\"")
}

/// JSON numbers and booleans map directly; strings go through inference.
/// `null` means "no value".
fn scalar_from_json(raw: serde_json::Value) -> Option<Scalar> {
    match raw {
        serde_json::Value::Null => None,
        serde_json::Value::Bool(b) => Some(Scalar::Bool(b)),
        serde_json::Value::Number(n) => n
            .as_i64()
            .map(Scalar::Int)
            .or_else(|| n.as_f64().map(Scalar::Float)),
        serde_json::Value::String(s) => Some(infer_scalar(&s)),
        other => Some(Scalar::Str(other.to_string())),
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn json_message<T: Serialize>(topic: String, payload: &T) -> Result<WireMessage, ProtocolError> {
    match serde_json::to_string(payload) {
        Ok(text) => Ok(WireMessage::text(topic, text)),
        Err(source) => Err(ProtocolError::Serialize { topic, source }),
    }
}

fn parse_json<T: DeserializeOwned>(msg: &WireMessage) -> Result<T, ProtocolError> {
    let bytes = msg
        .payload_bytes()
        .ok_or_else(|| ProtocolError::MissingPayload(msg.topic().to_string()))?;
    serde_json::from_slice(bytes).map_err(|source| ProtocolError::MalformedJson {
        topic: msg.topic().to_string(),
        source,
    })
}

/// Non-string commands read as the empty string, which maps to `Unknown`.
fn command_name(raw: Option<&serde_json::Value>) -> &str {
    raw.and_then(serde_json::Value::as_str).unwrap_or("")
}
