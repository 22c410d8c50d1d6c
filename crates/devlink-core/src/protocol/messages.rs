//! Wire message type and the JSON payload schemas carried on each topic.
//!
//! The schema structs are private to the codec in spirit: they exist so that
//! field names and optional-field omission are declared once, with serde,
//! instead of being assembled by hand.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ── Wire message ──────────────────────────────────────────────────────────────

/// Body of a wire message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// UTF-8 JSON text.
    Text(String),
    /// Raw bytes (firmware chunks, or JSON delivered undecoded by a transport).
    Binary(Vec<u8>),
}

impl Payload {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Payload::Text(text) => text.as_bytes(),
            Payload::Binary(bytes) => bytes,
        }
    }

    /// Returns the text form, or `None` for binary payloads.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(text) => Some(text),
            Payload::Binary(_) => None,
        }
    }
}

/// The transport-level unit: a topic and an optional payload.
///
/// Keep-alive pings and last-will messages carry no payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireMessage {
    topic: String,
    payload: Option<Payload>,
}

impl WireMessage {
    /// Creates a message.  `topic` must be non-empty.
    pub fn new(topic: impl Into<String>, payload: Option<Payload>) -> Self {
        let topic = topic.into();
        debug_assert!(!topic.is_empty(), "wire message topic must not be empty");
        Self { topic, payload }
    }

    pub fn text(topic: impl Into<String>, payload: impl Into<String>) -> Self {
        Self::new(topic, Some(Payload::Text(payload.into())))
    }

    pub fn binary(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self::new(topic, Some(Payload::Binary(payload.into())))
    }

    pub fn empty(topic: impl Into<String>) -> Self {
        Self::new(topic, None)
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }

    /// Payload bytes regardless of payload kind.
    pub fn payload_bytes(&self) -> Option<&[u8]> {
        self.payload.as_ref().map(Payload::as_bytes)
    }

    /// Payload text, for text payloads only.
    pub fn payload_text(&self) -> Option<&str> {
        self.payload.as_ref().and_then(Payload::as_text)
    }
}

// ── Outbound payload schemas ──────────────────────────────────────────────────

/// `d2p/sensor_reading` and `d2p/events`.
#[derive(Debug, Serialize)]
pub(crate) struct ReadingPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utc: Option<u64>,
    pub data: String,
}

/// `d2p/actuator_status`.
#[derive(Debug, Serialize)]
pub(crate) struct ActuatorStatusPayload {
    pub status: &'static str,
    pub value: String,
}

/// `d2p/configuration_get`.
#[derive(Debug, Serialize)]
pub(crate) struct ConfigurationPayload {
    pub values: BTreeMap<String, String>,
}

/// `service/status/firmware`.  `error` is omitted, not `null`, when absent.
#[derive(Debug, Serialize)]
pub(crate) struct FirmwareStatusPayload {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<u8>,
}

/// `service/binary/request`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ChunkRequestPayload<'a> {
    pub file_name: &'a str,
    pub chunk_index: u64,
    pub chunk_size: u64,
}

// ── Inbound payload schemas ───────────────────────────────────────────────────

// `command` fields are kept as raw JSON so that a non-string command degrades
// to `Unknown` instead of failing the whole payload.

/// `p2d/actuator_set`.
#[derive(Debug, Deserialize)]
pub(crate) struct ActuatorCommandPayload {
    #[serde(default)]
    pub command: Option<serde_json::Value>,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
}

/// `p2d/configuration_set`.
#[derive(Debug, Deserialize)]
pub(crate) struct ConfigurationCommandPayload {
    #[serde(default)]
    pub command: Option<serde_json::Value>,
    #[serde(default)]
    pub values: BTreeMap<String, serde_json::Value>,
}

/// `service/commands/firmware`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FirmwareCommandPayload {
    #[serde(default)]
    pub command: Option<serde_json::Value>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub file_hash: Option<String>,
    #[serde(default)]
    pub auto_install: Option<bool>,
    #[serde(default)]
    pub file_url: Option<String>,
}

/// `pong`.
#[derive(Debug, Deserialize)]
pub(crate) struct KeepAliveResponsePayload {
    #[serde(default)]
    pub value: Option<u64>,
}
