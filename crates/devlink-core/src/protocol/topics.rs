//! Topic grammar.
//!
//! ```text
//! {prefix}d/{device_key}/r/{reference}   per-reference data
//! {prefix}d/{device_key}                 device-scoped data
//! {prefix}{device_key}                   service topics (firmware, ping)
//! ```
//!
//! Every prefix constant below already ends in `/`.

// ── Outbound (device to platform) ─────────────────────────────────────────────

pub const SENSOR_READING: &str = "d2p/sensor_reading/";
pub const ALARM: &str = "d2p/events/";
pub const ACTUATOR_STATUS: &str = "d2p/actuator_status/";
pub const CONFIGURATION_STATUS: &str = "d2p/configuration_get/";
pub const FIRMWARE_STATUS: &str = "service/status/firmware/";
pub const CHUNK_REQUEST: &str = "service/binary/request/";
pub const KEEP_ALIVE: &str = "ping/";
pub const LAST_WILL: &str = "lastwill/";

// ── Inbound (platform to device) ──────────────────────────────────────────────

pub const ACTUATOR_SET: &str = "p2d/actuator_set/";
pub const CONFIGURATION_SET: &str = "p2d/configuration_set/";
pub const FIRMWARE_COMMAND: &str = "service/commands/firmware/";
pub const FIRMWARE_BINARY: &str = "service/binary/";
pub const KEEP_ALIVE_RESPONSE: &str = "pong/";

const DEVICE_PATH_PREFIX: &str = "d/";
const REFERENCE_PATH_PREFIX: &str = "r/";
const TOPIC_DELIMITER: char = '/';

/// Class of an inbound message, decided from its topic alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundKind {
    ActuatorCommand,
    ConfigurationCommand,
    FirmwareCommand,
    FirmwareBinary,
    KeepAliveResponse,
}

/// `{prefix}d/{key}/r/{reference}`
pub fn reference_topic(prefix: &str, device_key: &str, reference: &str) -> String {
    format!("{prefix}{DEVICE_PATH_PREFIX}{device_key}{TOPIC_DELIMITER}{REFERENCE_PATH_PREFIX}{reference}")
}

/// `{prefix}d/{key}`
pub fn device_topic(prefix: &str, device_key: &str) -> String {
    format!("{prefix}{DEVICE_PATH_PREFIX}{device_key}")
}

/// `{prefix}{key}`
pub fn service_topic(prefix: &str, device_key: &str) -> String {
    format!("{prefix}{device_key}")
}

/// Returns the actuator reference addressed by an actuator-set topic for
/// `device_key`.
///
/// A reference is exactly one non-empty path segment.
pub fn actuator_reference<'a>(topic: &'a str, device_key: &str) -> Option<&'a str> {
    topic
        .strip_prefix(reference_topic(ACTUATOR_SET, device_key, "").as_str())
        .filter(|reference| !reference.is_empty() && !reference.contains(TOPIC_DELIMITER))
}

/// Classifies `topic` for the device identified by `device_key`.
///
/// Topics scoped to a different device, and outbound topics echoed back by a
/// broker, classify as `None`.
pub fn classify(topic: &str, device_key: &str) -> Option<InboundKind> {
    if actuator_reference(topic, device_key).is_some() {
        return Some(InboundKind::ActuatorCommand);
    }
    if topic == device_topic(CONFIGURATION_SET, device_key) {
        return Some(InboundKind::ConfigurationCommand);
    }
    if topic == service_topic(FIRMWARE_COMMAND, device_key) {
        return Some(InboundKind::FirmwareCommand);
    }
    // `service/binary/request/{key}` shares the binary prefix, so only the
    // exact device-scoped topic counts.
    if topic == service_topic(FIRMWARE_BINARY, device_key) {
        return Some(InboundKind::FirmwareBinary);
    }
    if topic == service_topic(KEEP_ALIVE_RESPONSE, device_key) {
        return Some(InboundKind::KeepAliveResponse);
    }
    None
}
