//! Integration tests for the devlink-core codec.
//!
//! These exercise the public API end to end: topics produced by the encoders
//! are classified and decoded again the way a platform echo would be, and the
//! outbound queue is driven with encoded messages.

use std::collections::BTreeMap;

use devlink_core::{
    protocol::codec::{coerce_value, infer_scalar},
    ActuatorCommandType, ActuatorState, ActuatorStatus, Codec, Device, FirmwareErrorCode,
    FirmwareStatus, InboundKind, OutboundQueue, Scalar, SensorReading, Value, WireMessage,
};

fn codec() -> Codec {
    Codec::new("dev1")
}

/// Rewrites an outbound actuator-status topic into the matching inbound
/// actuator-set topic, as the platform does when it addresses the actuator.
fn command_topic_for(status_topic: &str) -> String {
    status_topic.replacen("d2p/actuator_status/", "p2d/actuator_set/", 1)
}

#[test]
fn test_actuator_reference_survives_status_to_command_round_trip() {
    for reference in ["SW", "SL", "relay_2", "x.y"] {
        let status = ActuatorStatus::new(reference, ActuatorState::Ready, 0);
        let outbound = codec().encode_actuator_status(&status).expect("encode must succeed");

        let inbound = WireMessage::text(
            command_topic_for(outbound.topic()),
            r#"{"command":"STATUS"}"#,
        );

        assert_eq!(codec().classify(inbound.topic()), Some(InboundKind::ActuatorCommand));
        let command = codec().decode_actuator_command(&inbound).expect("decode must succeed");
        assert_eq!(command.reference, reference);
        assert_eq!(command.command, ActuatorCommandType::Status);
    }
}

#[test]
fn test_every_subscription_topic_classifies() {
    let device = Device::new("dev1", "secret", ["SW", "SL"]);

    for topic in codec().inbound_topics(&device) {
        assert!(codec().classify(&topic).is_some(), "unclassified: {topic}");
    }
}

#[test]
fn test_outbound_topics_never_classify_as_inbound() {
    let reading = codec()
        .encode_sensor_reading(&SensorReading::new("T", 1))
        .expect("encode must succeed");
    let request = codec()
        .encode_firmware_status(FirmwareStatus::Completed)
        .expect("encode must succeed");

    assert_eq!(codec().classify(reading.topic()), None);
    assert_eq!(codec().classify(request.topic()), None);
    assert_eq!(codec().classify(codec().encode_keep_alive().topic()), None);
}

#[test]
fn test_firmware_error_key_present_only_on_error() {
    let non_error = [
        FirmwareStatus::FileTransfer,
        FirmwareStatus::FileReady,
        FirmwareStatus::Installation,
        FirmwareStatus::Completed,
        FirmwareStatus::Aborted,
    ];
    for status in non_error {
        let msg = codec().encode_firmware_status(status).expect("encode must succeed");
        let json: serde_json::Value =
            serde_json::from_str(msg.payload_text().expect("text")).expect("valid JSON");
        assert!(json.get("error").is_none(), "{status:?} must not carry error");
        assert_eq!(json["status"], status.as_str());
    }

    let msg = codec()
        .encode_firmware_status(FirmwareStatus::Error(FirmwareErrorCode::FileSystemError))
        .expect("encode must succeed");
    let json: serde_json::Value =
        serde_json::from_str(msg.payload_text().expect("text")).expect("valid JSON");
    assert_eq!(json["status"], "ERROR");
    assert_eq!(json["error"], 5);
}

#[test]
fn test_coerced_scalars_infer_back_to_same_variant() {
    for scalar in [
        Scalar::Int(-12),
        Scalar::Float(21.0),
        Scalar::Float(0.125),
        Scalar::Bool(true),
        Scalar::Str("INFO".to_string()),
    ] {
        let wire = coerce_value(&Value::from(scalar.clone()));

        assert_eq!(infer_scalar(&wire), scalar);
    }
}

#[test]
fn test_configuration_values_are_json_strings() {
    let mut configuration = BTreeMap::new();
    configuration.insert("HB".to_string(), Value::Int(30));
    configuration.insert("EN".to_string(), Value::Bool(false));

    let msg = codec()
        .encode_configuration(&configuration)
        .expect("encode must succeed");
    let json: serde_json::Value =
        serde_json::from_str(msg.payload_text().expect("text")).expect("valid JSON");

    assert_eq!(json["values"]["HB"], "30");
    assert_eq!(json["values"]["EN"], "false");
}

#[test]
fn test_queue_buffers_encoded_messages_in_order() {
    let mut queue = OutboundQueue::new(3);
    let topics: Vec<String> = (0..4)
        .map(|n| {
            let msg = codec()
                .encode_sensor_reading(&SensorReading::new(format!("R{n}"), n))
                .expect("encode must succeed");
            let topic = msg.topic().to_string();
            queue.enqueue(msg);
            topic
        })
        .collect();

    let drained: Vec<String> = std::iter::from_fn(|| queue.pop_front())
        .map(|msg| msg.topic().to_string())
        .collect();

    assert_eq!(drained, topics[..3].to_vec());
}
