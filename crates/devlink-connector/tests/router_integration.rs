//! Integration tests for the connector: store-and-forward delivery and the
//! inbound command router, driven through the in-memory transport and the
//! simulated device collaborators.

use std::collections::BTreeMap;
use std::sync::Arc;

use devlink_connector::application::ports::{Transport, TransportError};
use devlink_connector::infrastructure::simulated::{SimulatedActuators, SimulatedConfiguration};
use devlink_connector::infrastructure::transport::InMemoryTransport;
use devlink_connector::{Connector, ConnectorError};
use devlink_core::{Alarm, Device, Scalar, SensorReading, Value, WireMessage};

/// Connector for a sensor-only device plus a handle on its transport.
fn sensor_connector(queue_capacity: usize) -> (Connector, Arc<InMemoryTransport>) {
    let transport = Arc::new(InMemoryTransport::new());
    let connector = Connector::builder(
        Device::without_actuators("dev1", "secret"),
        Arc::clone(&transport) as Arc<dyn Transport>,
    )
    .queue_capacity(queue_capacity)
    .build()
    .expect("build must succeed");
    (connector, transport)
}

/// Connector for a device with actuators `SW` and `SL` and a configuration.
fn full_connector() -> (Connector, Arc<InMemoryTransport>, Arc<SimulatedActuators>) {
    let transport = Arc::new(InMemoryTransport::new());
    let actuators = Arc::new(SimulatedActuators::new());
    let mut initial = BTreeMap::new();
    initial.insert("HB".to_string(), Value::Int(60));
    let configuration = Arc::new(SimulatedConfiguration::new(initial));
    let mut connector = Connector::builder(
        Device::new("dev1", "secret", ["SW", "SL"]),
        Arc::clone(&transport) as Arc<dyn Transport>,
    )
    .actuation_handler(actuators.clone())
    .actuator_status_provider(actuators.clone())
    .configuration_handler(configuration.clone())
    .configuration_provider(configuration)
    .build()
    .expect("build must succeed");
    connector.connect().expect("connect must succeed");
    (connector, transport, actuators)
}

fn reading(n: i64) -> SensorReading {
    SensorReading::new("T", n).with_timestamp(1_000 + n as u64)
}

fn data_field(message: &WireMessage) -> String {
    let json: serde_json::Value =
        serde_json::from_str(message.payload_text().expect("text payload")).expect("valid JSON");
    json["data"].as_str().expect("data is a string").to_string()
}

// ── Store-and-forward ─────────────────────────────────────────────────────────

#[test]
fn test_offline_readings_drain_in_fifo_order_after_connect() {
    // Arrange
    let (mut connector, transport) = sensor_connector(10);
    for n in 0..3 {
        connector.add_sensor_reading(&reading(n)).expect("add reading");
    }
    assert_eq!(connector.queued_messages(), 3);

    // Act
    connector.connect().expect("connect");

    // Assert
    let published = transport.published();
    let data: Vec<String> = published.iter().map(data_field).collect();
    assert_eq!(data, vec!["0", "1", "2"]);
    assert_eq!(connector.queued_messages(), 0);
}

#[test]
fn test_capacity_plus_one_offline_readings_drop_the_newest() {
    // Arrange
    let capacity = 4;
    let (mut connector, transport) = sensor_connector(capacity);

    // Act
    for n in 0..=capacity as i64 {
        connector.add_sensor_reading(&reading(n)).expect("add reading");
    }
    connector.connect().expect("connect");

    // Assert
    let data: Vec<String> = transport.published().iter().map(data_field).collect();
    assert_eq!(data, vec!["0", "1", "2", "3"]);
}

#[test]
fn test_drain_stops_at_first_refusal_and_resumes_in_order() {
    // Arrange
    let (mut connector, transport) = sensor_connector(10);
    for n in 0..5 {
        connector.add_sensor_reading(&reading(n)).expect("add reading");
    }
    transport.connect().expect("connect");
    transport.set_publish_budget(Some(2));

    // Act
    let first = connector.publish();
    transport.set_publish_budget(None);
    let second = connector.publish();

    // Assert
    assert_eq!((first, second), (2, 3));
    let data: Vec<String> = transport.published().iter().map(data_field).collect();
    assert_eq!(data, vec!["0", "1", "2", "3", "4"]);
}

#[test]
fn test_online_event_bypasses_queue() {
    let (mut connector, transport) = sensor_connector(10);
    connector.connect().expect("connect");

    connector.add_alarm(&Alarm::new("HH", true)).expect("add alarm");

    assert_eq!(connector.queued_messages(), 0);
    assert_eq!(transport.published_topics(), vec!["d2p/events/d/dev1/r/HH"]);
}

#[test]
fn test_event_after_outage_is_delivered_behind_backlog() {
    // Arrange
    let (mut connector, transport) = sensor_connector(10);
    connector.connect().expect("connect");
    transport.set_offline(true);
    for n in 0..2 {
        connector.add_sensor_reading(&reading(n)).expect("add reading");
    }
    transport.set_offline(false);

    // Act
    connector.add_sensor_reading(&reading(2)).expect("add reading");

    // Assert
    let data: Vec<String> = transport.published().iter().map(data_field).collect();
    assert_eq!(data, vec!["0", "1", "2"]);
    assert_eq!(connector.queued_messages(), 0);
}

#[test]
fn test_connect_while_link_down_is_unavailable() {
    let (mut connector, transport) = sensor_connector(10);
    connector.add_sensor_reading(&reading(1)).expect("add reading");
    transport.set_offline(true);

    let result = connector.connect();

    assert!(matches!(
        result,
        Err(ConnectorError::Transport(TransportError::Unavailable(_)))
    ));
    assert_eq!(connector.queued_messages(), 1);
}

#[test]
fn test_publish_on_empty_queue_delivers_nothing() {
    let (mut connector, _transport) = sensor_connector(10);

    assert_eq!(connector.publish(), 0);
}

#[test]
fn test_refused_connect_keeps_queue() {
    let (mut connector, transport) = sensor_connector(10);
    connector.add_sensor_reading(&reading(1)).expect("add reading");
    transport.set_refuse_connect(true);

    let result = connector.connect();

    assert!(matches!(result, Err(ConnectorError::Transport(_))));
    assert_eq!(connector.queued_messages(), 1);
}

// ── Inbound routing ───────────────────────────────────────────────────────────

#[test]
fn test_switch_set_true_invokes_handler_once_and_publishes_one_status() {
    // Arrange
    let (mut connector, transport, actuators) = full_connector();
    let command = WireMessage::text(
        "p2d/actuator_set/d/dev1/r/SW",
        r#"{"command":"SET","value":"true"}"#,
    );

    // Act
    connector.handle_inbound_message(&command).expect("dispatch");

    // Assert
    assert_eq!(actuators.actuations(), vec![("SW".to_string(), Scalar::Bool(true))]);
    let published = transport.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].topic(), "d2p/actuator_status/d/dev1/r/SW");
    assert_eq!(
        published[0].payload_text(),
        Some(r#"{"status":"READY","value":"true"}"#)
    );
}

#[test]
fn test_status_command_reports_without_actuating() {
    let (mut connector, transport, actuators) = full_connector();

    connector
        .handle_inbound_message(&WireMessage::text(
            "p2d/actuator_set/d/dev1/r/SL",
            r#"{"command":"STATUS"}"#,
        ))
        .expect("dispatch");

    assert!(actuators.actuations().is_empty());
    assert_eq!(transport.published_topics(), vec!["d2p/actuator_status/d/dev1/r/SL"]);
}

#[test]
fn test_command_for_undeclared_actuator_is_ignored() {
    let (mut connector, transport, actuators) = full_connector();
    let topic = "p2d/actuator_set/d/dev1/r/XX";

    connector
        .handle_inbound_message(&WireMessage::text(topic, r#"{"command":"SET","value":"1"}"#))
        .expect("dispatch");

    assert!(actuators.actuations().is_empty());
    assert!(transport.published().is_empty());
}

#[test]
fn test_configuration_set_then_current_reports_merged_values() {
    // Arrange
    let (mut connector, transport, _) = full_connector();

    // Act
    connector
        .handle_inbound_message(&WireMessage::text(
            "p2d/configuration_set/d/dev1",
            r#"{"command":"SET","values":{"LL":"DEBUG"}}"#,
        ))
        .expect("dispatch");

    // Assert
    let published = transport.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].topic(), "d2p/configuration_get/d/dev1");
    assert_eq!(
        published[0].payload_text(),
        Some(r#"{"values":{"HB":"60","LL":"DEBUG"}}"#)
    );
}

#[test]
fn test_command_with_nested_reference_is_ignored() {
    let (mut connector, transport, actuators) = full_connector();

    connector
        .handle_inbound_message(&WireMessage::text(
            "p2d/actuator_set/d/dev1/r/SW/extra",
            r#"{"command":"SET","value":"true"}"#,
        ))
        .expect("dispatch");

    assert!(actuators.actuations().is_empty());
    assert!(transport.published().is_empty());
}

#[test]
fn test_decode_failure_leaves_state_untouched() {
    let (mut connector, transport, actuators) = full_connector();
    transport.set_offline(true);
    connector.add_sensor_reading(&reading(1)).expect("add reading");

    let result = connector.handle_inbound_message(&WireMessage::text(
        "p2d/actuator_set/d/dev1/r/SW",
        "not json",
    ));

    assert!(matches!(result, Err(ConnectorError::Decode(_))));
    assert!(actuators.actuations().is_empty());
    assert_eq!(connector.queued_messages(), 1);
}

#[test]
fn test_actuator_device_without_handlers_fails_to_build() {
    let transport: Arc<dyn Transport> = Arc::new(InMemoryTransport::new());

    let result = Connector::builder(Device::new("dev1", "secret", ["SW"]), transport).build();

    assert!(matches!(
        result,
        Err(ConnectorError::MissingActuatorHandlers { .. })
    ));
}

#[test]
fn test_subscriptions_cover_each_actuator() {
    let (connector, _, _) = full_connector();

    let topics = connector.inbound_topics();

    assert!(topics.contains(&"p2d/actuator_set/d/dev1/r/SW".to_string()));
    assert!(topics.contains(&"p2d/actuator_set/d/dev1/r/SL".to_string()));
    assert!(topics.contains(&"pong/dev1".to_string()));
    assert_eq!(connector.last_will().topic(), "lastwill/dev1");
}
