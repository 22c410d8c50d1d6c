//! Connector: the device's single entry point to the platform.
//!
//! Outbound, every domain event is encoded and published straight away; if
//! the transport refuses it the message is stored in the bounded
//! [`OutboundQueue`] and sent by a later [`Connector::publish`] call.
//!
//! Inbound, the transport owner hands each message to
//! [`Connector::handle_inbound_message`], which classifies it by topic and
//! dispatches it:
//!
//! | topic class           | action                                                  |
//! |-----------------------|---------------------------------------------------------|
//! | actuator command      | SET: handler, then status reply. STATUS: status reply   |
//! | configuration command | SET: handler, then configuration reply. CURRENT: reply  |
//! | firmware command      | forwarded to [`FirmwareUpdate`]                         |
//! | firmware binary       | forwarded to [`FirmwareUpdate`]                         |
//! | keep-alive response   | platform timestamp recorded                             |
//!
//! Without the matching collaborators actuator and configuration commands are
//! ignored, while firmware messages are answered with
//! `ERROR(FILE_UPLOAD_DISABLED)`.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use devlink_core::queue::DEFAULT_QUEUE_CAPACITY;
use devlink_core::{
    ActuatorCommandType, ActuatorStatus, Alarm, Codec, ConfigurationCommandType, Device,
    FirmwareErrorCode, FirmwareStatus, InboundKind, OutboundQueue, ProtocolError, SensorReading,
    WireMessage,
};

use crate::application::firmware_update::{FirmwareOutput, FirmwareState, FirmwareUpdate};
use crate::application::ports::{
    ActuationHandler, ActuatorStatusProvider, ConfigurationHandler, ConfigurationProvider,
    FirmwareHandler, KeepAlive, Transport, TransportError, UrlDownloadError,
};

/// Error type for connector operations.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// The device declares actuators but cannot act on or report them.
    #[error("device declares actuators {references:?} but no actuation handler or status provider was supplied")]
    MissingActuatorHandlers { references: Vec<String> },

    /// An inbound message could not be decoded.  The message is dropped.
    #[error("failed to decode inbound message: {0}")]
    Decode(#[source] ProtocolError),

    #[error("failed to encode outbound message: {0}")]
    Encode(#[source] ProtocolError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Synchronises one device with the platform.
///
/// All mutating operations take `&mut self`.  Embeddings that receive
/// messages on several tasks share the connector behind a mutex.
pub struct Connector {
    device: Device,
    codec: Codec,
    queue: OutboundQueue,
    transport: Arc<dyn Transport>,
    actuation_handler: Option<Arc<dyn ActuationHandler>>,
    actuator_status_provider: Option<Arc<dyn ActuatorStatusProvider>>,
    configuration_handler: Option<Arc<dyn ConfigurationHandler>>,
    configuration_provider: Option<Arc<dyn ConfigurationProvider>>,
    firmware: Option<FirmwareUpdate>,
    keep_alive: Option<Arc<dyn KeepAlive>>,
    request_timestamp: Option<u64>,
}

impl Connector {
    pub fn builder(device: Device, transport: Arc<dyn Transport>) -> ConnectorBuilder {
        ConnectorBuilder::new(device, transport)
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────────

    /// Connects the transport, starts the keep-alive, sends anything queued
    /// while offline, and reports the result of a firmware install that
    /// rebooted the device.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::Transport`] if the transport cannot connect.
    pub fn connect(&mut self) -> Result<(), ConnectorError> {
        self.transport.connect()?;
        info!(device = self.device.key(), "connected to platform");

        if let Some(keep_alive) = &self.keep_alive {
            keep_alive.start();
        }

        let delivered = self.publish();
        if delivered > 0 {
            info!(delivered, "sent messages queued while offline");
        }

        let outputs = self
            .firmware
            .as_mut()
            .map(FirmwareUpdate::report_result)
            .unwrap_or_default();
        self.emit_firmware_outputs(outputs)
    }

    pub fn disconnect(&mut self) {
        if let Some(keep_alive) = &self.keep_alive {
            keep_alive.stop();
        }
        self.transport.disconnect();
        info!(device = self.device.key(), "disconnected from platform");
    }

    // ── Outbound ──────────────────────────────────────────────────────────────

    /// Publishes a sensor reading, or queues it if the transport refuses.
    ///
    /// Messages still queued from an earlier outage are sent first, so the
    /// platform receives events in the order they were added.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::Encode`] if the reading cannot be encoded.
    pub fn add_sensor_reading(&mut self, reading: &SensorReading) -> Result<(), ConnectorError> {
        let message = self
            .codec
            .encode_sensor_reading(reading)
            .map_err(ConnectorError::Encode)?;
        self.publish_or_queue(message);
        Ok(())
    }

    /// Publishes an alarm, or queues it if the transport refuses.  Ordered
    /// behind any backlog like [`Connector::add_sensor_reading`].
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::Encode`] if the alarm cannot be encoded.
    pub fn add_alarm(&mut self, alarm: &Alarm) -> Result<(), ConnectorError> {
        let message = self.codec.encode_alarm(alarm).map_err(ConnectorError::Encode)?;
        self.publish_or_queue(message);
        Ok(())
    }

    /// Sends queued messages oldest first until the queue is empty or the
    /// transport refuses one.  Returns how many were delivered.
    ///
    /// A refused message stays at the head of the queue.
    pub fn publish(&mut self) -> usize {
        let mut delivered = 0;
        while let Some(message) = self.queue.peek_front() {
            if !self.transport.publish(message) {
                debug!(
                    topic = message.topic(),
                    remaining = self.queue.len(),
                    "transport refused queued message, stopping drain"
                );
                break;
            }
            self.queue.pop_front();
            delivered += 1;
        }
        delivered
    }

    /// Reads an actuator through the status provider and publishes its status.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::Encode`] if the status cannot be encoded.
    pub fn publish_actuator_status(&mut self, reference: &str) -> Result<(), ConnectorError> {
        let Some(provider) = self.actuator_status_provider.clone() else {
            debug!(reference, "no actuator status provider, not publishing status");
            return Ok(());
        };
        let (state, value) = provider.actuator_status(reference);
        let message = self
            .codec
            .encode_actuator_status(&ActuatorStatus::new(reference, state, value))
            .map_err(ConnectorError::Encode)?;
        self.publish_or_queue(message);
        Ok(())
    }

    /// Reads the configuration through the provider and publishes all of it.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::Encode`] if the configuration cannot be encoded.
    pub fn publish_configuration(&mut self) -> Result<(), ConnectorError> {
        let Some(provider) = self.configuration_provider.clone() else {
            debug!("no configuration provider, not publishing configuration");
            return Ok(());
        };
        let message = self
            .codec
            .encode_configuration(&provider.configuration())
            .map_err(ConnectorError::Encode)?;
        self.publish_or_queue(message);
        Ok(())
    }

    // ── Inbound ───────────────────────────────────────────────────────────────

    /// Classifies and dispatches one inbound message.
    ///
    /// Topics that are not addressed to this device are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::Decode`] if the payload is malformed; the
    /// message is dropped and no other state changes.
    pub fn handle_inbound_message(&mut self, message: &WireMessage) -> Result<(), ConnectorError> {
        let Some(kind) = self.codec.classify(message.topic()) else {
            debug!(topic = message.topic(), "ignoring message on unrecognised topic");
            return Ok(());
        };
        match kind {
            InboundKind::ActuatorCommand => self.handle_actuator_command(message),
            InboundKind::ConfigurationCommand => self.handle_configuration_command(message),
            InboundKind::FirmwareCommand => self.handle_firmware_command(message),
            InboundKind::FirmwareBinary => self.handle_firmware_binary(message),
            InboundKind::KeepAliveResponse => self.handle_keep_alive_response(message),
        }
    }

    /// Delivers the outcome of a firmware URL download.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::Encode`] if a resulting status cannot be encoded.
    pub fn handle_url_download_result(
        &mut self,
        result: Result<(), UrlDownloadError>,
    ) -> Result<(), ConnectorError> {
        let outputs = self
            .firmware
            .as_mut()
            .map(|firmware| firmware.handle_url_download_result(result))
            .unwrap_or_default();
        self.emit_firmware_outputs(outputs)
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Platform time (epoch milliseconds) from the most recent keep-alive
    /// response, if one has arrived.
    pub fn request_timestamp(&self) -> Option<u64> {
        self.request_timestamp
    }

    /// `None` when firmware updates are not enabled.
    pub fn firmware_state(&self) -> Option<FirmwareState> {
        self.firmware.as_ref().map(FirmwareUpdate::state)
    }

    pub fn firmware_version(&self) -> Option<String> {
        self.firmware.as_ref().map(FirmwareUpdate::version)
    }

    pub fn queued_messages(&self) -> usize {
        self.queue.len()
    }

    /// Topics the transport must subscribe to.
    pub fn inbound_topics(&self) -> Vec<String> {
        self.codec.inbound_topics(&self.device)
    }

    /// Message for transports that register a last will with the broker.
    pub fn last_will(&self) -> WireMessage {
        self.codec.encode_last_will()
    }

    // ── Dispatch ──────────────────────────────────────────────────────────────

    fn handle_actuator_command(&mut self, message: &WireMessage) -> Result<(), ConnectorError> {
        let (Some(handler), Some(_)) = (
            self.actuation_handler.clone(),
            self.actuator_status_provider.as_ref(),
        ) else {
            debug!(topic = message.topic(), "actuation not configured, ignoring command");
            return Ok(());
        };
        let command = self
            .codec
            .decode_actuator_command(message)
            .map_err(|e| decode_failed(message, e))?;

        if !self.device.has_actuator(&command.reference) {
            debug!(reference = %command.reference, "command for undeclared actuator, ignoring");
            return Ok(());
        }

        match command.command {
            ActuatorCommandType::Set => {
                match &command.value {
                    Some(value) => {
                        debug!(reference = %command.reference, ?value, "actuating");
                        handler.handle_actuation(&command.reference, value);
                    }
                    None => warn!(reference = %command.reference, "SET without a value, reporting status only"),
                }
                self.publish_actuator_status(&command.reference)
            }
            ActuatorCommandType::Status => self.publish_actuator_status(&command.reference),
            ActuatorCommandType::Unknown => {
                debug!(reference = %command.reference, "unknown actuator command, ignoring");
                Ok(())
            }
        }
    }

    fn handle_configuration_command(&mut self, message: &WireMessage) -> Result<(), ConnectorError> {
        let (Some(handler), Some(_)) = (
            self.configuration_handler.clone(),
            self.configuration_provider.as_ref(),
        ) else {
            debug!("configuration not supported, ignoring command");
            return Ok(());
        };
        let command = self
            .codec
            .decode_configuration_command(message)
            .map_err(|e| decode_failed(message, e))?;

        match command.command {
            ConfigurationCommandType::Set => {
                debug!(entries = command.values.len(), "applying configuration");
                handler.handle_configuration(&command.values);
                self.publish_configuration()
            }
            ConfigurationCommandType::Current => self.publish_configuration(),
            ConfigurationCommandType::Unknown => {
                debug!("unknown configuration command, ignoring");
                Ok(())
            }
        }
    }

    fn handle_firmware_command(&mut self, message: &WireMessage) -> Result<(), ConnectorError> {
        if self.firmware.is_none() {
            return self.report_firmware_disabled();
        }
        let command = self
            .codec
            .decode_firmware_command(message)
            .map_err(|e| decode_failed(message, e))?;
        let outputs = self
            .firmware
            .as_mut()
            .map(|firmware| firmware.handle_command(&command))
            .unwrap_or_default();
        self.emit_firmware_outputs(outputs)
    }

    fn handle_firmware_binary(&mut self, message: &WireMessage) -> Result<(), ConnectorError> {
        if self.firmware.is_none() {
            return self.report_firmware_disabled();
        }
        let packet = self
            .codec
            .decode_firmware_chunk(message)
            .map_err(|e| decode_failed(message, e))?;
        let outputs = self
            .firmware
            .as_mut()
            .map(|firmware| firmware.handle_packet(&packet))
            .unwrap_or_default();
        self.emit_firmware_outputs(outputs)
    }

    fn handle_keep_alive_response(&mut self, message: &WireMessage) -> Result<(), ConnectorError> {
        let timestamp = self
            .codec
            .decode_keep_alive_response(message)
            .map_err(|e| decode_failed(message, e))?;
        if let Some(timestamp) = timestamp {
            debug!(timestamp, "platform timestamp updated");
            self.request_timestamp = Some(timestamp);
        }
        Ok(())
    }

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn report_firmware_disabled(&mut self) -> Result<(), ConnectorError> {
        debug!("firmware update not enabled, reporting FILE_UPLOAD_DISABLED");
        let message = self
            .codec
            .encode_firmware_status(FirmwareStatus::Error(FirmwareErrorCode::FileUploadDisabled))
            .map_err(ConnectorError::Encode)?;
        self.publish_or_queue(message);
        Ok(())
    }

    fn emit_firmware_outputs(&mut self, outputs: Vec<FirmwareOutput>) -> Result<(), ConnectorError> {
        for output in outputs {
            let message = match output {
                FirmwareOutput::Status(status) => self.codec.encode_firmware_status(status),
                FirmwareOutput::RequestChunk(request) => self.codec.encode_chunk_request(&request),
            }
            .map_err(ConnectorError::Encode)?;
            self.publish_or_queue(message);
        }
        Ok(())
    }

    /// Publishes `message` once any backlog has been sent; otherwise the
    /// message joins the back of the queue.
    fn publish_or_queue(&mut self, message: WireMessage) {
        if !self.queue.is_empty() {
            self.publish();
        }
        if self.queue.is_empty() && self.transport.publish(&message) {
            return;
        }
        debug!(topic = message.topic(), "publish refused, queueing");
        self.queue.enqueue(message);
    }
}

fn decode_failed(message: &WireMessage, error: ProtocolError) -> ConnectorError {
    warn!(topic = message.topic(), "dropping inbound message: {error}");
    ConnectorError::Decode(error)
}

// ── Builder ───────────────────────────────────────────────────────────────────

/// Assembles a [`Connector`] from a device, a transport, and whichever
/// optional collaborators the device supports.
pub struct ConnectorBuilder {
    device: Device,
    transport: Arc<dyn Transport>,
    actuation_handler: Option<Arc<dyn ActuationHandler>>,
    actuator_status_provider: Option<Arc<dyn ActuatorStatusProvider>>,
    configuration_handler: Option<Arc<dyn ConfigurationHandler>>,
    configuration_provider: Option<Arc<dyn ConfigurationProvider>>,
    firmware_handler: Option<Box<dyn FirmwareHandler>>,
    keep_alive: Option<Arc<dyn KeepAlive>>,
    queue_capacity: usize,
}

impl ConnectorBuilder {
    pub fn new(device: Device, transport: Arc<dyn Transport>) -> Self {
        Self {
            device,
            transport,
            actuation_handler: None,
            actuator_status_provider: None,
            configuration_handler: None,
            configuration_provider: None,
            firmware_handler: None,
            keep_alive: None,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }

    pub fn actuation_handler(mut self, handler: Arc<dyn ActuationHandler>) -> Self {
        self.actuation_handler = Some(handler);
        self
    }

    pub fn actuator_status_provider(mut self, provider: Arc<dyn ActuatorStatusProvider>) -> Self {
        self.actuator_status_provider = Some(provider);
        self
    }

    pub fn configuration_handler(mut self, handler: Arc<dyn ConfigurationHandler>) -> Self {
        self.configuration_handler = Some(handler);
        self
    }

    pub fn configuration_provider(mut self, provider: Arc<dyn ConfigurationProvider>) -> Self {
        self.configuration_provider = Some(provider);
        self
    }

    /// Enables firmware updates.
    pub fn firmware_handler(mut self, handler: Box<dyn FirmwareHandler>) -> Self {
        self.firmware_handler = Some(handler);
        self
    }

    pub fn keep_alive(mut self, keep_alive: Arc<dyn KeepAlive>) -> Self {
        self.keep_alive = Some(keep_alive);
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// # Errors
    ///
    /// Returns [`ConnectorError::MissingActuatorHandlers`] if the device
    /// declares actuators but the actuation handler or the status provider
    /// is missing.
    pub fn build(self) -> Result<Connector, ConnectorError> {
        if self.device.has_actuators()
            && (self.actuation_handler.is_none() || self.actuator_status_provider.is_none())
        {
            return Err(ConnectorError::MissingActuatorHandlers {
                references: self.device.actuator_references().map(str::to_string).collect(),
            });
        }

        Ok(Connector {
            codec: Codec::for_device(&self.device),
            device: self.device,
            queue: OutboundQueue::new(self.queue_capacity),
            transport: self.transport,
            actuation_handler: self.actuation_handler,
            actuator_status_provider: self.actuator_status_provider,
            configuration_handler: self.configuration_handler,
            configuration_provider: self.configuration_provider,
            firmware: self.firmware_handler.map(FirmwareUpdate::new),
            keep_alive: self.keep_alive,
            request_timestamp: None,
        })
    }
}
