//! Traits the connector depends on.
//!
//! Everything device- or network-specific reaches the connector through one
//! of these traits, injected at construction time.  Infrastructure provides
//! real implementations; tests inject recording doubles or `mockall` mocks.

use std::collections::BTreeMap;

use devlink_core::{ActuatorState, Scalar, Value, WireMessage};
use thiserror::Error;

// ── Transport ─────────────────────────────────────────────────────────────────

/// Error returned when a transport cannot establish its connection.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection refused: {0}")]
    ConnectionRefused(String),

    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

/// Publish/subscribe connection to the platform.
///
/// `publish` is a single non-blocking attempt.  A `false` return is not an
/// error: the connector queues the message and retries on the next drain.
///
/// Inbound delivery is the transport owner's job: whoever receives a message
/// hands it to [`Connector::handle_inbound_message`].
///
/// [`Connector::handle_inbound_message`]: crate::application::connector::Connector::handle_inbound_message
#[cfg_attr(test, mockall::automock)]
pub trait Transport: Send + Sync {
    fn connect(&self) -> Result<(), TransportError>;

    fn disconnect(&self);

    fn connected(&self) -> bool;

    /// Attempts to publish `message`.  Returns `true` once the message is
    /// handed to the underlying connection.
    fn publish(&self, message: &WireMessage) -> bool;
}

// ── Actuators ─────────────────────────────────────────────────────────────────

/// Applies a new value to an actuator.
///
/// Must return promptly; the connector calls it from the inbound path.
#[cfg_attr(test, mockall::automock)]
pub trait ActuationHandler: Send + Sync {
    fn handle_actuation(&self, reference: &str, value: &Scalar);
}

/// Reads the current state and value of an actuator.
#[cfg_attr(test, mockall::automock)]
pub trait ActuatorStatusProvider: Send + Sync {
    fn actuator_status(&self, reference: &str) -> (ActuatorState, Scalar);
}

// ── Configuration ─────────────────────────────────────────────────────────────

/// Applies configuration values received from the platform.
#[cfg_attr(test, mockall::automock)]
pub trait ConfigurationHandler: Send + Sync {
    fn handle_configuration(&self, values: &BTreeMap<String, Value>);
}

/// Reads the device's full current configuration.
#[cfg_attr(test, mockall::automock)]
pub trait ConfigurationProvider: Send + Sync {
    fn configuration(&self) -> BTreeMap<String, Value>;
}

// ── Firmware ──────────────────────────────────────────────────────────────────

/// Failure reported by a [`FirmwareHandler`] hook.
#[derive(Debug, Error)]
pub enum FirmwareHandlerError {
    /// The handler will not accept this update (busy, insufficient space).
    #[error("update rejected: {0}")]
    Rejected(String),

    /// Reading or writing firmware storage failed.
    #[error("firmware storage error: {0}")]
    Storage(String),

    #[error("installation failed: {0}")]
    Installation(String),
}

/// Outcome of a URL download started by [`FirmwareHandler::download_url`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlDownloadError {
    #[error("malformed URL: {0}")]
    MalformedUrl(String),

    #[error("download could not be stored: {0}")]
    FileSystem(String),
}

/// Device-side storage and installation of firmware images.
///
/// Owned by the firmware update state machine, which calls the hooks in
/// order: `update_start`, `write_chunk` for each verified chunk, then
/// `install`, or `update_abort` at any point after `update_start`.
#[cfg_attr(test, mockall::automock)]
pub trait FirmwareHandler: Send {
    /// Chunk size, in bytes, requested from the platform.
    fn chunk_size(&self) -> u64;

    /// Largest firmware file the device accepts, in bytes.
    fn max_file_size(&self) -> u64;

    /// Version string of the firmware currently running.
    fn firmware_version(&self) -> String;

    /// Prepares storage for a new image of `file_size` bytes.
    fn update_start(&mut self, file_name: &str, file_size: u64) -> Result<(), FirmwareHandlerError>;

    /// Appends one verified chunk to the image being received.
    fn write_chunk(&mut self, data: &[u8]) -> Result<(), FirmwareHandlerError>;

    /// Installs the received image.  May not return if the device reboots.
    fn install(&mut self) -> Result<(), FirmwareHandlerError>;

    /// Discards any partially received image.
    fn update_abort(&mut self);

    /// Starts downloading the image from `url`.
    ///
    /// Returning `Ok` means the download is under way; its outcome is
    /// delivered later through
    /// [`Connector::handle_url_download_result`](crate::application::connector::Connector::handle_url_download_result).
    fn download_url(&mut self, url: &str) -> Result<(), FirmwareHandlerError>;

    /// Stores `version` so that an install interrupted by a reboot can be
    /// reported after the next connect.
    fn persist_version(&mut self, version: &str);

    fn persisted_version(&self) -> Option<String>;

    fn unpersist_version(&mut self);
}

// ── Keep-alive ────────────────────────────────────────────────────────────────

/// Periodic ping that keeps an idle connection open.
#[cfg_attr(test, mockall::automock)]
pub trait KeepAlive: Send + Sync {
    fn start(&self);

    fn stop(&self);
}
