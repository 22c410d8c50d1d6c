//! Firmware update state machine.
//!
//! ```text
//!            FILE_UPLOAD                    last chunk
//!   Idle ───────────────▶ FileTransfer ─────────────────▶ FileReady
//!     │                                                    ▲   │
//!     │ URL_DOWNLOAD                    download result Ok │   │ INSTALL
//!     └──────────────────▶ UrlDownload ────────────────────┘   ▼
//!                                                         Installation
//!                                                              │
//!                                      COMPLETED / ERROR ◀─────┘
//! ```
//!
//! Every terminal outcome (COMPLETED, ABORTED, ERROR) returns the machine to
//! [`FirmwareState::Idle`] so that the next command starts a fresh session.
//!
//! The machine performs no I/O of its own.  Each input returns the list of
//! [`FirmwareOutput`]s the connector must publish, in order.

use sha2::{Digest, Sha256};
use tracing::{debug, error, info, warn};

use devlink_core::domain::firmware::HASH_SIZE;
use devlink_core::{
    ChunkRequest, FirmwareCommand, FirmwareCommandType, FirmwareErrorCode, FirmwarePacket,
    FirmwareStatus,
};

use crate::application::ports::{FirmwareHandler, UrlDownloadError};

/// Times a chunk whose data does not match its digest is requested again
/// before the transfer fails.
pub const MAX_CHUNK_RETRIES: u32 = 3;

/// Internal state of the update session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirmwareState {
    Idle,
    /// Receiving chunks over `service/binary`.
    FileTransfer,
    /// Waiting for the handler's URL download to finish.
    UrlDownload,
    FileReady,
    Installation,
}

/// An effect the connector must carry out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FirmwareOutput {
    Status(FirmwareStatus),
    RequestChunk(ChunkRequest),
}

/// Book-keeping for an in-progress chunked transfer.
struct Transfer {
    file_name: String,
    file_size: u64,
    expected_file_hash: Option<Vec<u8>>,
    chunk_size: u64,
    next_index: u64,
    received: u64,
    last_hash: Vec<u8>,
    retries: u32,
    file_hasher: Sha256,
}

impl Transfer {
    fn chunk_request(&self) -> ChunkRequest {
        ChunkRequest {
            file_name: self.file_name.clone(),
            chunk_index: self.next_index,
            chunk_size: self.chunk_size,
        }
    }

    fn accept(&mut self, packet: &FirmwarePacket) {
        self.file_hasher.update(&packet.data);
        self.received += packet.data.len() as u64;
        self.last_hash = packet.current_hash.clone();
        self.next_index += 1;
        self.retries = 0;
    }

    fn is_complete(&self) -> bool {
        self.received >= self.file_size
    }
}

/// Drives one device's firmware updates through a [`FirmwareHandler`].
pub struct FirmwareUpdate {
    handler: Box<dyn FirmwareHandler>,
    state: FirmwareState,
    transfer: Option<Transfer>,
    auto_install: bool,
}

impl FirmwareUpdate {
    pub fn new(handler: Box<dyn FirmwareHandler>) -> Self {
        Self {
            handler,
            state: FirmwareState::Idle,
            transfer: None,
            auto_install: false,
        }
    }

    pub fn state(&self) -> FirmwareState {
        self.state
    }

    /// Version of the firmware currently running, as reported by the handler.
    pub fn version(&self) -> String {
        self.handler.firmware_version()
    }

    /// Handles a decoded `service/commands/firmware` message.
    ///
    /// Commands that do not fit the current state are ignored.
    pub fn handle_command(&mut self, command: &FirmwareCommand) -> Vec<FirmwareOutput> {
        match (self.state, command.command) {
            (FirmwareState::Idle, FirmwareCommandType::Abort) => {
                debug!("abort received with no update in progress, ignoring");
                Vec::new()
            }
            (_, FirmwareCommandType::Abort) => self.abort(),
            (FirmwareState::Idle, FirmwareCommandType::FileUpload) => self.start_file_upload(command),
            (FirmwareState::Idle, FirmwareCommandType::UrlDownload) => self.start_url_download(command),
            (FirmwareState::FileReady, FirmwareCommandType::Install) => self.install(),
            (state, kind) => {
                warn!(?state, command = ?kind, "firmware command does not fit current state, ignoring");
                Vec::new()
            }
        }
    }

    /// Handles one chunk received on `service/binary`.
    pub fn handle_packet(&mut self, packet: &FirmwarePacket) -> Vec<FirmwareOutput> {
        if self.state != FirmwareState::FileTransfer {
            debug!(state = ?self.state, "firmware chunk outside of a file transfer, ignoring");
            return Vec::new();
        }
        let Some(mut transfer) = self.transfer.take() else {
            return self.fail(FirmwareErrorCode::Unspecified);
        };

        if packet.previous_hash != transfer.last_hash {
            error!(
                file = %transfer.file_name,
                chunk = transfer.next_index,
                "chunk does not continue the hash chain, aborting transfer"
            );
            return self.fail_transfer(FirmwareErrorCode::FileSystemError);
        }

        if Sha256::digest(&packet.data).as_slice() != packet.current_hash.as_slice() {
            if transfer.retries >= MAX_CHUNK_RETRIES {
                error!(
                    file = %transfer.file_name,
                    chunk = transfer.next_index,
                    "chunk digest mismatch, retries exhausted"
                );
                return self.fail_transfer(FirmwareErrorCode::RetryCountExceeded);
            }
            transfer.retries += 1;
            warn!(
                chunk = transfer.next_index,
                attempt = transfer.retries,
                "chunk digest mismatch, requesting again"
            );
            let request = transfer.chunk_request();
            self.transfer = Some(transfer);
            return vec![FirmwareOutput::RequestChunk(request)];
        }

        if let Err(e) = self.handler.write_chunk(&packet.data) {
            error!(chunk = transfer.next_index, "failed to store chunk: {e}");
            return self.fail_transfer(FirmwareErrorCode::FileSystemError);
        }
        transfer.accept(packet);

        if !transfer.is_complete() {
            let request = transfer.chunk_request();
            self.transfer = Some(transfer);
            return vec![FirmwareOutput::RequestChunk(request)];
        }
        self.finish_transfer(transfer)
    }

    /// Completes a URL download started by a `URL_DOWNLOAD` command.
    pub fn handle_url_download_result(
        &mut self,
        result: Result<(), UrlDownloadError>,
    ) -> Vec<FirmwareOutput> {
        if self.state != FirmwareState::UrlDownload {
            debug!(state = ?self.state, "URL download result with no download pending, ignoring");
            return Vec::new();
        }
        match result {
            Ok(()) => {
                info!("firmware download complete");
                self.file_ready()
            }
            Err(UrlDownloadError::MalformedUrl(url)) => {
                warn!(%url, "firmware download failed: malformed URL");
                self.fail(FirmwareErrorCode::MalformedUrl)
            }
            Err(UrlDownloadError::FileSystem(reason)) => {
                warn!(%reason, "firmware download could not be stored");
                self.fail(FirmwareErrorCode::FileSystemError)
            }
        }
    }

    /// Reports the outcome of an installation that rebooted the device.
    ///
    /// Called after every connect.  If a version was persisted before
    /// installing, a different running version means the new image booted.
    pub fn report_result(&mut self) -> Vec<FirmwareOutput> {
        let Some(previous) = self.handler.persisted_version() else {
            return Vec::new();
        };
        let current = self.handler.firmware_version();
        self.handler.unpersist_version();

        if current != previous {
            info!(%previous, %current, "firmware update completed");
            vec![FirmwareOutput::Status(FirmwareStatus::Completed)]
        } else {
            warn!(version = %current, "device still runs the previous firmware");
            vec![FirmwareOutput::Status(FirmwareStatus::Error(
                FirmwareErrorCode::InstallationFailed,
            ))]
        }
    }

    // ── Transitions ───────────────────────────────────────────────────────────

    fn start_file_upload(&mut self, command: &FirmwareCommand) -> Vec<FirmwareOutput> {
        let (Some(file_name), Some(file_size)) = (command.file_name.as_deref(), command.file_size) else {
            warn!("file upload command without file name or size");
            return self.fail(FirmwareErrorCode::Unspecified);
        };

        let max_file_size = self.handler.max_file_size();
        if file_size == 0 || file_size > max_file_size {
            warn!(file_size, max_file_size, "unsupported firmware file size");
            return self.fail(FirmwareErrorCode::UnsupportedFileSize);
        }

        let expected_file_hash = match command.file_hash.as_deref().map(hex::decode) {
            None => None,
            Some(Ok(hash)) if hash.len() == HASH_SIZE => Some(hash),
            Some(_) => {
                warn!("file upload command carries an invalid file hash");
                return self.fail(FirmwareErrorCode::Unspecified);
            }
        };

        if let Err(e) = self.handler.update_start(file_name, file_size) {
            warn!("firmware handler refused the update: {e}");
            return self.fail(FirmwareErrorCode::FileSystemError);
        }

        let transfer = Transfer {
            file_name: file_name.to_string(),
            file_size,
            expected_file_hash,
            chunk_size: self.handler.chunk_size().max(1),
            next_index: 0,
            received: 0,
            last_hash: vec![0u8; HASH_SIZE],
            retries: 0,
            file_hasher: Sha256::new(),
        };
        info!(file = file_name, file_size, "firmware file transfer started");

        let request = transfer.chunk_request();
        self.state = FirmwareState::FileTransfer;
        self.transfer = Some(transfer);
        self.auto_install = command.auto_install;
        vec![
            FirmwareOutput::Status(FirmwareStatus::FileTransfer),
            FirmwareOutput::RequestChunk(request),
        ]
    }

    fn start_url_download(&mut self, command: &FirmwareCommand) -> Vec<FirmwareOutput> {
        let Some(url) = command.file_url.as_deref().filter(|url| !url.is_empty()) else {
            warn!("URL download command without a URL");
            return self.fail(FirmwareErrorCode::MalformedUrl);
        };
        if let Err(e) = self.handler.download_url(url) {
            warn!(%url, "firmware handler refused the download: {e}");
            return self.fail(FirmwareErrorCode::MalformedUrl);
        }
        info!(%url, "firmware download started");
        self.state = FirmwareState::UrlDownload;
        self.auto_install = command.auto_install;
        vec![FirmwareOutput::Status(FirmwareStatus::FileTransfer)]
    }

    fn finish_transfer(&mut self, transfer: Transfer) -> Vec<FirmwareOutput> {
        let digest = transfer.file_hasher.finalize();
        if let Some(expected) = &transfer.expected_file_hash {
            if digest.as_slice() != expected.as_slice() {
                error!(file = %transfer.file_name, "received file does not match its hash");
                return self.fail_transfer(FirmwareErrorCode::FileSystemError);
            }
        }
        info!(file = %transfer.file_name, bytes = transfer.received, "firmware file received");
        self.file_ready()
    }

    fn file_ready(&mut self) -> Vec<FirmwareOutput> {
        self.state = FirmwareState::FileReady;
        self.transfer = None;
        let mut outputs = vec![FirmwareOutput::Status(FirmwareStatus::FileReady)];
        if self.auto_install {
            outputs.extend(self.install());
        }
        outputs
    }

    fn install(&mut self) -> Vec<FirmwareOutput> {
        self.state = FirmwareState::Installation;
        let mut outputs = vec![FirmwareOutput::Status(FirmwareStatus::Installation)];

        // Survives a reboot into the new image; `report_result` picks it up.
        let version = self.handler.firmware_version();
        self.handler.persist_version(&version);

        match self.handler.install() {
            Ok(()) => {
                info!(previous = %version, "firmware installed");
                outputs.push(FirmwareOutput::Status(FirmwareStatus::Completed));
            }
            Err(e) => {
                error!("firmware installation failed: {e}");
                outputs.push(FirmwareOutput::Status(FirmwareStatus::Error(
                    FirmwareErrorCode::InstallationFailed,
                )));
            }
        }
        self.handler.unpersist_version();
        self.reset();
        outputs
    }

    fn abort(&mut self) -> Vec<FirmwareOutput> {
        info!(state = ?self.state, "firmware update aborted");
        self.handler.update_abort();
        self.reset();
        vec![FirmwareOutput::Status(FirmwareStatus::Aborted)]
    }

    /// Fails a session that has already called `update_start`.
    fn fail_transfer(&mut self, code: FirmwareErrorCode) -> Vec<FirmwareOutput> {
        self.handler.update_abort();
        self.fail(code)
    }

    fn fail(&mut self, code: FirmwareErrorCode) -> Vec<FirmwareOutput> {
        self.reset();
        vec![FirmwareOutput::Status(FirmwareStatus::Error(code))]
    }

    fn reset(&mut self) {
        self.state = FirmwareState::Idle;
        self.transfer = None;
        self.auto_install = false;
    }
}
