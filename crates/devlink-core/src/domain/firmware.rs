//! Firmware update vocabulary shared by the codec and the update state machine.
//!
//! # Transfer model
//!
//! A firmware file is pulled from the platform chunk by chunk.  Each chunk
//! arrives framed between two SHA-256 digests:
//!
//! ```text
//! [previous_hash:32][data:N][current_hash:32]
//! ```
//!
//! `previous_hash` must equal the digest of the last accepted chunk (all
//! zeros for the first chunk), which links the chunks into a chain and
//! catches corrupted or reordered delivery.

/// Width of a chunk digest in bytes.
pub const HASH_SIZE: usize = 32;

/// Kind of an inbound firmware command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirmwareCommandType {
    FileUpload,
    UrlDownload,
    Install,
    Abort,
    Unknown,
}

impl From<&str> for FirmwareCommandType {
    fn from(raw: &str) -> Self {
        match raw {
            "FILE_UPLOAD" => FirmwareCommandType::FileUpload,
            "URL_DOWNLOAD" => FirmwareCommandType::UrlDownload,
            "INSTALL" => FirmwareCommandType::Install,
            "ABORT" => FirmwareCommandType::Abort,
            _ => FirmwareCommandType::Unknown,
        }
    }
}

/// A decoded `service/commands/firmware` message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareCommand {
    pub command: FirmwareCommandType,
    pub file_name: Option<String>,
    /// Total file size in bytes.
    pub file_size: Option<u64>,
    /// Hex-encoded SHA-256 of the complete file.
    pub file_hash: Option<String>,
    pub auto_install: bool,
    pub file_url: Option<String>,
}

impl FirmwareCommand {
    /// A command of the given type with no optional fields set.
    pub fn bare(command: FirmwareCommandType) -> Self {
        Self {
            command,
            file_name: None,
            file_size: None,
            file_hash: None,
            auto_install: false,
            file_url: None,
        }
    }
}

/// One chunk of a firmware file as delivered on `service/binary`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwarePacket {
    pub previous_hash: Vec<u8>,
    pub data: Vec<u8>,
    pub current_hash: Vec<u8>,
}

/// Request for one chunk, published on `service/binary/request`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkRequest {
    pub file_name: String,
    pub chunk_index: u64,
    pub chunk_size: u64,
}

/// Reason attached to [`FirmwareStatus::Error`].
///
/// The discriminants are the numeric codes used on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FirmwareErrorCode {
    Unspecified = 0,
    FileUploadDisabled = 1,
    UnsupportedFileSize = 2,
    InstallationFailed = 3,
    MalformedUrl = 4,
    FileSystemError = 5,
    RetryCountExceeded = 10,
}

impl FirmwareErrorCode {
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Externally visible state of a firmware update.
///
/// An error code exists only on the `Error` variant, so a status can never
/// carry an error without being an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirmwareStatus {
    FileTransfer,
    FileReady,
    Installation,
    Completed,
    Aborted,
    Error(FirmwareErrorCode),
}

impl FirmwareStatus {
    /// Status name as used on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            FirmwareStatus::FileTransfer => "FILE_TRANSFER",
            FirmwareStatus::FileReady => "FILE_READY",
            FirmwareStatus::Installation => "INSTALLATION",
            FirmwareStatus::Completed => "COMPLETED",
            FirmwareStatus::Aborted => "ABORTED",
            FirmwareStatus::Error(_) => "ERROR",
        }
    }

    pub fn error(self) -> Option<FirmwareErrorCode> {
        match self {
            FirmwareStatus::Error(code) => Some(code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_match_wire_table() {
        assert_eq!(FirmwareErrorCode::Unspecified.code(), 0);
        assert_eq!(FirmwareErrorCode::FileUploadDisabled.code(), 1);
        assert_eq!(FirmwareErrorCode::UnsupportedFileSize.code(), 2);
        assert_eq!(FirmwareErrorCode::InstallationFailed.code(), 3);
        assert_eq!(FirmwareErrorCode::MalformedUrl.code(), 4);
        assert_eq!(FirmwareErrorCode::FileSystemError.code(), 5);
        assert_eq!(FirmwareErrorCode::RetryCountExceeded.code(), 10);
    }

    #[test]
    fn test_only_error_status_carries_error_code() {
        assert_eq!(FirmwareStatus::FileReady.error(), None);
        assert_eq!(
            FirmwareStatus::Error(FirmwareErrorCode::MalformedUrl).error(),
            Some(FirmwareErrorCode::MalformedUrl)
        );
        assert_eq!(FirmwareStatus::Error(FirmwareErrorCode::Unspecified).as_str(), "ERROR");
    }

    #[test]
    fn test_unknown_firmware_command_string() {
        assert_eq!(FirmwareCommandType::from("INSTALL"), FirmwareCommandType::Install);
        assert_eq!(FirmwareCommandType::from("REBOOT"), FirmwareCommandType::Unknown);
    }
}
