//! Core error types

use serde::{Deserialize, Serialize};
use thiserror::Error;

use safstream_read::ReadError;
use safstream_session::SessionError;
use safstream_storage::StorageError;
use safstream_write::WriteError;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("{0}")]
    Storage(#[from] StorageError),

    #[error("{0}")]
    Session(#[from] SessionError),

    #[error("{0}")]
    Read(#[from] ReadError),

    #[error("{0}")]
    Write(#[from] WriteError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Worker failed: {0}")]
    Worker(String),
}

/// What went wrong, as seen by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Directory, document or locator does not exist
    NotFound,
    /// The provider refused to open or create a stream
    ResourceCreationFailed,
    /// Read, write, skip or close failed on an open stream
    #[serde(rename = "IOFailure")]
    IoFailure,
    /// Unknown or closed session id, or malformed request
    ProtocolMisuse,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NotFound",
            ErrorKind::ResourceCreationFailed => "ResourceCreationFailed",
            ErrorKind::IoFailure => "IOFailure",
            ErrorKind::ProtocolMisuse => "ProtocolMisuse",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::Storage(e) => storage_kind(e),
            CoreError::Session(_) => ErrorKind::ProtocolMisuse,
            CoreError::Read(ReadError::Session(_)) => ErrorKind::ProtocolMisuse,
            CoreError::Read(ReadError::Io(_)) => ErrorKind::IoFailure,
            CoreError::Write(WriteError::Session(_)) => ErrorKind::ProtocolMisuse,
            CoreError::Write(WriteError::Storage(e)) => storage_kind(e),
            CoreError::Write(WriteError::Io(_)) => ErrorKind::IoFailure,
            CoreError::Io(_) | CoreError::Worker(_) => ErrorKind::IoFailure,
            CoreError::Serialization(_) | CoreError::InvalidArguments(_) | CoreError::Config(_) => {
                ErrorKind::ProtocolMisuse
            }
        }
    }

    /// True when the error names a session that is not open
    pub fn is_stream_not_found(&self) -> bool {
        matches!(
            self,
            CoreError::Session(SessionError::NotFound(_))
                | CoreError::Read(ReadError::Session(SessionError::NotFound(_)))
                | CoreError::Write(WriteError::Session(SessionError::NotFound(_)))
        )
    }
}

fn storage_kind(error: &StorageError) -> ErrorKind {
    match error {
        StorageError::NotFound(_) => ErrorKind::NotFound,
        StorageError::CreationFailed(_) | StorageError::InvalidLocator(_) => {
            ErrorKind::ResourceCreationFailed
        }
        StorageError::Io(_) => ErrorKind::IoFailure,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        let missing: CoreError = SessionError::NotFound("s".to_string()).into();
        assert_eq!(missing.kind(), ErrorKind::ProtocolMisuse);
        assert!(missing.is_stream_not_found());
        assert_eq!(missing.to_string(), "Stream not found: s");

        let io: CoreError = ReadError::Io(std::io::Error::other("disk")).into();
        assert_eq!(io.kind(), ErrorKind::IoFailure);
        assert!(!io.is_stream_not_found());

        let dir: CoreError =
            WriteError::Storage(StorageError::NotFound("Directory not found".to_string())).into();
        assert_eq!(dir.kind(), ErrorKind::NotFound);
        assert_eq!(dir.to_string(), "Directory not found");

        let refused: CoreError =
            StorageError::CreationFailed("File creation failed".to_string()).into();
        assert_eq!(refused.kind(), ErrorKind::ResourceCreationFailed);
    }
}
