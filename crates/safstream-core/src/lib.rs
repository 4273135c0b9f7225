//! saf_stream Core
//!
//! The transfer orchestrator: turns discrete client calls into registry and
//! engine operations. Provider I/O always runs on blocking workers, so callers
//! never wait on a stream they are not using.

mod config;
mod dispatch;
mod error;
mod oneshot;
mod transfer;

pub use config::Config;
pub use dispatch::{dispatch, MethodCall, MethodResult};
pub use error::{CoreError, ErrorKind};
pub use transfer::Transfer;

// Re-export engine components
pub use safstream_read::{Chunk, DrainState, PullReadManager, ReadError, ReadEvent, ReadEventStream};
pub use safstream_session::{
    Direction, Session, SessionError, SessionState, SessionTable, DEFAULT_BUFFER_SIZE,
};
pub use safstream_storage::{
    DocumentEntry, FsProvider, LocalFile, MemoryProvider, ReadResource, StorageError,
    StorageProvider, WriteMode, WriteResource,
};
pub use safstream_write::{WriteError, WriteStreamManager};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Initialize logging
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt().with_env_filter(filter).with_target(true).init();
}

/// Generate a fresh session id for clients that do not bring their own
pub fn new_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_id() {
        let a = new_session_id();
        let b = new_session_id();

        assert_ne!(a, b);
        assert!(uuid::Uuid::parse_str(&a).is_ok());
    }
}
