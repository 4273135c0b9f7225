//! Write error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WriteError {
    #[error(transparent)]
    Session(#[from] safstream_session::SessionError),

    #[error(transparent)]
    Storage(#[from] safstream_storage::StorageError),

    #[error("Write failed: {0}")]
    Io(#[from] std::io::Error),
}
