//! Read error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReadError {
    #[error(transparent)]
    Session(#[from] safstream_session::SessionError),

    #[error("Read failed: {0}")]
    Io(#[from] std::io::Error),
}
