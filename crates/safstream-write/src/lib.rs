//! saf_stream Chunked Write Engine
//!
//! - Resolves the target document under a directory handle, honoring the
//!   overwrite flag
//! - Appends client chunks to a session's stream in submission order
//! - Closes and removes the session on end, or on the first failed write

mod error;
mod manager;
mod target;

pub use error::WriteError;
pub use manager::WriteStreamManager;
pub use target::open_target;

pub type Result<T> = std::result::Result<T, WriteError>;
