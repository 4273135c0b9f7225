//! saf_stream Session Registry
//!
//! A session is one in-flight transfer, named by a client-supplied id.
//! - Read and write sessions live in separate tables, so ids only need to be
//!   unique per direction
//! - Each table owns its stream resources until they are removed
//! - Removal hands the resource to exactly one caller

mod error;
mod session;
mod table;

pub use error::SessionError;
pub use session::{Direction, Session, SessionState};
pub use table::{Rejected, Released, SessionHandle, SessionTable};

pub type Result<T> = std::result::Result<T, SessionError>;

/// Chunk size used when the client does not pick one (4 MiB)
pub const DEFAULT_BUFFER_SIZE: usize = 4 * 1024 * 1024;
