//! saf_stream Chunked Read Engine
//!
//! Drains a readable provider stream in fixed-size chunks, in one of two modes:
//! - Push: a drain task streams every chunk as an event, then exactly one
//!   terminal event (complete or error). Cancellable at any point.
//! - Pull: the client asks for one chunk at a time and may skip ahead.

mod chunk;
mod error;
mod pull;
mod push;

pub use chunk::{Chunk, ChunkReader};
pub use error::ReadError;
pub use pull::PullReadManager;
pub use push::{spawn_drain, Drain, DrainState, ReadEvent, ReadEventStream};

pub type Result<T> = std::result::Result<T, ReadError>;
