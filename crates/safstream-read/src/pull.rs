//! Pull-mode read sessions
//!
//! Opening a session performs no reads. Each request reads or skips once;
//! reaching end-of-data leaves the session open until the client ends it.
//! Any I/O error closes and removes the session.

use std::io;

use safstream_session::{Direction, Session, SessionTable};
use safstream_storage::ReadResource;

use crate::chunk::{Chunk, ChunkReader};
use crate::error::ReadError;
use crate::Result;

pub struct PullReadManager {
    readers: SessionTable<ChunkReader>,
}

impl PullReadManager {
    pub fn new() -> Self {
        Self {
            readers: SessionTable::new(Direction::Read),
        }
    }

    /// Register an opened resource under `session_id`, optionally skipping to
    /// `start` first.
    pub fn start(
        &self,
        session_id: &str,
        resource: Box<dyn ReadResource>,
        buffer_size: usize,
        start: Option<u64>,
    ) -> Result<Session> {
        let mut reader = ChunkReader::new(resource, buffer_size);

        if let Some(offset) = start.filter(|offset| *offset > 0) {
            if let Err(e) = reader.skip(offset) {
                let _ = reader.close();
                return Err(e.into());
            }
        }

        match self.readers.register(session_id, Some(buffer_size), reader) {
            Ok(session) => Ok(session),
            Err(rejected) => {
                if let Err(e) = rejected.resource.close() {
                    tracing::warn!(
                        session_id = %session_id,
                        error = %e,
                        "Failed to close read stream"
                    );
                }
                Err(rejected.error.into())
            }
        }
    }

    /// Read the next chunk, or `Chunk::End` once the resource is exhausted
    pub fn next_chunk(&self, session_id: &str) -> Result<Chunk> {
        let outcome = self
            .readers
            .with_resource(session_id, |reader| reader.next_chunk())?;

        match outcome {
            Ok(chunk) => {
                tracing::debug!(
                    session_id = %session_id,
                    bytes = chunk.len(),
                    end = chunk.is_end(),
                    "Read chunk"
                );
                Ok(chunk)
            }
            Err(e) => Err(self.fail(session_id, e)),
        }
    }

    /// Skip up to `count` bytes; returns how many were actually skipped
    pub fn skip(&self, session_id: &str, count: u64) -> Result<u64> {
        let outcome = self
            .readers
            .with_resource(session_id, |reader| reader.skip(count))?;

        match outcome {
            Ok(skipped) => {
                tracing::debug!(
                    session_id = %session_id,
                    requested = count,
                    skipped,
                    "Skipped bytes"
                );
                Ok(skipped)
            }
            Err(e) => Err(self.fail(session_id, e)),
        }
    }

    /// Close and remove the session
    pub fn end(&self, session_id: &str) -> Result<()> {
        let released = self.readers.remove(session_id)?;
        let (_, result) = released.close(ChunkReader::close);
        result.map_err(ReadError::from)
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.readers.contains(session_id)
    }

    pub fn list_sessions(&self) -> Vec<Session> {
        self.readers.list_sessions()
    }

    fn fail(&self, session_id: &str, error: io::Error) -> ReadError {
        tracing::warn!(session_id = %session_id, error = %error, "Read failed, closing session");
        if let Ok(released) = self.readers.remove(session_id) {
            let _ = released.close(ChunkReader::close);
        }
        ReadError::Io(error)
    }
}

impl Default for PullReadManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for PullReadManager {
    fn clone(&self) -> Self {
        Self {
            readers: self.readers.clone(),
        }
    }
}
