//! Write stream sessions

use safstream_session::{Direction, Session, SessionTable};
use safstream_storage::WriteResource;

use crate::error::WriteError;
use crate::Result;

type Writer = Box<dyn WriteResource>;

pub struct WriteStreamManager {
    writers: SessionTable<Writer>,
}

impl WriteStreamManager {
    pub fn new() -> Self {
        Self {
            writers: SessionTable::new(Direction::Write),
        }
    }

    /// Register an opened writable resource under `session_id`
    pub fn start(&self, session_id: &str, stream: Writer) -> Result<Session> {
        match self.writers.register(session_id, None, stream) {
            Ok(session) => Ok(session),
            Err(rejected) => {
                if let Err(e) = rejected.resource.close() {
                    tracing::warn!(
                        session_id = %session_id,
                        error = %e,
                        "Failed to close write stream"
                    );
                }
                Err(rejected.error.into())
            }
        }
    }

    /// Append `data` to the session's stream.
    ///
    /// A failed write closes and removes the session. Bytes from earlier
    /// chunks stay where they landed.
    pub fn write_chunk(&self, session_id: &str, data: &[u8]) -> Result<()> {
        let outcome = self
            .writers
            .with_resource(session_id, |stream| stream.write(data))?;

        match outcome {
            Ok(()) => {
                tracing::debug!(session_id = %session_id, bytes = data.len(), "Wrote chunk");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(session_id = %session_id, error = %e, "Write failed, closing session");
                if let Ok(released) = self.writers.remove(session_id) {
                    let _ = released.close(|stream| stream.close());
                }
                Err(WriteError::Io(e))
            }
        }
    }

    /// Flush, close and remove the session. The session is gone even when
    /// closing fails.
    pub fn end(&self, session_id: &str) -> Result<()> {
        let released = self.writers.remove(session_id)?;
        let (_, result) = released.close(|stream| stream.close());
        result.map_err(WriteError::from)
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.writers.contains(session_id)
    }

    pub fn list_sessions(&self) -> Vec<Session> {
        self.writers.list_sessions()
    }
}

impl Default for WriteStreamManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for WriteStreamManager {
    fn clone(&self) -> Self {
        Self {
            writers: self.writers.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::open_target;
    use safstream_session::SessionError;
    use safstream_storage::{Faults, MemoryProvider};

    fn start(provider: &MemoryProvider, manager: &WriteStreamManager, id: &str) -> String {
        provider.add_dir("docs");
        let (entry, stream) =
            open_target(provider, "docs", &format!("{id}.bin"), "application/octet-stream", true)
                .unwrap();
        manager.start(id, stream).unwrap();
        entry.uri
    }

    #[test]
    fn test_chunks_land_in_order() {
        let provider = MemoryProvider::new();
        let manager = WriteStreamManager::new();
        let uri = start(&provider, &manager, "w");

        let chunks: [&[u8]; 4] = [b"a", b"", b"bcd", b"efghij"];
        for chunk in chunks {
            manager.write_chunk("w", chunk).unwrap();
        }
        manager.end("w").unwrap();

        assert_eq!(provider.contents(&uri).unwrap(), b"abcdefghij");
        assert_eq!(provider.stats(&uri).closes, 1);
        assert!(!manager.contains("w"));
    }

    #[test]
    fn test_write_session_has_no_chunk_size() {
        let provider = MemoryProvider::new();
        let manager = WriteStreamManager::new();
        start(&provider, &manager, "w");

        let sessions = manager.list_sessions();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].buffer_size, None);
    }

    #[test]
    fn test_write_after_end_is_not_found() {
        let provider = MemoryProvider::new();
        let manager = WriteStreamManager::new();
        start(&provider, &manager, "w");
        manager.end("w").unwrap();

        assert!(matches!(
            manager.write_chunk("w", b"late"),
            Err(WriteError::Session(SessionError::NotFound(_)))
        ));
        assert!(matches!(
            manager.end("w"),
            Err(WriteError::Session(SessionError::NotFound(_)))
        ));
    }

    #[test]
    fn test_write_failure_removes_session() {
        let provider = MemoryProvider::new();
        let manager = WriteStreamManager::new();
        let uri = start(&provider, &manager, "w");
        // Faults are captured at open, so reopen through a fresh session
        manager.end("w").unwrap();
        provider.set_faults(
            &uri,
            Faults {
                write_fails: true,
                ..Faults::default()
            },
        );
        let (_, stream) =
            open_target(&provider, "docs", "w.bin", "application/octet-stream", true).unwrap();
        manager.start("w", stream).unwrap();

        assert!(matches!(
            manager.write_chunk("w", b"x"),
            Err(WriteError::Io(_))
        ));
        assert!(!manager.contains("w"));
        assert_eq!(provider.stats(&uri).open_handles(), 0);
    }

    #[test]
    fn test_close_failure_still_removes() {
        let provider = MemoryProvider::new();
        let manager = WriteStreamManager::new();
        provider.insert("docs", "c.bin", Vec::new());
        let uri = "mem://docs/c.bin";
        provider.set_faults(
            uri,
            Faults {
                close_fails: true,
                ..Faults::default()
            },
        );
        let (_, stream) =
            open_target(&provider, "docs", "c.bin", "application/octet-stream", true).unwrap();
        manager.start("c", stream).unwrap();
        manager.write_chunk("c", b"data").unwrap();

        assert!(matches!(manager.end("c"), Err(WriteError::Io(_))));
        assert!(!manager.contains("c"));
        assert_eq!(provider.contents(uri).unwrap(), b"data");
    }

    #[test]
    fn test_sessions_are_independent() {
        let provider = MemoryProvider::new();
        let manager = WriteStreamManager::new();
        let a = start(&provider, &manager, "a");
        let b = start(&provider, &manager, "b");

        manager.write_chunk("a", b"1").unwrap();
        manager.write_chunk("b", b"2").unwrap();
        manager.write_chunk("a", b"3").unwrap();
        manager.end("b").unwrap();
        manager.write_chunk("a", b"5").unwrap();
        manager.end("a").unwrap();

        assert_eq!(provider.contents(&a).unwrap(), b"135");
        assert_eq!(provider.contents(&b).unwrap(), b"2");
    }
}
