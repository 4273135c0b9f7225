//! Session table
//!
//! Maps session ids to exclusively owned stream resources. The map lock is
//! only held to find or detach an entry; chunk I/O runs under the entry's own
//! lock, so sessions never wait on each other.

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::SessionError;
use crate::session::{Direction, Session, SessionState};
use crate::Result;

struct Entry<R> {
    session: Session,
    slot: Arc<Mutex<Option<R>>>,
}

pub struct SessionTable<R> {
    direction: Direction,
    entries: Arc<RwLock<HashMap<String, Entry<R>>>>,
}

impl<R> SessionTable<R> {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Register a freshly opened resource under `id`.
    ///
    /// On rejection the resource is handed back so the caller can release it.
    pub fn register(
        &self,
        id: &str,
        buffer_size: Option<usize>,
        resource: R,
    ) -> std::result::Result<Session, Rejected<R>> {
        let session = match Session::new(id, self.direction, buffer_size) {
            Ok(session) => session,
            Err(error) => return Err(Rejected { error, resource }),
        };

        let mut entries = self.entries.write();
        if entries.contains_key(id) {
            return Err(Rejected {
                error: SessionError::AlreadyExists(id.to_string()),
                resource,
            });
        }
        entries.insert(
            id.to_string(),
            Entry {
                session: session.clone(),
                slot: Arc::new(Mutex::new(Some(resource))),
            },
        );

        tracing::info!(
            session_id = %id,
            direction = %self.direction,
            buffer_size = ?buffer_size,
            "Registered stream session"
        );

        Ok(session)
    }

    /// Find a session without removing it
    pub fn lookup(&self, id: &str) -> Result<SessionHandle<R>> {
        self.entries
            .read()
            .get(id)
            .map(|entry| SessionHandle {
                session: entry.session.clone(),
                slot: Arc::clone(&entry.slot),
            })
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    /// Run `f` against the session's resource
    pub fn with_resource<T>(&self, id: &str, f: impl FnOnce(&mut R) -> T) -> Result<T> {
        self.lookup(id)?.with(f)
    }

    /// Detach a session and take ownership of its resource.
    ///
    /// Of several concurrent callers for the same id, exactly one receives the
    /// resource; the others get `NotFound`.
    pub fn remove(&self, id: &str) -> Result<Released<R>> {
        let entry = self
            .entries
            .write()
            .remove(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;

        let resource = entry
            .slot
            .lock()
            .take()
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;

        let mut session = entry.session;
        session.transition(SessionState::Closing)?;

        Ok(Released { session, resource })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.read().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn list_sessions(&self) -> Vec<Session> {
        self.entries
            .read()
            .values()
            .map(|entry| entry.session.clone())
            .collect()
    }
}

impl<R> Clone for SessionTable<R> {
    fn clone(&self) -> Self {
        Self {
            direction: self.direction,
            entries: Arc::clone(&self.entries),
        }
    }
}

/// A resource that could not be registered
pub struct Rejected<R> {
    pub error: SessionError,
    pub resource: R,
}

impl<R> std::fmt::Debug for Rejected<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rejected")
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

/// A live session found by [`SessionTable::lookup`]
pub struct SessionHandle<R> {
    session: Session,
    slot: Arc<Mutex<Option<R>>>,
}

impl<R> std::fmt::Debug for SessionHandle<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl<R> SessionHandle<R> {
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Run `f` against the resource, serialized with every other operation on
    /// this session. Fails with `NotFound` if the session was removed meanwhile.
    pub fn with<T>(&self, f: impl FnOnce(&mut R) -> T) -> Result<T> {
        let mut slot = self.slot.lock();
        match slot.as_mut() {
            Some(resource) => Ok(f(resource)),
            None => Err(SessionError::NotFound(self.session.id.clone())),
        }
    }
}

/// A session detached from its table, holding the resource until it is closed
pub struct Released<R> {
    session: Session,
    resource: R,
}

impl<R> std::fmt::Debug for Released<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Released")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl<R> Released<R> {
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Release the resource with `f`. The session counts as closed whether or
    /// not `f` succeeds.
    pub fn close<T, E>(
        self,
        f: impl FnOnce(R) -> std::result::Result<T, E>,
    ) -> (Session, std::result::Result<T, E>)
    where
        E: std::fmt::Display,
    {
        let Released {
            mut session,
            resource,
        } = self;

        let result = f(resource);
        if let Err(e) = &result {
            tracing::warn!(
                session_id = %session.id,
                direction = %session.direction,
                error = %e,
                "Stream close failed"
            );
        }

        if let Err(e) = session.transition(SessionState::Closed) {
            tracing::warn!(session_id = %session.id, error = %e, "Unexpected session state");
        }
        tracing::info!(
            session_id = %session.id,
            direction = %session.direction,
            "Closed stream session"
        );

        (session, result)
    }
}
