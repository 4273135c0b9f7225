//! Session data structure
//!
//! ```text
//! Open
//!   ↓ end / end-of-data / error / cancel
//! Closing
//!   ↓ resource released
//! Closed
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Read,
    Write,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Read => "read",
            Direction::Write => "write",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Resource is registered and accepts chunk operations
    Open,
    /// Removed from the registry, release in progress
    Closing,
    /// Resource released
    Closed,
}

impl SessionState {
    pub fn can_transition_to(&self, target: SessionState) -> bool {
        match (self, target) {
            (SessionState::Open, SessionState::Closing) => true,
            (SessionState::Closing, SessionState::Closed) => true,
            (a, b) if *a == b => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Open => "open",
            SessionState::Closing => "closing",
            SessionState::Closed => "closed",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Client-supplied identifier
    pub id: String,
    pub direction: Direction,
    /// Chunk size in bytes for read sessions. Write sessions append whatever
    /// the client sends and carry none.
    pub buffer_size: Option<usize>,
    pub state: SessionState,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(
        id: impl Into<String>,
        direction: Direction,
        buffer_size: Option<usize>,
    ) -> Result<Self> {
        if buffer_size == Some(0) {
            return Err(SessionError::InvalidBufferSize(0));
        }

        Ok(Self {
            id: id.into(),
            direction,
            buffer_size,
            state: SessionState::Open,
            created_at: Utc::now(),
        })
    }

    pub fn transition(&mut self, target: SessionState) -> Result<()> {
        if !self.state.can_transition_to(target) {
            return Err(SessionError::InvalidTransition {
                from: self.state.to_string(),
                to: target.to_string(),
            });
        }
        self.state = target;
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.state == SessionState::Open
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session() {
        let session = Session::new("s-1", Direction::Read, Some(1024)).unwrap();
        assert_eq!(session.state, SessionState::Open);
        assert_eq!(session.buffer_size, Some(1024));
        assert!(session.is_open());
    }

    #[test]
    fn test_zero_buffer_rejected() {
        let err = Session::new("s-1", Direction::Read, Some(0)).unwrap_err();
        assert!(matches!(err, SessionError::InvalidBufferSize(0)));
    }

    #[test]
    fn test_transitions() {
        assert!(SessionState::Open.can_transition_to(SessionState::Closing));
        assert!(SessionState::Closing.can_transition_to(SessionState::Closed));

        // Closing must happen before Closed
        assert!(!SessionState::Open.can_transition_to(SessionState::Closed));
        // Nothing reopens
        assert!(!SessionState::Closed.can_transition_to(SessionState::Open));
        assert!(!SessionState::Closing.can_transition_to(SessionState::Open));
    }

    #[test]
    fn test_transition_updates_state() {
        let mut session = Session::new("s-1", Direction::Write, None).unwrap();
        session.transition(SessionState::Closing).unwrap();
        session.transition(SessionState::Closed).unwrap();
        assert!(session.transition(SessionState::Open).is_err());
        assert_eq!(session.state, SessionState::Closed);
    }
}
