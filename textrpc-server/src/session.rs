//! Per-connection session tracking.

use std::net::SocketAddr;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Session state.
///
/// A connection carries exactly one request: it starts out awaiting that
/// request and ends either completed or failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Connected, request not yet read.
    AwaitingRequest,
    /// Reply written (or nothing to reply to).
    Completed,
    /// The request could not be served.
    Failed,
}

impl SessionState {
    /// Returns whether the session has reached a final state.
    pub fn is_terminal(self) -> bool {
        !matches!(self, SessionState::AwaitingRequest)
    }
}

/// A client session.
#[derive(Debug)]
pub struct Session {
    /// Unique session ID.
    pub id: String,

    /// Remote address.
    pub remote_addr: SocketAddr,

    state: SessionState,

    /// Function named by the request, once decoded.
    function: Option<String>,

    bytes_read: usize,
    bytes_written: usize,

    created_at: Instant,
}

impl Session {
    /// Creates a new session.
    pub fn new(remote_addr: SocketAddr) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            remote_addr,
            state: SessionState::AwaitingRequest,
            function: None,
            bytes_read: 0,
            bytes_written: 0,
            created_at: Instant::now(),
        }
    }

    /// Returns the session state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Returns the requested function name.
    pub fn function(&self) -> Option<&str> {
        self.function.as_deref()
    }

    pub fn set_function(&mut self, function: impl Into<String>) {
        self.function = Some(function.into());
    }

    pub fn record_read(&mut self, n: usize) {
        self.bytes_read += n;
    }

    pub fn record_write(&mut self, n: usize) {
        self.bytes_written += n;
    }

    pub fn bytes_read(&self) -> usize {
        self.bytes_read
    }

    pub fn bytes_written(&self) -> usize {
        self.bytes_written
    }

    /// Marks the session completed. Final states are sticky.
    pub fn complete(&mut self) {
        if !self.state.is_terminal() {
            self.state = SessionState::Completed;
        }
    }

    /// Marks the session failed. Final states are sticky.
    pub fn fail(&mut self) {
        if !self.state.is_terminal() {
            self.state = SessionState::Failed;
        }
    }

    /// Returns the session age.
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn test_addr() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 12345)
    }

    #[test]
    fn test_session_creation() {
        let session = Session::new(test_addr());
        assert_eq!(session.state(), SessionState::AwaitingRequest);
        assert!(!session.state().is_terminal());
        assert_eq!(session.function(), None);
        assert_eq!(session.bytes_read(), 0);
    }

    #[test]
    fn test_unique_ids() {
        let a = Session::new(test_addr());
        let b = Session::new(test_addr());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_complete() {
        let mut session = Session::new(test_addr());
        session.set_function("rot13");
        session.record_read(40);
        session.record_write(5);
        session.complete();

        assert_eq!(session.state(), SessionState::Completed);
        assert_eq!(session.function(), Some("rot13"));
        assert_eq!(session.bytes_read(), 40);
        assert_eq!(session.bytes_written(), 5);
    }

    #[test]
    fn test_terminal_states_are_sticky() {
        let mut session = Session::new(test_addr());
        session.fail();
        session.complete();
        assert_eq!(session.state(), SessionState::Failed);

        let mut session = Session::new(test_addr());
        session.complete();
        session.fail();
        assert_eq!(session.state(), SessionState::Completed);
    }
}
