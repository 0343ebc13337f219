//! Connection state machine for one embedded viewer.
//!
//! ```text
//!   Disconnected ──attach──► HandshakeSent ──(host ∧ viewer ready)──► Connected
//!        ▲                                                              │
//!        └──────────────────────────── teardown ────────────────────────┘
//! ```
//!
//! Host readiness and viewer readiness are independent flags and may arrive
//! in either order.  The one that arrives second completes the connection;
//! the caller learns this from the return value and runs the completion step.

/// Lifecycle stage of a bridge instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    /// `handshake` posted to the parent; waiting for both readiness signals.
    HandshakeSent,
    /// Both sides ready and the completion step has run.  Terminal until
    /// teardown.
    Connected,
}

/// Outcome of recording a readiness signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Recorded; the other side has not reported yet.
    Waiting,
    /// This signal completed the connection.  Run the completion step now.
    Completed,
    /// The side was already ready or the connection already complete.
    Repeated,
}

#[derive(Debug, Clone, Default)]
pub struct Connection {
    state: ConnectionState,
    host_ready: bool,
    viewer_ready: bool,
}

impl Connection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn is_host_ready(&self) -> bool {
        self.host_ready
    }

    pub fn is_viewer_ready(&self) -> bool {
        self.viewer_ready
    }

    /// Records that the handshake went out.  Returns `false` (and changes
    /// nothing) unless the instance was `Disconnected`, so at most one
    /// handshake is sent per attach.
    pub fn handshake_sent(&mut self) -> bool {
        if self.state != ConnectionState::Disconnected {
            return false;
        }
        self.state = ConnectionState::HandshakeSent;
        true
    }

    /// Records the host's `initialized` event.
    pub fn host_ready(&mut self) -> Readiness {
        if self.host_ready {
            return Readiness::Repeated;
        }
        self.host_ready = true;
        self.try_complete()
    }

    /// Records the viewer's ready notification.
    pub fn viewer_ready(&mut self) -> Readiness {
        if self.viewer_ready {
            return Readiness::Repeated;
        }
        self.viewer_ready = true;
        self.try_complete()
    }

    /// Returns to `Disconnected` and clears both flags.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn try_complete(&mut self) -> Readiness {
        if self.state == ConnectionState::HandshakeSent && self.host_ready && self.viewer_ready {
            self.state = ConnectionState::Connected;
            Readiness::Completed
        } else {
            Readiness::Waiting
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn attached() -> Connection {
        let mut conn = Connection::new();
        assert!(conn.handshake_sent());
        conn
    }

    #[test]
    fn test_new_connection_is_disconnected() {
        let conn = Connection::new();
        assert_eq!(conn.state(), ConnectionState::Disconnected);
        assert!(!conn.is_host_ready());
        assert!(!conn.is_viewer_ready());
    }

    #[test]
    fn test_handshake_moves_to_handshake_sent_once() {
        // Arrange
        let mut conn = Connection::new();

        // Act
        let first = conn.handshake_sent();
        let second = conn.handshake_sent();

        // Assert
        assert!(first);
        assert!(!second, "a second handshake must be refused");
        assert_eq!(conn.state(), ConnectionState::HandshakeSent);
    }

    #[test]
    fn test_host_then_viewer_completes_on_viewer() {
        let mut conn = attached();

        assert_eq!(conn.host_ready(), Readiness::Waiting);
        assert!(!conn.is_connected());
        assert_eq!(conn.viewer_ready(), Readiness::Completed);
        assert!(conn.is_connected());
    }

    #[test]
    fn test_viewer_then_host_completes_on_host() {
        let mut conn = attached();

        assert_eq!(conn.viewer_ready(), Readiness::Waiting);
        assert_eq!(conn.host_ready(), Readiness::Completed);
        assert_eq!(conn.state(), ConnectionState::Connected);
    }

    #[test]
    fn test_repeated_signals_never_complete_twice() {
        // Arrange: fully connected
        let mut conn = attached();
        conn.host_ready();
        conn.viewer_ready();

        // Act
        let again_host = conn.host_ready();
        let again_viewer = conn.viewer_ready();

        // Assert
        assert_eq!(again_host, Readiness::Repeated);
        assert_eq!(again_viewer, Readiness::Repeated);
        assert!(conn.is_connected());
    }

    #[test]
    fn test_repeated_host_signal_before_viewer_is_reported() {
        let mut conn = attached();
        conn.host_ready();
        assert_eq!(conn.host_ready(), Readiness::Repeated);
        assert_eq!(conn.state(), ConnectionState::HandshakeSent);
    }

    #[test]
    fn test_readiness_without_handshake_does_not_connect() {
        let mut conn = Connection::new();
        conn.host_ready();
        assert_eq!(conn.viewer_ready(), Readiness::Waiting);
        assert_eq!(conn.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_reset_returns_to_disconnected() {
        let mut conn = attached();
        conn.host_ready();
        conn.viewer_ready();

        conn.reset();

        assert_eq!(conn.state(), ConnectionState::Disconnected);
        assert!(!conn.is_host_ready());
        assert!(!conn.is_viewer_ready());
    }
}
