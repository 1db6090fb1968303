//! Error taxonomy and the transient/fatal fault classifier.

use std::time::Duration;
use thiserror::Error;

/// Errors raised by surface calls and configuration.
#[derive(Debug, Error)]
pub enum SurfaceError {
    /// A control or candidate the interaction needed is not on the page.
    #[error("element not found: {0}")]
    ElementNotFound(String),

    /// A surface call did not answer in time.
    #[error("surface call timed out: {0}")]
    Timeout(String),

    /// The browser session itself has ended; the handle is no longer usable.
    #[error("session closed: {0}")]
    SessionClosed(String),

    /// The DevTools endpoint rejected or garbled a command.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Page-side script evaluation threw.
    #[error("script evaluation failed: {0}")]
    Script(String),

    /// A group heading did not match the expected date grammar.
    #[error("unrecognized date label: {0:?}")]
    UnparsableLabel(String),

    /// Rejected at startup, before any browser interaction.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The user did not sign in within the bounded wait.
    #[error("sign-in timed out after {0:?}")]
    LoginTimeout(Duration),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// How a failure affects the traversal loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// Recoverable; the loop logs, counts and continues.
    Transient,
    /// The session has ended; no further surface calls are safe.
    Fatal,
}

/// Error-message fragments that indicate the session itself has terminated.
///
/// Anything carrying one of these came back from a connection that is gone
/// (or going), regardless of which command triggered it.
const SESSION_ENDED_PATTERNS: &[&str] = &[
    "websocket: close",
    "websocket closed",
    "connection closed",
    "target closed",
    "target crashed",
    "session closed",
    "page closed",
    "browser has disconnected",
    "connection refused",
    "broken pipe",
    "deadline exceeded",
    "canceled",
];

fn message_indicates_session_ended(message: &str) -> bool {
    let lower = message.to_lowercase();
    SESSION_ENDED_PATTERNS
        .iter()
        .any(|pattern| lower.contains(pattern))
}

impl SurfaceError {
    /// Classify this failure for the traversal engine.
    ///
    /// Fatal means the loop must stop immediately and skip all further
    /// surface calls; everything else, including element-not-found style
    /// failures, is retried or logged and the loop continues.
    pub fn fault_kind(&self) -> FaultKind {
        match self {
            SurfaceError::SessionClosed(_) | SurfaceError::LoginTimeout(_) => FaultKind::Fatal,
            SurfaceError::Timeout(msg)
            | SurfaceError::Protocol(msg)
            | SurfaceError::Script(msg) => {
                if message_indicates_session_ended(msg) {
                    FaultKind::Fatal
                } else {
                    FaultKind::Transient
                }
            }
            SurfaceError::Io(err) => match err.kind() {
                std::io::ErrorKind::ConnectionRefused
                | std::io::ErrorKind::ConnectionReset
                | std::io::ErrorKind::ConnectionAborted
                | std::io::ErrorKind::BrokenPipe => FaultKind::Fatal,
                _ => FaultKind::Transient,
            },
            SurfaceError::ElementNotFound(_)
            | SurfaceError::UnparsableLabel(_)
            | SurfaceError::InvalidConfig(_) => FaultKind::Transient,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.fault_kind() == FaultKind::Fatal
    }
}
