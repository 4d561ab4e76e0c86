// MIT License - Copyright (c) 2026 Peter Wright
// Error taxonomy

use std::fmt;
use std::time::Duration;

/// Why a session ended in `Failed`.
///
/// Cloned into the terminal event of every subscriber, so it carries the
/// I/O error as kind + message rather than the error itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureCause {
    /// The byte stream returned an error on read or write.
    Transport {
        kind: std::io::ErrorKind,
        message: String,
    },
    /// The peer closed the byte stream.
    ConnectionClosed,
    /// No traffic at all for the keep-alive window.
    KeepAliveTimeout { idle: Duration },
    /// The network bridge answered the login with a failure status.
    LoginRejected,
}

impl FailureCause {
    pub fn transport(err: &std::io::Error) -> Self {
        Self::Transport {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport { message, .. } => write!(f, "transport error: {}", message),
            Self::ConnectionClosed => write!(f, "connection closed by peer"),
            Self::KeepAliveTimeout { idle } => {
                write!(f, "keep-alive timeout after {:.1}s idle", idle.as_secs_f64())
            }
            Self::LoginRejected => write!(f, "login rejected"),
        }
    }
}

/// How a session reached its end of stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// `disconnect()` was called.
    Requested,
    Failed(FailureCause),
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Requested => write!(f, "disconnect requested"),
            Self::Failed(cause) => write!(f, "session failed: {}", cause),
        }
    }
}

/// All errors returned by the it100-bridge library.
#[derive(Debug, thiserror::Error)]
pub enum It100Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Connection timeout")]
    ConnectionTimeout,

    #[error("Not connected: call connect() first")]
    NotConnected,

    #[error("Already connected")]
    AlreadyConnected,

    #[error("Invalid command code: {code:?} (expected 3 ASCII characters)")]
    InvalidCode { code: String },

    #[error("Command code {code} is already registered")]
    DuplicateCode { code: String },

    #[error("Cannot serialize command {code}: {reason}")]
    Serialize { code: String, reason: String },

    #[error("Session failed: {0}")]
    SessionFailed(FailureCause),
}

impl It100Error {
    /// Whether this error is transient and the connection should be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            It100Error::Io(_) | It100Error::ConnectionTimeout | It100Error::SessionFailed(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, It100Error>;
