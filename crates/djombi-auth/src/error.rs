//! Error types for session and profile operations.

use std::io;

/// Result type alias for session and profile operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Session and profile error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// HTTP transport error (timeout, DNS, connection reset...).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Non-success HTTP status returned by the remote service.
    #[error("HTTP {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Upstream message, or the canonical reason phrase.
        message: String,
    },

    /// The request was rejected with 401 and could not be recovered by a refresh.
    #[error("Unauthorized")]
    Unauthorized,

    /// No Adafri token is stored, so no Djombi token can be minted.
    #[error("No Adafri token available")]
    NoAdafriToken,

    /// Profile payload did not have the expected shape.
    #[error("Invalid profile response: {0}")]
    InvalidResponse(String),

    /// Transport failure not covered by the other variants, or one shared
    /// with callers that waited on the same request.
    #[error("Transport error: {0}")]
    Transport(String),

    /// URL parsing error.
    #[error("URL error: {0}")]
    UrlError(#[from] url::ParseError),
}

impl Error {
    /// Creates a status error from a code and message.
    #[must_use]
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    /// Returns the HTTP status carried by this error, if any.
    #[must_use]
    pub const fn http_status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Unauthorized => Some(401),
            _ => None,
        }
    }

    /// Rebuilds this error for callers that waited on the same request.
    ///
    /// Status, auth and payload errors keep their variant; source-carrying
    /// errors collapse to [`Error::Transport`] with the rendered message.
    #[must_use]
    pub fn replay(&self) -> Self {
        match self {
            Self::Status { status, message } => Self::status(*status, message.clone()),
            Self::Unauthorized => Self::Unauthorized,
            Self::NoAdafriToken => Self::NoAdafriToken,
            Self::InvalidResponse(message) => Self::InvalidResponse(message.clone()),
            Self::Transport(message) => Self::Transport(message.clone()),
            other => Self::Transport(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replay_keeps_status() {
        let replayed = Error::status(500, "boom").replay();
        assert!(matches!(
            replayed,
            Error::Status { status: 500, ref message } if message == "boom"
        ));
        assert_eq!(Error::Unauthorized.replay().http_status(), Some(401));

        let io = Error::Io(io::Error::new(io::ErrorKind::TimedOut, "timed out"));
        assert!(matches!(io.replay(), Error::Transport(m) if m == "I/O error: timed out"));
    }
}
