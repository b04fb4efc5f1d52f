//! Error types for Nuve client operations.
//!
//! Only an HTTP 401 is turned into a typed failure. Every other status is
//! handed back to the caller as a response body.

/// Errors returned by [`crate::NuveClient`] operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The service rejected the MAuth header (bad key, replayed nonce, clock skew).
    #[error("unauthorized ({status} {reason})")]
    Unauthorized { status: u16, reason: String },

    /// HTTP transport error (connection refused, DNS, TLS, etc.).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Failure while reading the response body that did not come from the
    /// HTTP stack. Transport failures raised mid-body surface as [`Error::Http`].
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Request body could not be serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error (missing credentials, invalid builder state, etc.).
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Classify an error raised while reading a response body.
    ///
    /// The blocking `reqwest` body reader wraps its own errors (timeouts,
    /// dropped connections) in an `io::Error`; those are unwrapped back into
    /// [`Error::Http`].
    pub(crate) fn from_body_read(err: std::io::Error) -> Error {
        match err.downcast::<reqwest::Error>() {
            Ok(http) => Error::Http(http),
            Err(err) => Error::Io(err),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Unauthorized { .. })
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Unauthorized { status, .. } => Some(*status),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_display() {
        let err = Error::Unauthorized {
            status: 401,
            reason: "Unauthorized".to_string(),
        };
        assert!(err.is_unauthorized());
        assert_eq!(err.status(), Some(401));
        assert_eq!(err.to_string(), "unauthorized (401 Unauthorized)");
    }

    #[test]
    fn test_config_is_not_unauthorized() {
        let err = Error::Config("host is required".to_string());
        assert!(!err.is_unauthorized());
        assert_eq!(err.status(), None);
        assert!(err.to_string().contains("host is required"));
    }

    #[test]
    fn test_body_read_unwraps_http_error() {
        let http = reqwest::blocking::Client::new()
            .get("not a url")
            .build()
            .unwrap_err();
        let err = Error::from_body_read(std::io::Error::other(http));
        assert!(matches!(err, Error::Http(_)), "got {err:?}");
    }

    #[test]
    fn test_body_read_keeps_plain_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "truncated");
        match Error::from_body_read(io) {
            Error::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof),
            other => panic!("expected Io, got {other:?}"),
        }
    }
}
