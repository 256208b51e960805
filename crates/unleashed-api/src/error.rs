use thiserror::Error;

/// Top-level error type for the `unleashed-api` crate.
///
/// Covers every failure mode of talking to a device: the login sequence,
/// transport, HTTP status, and document parsing. `unleashed-core` maps
/// these into probe-level failure kinds.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login sequence failed (rejected form post, missing CSRF token, etc.)
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The device answered with its login page instead of the requested data.
    #[error("Session expired -- re-authentication required")]
    SessionExpired,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// TLS setup or HTTP client construction error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// Non-success HTTP status from a device endpoint.
    #[error("HTTP {status} from {path}")]
    Http { status: u16, path: String },

    // ── Data ────────────────────────────────────────────────────────
    /// Response body was not well-formed XML.
    #[error("XML parse error: {message}")]
    Xml { message: String },
}

impl Error {
    /// Returns `true` if this error means the cached session is no longer
    /// usable and the next probe must log in again.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }

    /// Map a `reqwest` failure, promoting timeouts to [`Error::Timeout`].
    pub(crate) fn from_reqwest(err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            Self::Timeout { timeout_secs }
        } else {
            Self::Transport(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_session_expired_counts_as_auth_expired() {
        assert!(Error::SessionExpired.is_auth_expired());
        assert!(
            !Error::Authentication {
                message: "bad password".into()
            }
            .is_auth_expired()
        );
        assert!(!Error::Timeout { timeout_secs: 15 }.is_auth_expired());
    }
}
