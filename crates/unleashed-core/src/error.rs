// ── Core error types ──
//
// Probe-level failure kinds. Transport errors from `unleashed-api` are
// folded into these at the orchestrator boundary; nothing here ever
// escapes as a process fault.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No target, or no usable Basic credentials. No upstream call is made.
    #[error("Missing input: {reason}")]
    MissingInput { reason: String },

    /// The login sequence failed at some step; nothing was cached.
    #[error("Authentication failed: {message}")]
    Auth { message: String },

    /// The device rejected a cached session mid-fetch. The session has
    /// been evicted; the next probe logs in again.
    #[error("Session expired -- next probe will re-authenticate")]
    SessionExpired,

    /// Network, timeout, HTTP status or parse failure while fetching.
    #[error("Upstream error: {message}")]
    Upstream { message: String },

    /// Metric registration failed.
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

impl CoreError {
    /// HTTP status the probe endpoint answers with for this failure.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MissingInput { .. } | Self::Auth { .. } => 401,
            Self::SessionExpired | Self::Upstream { .. } | Self::Metrics(_) => 500,
        }
    }

    pub(crate) fn missing(reason: impl Into<String>) -> Self {
        Self::MissingInput {
            reason: reason.into(),
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<unleashed_api::Error> for CoreError {
    fn from(err: unleashed_api::Error) -> Self {
        use unleashed_api::Error as Api;
        match err {
            Api::Authentication { message } => Self::Auth { message },
            Api::SessionExpired => Self::SessionExpired,
            other => Self::Upstream {
                message: other.to_string(),
            },
        }
    }
}
