//! Startup error types with miette diagnostics.

use std::net::SocketAddr;

use miette::Diagnostic;
use thiserror::Error;

use unleashed_config::ConfigError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const CONFIG: i32 = 2;
    pub const BIND: i32 = 3;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Configuration ────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(
        code(unleashed::validation),
        help("Fix the value in the config file or the UNLEASHED_* environment variable.")
    )]
    Validation { field: String, reason: String },

    #[error("Failed to load configuration")]
    #[diagnostic(
        code(unleashed::config),
        help("Default config location: {path}")
    )]
    Config {
        path: String,
        #[source]
        source: ConfigError,
    },

    // ── Listener ─────────────────────────────────────────────────────

    #[error("Could not listen on {addr}")]
    #[diagnostic(
        code(unleashed::bind_failed),
        help("Is another exporter already running? Pick another port with --listen.")
    )]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP server failed")]
    #[diagnostic(code(unleashed::serve))]
    Serve(#[source] std::io::Error),
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config {
                path: unleashed_config::config_path().display().to_string(),
                source: other,
            },
        }
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Validation { .. } | Self::Config { .. } => exit_code::CONFIG,
            Self::Bind { .. } => exit_code::BIND,
            Self::Serve(_) => exit_code::GENERAL,
        }
    }
}
