//! Exporter configuration.
//!
//! Layered with `figment`: built-in defaults, then an optional TOML file,
//! then `UNLEASHED_*` environment variables. The result translates into
//! the orchestrator's [`ScrapeSettings`].

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use unleashed_api::{TlsMode, TransportConfig};
use unleashed_core::{ScrapeSettings, SignalQualityMode};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── Config struct ───────────────────────────────────────────────────

/// Top-level exporter configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// HTTP listener address.
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,

    /// Per-call timeout for the three login steps.
    #[serde(default = "default_login_timeout")]
    pub login_timeout_secs: u64,

    /// Per-call timeout for status-document fetches.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// `https` for real devices; `http` for lab setups.
    #[serde(default = "default_scheme")]
    pub device_scheme: String,

    /// Skip certificate validation (devices ship self-signed certs).
    #[serde(default = "default_true")]
    pub accept_invalid_certs: bool,

    /// PEM CA bundle, used only when `accept_invalid_certs` is false.
    pub ca_cert: Option<PathBuf>,

    #[serde(default)]
    pub signal_quality_mode: SignalQualityMode,

    /// Grace period for in-flight probes on shutdown.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            login_timeout_secs: default_login_timeout(),
            fetch_timeout_secs: default_fetch_timeout(),
            device_scheme: default_scheme(),
            accept_invalid_certs: true,
            ca_cert: None,
            signal_quality_mode: SignalQualityMode::default(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 9105))
}
fn default_login_timeout() -> u64 {
    10
}
fn default_fetch_timeout() -> u64 {
    15
}
fn default_scheme() -> String {
    "https".into()
}
fn default_true() -> bool {
    true
}
fn default_shutdown_timeout() -> u64 {
    10
}

impl Config {
    /// Reject values the exporter cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("login_timeout_secs", self.login_timeout_secs),
            ("fetch_timeout_secs", self.fetch_timeout_secs),
            ("shutdown_timeout_secs", self.shutdown_timeout_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::Validation {
                    field: field.into(),
                    reason: "must be greater than zero".into(),
                });
            }
        }

        if !matches!(self.device_scheme.as_str(), "http" | "https") {
            return Err(ConfigError::Validation {
                field: "device_scheme".into(),
                reason: format!("expected http or https, got '{}'", self.device_scheme),
            });
        }

        Ok(())
    }

    fn tls_mode(&self) -> TlsMode {
        match (&self.ca_cert, self.accept_invalid_certs) {
            (_, true) => TlsMode::DangerAcceptInvalid,
            (Some(path), false) => TlsMode::CustomCa(path.clone()),
            (None, false) => TlsMode::System,
        }
    }

    /// Orchestrator settings derived from this config.
    pub fn scrape_settings(&self) -> ScrapeSettings {
        let base = TransportConfig {
            tls: self.tls_mode(),
            ..TransportConfig::default()
        };
        ScrapeSettings {
            scheme: self.device_scheme.clone(),
            login: base
                .clone()
                .with_timeout(Duration::from_secs(self.login_timeout_secs)),
            fetch: base.with_timeout(Duration::from_secs(self.fetch_timeout_secs)),
            signal_mode: self.signal_quality_mode,
        }
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the default config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("io", "unleashed", "unleashed").map_or_else(
        || PathBuf::from("unleashed").join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// The figment chain for `path` (or the default path): defaults, TOML
/// file if it exists, then `UNLEASHED_*` environment variables.
pub fn figment(path: Option<&Path>) -> Figment {
    let path = path.map_or_else(config_path, Path::to_path_buf);
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("UNLEASHED_").split("__"))
}

/// Load and validate the configuration.
///
/// An explicitly given file must exist; the default path is optional.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    if let Some(missing) = path.filter(|p| !p.exists()) {
        return Err(ConfigError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("config file not found: {}", missing.display()),
        )));
    }
    extract(&figment(path))
}

/// Extract and validate a [`Config`] from any figment.
pub fn extract(figment: &Figment) -> Result<Config, ConfigError> {
    let config: Config = figment.extract()?;
    config.validate()?;
    Ok(config)
}
