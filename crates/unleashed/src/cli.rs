//! Clap derive structures for the `unleashed` binary.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// unleashed -- Prometheus exporter for Ruckus Unleashed Wi-Fi controllers
#[derive(Debug, Parser)]
#[command(
    name = "unleashed",
    version,
    about = "Prometheus exporter for Ruckus Unleashed Wi-Fi controllers",
    long_about = "Serves /probe?target=<host> with HTTP Basic credentials for the device.\n\
        Each probe logs in (or reuses a cached session), fetches AP and client\n\
        status, and answers with Prometheus text exposition."
)]
pub struct Cli {
    /// Config file path (defaults to the platform config directory)
    #[arg(long, short = 'c', env = "UNLEASHED_CONFIG")]
    pub config: Option<PathBuf>,

    /// Listen address (overrides the config file)
    #[arg(long, short = 'l')]
    pub listen: Option<SocketAddr>,

    /// Increase verbosity (-v, -vv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log output format
    #[arg(long, env = "UNLEASHED_LOG_FORMAT", default_value = "text")]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}
