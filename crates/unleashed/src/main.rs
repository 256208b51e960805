mod cli;
mod error;

use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use unleashed::server::{self, AppState};
use unleashed_core::Scraper;

use crate::cli::{Cli, LogFormat};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.log_format);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8, format: LogFormat) {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init(),
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = unleashed_config::load_config(cli.config.as_deref())?;
    if let Some(listen) = cli.listen {
        config.listen = listen;
    }

    let settings = config.scrape_settings();
    info!(
        scheme = %settings.scheme,
        signal_mode = %settings.signal_mode,
        "exporter configured"
    );
    let state = AppState {
        scraper: Arc::new(Scraper::new(settings)),
    };

    let listener = TcpListener::bind(config.listen)
        .await
        .map_err(|source| CliError::Bind {
            addr: config.listen,
            source,
        })?;
    info!("listening on http://{}/probe", config.listen);

    server::serve(
        listener,
        state,
        server::shutdown_signal(),
        config.shutdown_timeout(),
    )
    .await
    .map_err(CliError::Serve)?;

    info!("server stopped");
    Ok(())
}
