//! Probe and health endpoints.

use std::future::{Future, IntoFuture};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::{Query, State},
    http::{
        HeaderMap, StatusCode,
        header::{AUTHORIZATION, CONTENT_TYPE, WWW_AUTHENTICATE},
    },
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};
use unleashed_core::{ProbeRequest, Scraper};

const REALM: &str = r#"Basic realm="Ruckus Exporter""#;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub scraper: Arc<Scraper>,
}

/// Build the router with all routes.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/probe", get(handle_probe))
        .route("/health", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct ProbeParams {
    pub target: Option<String>,
}

async fn handle_probe(
    State(state): State<AppState>,
    Query(params): Query<ProbeParams>,
    headers: HeaderMap,
) -> Response {
    let authorization = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());

    let request = match ProbeRequest::from_parts(params.target.as_deref(), authorization) {
        Ok(request) => request,
        Err(err) => {
            debug!(error = %err, "probe rejected");
            return (
                StatusCode::UNAUTHORIZED,
                [(WWW_AUTHENTICATE, REALM)],
                err.to_string(),
            )
                .into_response();
        }
    };

    match state.scraper.probe(&request).await {
        Ok(outcome) => {
            let status =
                StatusCode::from_u16(outcome.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (
                status,
                [(CONTENT_TYPE, unleashed_core::CONTENT_TYPE)],
                outcome.body,
            )
                .into_response()
        }
        Err(err) => {
            error!(target = %request.target, error = %err, "failed to render metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}

async fn handle_health() -> &'static str {
    "ok"
}

// ── Serving & shutdown ──────────────────────────────────────────────

/// Serve until `shutdown` resolves, then give in-flight probes up to
/// `grace` to finish before returning anyway.
pub async fn serve<F>(
    listener: TcpListener,
    state: AppState,
    shutdown: F,
    grace: Duration,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let (stopping_tx, mut stopping_rx) = watch::channel(false);
    let signal = async move {
        shutdown.await;
        let _ = stopping_tx.send(true);
    };

    let server = axum::serve(listener, router(state))
        .with_graceful_shutdown(signal)
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => return result,
        _ = stopping_rx.changed() => {}
    }

    info!(grace_secs = grace.as_secs(), "draining in-flight probes");
    if let Ok(result) = tokio::time::timeout(grace, server).await {
        result
    } else {
        warn!("shutdown grace period elapsed, dropping remaining connections");
        Ok(())
    }
}

/// Resolves on SIGINT, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received SIGINT"),
        () = terminate => info!("received SIGTERM"),
    }
}
