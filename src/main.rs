use std::{process, sync::Arc};

use tally::{
    application::{counters::CounterService, error::AppError},
    cache::{CounterCache, CounterCacheConfig},
    config,
    infra::{
        error::InfraError,
        http::{self, HttpState},
        store, telemetry,
    },
};
use tokio::signal;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (_cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    let remote = store::open(&settings.store).map_err(AppError::from)?;
    let cache = CounterCache::start(remote, CounterCacheConfig::from(&settings)).await;

    let counters = Arc::new(CounterService::new(cache.clone()));
    let result = serve_http(&settings, HttpState::new(counters)).await;

    match tokio::time::timeout(settings.server.graceful_shutdown, cache.shutdown()).await {
        Ok(Some(report)) if report.failed > 0 => warn!(
            target = "tally::main",
            failed = report.failed,
            "final flush left counters unsynchronized"
        ),
        Ok(_) => info!(target = "tally::main", "counter cache drained"),
        Err(_) => warn!(
            target = "tally::main",
            timeout_secs = settings.server.graceful_shutdown.as_secs(),
            "final flush did not finish before the shutdown deadline"
        ),
    }

    result
}

async fn serve_http(settings: &config::Settings, http_state: HttpState) -> Result<(), AppError> {
    let router = http::build_router(http_state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(target = "tally::main", addr = %settings.server.addr, "listening");

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(target = "tally::main", error = %err, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                error!(target = "tally::main", error = %err, "failed to install SIGTERM handler")
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!(target = "tally::main", "received SIGINT, shutting down"),
        _ = terminate => info!(target = "tally::main", "received SIGTERM, shutting down"),
    }
}
