use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use fbc_core::{
    cli::CalendarArgs,
    config::{CalendarConfig, FeedConfig},
};
use tokio::signal;
use tracing_subscriber::EnvFilter;

use crate::state::{spawn_scheduled_refresh, AppState};

mod cache;
mod route;
mod state;

/// Upper bound of the interval arguments, one year in minutes.
const MAX_MINUTES: i64 = 366 * 24 * 60;

/// Serve the team's matches as a subscribable calendar.
#[derive(Debug, Parser)]
pub struct Arguments {
    #[command(flatten)]
    pub calendar: CalendarArgs,
    /// the port to listen on
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,
    /// minutes between scheduled refreshes
    #[arg(
        long,
        env = "REFRESH_INTERVAL",
        default_value_t = 360,
        value_parser = clap::value_parser!(u64).range(1..=MAX_MINUTES as u64)
    )]
    pub refresh_interval: u64,
    /// minutes after which a request refreshes the calendar first
    #[arg(
        long,
        env = "STALE_AFTER",
        default_value_t = 60,
        value_parser = clap::value_parser!(i64).range(0..=MAX_MINUTES)
    )]
    pub stale_after: i64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
    let args = Arguments::parse();
    let state = Arc::new(AppState::from_feed(
        FeedConfig::from(&args.calendar),
        CalendarConfig::from(&args.calendar),
        chrono::Duration::minutes(args.stale_after),
    ));

    if state.refresh().await.ics.is_none() {
        tracing::warn!("starting without a calendar");
    }
    spawn_scheduled_refresh(
        state.clone(),
        Duration::from_secs(args.refresh_interval * 60),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    tracing::info!(%addr, "listening");
    axum::Server::try_bind(&addr)
        .with_context(|| format!("failed to bind {addr}"))?
        .serve(route::router(state).into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutting down");
}
