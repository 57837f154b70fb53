//! AERIS scheduler service.
//!
//! Cron-style hourly triggering of ingestion -> UPES compute -> saved-route
//! scoring -> alert pipeline, plus a status/health HTTP surface.

mod config;
mod scheduler;
mod server;
mod state;
mod tasks;

use std::sync::Arc;

use clap::Parser;
use tokio::sync::broadcast;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use config::WorkerConfig;
use scheduler::Scheduler;
use state::AppState;

#[derive(Parser, Debug)]
#[command(name = "aeris-worker")]
#[command(about = "AERIS scheduler: hourly ingestion, UPES compute, route scoring, and alerts")]
struct Args {
    /// Run every scheduled task once and exit, instead of polling forever.
    #[arg(long)]
    once: bool,

    /// Postgres connection string.
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// Redis connection string; omit to run with caching disabled.
    #[arg(long, env = "REDIS_URL")]
    redis_url: Option<String>,

    /// Weather provider API key, reserved for a future HTTP-backed
    /// `WeatherProvider` (not wired in this build).
    #[arg(long, env = "WEATHER_API_KEY")]
    weather_api_key: Option<String>,

    /// Log level.
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Port for the status HTTP server.
    #[arg(long, env = "STATUS_PORT", default_value = "8090")]
    status_port: u16,

    /// Disable the status HTTP server.
    #[arg(long)]
    no_status_server: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .json()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("starting aeris-worker");

    let worker_config = WorkerConfig::from_env(
        args.database_url.clone(),
        args.redis_url.clone(),
        args.weather_api_key.clone(),
    );
    if let Err(e) = worker_config.validate() {
        tracing::error!(error = %e, "invalid configuration at startup");
        std::process::exit(1);
    }

    let state = match AppState::new(worker_config).await {
        Ok(state) => Arc::new(state),
        Err(e) => {
            tracing::error!(error = %e, "failed to initialize application state");
            std::process::exit(1);
        }
    };

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    if !args.no_status_server && !args.once {
        let server_state = state.clone();
        let status_port = args.status_port;
        tokio::spawn(async move {
            if let Err(e) = server::run_server(server_state, status_port).await {
                tracing::error!(error = %e, "status server failed");
            }
        });
    }

    if args.once {
        info!("running each scheduled task once");
        Scheduler::new(state).run_all_once().await;
    } else {
        info!("starting continuous scheduling");

        let shutdown_tx_clone = shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            info!("received shutdown signal");
            shutdown_tx_clone.send(()).ok();
        });

        let mut scheduler = Scheduler::new(state);
        scheduler.run_forever(shutdown_tx.subscribe()).await;
    }

    Ok(())
}
