//! Relay CI server binary — webhook intake, build orchestration, history API.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;

use relay_ci_server::config::CiConfig;
use relay_ci_server::metrics;
use relay_ci_server::routes::{self, CiRouterState};
use relay_ci_server::services::github_service::GithubStatusReporter;
use relay_ci_server::services::orchestrator::Orchestrator;
use relay_ci_server::services::runner::ShellRunner;
use relay_ci_server::store::BuildStore;

#[derive(Parser)]
#[command(name = "relay-ci", about = "Minimal CI orchestrator for GitHub pushes")]
struct Cli {
    /// Server port
    #[arg(short, long, env = "CI_PORT", default_value = "9090")]
    port: u16,

    /// Path of the build history file
    #[arg(long, env = "CI_HISTORY_FILE", default_value = "./build_history.json")]
    history_file: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    if log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "info".into()),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "info".into()),
            )
            .init();
    }

    let cli = Cli::parse();
    let config = CiConfig::from_env();

    tracing::info!("Starting Relay CI server...");

    let store = Arc::new(BuildStore::load(&cli.history_file).await?);
    let runner = Arc::new(ShellRunner::from_config(&config));
    let reporter = Arc::new(GithubStatusReporter::from_config(&config));
    let orchestrator = Arc::new(Orchestrator::new(
        store.clone(),
        runner,
        reporter,
        config.local,
    ));

    let app = routes::ci_router(CiRouterState {
        store,
        orchestrator,
    });

    metrics::init_metrics();

    let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));
    tracing::info!("Relay CI server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
