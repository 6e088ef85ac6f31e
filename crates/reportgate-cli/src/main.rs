mod report;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::report::{ReportArgs, SourceKind};

#[derive(Debug, Parser)]
#[command(name = "reportgate")]
#[command(about = "Build project reports and publish them only when they change")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Report on every project of a `SonarQube` server
    Sonarqube(ReportArgs),
    /// Report on every project of an Azure `DevOps` organization
    AzureDevops(ReportArgs),
}

impl Commands {
    fn split(&self) -> (SourceKind, &ReportArgs) {
        match self {
            Commands::Sonarqube(args) => (SourceKind::SonarQube, args),
            Commands::AzureDevops(args) => (SourceKind::AzureDevOps, args),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // `.env` must be loaded before parsing: `--url` and `--token` fall back to it.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = reportgate_core::load_app_config_from_env()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    // stdout is reserved for the dry-run report.
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let (kind, args) = cli.command.split();
    tracing::debug!(source = %kind, page_size = config.page_size, "starting report run");
    report::run_report(&config, kind, args, shutdown_signal()).await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::warn!("received shutdown signal, cancelling the run");
}
