//! SDS Tokens Dashboard
//! Mission: Show which design-token changes land on which ad surfaces, and when

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::{net::TcpListener, sync::watch};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sds_tokens_dashboard::{
    access::{AccessState, AllowlistStore, SessionHandler},
    api::build_router,
    config::{load_env, ACCESS_TOKEN_VAR},
    dashboard::spawn_refresh_loop,
    sources::{BigQueryClient, CredentialProvider, EnvCredential},
    sync::{run_sync, SyncOptions, DEFAULT_OUTPUT},
    Config, DashboardController,
};

/// SDS tokens dashboard backend
#[derive(Parser, Debug)]
#[command(name = "sds-dashboard")]
#[command(about = "Serve the SDS tokens dashboard and keep its data fresh")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API with periodic refresh (default)
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "PORT")]
        port: Option<u16>,

        /// Local export location (file path or http(s) URL)
        #[arg(long, env = "LOCAL_DATA_SOURCE")]
        local_data: Option<String>,

        /// Auto-refresh interval in seconds
        #[arg(long, env = "REFRESH_INTERVAL_SECS")]
        refresh_secs: Option<u64>,
    },

    /// Pull the latest BigQuery export into the local data file
    Sync {
        /// Output JSON file path
        #[arg(short, long, default_value = DEFAULT_OUTPUT)]
        output: PathBuf,

        /// Report how old the exported data is
        #[arg(short, long)]
        verify: bool,

        /// Minimal output
        #[arg(short, long)]
        quiet: bool,
    },

    /// Run the load chain once and print what loaded
    Load,
}

#[tokio::main]
async fn main() -> Result<()> {
    load_env();
    init_tracing();

    let cli = Cli::parse();
    let mut config = Config::from_env();

    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.remote_timeout_secs.max(1)))
        .build()
        .context("Failed to build HTTP client")?;

    match cli.command.unwrap_or(Commands::Serve {
        port: None,
        local_data: None,
        refresh_secs: None,
    }) {
        Commands::Serve {
            port,
            local_data,
            refresh_secs,
        } => {
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(local_data) = local_data {
                config.local_data_source = local_data;
            }
            if let Some(refresh_secs) = refresh_secs {
                config.refresh_interval_secs = refresh_secs;
            }
            serve(config, http_client).await
        }
        Commands::Sync {
            output,
            verify,
            quiet,
        } => sync(config, http_client, SyncOptions { output, verify, quiet }).await,
        Commands::Load => load_once(config, http_client).await,
    }
}

async fn serve(config: Config, http_client: reqwest::Client) -> Result<()> {
    info!("🚀 SDS Tokens Dashboard starting");

    let allowlist = AllowlistStore::new(&config.auth_db_path, &config.admin_email)?;
    if config.uses_dev_secret() {
        warn!("⚠️  SESSION_SECRET not set, using development secret");
    }
    let access = AccessState::new(allowlist, SessionHandler::new(config.session_secret.clone()));
    info!("🔐 Access allowlist at: {}", config.auth_db_path);

    let controller = Arc::new(DashboardController::new(config.source_chain(http_client)));

    // Startup load; failures are served as 503 until a retry succeeds.
    if let Err(e) = controller.refresh().await {
        error!("❌ Initial load failed: {}", e);
        if let Some(remediation) = e.remediation() {
            warn!("💡 {}", remediation);
        }
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let refresher = spawn_refresh_loop(controller.clone(), config.refresh_interval(), shutdown_rx);

    let app = build_router(controller, access);

    let addr = config.listen_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("🎯 API server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("🛑 Shutdown signal received");
            let _ = shutdown_tx.send(true);
        })
        .await
        .context("Server error")?;

    let _ = refresher.await;
    info!("👋 Dashboard stopped");
    Ok(())
}

async fn sync(config: Config, http_client: reqwest::Client, options: SyncOptions) -> Result<()> {
    if !options.quiet {
        println!("🔄 SDS Tokens Dashboard - BigQuery Sync");
        println!("{}", "=".repeat(50));
    }

    let client = BigQueryClient::new(http_client, config.bigquery);
    let token = EnvCredential::new(ACCESS_TOKEN_VAR).access_token();
    let report = run_sync(&client, token, &options).await?;

    if !options.quiet {
        println!("\n🎉 Sync completed successfully!");
        println!("📁 File updated: {}", report.output.display());
        if let Some(backup) = &report.backup {
            println!("📁 Previous file kept at: {}", backup.display());
        }
        println!(
            "📊 Records: {}",
            report
                .record_count
                .map(|c| c.to_string())
                .unwrap_or_else(|| "Unknown".to_string())
        );
        println!(
            "🕒 Last updated: {}",
            report
                .last_updated
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "Unknown".to_string())
        );
    }
    Ok(())
}

async fn load_once(config: Config, http_client: reqwest::Client) -> Result<()> {
    let chain = config.source_chain(http_client);
    match chain.load().await {
        Ok(outcome) => {
            println!(
                "✅ {} records from {} (as of {})",
                outcome.records.len(),
                outcome.origin.as_str(),
                outcome.as_of.to_rfc3339()
            );
            Ok(())
        }
        Err(e) => {
            if let Some(remediation) = e.remediation() {
                eprintln!("💡 {remediation}");
            }
            Err(e).context("Load failed")
        }
    }
}

/// Initialize tracing
/// Covers both the library and this binary's own targets.
const DEFAULT_LOG_FILTER: &str = "sds_tokens_dashboard=debug,sds_dashboard=debug,tower_http=debug";

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
