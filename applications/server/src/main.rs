/// Vuvur Server - self-hosted media gallery
use clap::{Parser, Subcommand};
use std::{net::SocketAddr, path::PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vuvur_core::settings::SettingsResolver;
use vuvur_scanner::ScanOutcome;
use vuvur_server::{api, config::ServerConfig, state, state::AppState};

#[derive(Parser)]
#[command(name = "vuvur-server")]
#[command(about = "Vuvur self-hosted media gallery", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server and the background scanner
    Serve {
        /// Configuration file path
        #[arg(short, long, env = "VUVUR_CONFIG")]
        config: Option<PathBuf>,
    },
    /// Run one guarded scan cycle and exit
    Scan {
        /// Configuration file path
        #[arg(short, long, env = "VUVUR_CONFIG")]
        config: Option<PathBuf>,
        /// Only scan if the initial scan has never completed
        #[arg(long)]
        initial: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "vuvur_server=info,vuvur_scanner=info,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config } => {
            serve(config).await?;
        }
        Commands::Scan { config, initial } => {
            scan_once(config, initial).await?;
        }
    }

    Ok(())
}

async fn load_config(path: Option<PathBuf>) -> anyhow::Result<(ServerConfig, sqlx::SqlitePool)> {
    let config = ServerConfig::load(path.as_deref())?;
    config.validate()?;

    tokio::fs::create_dir_all(&config.storage.data_dir).await?;

    // Initialize database
    let pool = vuvur_storage::create_pool(&config.storage.database_url).await?;
    vuvur_storage::run_migrations(&pool).await?;
    tracing::info!("Database connected");

    Ok((config, pool))
}

async fn serve(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let (config, pool) = load_config(config_path).await?;

    tracing::info!("Starting Vuvur Server");
    tracing::info!("Host: {}", config.server.host);
    tracing::info!("Port: {}", config.server.port);
    tracing::info!("Media roots: {:?}", config.library.roots);

    // Environment overrides are captured once and lock their keys
    let resolver = SettingsResolver::from_env();
    if !resolver.locked_keys().is_empty() {
        tracing::info!("Settings locked by environment: {:?}", resolver.locked_keys());
    }

    let addr = SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>()?,
        config.server.port,
    ));

    // Build application state
    let app_state = AppState::build(config, pool, resolver).await?;

    // Initial scan (once per data directory), then periodic scans
    let scheduler = app_state.scheduler().spawn();

    // Build router
    let app = api::router(app_state);

    tracing::info!("Server listening on {}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.abort();
    tracing::info!("Server stopped");

    Ok(())
}

async fn scan_once(config_path: Option<PathBuf>, initial: bool) -> anyhow::Result<()> {
    let (config, pool) = load_config(config_path).await?;

    let extractor = state::default_extractor(&config);
    let guard = state::scan_guard(&config, pool, extractor);

    let outcome = if initial {
        guard.run_initial().await?
    } else {
        guard.run_once().await?
    };

    match outcome {
        ScanOutcome::Completed(summary) => {
            tracing::info!(
                "Scan complete: {} discovered, {} inserted, {} updated, {} deleted, {} failed in {:?}",
                summary.discovered,
                summary.inserted,
                summary.updated,
                summary.deleted,
                summary.failed,
                summary.elapsed
            );
        }
        ScanOutcome::Skipped(reason) => tracing::warn!("Scan skipped: {}", reason),
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
