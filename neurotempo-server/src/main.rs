//! neurotempo-server - EEG-driven music recommendation service
//!
//! Turns an uploaded EEG band-power recording into a target tempo, a genre and
//! a song list, and runs live mental-state analysis sessions over HTTP,
//! WebSocket and SSE.

use anyhow::{Context, Result};
use clap::Parser;
use neurotempo_common::config::{
    default_config_path, load_toml_config, CompiledDefaults, RootFolderInitializer,
    RootFolderResolver, TomlConfig,
};
use neurotempo_common::events::EventBus;
use neurotempo_server::services::{GeminiClient, SharedGateway, YoutubeClient};
use neurotempo_server::AppState;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const MODULE_NAME: &str = "neurotempo";

/// Command-line arguments for neurotempo-server
#[derive(Parser, Debug)]
#[command(name = "neurotempo-server")]
#[command(about = "EEG-driven music recommendation service")]
#[command(version)]
struct Args {
    /// Port to listen on (falls back to TOML, then 8008)
    #[arg(short, long, env = "NEUROTEMPO_PORT")]
    port: Option<u16>,

    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: IpAddr,

    /// Root folder holding the database and uploads
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// TOML config file (default: <config_dir>/neurotempo/neurotempo.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn init_tracing(config: &TomlConfig) -> Result<()> {
    let level = &config.logging.level;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("neurotempo_server={level},neurotempo_common={level},tower_http={level}"))
    });

    let file_layer = match &config.logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(fmt::layer().with_ansi(false).with_writer(std::sync::Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_path = args
        .config
        .clone()
        .or_else(|| default_config_path(MODULE_NAME))
        .unwrap_or_else(|| PathBuf::from("neurotempo.toml"));
    let toml_config = load_toml_config(&toml_path)
        .with_context(|| format!("Failed to load config {}", toml_path.display()))?;

    init_tracing(&toml_config)?;

    info!("Starting neurotempo-server");
    info!("Version: {} ({})", env!("CARGO_PKG_VERSION"), env!("GIT_HASH"));
    info!("Config file: {}", toml_path.display());

    // Root folder: CLI → ENV → TOML → OS default
    let root_folder = RootFolderResolver::new(MODULE_NAME)
        .with_cli_arg(args.root_folder.clone())
        .with_config_path(Some(toml_path.clone()))
        .resolve();

    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;
    info!("Root folder: {}", initializer.root_folder().display());

    let db_path = initializer.database_path();
    let db_pool = neurotempo_server::db::init_database_pool(&db_path)
        .await
        .context("Failed to open database")?;
    info!("Database: {}", db_path.display());

    // Provider keys: Database → ENV → TOML
    let gemini_key = neurotempo_server::config::resolve_gemini_api_key(&db_pool, &toml_config).await?;
    let youtube_key =
        neurotempo_server::config::resolve_youtube_api_key(&db_pool, &toml_config).await?;

    let gemini = GeminiClient::new(gemini_key, &toml_config.gateway)
        .context("Failed to build Gemini client")?;
    let youtube = YoutubeClient::new(youtube_key).context("Failed to build YouTube client")?;

    let event_bus = EventBus::new(100);

    let state = AppState::new(
        db_pool,
        event_bus,
        SharedGateway::new(Arc::new(gemini)),
        youtube,
        &toml_config,
        initializer.upload_dir(),
        toml_path,
    );
    let sessions = Arc::clone(&state.sessions);

    let app = neurotempo_server::build_router(state);

    let port = args
        .port
        .or(toml_config.port)
        .unwrap_or(CompiledDefaults::for_current_platform().port);
    let addr = SocketAddr::new(args.host, port);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if let Some(session_id) = sessions.stop().await {
        info!(session_id = %session_id, "Stopped running session on shutdown");
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
