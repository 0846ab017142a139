//! Mix Review server (mixreview-server) - Main entry point
//!
//! Collaborative audio review: an admin panel behind bearer tokens and
//! share-link pages for collaborators.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use mixreview_common::config::{
    resolve_secret_key, CompiledDefaults, RootFolderInitializer, RootFolderResolver, SecretSource,
    TomlConfig, DEFAULT_MAX_UPLOAD_MB,
};
use mixreview_common::credentials::TokenSigner;
use mixreview_common::db::init_database;
use mixreview_common::storage::MediaStore;
use mixreview_server::{build_router, AppState};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for mixreview-server
#[derive(Parser, Debug)]
#[command(name = "mixreview-server")]
#[command(about = "Collaborative audio review server")]
#[command(version)]
struct Args {
    /// Root folder holding the database and uploads
    #[arg(short, long, env = "MIXREVIEW_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Port to listen on [default: 8000]
    #[arg(short, long, env = "MIXREVIEW_PORT")]
    port: Option<u16>,

    /// Address to bind [default: 127.0.0.1]
    #[arg(long, env = "MIXREVIEW_HOST")]
    host: Option<String>,

    /// Path to config.toml
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mixreview_server=info,mixreview_common=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Build identification first, before any slow startup step
    info!(
        "Starting Mix Review (mixreview-server) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();
    let toml = TomlConfig::load(args.config.as_deref());
    let defaults = CompiledDefaults::for_current_platform();

    let root_folder = RootFolderResolver::new(args.root_folder.clone(), toml.clone()).resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to create root folder")?;
    info!("Root folder: {}", initializer.root_folder().display());

    let db_path = initializer.database_path();
    info!("Database path: {}", db_path.display());

    let pool = match init_database(&db_path).await {
        Ok(pool) => {
            info!("✓ Database ready");
            pool
        }
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            return Err(e.into());
        }
    };

    let (secret, source) = resolve_secret_key(&toml);
    match source {
        SecretSource::Environment => info!("Token secret loaded from environment"),
        SecretSource::ConfigFile => info!("Token secret loaded from config file"),
        SecretSource::DevelopmentDefault => {
            warn!("No token secret configured; using the development default. Set MIXREVIEW_SECRET_KEY in production.")
        }
    }

    let max_upload_mb = toml.max_upload_mb.unwrap_or(DEFAULT_MAX_UPLOAD_MB);
    let max_upload_bytes = usize::try_from(max_upload_mb.saturating_mul(1024 * 1024)).unwrap_or(usize::MAX);

    let state = AppState::new(
        pool,
        MediaStore::new(initializer.uploads_dir()),
        TokenSigner::new(&secret),
        max_upload_bytes,
    );
    let app = build_router(state);

    let host = args.host.or(toml.host).unwrap_or(defaults.host);
    let port = args.port.or(toml.port).unwrap_or(defaults.port);
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", host, port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("mixreview-server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
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
