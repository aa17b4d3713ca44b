//! Airlift server binary.

use airlift_core::config::AppConfig;
use airlift_server::{AppState, create_router};
use anyhow::{Context, Result};
use clap::Parser;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Airlift - chunked video upload server with coin settlement
#[derive(Parser, Debug)]
#[command(name = "airliftd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "AIRLIFT_CONFIG",
        default_value = "config/airlift.toml"
    )]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Airlift v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration: optional TOML file, overridable by AIRLIFT_*
    // environment variables (e.g. AIRLIFT_SERVER__BIND=0.0.0.0:9000).
    let mut figment = Figment::new();
    let config_path = std::path::Path::new(&args.config);
    if config_path.exists() {
        tracing::info!(config_path = %args.config, "Loading configuration from file");
        figment = figment.merge(Toml::file(&args.config));
    } else {
        tracing::debug!("No config file found at {}, using defaults", args.config);
    }
    let config: AppConfig = figment
        .merge(Env::prefixed("AIRLIFT_").split("__"))
        .extract()
        .context("failed to load configuration")?;

    // Register Prometheus metrics
    airlift_server::metrics::register_metrics();

    // Initialize the spool and the video library
    let (spool, library) = airlift_spool::from_config(&config.storage)
        .await
        .context("failed to initialize spool storage")?;
    tracing::info!(
        spool = %config.storage.spool_path.display(),
        library = %config.storage.library_path.display(),
        "Storage initialized"
    );

    // Initialize the metadata store
    let metadata = airlift_metadata::from_config(&config.metadata)
        .await
        .context("failed to initialize metadata store")?;
    metadata
        .health_check()
        .await
        .context("metadata store health check failed")?;
    tracing::info!(db = %config.metadata.path.display(), "Metadata store initialized");

    let reaper_enabled = config.reaper.enabled;
    let state = AppState::new(config.clone(), spool, library, metadata);

    // Spawn the stale-session reaper
    if reaper_enabled {
        let _reaper_handle = airlift_server::reaper::spawn_reaper(state.clone());
    } else {
        tracing::info!("Session reaper disabled");
    }

    let app = create_router(state);

    let addr: SocketAddr = config.server.bind.parse().context("invalid bind address")?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
