//! Sharebox -- self-hosted file sharing server.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

/// Command-line arguments for the Sharebox server.
#[derive(Parser, Debug)]
#[command(name = "sharebox", version, about = "Self-hosted file sharing server")]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, default_value = "sharebox.example.yaml")]
    config: String,

    /// Override the bind address (host:port).
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = sharebox::config::load_config(&cli.config)?;

    // Initialize tracing / logging.  The config itself carries the log
    // level and format, so nothing is logged before this point.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.logging.level.clone()));
    if config.logging.format == "json" {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    info!("Configuration loaded from {}", cli.config);

    let bind_addr = cli
        .bind
        .unwrap_or_else(|| format!("{}:{}", config.server.host, config.server.port));

    // Initialize Prometheus metrics recorder and register descriptions.
    if config.observability.metrics {
        sharebox::metrics::init_metrics();
        sharebox::metrics::describe_metrics();
        info!("Prometheus metrics initialized");
    }

    // Initialize the record store (SQLite).
    let db_path = &config.database.path;
    if let Some(parent) = std::path::Path::new(db_path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    let sqlite = sharebox::store::sqlite::SqliteFileStore::new(db_path)?;
    sqlite.seed_settings()?;
    info!("SQLite record store initialized at {}", db_path);

    let store: Arc<dyn sharebox::store::records::FileStore> = Arc::new(sqlite);

    // Initialize blob storage.
    let storage_root = &config.storage.root_dir;
    let storage: Arc<dyn sharebox::storage::backend::BlobStore> =
        Arc::new(sharebox::storage::local::LocalBlobStore::new(storage_root)?);
    info!("Local blob storage initialized at {}", storage_root);

    // Start the retention sweeper; the first sweep runs immediately so
    // every startup clears whatever expired while the server was down.
    let sweeper = sharebox::sweeper::spawn(
        store.clone(),
        storage.clone(),
        config.sweeper.interval_seconds,
        config.sweeper.orphan_grace_hours,
    );
    info!(
        "Retention sweeper started (interval {}s, orphan grace {}h)",
        config.sweeper.interval_seconds, config.sweeper.orphan_grace_hours
    );

    let state = sharebox::AppState::new(config, store, storage);
    let app = sharebox::server::router(state)
        .into_make_service_with_connect_info::<SocketAddr>();

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Sharebox listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(sharebox::server::shutdown_signal())
        .await?;

    sweeper.abort();
    info!("Sharebox shut down");

    Ok(())
}
