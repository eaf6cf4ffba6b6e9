//! attn-svc - Attendance Reconciliation Service
//!
//! Startup sequence:
//! 1. Tracing, then build identification
//! 2. Config: CLI > environment > TOML > compiled defaults
//! 3. Root folder, database, schema migrations
//! 4. Sheet (created if missing) and legacy date-header migration
//! 5. Photo folder
//! 6. HTTP server with graceful shutdown on Ctrl-C

use anyhow::{Context, Result};
use attn_common::config::{
    default_config_path, load_toml_config, RootFolderInitializer, TomlConfig,
};
use attn_common::db::init_database;
use attn_common::time::ZonedClock;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use attn_svc::blob::FolderBlobStore;
use attn_svc::config::{ConfigOverrides, ServiceConfig};
use attn_svc::lock::SheetLock;
use attn_svc::reconcile::ReconciliationService;
use attn_svc::sheet::SqliteSheetStore;
use attn_svc::{build_router, AppState};

#[derive(Parser, Debug)]
#[command(name = "attn-svc")]
#[command(about = "Kiosk attendance reconciliation service", long_about = None)]
#[command(version)]
struct Args {
    /// TOML config file (default: <config dir>/attn/attn-svc.toml)
    #[arg(short, long, env = "ATTN_CONFIG")]
    config: Option<PathBuf>,

    /// Folder holding the database and photo folder
    #[arg(long, env = "ATTN_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Address to listen on
    #[arg(long, env = "ATTN_BIND")]
    bind: Option<String>,

    #[arg(short, long, env = "ATTN_PORT")]
    port: Option<u16>,

    /// Attendance sheet name
    #[arg(long, env = "ATTN_SHEET_NAME")]
    sheet_name: Option<String>,

    /// Photo folder name inside the root folder
    #[arg(long, env = "ATTN_PHOTO_FOLDER")]
    photo_folder: Option<String>,

    /// Base URL kiosks and operators use to reach this service
    #[arg(long, env = "ATTN_PUBLIC_BASE_URL")]
    public_base_url: Option<String>,

    /// Seconds to wait for the sheet lock before answering "server busy"
    #[arg(long, env = "ATTN_LOCK_TIMEOUT_SECS")]
    lock_timeout_secs: Option<u64>,

    /// IANA time zone used to decide "today"
    #[arg(long, env = "ATTN_TIME_ZONE")]
    time_zone: Option<String>,

    /// Maximum request body size in bytes
    #[arg(long, env = "ATTN_BODY_LIMIT_BYTES")]
    body_limit_bytes: Option<usize>,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            root_folder: self.root_folder.clone(),
            bind: self.bind.clone(),
            port: self.port,
            sheet_name: self.sheet_name.clone(),
            photo_folder: self.photo_folder.clone(),
            public_base_url: self.public_base_url.clone(),
            lock_timeout_secs: self.lock_timeout_secs,
            time_zone: self.time_zone.clone(),
            body_limit_bytes: self.body_limit_bytes,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // The TOML file may set the log level, so read it before tracing exists.
    // Its own warnings are replayed once logging is up.
    let config_path = args.config.clone().or_else(default_config_path);
    let toml_result = match &config_path {
        Some(path) => load_toml_config(path).map(Some),
        None => Ok(None),
    };

    let default_level = match &toml_result {
        Ok(Some(toml)) => toml.log_level(),
        _ => TomlConfig::default().log_level(),
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(format!(
                    "attn_svc={},attn_common={},tower_http={}",
                    default_level, default_level, default_level
                ))
            }),
        )
        .init();

    info!(
        "Starting attn-svc (Attendance Reconciliation) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let toml = toml_result
        .context("Failed to load config file")?
        .unwrap_or_default();
    match &config_path {
        Some(path) if path.exists() => info!("Config file: {}", path.display()),
        Some(path) => warn!("Config file {} not found, using defaults", path.display()),
        None => warn!("No config directory on this platform, using defaults"),
    }

    let config = ServiceConfig::resolve(args.overrides(), &toml)
        .context("Invalid configuration")?;

    let initializer = RootFolderInitializer::new(config.root_folder.clone());
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;

    let db_path = initializer.database_path();
    info!("Database: {}", db_path.display());
    let pool = init_database(&db_path).await?;

    let sheets = SqliteSheetStore::new(pool, config.sheet_name.clone());
    if sheets.create_sheet().await? {
        warn!("Sheet '{}' did not exist and was created empty", config.sheet_name);
    }
    let normalized = sheets.normalize_date_headers().await?;
    if normalized > 0 {
        info!(normalized, "Rewrote legacy date headers as text labels");
    }

    let photo_folder = initializer.photo_folder(&config.photo_folder)?;
    let blobs = FolderBlobStore::new(photo_folder, &config.public_base_url);
    blobs.ensure_folder().await?;
    info!("Photo folder: {}", blobs.folder().display());

    let blobs = Arc::new(blobs);
    let service = ReconciliationService::new(
        Arc::new(sheets),
        blobs.clone(),
        SheetLock::new(config.lock_timeout),
        Arc::new(ZonedClock::new(config.time_zone)),
    );
    info!(
        sheet = %config.sheet_name,
        time_zone = %config.time_zone,
        lock_timeout_secs = config.lock_timeout.as_secs(),
        "Reconciliation service ready"
    );

    let state = AppState::new(Arc::new(service), blobs, config.body_limit_bytes);
    let app = build_router(state);

    let addr = config.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("attn-svc listening on http://{}", addr);
    info!("Public base URL: {}", config.public_base_url);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("attn-svc stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
