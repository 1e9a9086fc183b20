//! Pipeline Runtime - polling daemon for tracked social accounts
//!
//! This binary orchestrates the refresh pipeline:
//! - Initializes the SQLite database with schema
//! - Builds one platform client per enabled platform
//! - Spawns one polling loop per enabled platform
//! - Shuts down on CTRL+C
//!
//! Usage:
//!   cargo run --release --bin pipeline_runtime
//!
//! Environment variables:
//!   SOCIFLOW_DB_PATH - SQLite database path (default: /var/lib/sociflow/sociflow.db)
//!   ENABLE_INSTAGRAM / ENABLE_TIKTOK / ENABLE_YOUTUBE - platform switches (default: true)
//!   INSTAGRAM_POLL_INTERVAL_SECS - Instagram cycle spacing (default: 600)
//!   TIKTOK_POLL_INTERVAL_SECS / YOUTUBE_POLL_INTERVAL_SECS - cycle spacing (default: 3600)
//!   REFRESH_STALENESS_HOURS - refresh age threshold (default: 24)
//!   YOUTUBE_API_KEY - required when YouTube is enabled
//!
//! See `PipelineConfig::from_env` for the full list, including detector
//! threshold overrides.

use dotenv::dotenv;
use log::{error, info, warn};
use rusqlite::Connection;
use sociflow::pipeline::{
    client::{build_http_client, PlatformClient},
    config::PipelineConfig,
    db::{run_schema_migrations, MetricsStore, SqliteMetricsStore},
    detector::AnomalyDetector,
    engine::RefreshEngine,
    instagram::InstagramClient,
    tiktok::TikTokClient,
    types::Platform,
    youtube::YouTubeClient,
};
use std::sync::Arc;

fn spawn_platform_loop(
    platform: Platform,
    client: Arc<dyn PlatformClient>,
    store: Arc<dyn MetricsStore>,
    config: &PipelineConfig,
) -> tokio::task::JoinHandle<()> {
    let settings = config.platform_settings(platform).clone();
    let detector = AnomalyDetector::new(config.detector_config(platform));
    let engine = RefreshEngine::new(platform, client, store, detector, settings);

    tokio::spawn(async move {
        info!("   ├─ Starting {} polling loop", platform);
        engine.run(None).await;
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize environment and logging
    dotenv().ok();
    env_logger::init();

    info!("🚀 Sociflow Pipeline Runtime");

    // Load and validate configuration
    let config = PipelineConfig::from_env();
    if let Err(err) = config.validate() {
        error!("❌ Invalid configuration: {}", err);
        return Err(err.into());
    }

    info!("✅ Configuration loaded");
    info!("   ├─ Database: {}", config.db_path);
    info!(
        "   ├─ Instagram: {} (poll every {}s)",
        if config.instagram.enabled { "enabled" } else { "disabled" },
        config.instagram.poll_interval_secs
    );
    info!(
        "   ├─ TikTok: {} (poll every {}s)",
        if config.tiktok.enabled { "enabled" } else { "disabled" },
        config.tiktok.poll_interval_secs
    );
    info!(
        "   ├─ YouTube: {} (poll every {}s)",
        if config.youtube.enabled { "enabled" } else { "disabled" },
        config.youtube.poll_interval_secs
    );
    info!(
        "   └─ Staleness threshold: {}h",
        config.instagram.staleness_secs / 3_600
    );

    // Initialize database
    info!("🔧 Initializing database...");
    let conn = Connection::open(&config.db_path)?;
    run_schema_migrations(&conn)?;
    drop(conn); // Close temporary connection

    let store: Arc<dyn MetricsStore> = Arc::new(SqliteMetricsStore::new(&config.db_path)?);
    info!("✅ Database initialized");

    // Shared HTTP client; reqwest clients are cheap to clone
    let http = build_http_client(config.http_timeout_secs)?;

    info!("🚀 Spawning platform polling loops...");
    let mut loops = Vec::new();

    if config.instagram.enabled {
        let client: Arc<dyn PlatformClient> = Arc::new(InstagramClient::new(
            http.clone(),
            config.instagram_app_id.clone(),
            config.instagram_session_id.clone(),
        ));
        loops.push(spawn_platform_loop(
            Platform::Instagram,
            client,
            store.clone(),
            &config,
        ));
    }

    if config.tiktok.enabled {
        let client: Arc<dyn PlatformClient> = Arc::new(TikTokClient::new(
            http.clone(),
            config.tiktok_api_base.clone(),
        ));
        loops.push(spawn_platform_loop(
            Platform::TikTok,
            client,
            store.clone(),
            &config,
        ));
    }

    if config.youtube.enabled {
        // validate() already rejected the keyless case
        if let Some(api_key) = config.youtube_api_key.clone() {
            let client: Arc<dyn PlatformClient> =
                Arc::new(YouTubeClient::new(http.clone(), api_key));
            loops.push(spawn_platform_loop(
                Platform::YouTube,
                client,
                store.clone(),
                &config,
            ));
        }
    }

    if loops.is_empty() {
        warn!("⚠️  No platforms enabled, nothing to poll");
        return Ok(());
    }

    info!("✅ {} platform loop(s) running", loops.len());
    info!("🔄 Press CTRL+C to shutdown gracefully");

    // Wait for CTRL+C
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("⚠️  Received CTRL+C, shutting down...");
        }
        Err(err) => {
            error!("❌ Failed to listen for CTRL+C: {}", err);
        }
    }

    for handle in loops {
        handle.abort();
    }

    info!("✅ Pipeline runtime stopped");
    Ok(())
}
