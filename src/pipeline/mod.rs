//! Metrics refresh pipeline
//!
//! One pipeline instance per platform polls tracked accounts, derives
//! engagement metrics against stored history, classifies anomalies, and
//! persists the results. The database is the only state shared between
//! platform pipelines.
//!
//! ## Architecture
//!
//! ```text
//! MetricsStore (influencers table)
//!     ↓ list_tracked_entities
//! RefreshEngine (staleness check per entity)
//!     ↓ fetch_profile / fetch_recent_posts
//! PlatformClient (Instagram / TikTok / YouTube)
//!     ↓ Snapshot
//! aggregate() → AnomalyDetector
//!     ↓ MetricsRecord
//! MetricsStore (history append + state/post upserts, one tx per entity)
//! ```
//!
//! ## Module Organization
//!
//! - `types` - Core data structures (Snapshot, MetricsRecord, EntityState)
//! - `aggregator` - Pure metric derivation from a snapshot + prior record
//! - `detector` - Threshold-configured spike detection over history windows
//! - `scheduler` - Staleness decisions and poll-interval jitter
//! - `client` - PlatformClient trait + error taxonomy
//! - `instagram` / `tiktok` / `youtube` - HTTP adapters per platform
//! - `db` - MetricsStore trait + SQLite implementation
//! - `engine` - RefreshEngine polling loop
//! - `config` - Environment configuration
//! - `retry` - Bounded exponential backoff

pub mod aggregator;
pub mod client;
pub mod config;
pub mod db;
pub mod detector;
pub mod engine;
pub mod instagram;
pub mod retry;
pub mod scheduler;
pub mod tiktok;
pub mod types;
pub mod youtube;

// Re-export commonly used types
pub use aggregator::aggregate;
pub use client::{PlatformClient, PlatformError};
pub use config::{PipelineConfig, PlatformSettings};
pub use db::{run_schema_migrations, MetricsStore, SqliteMetricsStore, StoreError};
pub use detector::{AnomalyDetector, DetectorConfig};
pub use engine::{CycleSummary, RefreshEngine};
pub use scheduler::due_for_refresh;
pub use types::{
    AggregatedMetrics, EntityState, MetricsRecord, Platform, PostSnapshot, ProfileSnapshot,
    Snapshot, TrackedEntity,
};
