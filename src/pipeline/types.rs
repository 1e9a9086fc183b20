//! Core data structures shared across the refresh pipeline
//!
//! Everything here is plain data: snapshots produced by platform clients,
//! derived metrics produced by the aggregator, and the rows the store
//! persists. No I/O.

use serde::{Deserialize, Serialize};

/// Current Unix timestamp in seconds
pub fn current_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Platform a tracked account lives on
///
/// Also selects the per-platform recent-post window size and the handle
/// column in the `influencers` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    Instagram,
    TikTok,
    YouTube,
}

impl Platform {
    /// Stable lowercase identifier used in database rows and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Instagram => "instagram",
            Platform::TikTok => "tiktok",
            Platform::YouTube => "youtube",
        }
    }

    /// How many recent posts a refresh pulls for this platform
    pub fn post_window(&self) -> usize {
        match self {
            Platform::Instagram => 10,
            Platform::TikTok => 5,
            Platform::YouTube => 10,
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Malformed or incomplete record coming out of a platform response
#[derive(Debug)]
pub enum DataError {
    MissingField(&'static str),
    InvalidValue { field: &'static str, value: String },
}

impl std::fmt::Display for DataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataError::MissingField(field) => write!(f, "missing field: {}", field),
            DataError::InvalidValue { field, value } => {
                write!(f, "invalid value for {}: {}", field, value)
            }
        }
    }
}

impl std::error::Error for DataError {}

/// Raw profile figures for one account, normalized from a platform response
///
/// `total_views` is the account-level cumulative view count (YouTube channel
/// views); platforms that do not report one leave it 0. Optional fields are
/// platform-dependent extras.
#[derive(Debug, Clone, Default)]
pub struct ProfileSnapshot {
    pub follower_count: i64,
    pub following_count: i64,
    pub media_count: i64,
    pub total_views: i64,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub profile_pic_url: Option<String>,
    pub website_url: Option<String>,
    pub is_verified: bool,
    pub account_type: Option<String>,
}

/// One recent post (or video) with its engagement counters
#[derive(Debug, Clone, Default)]
pub struct PostSnapshot {
    pub post_id: String,
    /// Unix seconds; None when the platform response omits it
    pub posted_at: Option<i64>,
    pub caption: Option<String>,
    pub media_type: Option<String>,
    pub like_count: i64,
    pub comment_count: i64,
    pub view_count: i64,
}

/// Point-in-time pull of one entity: profile plus recent posts
///
/// Immutable once assembled. `recent_posts` is most-recent-first and bounded
/// to the platform's post window.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub entity_id: i64,
    pub platform: Platform,
    /// Unix seconds at capture time
    pub captured_at: i64,
    pub profile: ProfileSnapshot,
    pub recent_posts: Vec<PostSnapshot>,
}

impl Snapshot {
    /// Assemble a snapshot from fetched parts, truncating posts to `window`
    ///
    /// Callers supply posts most-recent-first (the order platform feeds
    /// return them in).
    pub fn assemble(
        entity_id: i64,
        platform: Platform,
        captured_at: i64,
        profile: ProfileSnapshot,
        mut posts: Vec<PostSnapshot>,
        window: usize,
    ) -> Self {
        posts.truncate(window);
        Self {
            entity_id,
            platform,
            captured_at,
            profile,
            recent_posts: posts,
        }
    }
}

/// Engagement figures derived from one snapshot against the prior record
///
/// Produced by [`crate::pipeline::aggregate`]; pure data.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AggregatedMetrics {
    pub total_likes: i64,
    pub total_comments: i64,
    pub avg_likes: i64,
    pub avg_comments: i64,
    pub engagement_rate: f64,
    pub growth_rate: f64,
}

/// One immutable row of the `influencer_history` audit trail
///
/// Never updated after insertion; anomaly detection reads windows of these.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsRecord {
    pub entity_id: i64,
    pub platform: Platform,
    /// Unix seconds of the refresh that produced this row
    pub timestamp: i64,
    pub follower_count: i64,
    pub following_count: i64,
    pub media_count: i64,
    pub avg_likes: i64,
    pub avg_comments: i64,
    pub total_likes: i64,
    pub total_comments: i64,
    /// Account-level cumulative views at refresh time (0 where unreported)
    pub total_views: i64,
    pub engagement_rate: f64,
    pub growth_rate: f64,
    pub bot_flag: bool,
}

impl MetricsRecord {
    /// Combine a snapshot with its derived metrics into a history row
    ///
    /// `bot_flag` starts out however the caller says; the engine classifies
    /// after building the row so the detector sees the final values.
    pub fn from_snapshot(snapshot: &Snapshot, metrics: &AggregatedMetrics, bot_flag: bool) -> Self {
        Self {
            entity_id: snapshot.entity_id,
            platform: snapshot.platform,
            timestamp: snapshot.captured_at,
            follower_count: snapshot.profile.follower_count,
            following_count: snapshot.profile.following_count,
            media_count: snapshot.profile.media_count,
            avg_likes: metrics.avg_likes,
            avg_comments: metrics.avg_comments,
            total_likes: metrics.total_likes,
            total_comments: metrics.total_comments,
            total_views: snapshot.profile.total_views,
            engagement_rate: metrics.engagement_rate,
            growth_rate: metrics.growth_rate,
            bot_flag,
        }
    }
}

/// Latest-known profile fields for one entity+platform (upserted row)
#[derive(Debug, Clone)]
pub struct EntityState {
    pub entity_id: i64,
    pub platform: Platform,
    pub handle: String,
    pub display_name: Option<String>,
    pub follower_count: i64,
    pub following_count: i64,
    pub media_count: i64,
    pub total_views: i64,
    pub bio: Option<String>,
    pub profile_pic_url: Option<String>,
    pub website_url: Option<String>,
    pub is_verified: bool,
    pub account_type: Option<String>,
    pub last_updated: i64,
}

impl EntityState {
    pub fn from_snapshot(handle: &str, snapshot: &Snapshot) -> Self {
        let p = &snapshot.profile;
        Self {
            entity_id: snapshot.entity_id,
            platform: snapshot.platform,
            handle: handle.to_string(),
            display_name: p.display_name.clone(),
            follower_count: p.follower_count,
            following_count: p.following_count,
            media_count: p.media_count,
            total_views: p.total_views,
            bio: p.bio.clone(),
            profile_pic_url: p.profile_pic_url.clone(),
            website_url: p.website_url.clone(),
            is_verified: p.is_verified,
            account_type: p.account_type.clone(),
            last_updated: snapshot.captured_at,
        }
    }
}

/// One row of the operator-managed tracking list
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedEntity {
    pub entity_id: i64,
    pub handle: String,
}
