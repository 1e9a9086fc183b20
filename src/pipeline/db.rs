//! SQLite store for tracked entities, metrics history and post data
//!
//! Tables (embedded schema, applied by [`run_schema_migrations`]):
//! - `influencers` - operator-managed tracking list, one handle column per platform
//! - `influencer_history` - INSERT (append-only metrics audit trail)
//! - `influencer_state` - UPSERT on (entity_id, platform) (latest profile fields)
//! - `post_data` - UPSERT on post_id (latest post counters)
//! - `post_history` - INSERT (append-only post engagement trail)
//!
//! The store is the only component that reads or writes refresh timestamps;
//! staleness decisions always come from `influencer_history`.

use super::types::{EntityState, MetricsRecord, Platform, PostSnapshot, TrackedEntity};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::sync::{Arc, Mutex};

/// Embedded schema, idempotent via IF NOT EXISTS
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS influencers (
    influencer_id       INTEGER PRIMARY KEY AUTOINCREMENT,
    name                TEXT NOT NULL,
    instagram_username  TEXT,
    tiktok_username     TEXT,
    youtube_channel_id  TEXT,
    created_at          INTEGER NOT NULL DEFAULT (strftime('%s','now'))
);

CREATE TABLE IF NOT EXISTS influencer_history (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    entity_id       INTEGER NOT NULL,
    platform        TEXT NOT NULL,
    timestamp       INTEGER NOT NULL,
    follower_count  INTEGER NOT NULL DEFAULT 0,
    following_count INTEGER NOT NULL DEFAULT 0,
    media_count     INTEGER NOT NULL DEFAULT 0,
    avg_likes       INTEGER NOT NULL DEFAULT 0,
    avg_comments    INTEGER NOT NULL DEFAULT 0,
    total_likes     INTEGER NOT NULL DEFAULT 0,
    total_comments  INTEGER NOT NULL DEFAULT 0,
    total_views     INTEGER NOT NULL DEFAULT 0,
    engagement_rate REAL NOT NULL DEFAULT 0,
    growth_rate     REAL NOT NULL DEFAULT 0,
    bot_flag        INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_history_entity_platform_ts
    ON influencer_history(entity_id, platform, timestamp DESC);

CREATE TABLE IF NOT EXISTS influencer_state (
    entity_id       INTEGER NOT NULL,
    platform        TEXT NOT NULL,
    handle          TEXT NOT NULL,
    display_name    TEXT,
    follower_count  INTEGER NOT NULL DEFAULT 0,
    following_count INTEGER NOT NULL DEFAULT 0,
    media_count     INTEGER NOT NULL DEFAULT 0,
    total_views     INTEGER NOT NULL DEFAULT 0,
    bio             TEXT,
    profile_pic_url TEXT,
    website_url     TEXT,
    is_verified     INTEGER NOT NULL DEFAULT 0,
    account_type    TEXT,
    last_updated    INTEGER NOT NULL,
    PRIMARY KEY (entity_id, platform)
);

CREATE TABLE IF NOT EXISTS post_data (
    post_id         TEXT PRIMARY KEY,
    entity_id       INTEGER NOT NULL,
    platform        TEXT NOT NULL,
    posted_at       INTEGER,
    caption         TEXT,
    media_type      TEXT,
    likes_count     INTEGER NOT NULL DEFAULT 0,
    comments_count  INTEGER NOT NULL DEFAULT 0,
    views_count     INTEGER NOT NULL DEFAULT 0,
    last_updated    INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_post_data_entity
    ON post_data(entity_id, platform);

CREATE TABLE IF NOT EXISTS post_history (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    post_id         TEXT NOT NULL,
    entity_id       INTEGER NOT NULL,
    timestamp       INTEGER NOT NULL,
    likes_count     INTEGER NOT NULL DEFAULT 0,
    comments_count  INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_post_history_post_ts
    ON post_history(post_id, timestamp DESC);
"#;

/// Store-level failure
#[derive(Debug)]
pub enum StoreError {
    Database(rusqlite::Error),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Database(err) => write!(f, "database error: {}", err),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Database(err) => Some(err),
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Database(err)
    }
}

/// Apply the embedded schema and runtime pragmas
///
/// Idempotent: every statement carries IF NOT EXISTS, so this runs at every
/// startup.
pub fn run_schema_migrations(conn: &Connection) -> Result<(), StoreError> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    log::info!("📊 Enabled WAL mode for SQLite database");

    log::info!("🔧 Applying embedded schema");
    conn.execute_batch(SCHEMA_SQL)?;
    log::info!("✅ Schema migrations completed");

    Ok(())
}

/// Persistence surface of the refresh pipeline
///
/// Reads feed scheduling (last refresh timestamp) and anomaly detection
/// (history windows); writes record one refresh outcome. `get_history` and
/// `get_last_metrics` return rows newest first.
#[async_trait]
pub trait MetricsStore: Send + Sync {
    /// Entities tracked on `platform`, in registration order
    async fn list_tracked_entities(
        &self,
        platform: Platform,
    ) -> Result<Vec<TrackedEntity>, StoreError>;

    /// Newest history row for one entity, None before its first refresh
    async fn get_last_metrics(
        &self,
        entity_id: i64,
        platform: Platform,
    ) -> Result<Option<MetricsRecord>, StoreError>;

    /// Up to `limit` history rows, newest first
    async fn get_history(
        &self,
        entity_id: i64,
        platform: Platform,
        limit: usize,
    ) -> Result<Vec<MetricsRecord>, StoreError>;

    /// Append one history row (append-only, never updated)
    async fn append_metrics(&self, record: &MetricsRecord) -> Result<(), StoreError>;

    /// UPSERT the latest-known profile fields for (entity_id, platform)
    async fn upsert_current_state(&self, state: &EntityState) -> Result<(), StoreError>;

    /// UPSERT one post's latest counters on post_id
    async fn upsert_post(
        &self,
        entity_id: i64,
        platform: Platform,
        post: &PostSnapshot,
    ) -> Result<(), StoreError>;

    /// Append one post engagement row
    async fn append_post_history(
        &self,
        post_id: &str,
        entity_id: i64,
        timestamp: i64,
        like_count: i64,
        comment_count: i64,
    ) -> Result<(), StoreError>;

    /// Persist one entity's complete refresh outcome
    ///
    /// Post rows stamp the refresh timestamp. Implementations may commit the
    /// whole refresh atomically; this default issues the writes one by one.
    async fn persist_refresh(
        &self,
        record: &MetricsRecord,
        state: &EntityState,
        posts: &[PostSnapshot],
    ) -> Result<(), StoreError> {
        self.append_metrics(record).await?;
        self.upsert_current_state(state).await?;
        for post in posts {
            self.upsert_post(state.entity_id, state.platform, post).await?;
            self.append_post_history(
                &post.post_id,
                state.entity_id,
                record.timestamp,
                post.like_count,
                post.comment_count,
            )
            .await?;
        }
        Ok(())
    }
}

/// `influencers` column holding the handle for a platform
fn handle_column(platform: Platform) -> &'static str {
    match platform {
        Platform::Instagram => "instagram_username",
        Platform::TikTok => "tiktok_username",
        Platform::YouTube => "youtube_channel_id",
    }
}

fn record_from_row(
    entity_id: i64,
    platform: Platform,
    row: &rusqlite::Row<'_>,
) -> rusqlite::Result<MetricsRecord> {
    Ok(MetricsRecord {
        entity_id,
        platform,
        timestamp: row.get(0)?,
        follower_count: row.get(1)?,
        following_count: row.get(2)?,
        media_count: row.get(3)?,
        avg_likes: row.get(4)?,
        avg_comments: row.get(5)?,
        total_likes: row.get(6)?,
        total_comments: row.get(7)?,
        total_views: row.get(8)?,
        engagement_rate: row.get(9)?,
        growth_rate: row.get(10)?,
        bot_flag: row.get(11)?,
    })
}

fn fetch_history(
    conn: &Connection,
    entity_id: i64,
    platform: Platform,
    limit: usize,
) -> Result<Vec<MetricsRecord>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT timestamp, follower_count, following_count, media_count,
                avg_likes, avg_comments, total_likes, total_comments, total_views,
                engagement_rate, growth_rate, bot_flag
         FROM influencer_history
         WHERE entity_id = ?1 AND platform = ?2
         ORDER BY timestamp DESC
         LIMIT ?3",
    )?;

    let rows = stmt.query_map(params![entity_id, platform.as_str(), limit as i64], |row| {
        record_from_row(entity_id, platform, row)
    })?;

    let records: Result<Vec<_>, _> = rows.collect();
    Ok(records?)
}

fn insert_metrics(conn: &Connection, record: &MetricsRecord) -> Result<(), StoreError> {
    conn.execute(
        r#"
        INSERT INTO influencer_history (
            entity_id, platform, timestamp,
            follower_count, following_count, media_count,
            avg_likes, avg_comments, total_likes, total_comments, total_views,
            engagement_rate, growth_rate, bot_flag
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
        params![
            record.entity_id,
            record.platform.as_str(),
            record.timestamp,
            record.follower_count,
            record.following_count,
            record.media_count,
            record.avg_likes,
            record.avg_comments,
            record.total_likes,
            record.total_comments,
            record.total_views,
            record.engagement_rate,
            record.growth_rate,
            record.bot_flag,
        ],
    )?;
    Ok(())
}

fn upsert_state_row(conn: &Connection, state: &EntityState) -> Result<(), StoreError> {
    conn.execute(
        r#"
        INSERT INTO influencer_state (
            entity_id, platform, handle, display_name,
            follower_count, following_count, media_count, total_views,
            bio, profile_pic_url, website_url, is_verified, account_type,
            last_updated
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(entity_id, platform) DO UPDATE SET
            handle = excluded.handle,
            display_name = excluded.display_name,
            follower_count = excluded.follower_count,
            following_count = excluded.following_count,
            media_count = excluded.media_count,
            total_views = excluded.total_views,
            bio = excluded.bio,
            profile_pic_url = excluded.profile_pic_url,
            website_url = excluded.website_url,
            is_verified = excluded.is_verified,
            account_type = excluded.account_type,
            last_updated = excluded.last_updated
        "#,
        params![
            state.entity_id,
            state.platform.as_str(),
            state.handle,
            state.display_name,
            state.follower_count,
            state.following_count,
            state.media_count,
            state.total_views,
            state.bio,
            state.profile_pic_url,
            state.website_url,
            state.is_verified,
            state.account_type,
            state.last_updated,
        ],
    )?;
    Ok(())
}

fn upsert_post_row(
    conn: &Connection,
    entity_id: i64,
    platform: Platform,
    post: &PostSnapshot,
    last_updated: i64,
) -> Result<(), StoreError> {
    conn.execute(
        r#"
        INSERT INTO post_data (
            post_id, entity_id, platform, posted_at, caption, media_type,
            likes_count, comments_count, views_count, last_updated
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(post_id) DO UPDATE SET
            caption = excluded.caption,
            likes_count = excluded.likes_count,
            comments_count = excluded.comments_count,
            views_count = excluded.views_count,
            last_updated = excluded.last_updated
        "#,
        params![
            post.post_id,
            entity_id,
            platform.as_str(),
            post.posted_at,
            post.caption,
            post.media_type,
            post.like_count,
            post.comment_count,
            post.view_count,
            last_updated,
        ],
    )?;
    Ok(())
}

fn insert_post_history(
    conn: &Connection,
    post_id: &str,
    entity_id: i64,
    timestamp: i64,
    like_count: i64,
    comment_count: i64,
) -> Result<(), StoreError> {
    conn.execute(
        r#"
        INSERT INTO post_history (post_id, entity_id, timestamp, likes_count, comments_count)
        VALUES (?, ?, ?, ?, ?)
        "#,
        params![post_id, entity_id, timestamp, like_count, comment_count],
    )?;
    Ok(())
}

/// SQLite implementation of [`MetricsStore`]
pub struct SqliteMetricsStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteMetricsStore {
    /// Open the database at `db_path`
    ///
    /// Does not create the schema; run [`run_schema_migrations`] first.
    pub fn new(db_path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Add an influencer to the tracking list, returning its id
    ///
    /// Operator-facing: polling cycles pick the entity up on their next list.
    pub fn register_influencer(
        &self,
        name: &str,
        platform: Platform,
        handle: &str,
    ) -> Result<i64, StoreError> {
        let conn = self.conn.lock().unwrap();

        // Column name comes from a fixed map, not caller input
        let sql = format!(
            "INSERT INTO influencers (name, {}) VALUES (?1, ?2)",
            handle_column(platform)
        );
        conn.execute(&sql, params![name, handle])?;
        Ok(conn.last_insert_rowid())
    }
}

#[async_trait]
impl MetricsStore for SqliteMetricsStore {
    async fn list_tracked_entities(
        &self,
        platform: Platform,
    ) -> Result<Vec<TrackedEntity>, StoreError> {
        let conn = self.conn.lock().unwrap();

        let sql = format!(
            "SELECT influencer_id, {col} FROM influencers
             WHERE {col} IS NOT NULL
             ORDER BY influencer_id",
            col = handle_column(platform)
        );
        let mut stmt = conn.prepare(&sql)?;

        let rows = stmt.query_map([], |row| {
            Ok(TrackedEntity {
                entity_id: row.get(0)?,
                handle: row.get(1)?,
            })
        })?;

        let entities: Result<Vec<_>, _> = rows.collect();
        Ok(entities?)
    }

    async fn get_last_metrics(
        &self,
        entity_id: i64,
        platform: Platform,
    ) -> Result<Option<MetricsRecord>, StoreError> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare(
            "SELECT timestamp, follower_count, following_count, media_count,
                    avg_likes, avg_comments, total_likes, total_comments, total_views,
                    engagement_rate, growth_rate, bot_flag
             FROM influencer_history
             WHERE entity_id = ?1 AND platform = ?2
             ORDER BY timestamp DESC
             LIMIT 1",
        )?;

        let record = stmt
            .query_row(params![entity_id, platform.as_str()], |row| {
                record_from_row(entity_id, platform, row)
            })
            .optional()?;
        Ok(record)
    }

    async fn get_history(
        &self,
        entity_id: i64,
        platform: Platform,
        limit: usize,
    ) -> Result<Vec<MetricsRecord>, StoreError> {
        let conn = self.conn.lock().unwrap();
        fetch_history(&conn, entity_id, platform, limit)
    }

    async fn append_metrics(&self, record: &MetricsRecord) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        insert_metrics(&conn, record)
    }

    async fn upsert_current_state(&self, state: &EntityState) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        upsert_state_row(&conn, state)
    }

    async fn upsert_post(
        &self,
        entity_id: i64,
        platform: Platform,
        post: &PostSnapshot,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        upsert_post_row(&conn, entity_id, platform, post, super::types::current_timestamp())
    }

    async fn append_post_history(
        &self,
        post_id: &str,
        entity_id: i64,
        timestamp: i64,
        like_count: i64,
        comment_count: i64,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        insert_post_history(&conn, post_id, entity_id, timestamp, like_count, comment_count)
    }

    /// One transaction per entity refresh
    ///
    /// BEGIN IMMEDIATE takes the write lock up front so a refresh either
    /// lands whole or not at all; readers still see the prior state under WAL.
    async fn persist_refresh(
        &self,
        record: &MetricsRecord,
        state: &EntityState,
        posts: &[PostSnapshot],
    ) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        insert_metrics(&tx, record)?;
        upsert_state_row(&tx, state)?;
        for post in posts {
            upsert_post_row(&tx, state.entity_id, state.platform, post, record.timestamp)?;
            insert_post_history(
                &tx,
                &post.post_id,
                state.entity_id,
                record.timestamp,
                post.like_count,
                post.comment_count,
            )?;
        }

        tx.commit()?;
        Ok(())
    }
}
