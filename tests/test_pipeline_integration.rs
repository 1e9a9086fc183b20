//! Integration tests for the refresh pipeline over a real SQLite store
//!
//! A scripted platform client stands in for the network; everything from
//! RefreshEngine down through SqliteMetricsStore runs against a temp-file
//! database with the production schema.
//!
//! Key integration points tested:
//! - First-cycle refresh writes history, state and post rows together
//! - Staleness gating across consecutive cycles
//! - Per-entity failure isolation within a cycle
//! - Anomaly flagging against previously stored history

#[cfg(test)]
mod refresh_pipeline_tests {
    use async_trait::async_trait;
    use rusqlite::Connection;
    use sociflow::pipeline::{
        client::{PlatformClient, PlatformError},
        config::PlatformSettings,
        db::{run_schema_migrations, MetricsStore, SqliteMetricsStore},
        detector::AnomalyDetector,
        engine::RefreshEngine,
        types::{MetricsRecord, Platform, PostSnapshot, ProfileSnapshot},
    };
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Arc;
    use tempfile::NamedTempFile;

    /// Scripted stand-in for a platform API
    struct ScriptedClient {
        profiles: HashMap<String, ProfileSnapshot>,
        posts: HashMap<String, Vec<PostSnapshot>>,
        failing: HashSet<String>,
    }

    impl ScriptedClient {
        fn new() -> Self {
            Self {
                profiles: HashMap::new(),
                posts: HashMap::new(),
                failing: HashSet::new(),
            }
        }

        fn with_account(
            mut self,
            handle: &str,
            profile: ProfileSnapshot,
            posts: Vec<PostSnapshot>,
        ) -> Self {
            self.profiles.insert(handle.to_string(), profile);
            self.posts.insert(handle.to_string(), posts);
            self
        }

        fn with_failing(mut self, handle: &str) -> Self {
            self.failing.insert(handle.to_string());
            self
        }
    }

    #[async_trait]
    impl PlatformClient for ScriptedClient {
        fn platform(&self) -> Platform {
            Platform::Instagram
        }

        async fn fetch_profile(&self, handle: &str) -> Result<ProfileSnapshot, PlatformError> {
            if self.failing.contains(handle) {
                return Err(PlatformError::Api {
                    status: 503,
                    message: "scripted outage".to_string(),
                });
            }
            self.profiles
                .get(handle)
                .cloned()
                .ok_or_else(|| PlatformError::MissingProfile(handle.to_string()))
        }

        async fn fetch_recent_posts(
            &self,
            handle: &str,
            count: usize,
        ) -> Result<Vec<PostSnapshot>, PlatformError> {
            if self.failing.contains(handle) {
                return Err(PlatformError::Api {
                    status: 503,
                    message: "scripted outage".to_string(),
                });
            }
            let mut posts = self.posts.get(handle).cloned().unwrap_or_default();
            posts.truncate(count);
            Ok(posts)
        }
    }

    /// Temp-file database with the production schema applied
    fn temp_store() -> (NamedTempFile, Arc<SqliteMetricsStore>) {
        let temp_file = NamedTempFile::new().unwrap();
        let db_path = temp_file.path().to_str().unwrap();

        let conn = Connection::open(db_path).unwrap();
        run_schema_migrations(&conn).unwrap();
        drop(conn);

        let store = Arc::new(SqliteMetricsStore::new(db_path).unwrap());
        (temp_file, store)
    }

    fn make_profile(followers: i64) -> ProfileSnapshot {
        ProfileSnapshot {
            follower_count: followers,
            following_count: 40,
            media_count: 12,
            display_name: Some("Test Account".to_string()),
            ..Default::default()
        }
    }

    fn make_posts(count: usize, likes: i64, comments: i64) -> Vec<PostSnapshot> {
        (0..count)
            .map(|i| PostSnapshot {
                post_id: format!("post_{}", i),
                posted_at: Some(1_699_900_000),
                caption: Some(format!("caption {}", i)),
                media_type: Some("GraphImage".to_string()),
                like_count: likes,
                comment_count: comments,
                view_count: 0,
            })
            .collect()
    }

    fn make_history_row(entity_id: i64, timestamp: i64, followers: i64) -> MetricsRecord {
        MetricsRecord {
            entity_id,
            platform: Platform::Instagram,
            timestamp,
            follower_count: followers,
            following_count: 40,
            media_count: 12,
            avg_likes: 0,
            avg_comments: 0,
            total_likes: 0,
            total_comments: 0,
            total_views: 0,
            engagement_rate: 0.0,
            growth_rate: 0.0,
            bot_flag: false,
        }
    }

    fn make_engine(
        client: ScriptedClient,
        store: Arc<SqliteMetricsStore>,
        clock: Arc<AtomicI64>,
    ) -> RefreshEngine {
        RefreshEngine::new_with_timestamp_fn(
            Platform::Instagram,
            Arc::new(client),
            store,
            AnomalyDetector::for_platform(Platform::Instagram),
            PlatformSettings {
                enabled: true,
                poll_interval_secs: 600,
                staleness_secs: 86_400,
            },
            Box::new(move || clock.load(Ordering::SeqCst)),
        )
    }

    #[tokio::test]
    async fn test_first_cycle_persists_full_refresh() {
        // Test: two registered entities with no history both refresh, and
        // every table ends up populated with consistent values
        let base_time = 1_700_000_000;
        let (temp_file, store) = temp_store();

        let alice_id = store
            .register_influencer("Alice", Platform::Instagram, "alice_ig")
            .unwrap();
        let bob_id = store
            .register_influencer("Bob", Platform::Instagram, "bob_ig")
            .unwrap();

        let client = ScriptedClient::new()
            .with_account("alice_ig", make_profile(500), make_posts(5, 10, 2))
            .with_account("bob_ig", make_profile(2_000), make_posts(2, 40, 8));

        let clock = Arc::new(AtomicI64::new(base_time));
        let engine = make_engine(client, store.clone(), clock);

        let summary = engine.run_cycle().await;
        assert_eq!(summary.tracked, 2);
        assert_eq!(summary.refreshed, 2);
        assert_eq!(summary.fresh, 0);
        assert_eq!(summary.flagged, 0);
        assert_eq!(summary.failed, 0);

        // Alice: 5 posts of (10, 2) against 500 followers
        let alice = store
            .get_last_metrics(alice_id, Platform::Instagram)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(alice.timestamp, base_time);
        assert_eq!(alice.follower_count, 500);
        assert_eq!(alice.total_likes, 50);
        assert_eq!(alice.total_comments, 10);
        assert_eq!(alice.avg_likes, 10);
        assert_eq!(alice.avg_comments, 2);
        assert_eq!(alice.engagement_rate, 12.0);
        assert_eq!(alice.growth_rate, 0.0);
        assert!(!alice.bot_flag);

        // Bob: 2 posts of (40, 8) against 2000 followers
        let bob = store
            .get_last_metrics(bob_id, Platform::Instagram)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(bob.total_likes, 80);
        assert_eq!(bob.avg_likes, 40);
        assert_eq!(bob.engagement_rate, 4.8);

        // State and post tables, checked through a fresh connection
        let conn = Connection::open(temp_file.path()).unwrap();
        let states: i64 = conn
            .query_row("SELECT COUNT(*) FROM influencer_state", [], |row| row.get(0))
            .unwrap();
        let posts: i64 = conn
            .query_row("SELECT COUNT(*) FROM post_data", [], |row| row.get(0))
            .unwrap();
        let post_history: i64 = conn
            .query_row("SELECT COUNT(*) FROM post_history", [], |row| row.get(0))
            .unwrap();
        assert_eq!(states, 2, "Expected one state row per entity");
        assert_eq!(posts, 7, "Expected 5 + 2 post rows");
        assert_eq!(post_history, 7);

        let (handle, last_updated): (String, i64) = conn
            .query_row(
                "SELECT handle, last_updated FROM influencer_state WHERE entity_id = ?",
                [alice_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(handle, "alice_ig");
        assert_eq!(last_updated, base_time);
    }

    #[tokio::test]
    async fn test_staleness_gates_consecutive_cycles() {
        // Test: a refreshed entity is skipped until the staleness interval
        // passes, then refreshed again
        let base_time = 1_700_000_000;
        let (_temp_file, store) = temp_store();

        let alice_id = store
            .register_influencer("Alice", Platform::Instagram, "alice_ig")
            .unwrap();
        let client = ScriptedClient::new().with_account(
            "alice_ig",
            make_profile(500),
            make_posts(3, 10, 2),
        );

        let clock = Arc::new(AtomicI64::new(base_time));
        let engine = make_engine(client, store.clone(), clock.clone());

        // 1. First cycle refreshes
        let summary = engine.run_cycle().await;
        assert_eq!(summary.refreshed, 1);

        // 2. Ten minutes later: still fresh, nothing written
        clock.store(base_time + 600, Ordering::SeqCst);
        let summary = engine.run_cycle().await;
        assert_eq!(summary.fresh, 1);
        assert_eq!(summary.refreshed, 0);

        let history = store
            .get_history(alice_id, Platform::Instagram, 10)
            .await
            .unwrap();
        assert_eq!(history.len(), 1);

        // 3. 25 hours later: stale again
        clock.store(base_time + 90_000, Ordering::SeqCst);
        let summary = engine.run_cycle().await;
        assert_eq!(summary.refreshed, 1);

        let history = store
            .get_history(alice_id, Platform::Instagram, 10)
            .await
            .unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].timestamp, base_time + 90_000);
    }

    #[tokio::test]
    async fn test_failure_isolated_to_entity() {
        // Test: one entity's outage leaves the other entity's refresh intact
        let base_time = 1_700_000_000;
        let (_temp_file, store) = temp_store();

        let alice_id = store
            .register_influencer("Alice", Platform::Instagram, "alice_ig")
            .unwrap();
        let bob_id = store
            .register_influencer("Bob", Platform::Instagram, "bob_ig")
            .unwrap();

        let client = ScriptedClient::new()
            .with_account("bob_ig", make_profile(900), make_posts(2, 5, 1))
            .with_failing("alice_ig");

        let clock = Arc::new(AtomicI64::new(base_time));
        let engine = make_engine(client, store.clone(), clock);

        let summary = engine.run_cycle().await;
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.refreshed, 1);

        let alice = store
            .get_last_metrics(alice_id, Platform::Instagram)
            .await
            .unwrap();
        assert!(alice.is_none(), "Failed entity must not leave partial rows");

        let bob = store
            .get_last_metrics(bob_id, Platform::Instagram)
            .await
            .unwrap();
        assert!(bob.is_some());
    }

    #[tokio::test]
    async fn test_follower_spike_flagged_against_stored_history() {
        // Test: seeded baseline of 600 followers, next reading of 1000
        // exceeds 1.5x and the persisted row carries the flag
        let base_time = 1_700_000_000;
        let (_temp_file, store) = temp_store();

        let alice_id = store
            .register_influencer("Alice", Platform::Instagram, "alice_ig")
            .unwrap();

        for (offset, followers) in [(-200_000, 600), (-100_000, 600), (0, 600)] {
            store
                .append_metrics(&make_history_row(alice_id, base_time + offset, followers))
                .await
                .unwrap();
        }

        let client =
            ScriptedClient::new().with_account("alice_ig", make_profile(1_000), vec![]);

        let clock = Arc::new(AtomicI64::new(base_time + 90_000));
        let engine = make_engine(client, store.clone(), clock);

        let summary = engine.run_cycle().await;
        assert_eq!(summary.refreshed, 1);
        assert_eq!(summary.flagged, 1);

        let newest = store
            .get_last_metrics(alice_id, Platform::Instagram)
            .await
            .unwrap()
            .unwrap();
        assert!(newest.bot_flag);
        assert_eq!(newest.follower_count, 1_000);
    }
}
