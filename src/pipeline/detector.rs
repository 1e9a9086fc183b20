//! Anomaly detection with configurable thresholds
//!
//! One generic detector covers all platforms; the per-platform differences
//! (YouTube has no time gate but adds a view-delta check) live entirely in
//! [`DetectorConfig`]. The detector never touches storage: the engine hands
//! it the history window, which keeps it testable in isolation.

use super::types::{MetricsRecord, Platform};

/// Observed heuristic guardrails. Tunable constants, not derived statistically.
pub mod default_thresholds {
    /// New follower count must exceed baseline mean by this factor
    pub const FOLLOWER_SPIKE_MULTIPLIER: f64 = 1.5;
    /// History rows consulted for the follower baseline
    pub const FOLLOWER_WINDOW: usize = 5;
    /// History rows walked pairwise for engagement deltas
    pub const ENGAGEMENT_WINDOW: usize = 10;
    pub const LIKE_DELTA: i64 = 100;
    pub const COMMENT_DELTA: i64 = 50;
    pub const VIEW_DELTA: i64 = 1000;
    /// Adjacent rows must be closer than this for a delta to count
    pub const TIME_GATE_SECS: i64 = 600;
}

/// Thresholds for one platform's detector
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    pub follower_spike_multiplier: f64,
    pub follower_window: usize,
    pub engagement_window: usize,
    pub like_delta_threshold: i64,
    pub comment_delta_threshold: i64,
    /// None disables the view check (platforms without account-level views)
    pub view_delta_threshold: Option<i64>,
    /// None disables the time gate (deltas count regardless of row spacing)
    pub time_gate_secs: Option<i64>,
}

impl DetectorConfig {
    /// Default thresholds for a platform
    ///
    /// YouTube runs ungated with the extra view check; Instagram and TikTok
    /// gate on row spacing and check likes/comments only.
    pub fn for_platform(platform: Platform) -> Self {
        let base = Self {
            follower_spike_multiplier: default_thresholds::FOLLOWER_SPIKE_MULTIPLIER,
            follower_window: default_thresholds::FOLLOWER_WINDOW,
            engagement_window: default_thresholds::ENGAGEMENT_WINDOW,
            like_delta_threshold: default_thresholds::LIKE_DELTA,
            comment_delta_threshold: default_thresholds::COMMENT_DELTA,
            view_delta_threshold: None,
            time_gate_secs: Some(default_thresholds::TIME_GATE_SECS),
        };

        match platform {
            Platform::Instagram | Platform::TikTok => base,
            Platform::YouTube => Self {
                view_delta_threshold: Some(default_thresholds::VIEW_DELTA),
                time_gate_secs: None,
                ..base
            },
        }
    }
}

/// Classifies a fresh metrics row against the entity's stored history
pub struct AnomalyDetector {
    config: DetectorConfig,
}

impl AnomalyDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    pub fn for_platform(platform: Platform) -> Self {
        Self::new(DetectorConfig::for_platform(platform))
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// How many history rows the engine should fetch for classification
    pub fn history_window(&self) -> usize {
        self.config.follower_window.max(self.config.engagement_window)
    }

    /// Classify a new record against prior history (newest-first, excluding
    /// the record itself). Either sub-check firing flags the record.
    pub fn is_anomalous(&self, history: &[MetricsRecord], new: &MetricsRecord) -> bool {
        self.follower_spike(history, new.follower_count) || self.engagement_spike(history)
    }

    /// Follower-spike check over the last `follower_window` rows
    ///
    /// The baseline mean skips the most recent prior row, so one
    /// already-elevated reading does not trip the check by itself. Fewer
    /// than 2 rows means insufficient data, not an anomaly.
    fn follower_spike(&self, history: &[MetricsRecord], new_follower_count: i64) -> bool {
        let window = &history[..history.len().min(self.config.follower_window)];
        if window.len() < 2 {
            return false;
        }

        let baseline: f64 = window[1..]
            .iter()
            .map(|r| r.follower_count as f64)
            .sum::<f64>()
            / (window.len() - 1) as f64;

        new_follower_count as f64 > baseline * self.config.follower_spike_multiplier
    }

    /// Engagement-spike check over adjacent pairs of history rows
    ///
    /// Deltas are newer minus older. When a time gate is configured, only
    /// pairs closer together than the gate are considered.
    fn engagement_spike(&self, history: &[MetricsRecord]) -> bool {
        let window = &history[..history.len().min(self.config.engagement_window)];
        if window.len() < 2 {
            return false;
        }

        for pair in window.windows(2) {
            let (newer, older) = (&pair[0], &pair[1]);

            if let Some(gate) = self.config.time_gate_secs {
                if newer.timestamp - older.timestamp >= gate {
                    continue;
                }
            }

            let like_diff = newer.total_likes - older.total_likes;
            let comment_diff = newer.total_comments - older.total_comments;

            if like_diff > self.config.like_delta_threshold
                || comment_diff > self.config.comment_delta_threshold
            {
                return true;
            }

            if let Some(view_threshold) = self.config.view_delta_threshold {
                if newer.total_views - older.total_views > view_threshold {
                    return true;
                }
            }
        }

        false
    }
}
