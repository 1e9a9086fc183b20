//! Pipeline configuration from environment variables
//!
//! Everything is loaded once at startup with sensible defaults; `validate()`
//! catches the combinations that cannot run (YouTube polling without an API
//! key, zero-length poll intervals).

use super::detector::DetectorConfig;
use super::types::Platform;
use std::env;

/// Rejected or missing configuration, raised at startup
#[derive(Debug)]
pub enum ConfigError {
    MissingVariable(String),
    InvalidValue { variable: String, value: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingVariable(name) => {
                write!(f, "missing required environment variable: {}", name)
            }
            ConfigError::InvalidValue { variable, value } => {
                write!(f, "invalid value for {}: {}", variable, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Per-platform polling knobs
#[derive(Debug, Clone)]
pub struct PlatformSettings {
    /// Master enable flag for this platform's polling loop
    pub enabled: bool,

    /// Seconds between polling cycles
    pub poll_interval_secs: u64,

    /// Seconds after which an entity's last refresh counts as stale
    pub staleness_secs: i64,
}

/// Operator threshold overrides, applied over per-platform defaults
///
/// Unset fields keep the platform default from
/// [`DetectorConfig::for_platform`].
#[derive(Debug, Clone, Default)]
pub struct DetectorOverrides {
    pub follower_spike_multiplier: Option<f64>,
    pub like_delta_threshold: Option<i64>,
    pub comment_delta_threshold: Option<i64>,
    pub view_delta_threshold: Option<i64>,
    pub time_gate_secs: Option<i64>,
}

/// Configuration for pipeline runtime
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Path to SQLite database file
    pub db_path: String,

    /// HTTP client timeout in seconds
    pub http_timeout_secs: u64,

    pub instagram: PlatformSettings,
    pub tiktok: PlatformSettings,
    pub youtube: PlatformSettings,

    /// App id sent as `x-ig-app-id` on Instagram requests
    pub instagram_app_id: String,

    /// Authenticated Instagram session cookie (optional, raises rate limits)
    pub instagram_session_id: Option<String>,

    /// Base URL of the TikTok gateway
    pub tiktok_api_base: String,

    /// YouTube Data API key, required when YouTube polling is enabled
    pub youtube_api_key: Option<String>,

    pub detector_overrides: DetectorOverrides,
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

fn env_opt<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| s.parse().ok())
}

impl PipelineConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `SOCIFLOW_DB_PATH` (default: /var/lib/sociflow/sociflow.db)
    /// - `HTTP_TIMEOUT_SECS` (default: 10)
    /// - `ENABLE_INSTAGRAM` / `ENABLE_TIKTOK` / `ENABLE_YOUTUBE` (default: true)
    /// - `INSTAGRAM_POLL_INTERVAL_SECS` (default: 600)
    /// - `TIKTOK_POLL_INTERVAL_SECS` (default: 3600)
    /// - `YOUTUBE_POLL_INTERVAL_SECS` (default: 3600)
    /// - `REFRESH_STALENESS_HOURS` (default: 24)
    /// - `INSTAGRAM_APP_ID` (default: public web app id)
    /// - `INSTAGRAM_SESSION_ID` (optional)
    /// - `TIKTOK_API_BASE` (default: https://www.tikwm.com)
    /// - `YOUTUBE_API_KEY` (required when YouTube is enabled)
    /// - `BOT_FOLLOWER_SPIKE_MULTIPLIER` / `BOT_LIKE_DELTA_THRESHOLD` /
    ///   `BOT_COMMENT_DELTA_THRESHOLD` / `BOT_VIEW_DELTA_THRESHOLD` /
    ///   `BOT_TIME_GATE_SECS` (optional detector overrides)
    pub fn from_env() -> Self {
        let staleness_secs = env_parse("REFRESH_STALENESS_HOURS", 24i64) * 3_600;

        Self {
            db_path: env::var("SOCIFLOW_DB_PATH")
                .unwrap_or_else(|_| "/var/lib/sociflow/sociflow.db".to_string()),

            http_timeout_secs: env_parse("HTTP_TIMEOUT_SECS", 10),

            instagram: PlatformSettings {
                enabled: env_parse("ENABLE_INSTAGRAM", true),
                poll_interval_secs: env_parse("INSTAGRAM_POLL_INTERVAL_SECS", 600),
                staleness_secs,
            },

            tiktok: PlatformSettings {
                enabled: env_parse("ENABLE_TIKTOK", true),
                poll_interval_secs: env_parse("TIKTOK_POLL_INTERVAL_SECS", 3_600),
                staleness_secs,
            },

            youtube: PlatformSettings {
                enabled: env_parse("ENABLE_YOUTUBE", true),
                poll_interval_secs: env_parse("YOUTUBE_POLL_INTERVAL_SECS", 3_600),
                staleness_secs,
            },

            instagram_app_id: env::var("INSTAGRAM_APP_ID")
                .unwrap_or_else(|_| "936619743392459".to_string()),

            instagram_session_id: env::var("INSTAGRAM_SESSION_ID")
                .ok()
                .filter(|s| !s.is_empty()),

            tiktok_api_base: env::var("TIKTOK_API_BASE")
                .unwrap_or_else(|_| "https://www.tikwm.com".to_string()),

            youtube_api_key: env::var("YOUTUBE_API_KEY").ok().filter(|s| !s.is_empty()),

            detector_overrides: DetectorOverrides {
                follower_spike_multiplier: env_opt("BOT_FOLLOWER_SPIKE_MULTIPLIER"),
                like_delta_threshold: env_opt("BOT_LIKE_DELTA_THRESHOLD"),
                comment_delta_threshold: env_opt("BOT_COMMENT_DELTA_THRESHOLD"),
                view_delta_threshold: env_opt("BOT_VIEW_DELTA_THRESHOLD"),
                time_gate_secs: env_opt("BOT_TIME_GATE_SECS"),
            },
        }
    }

    pub fn platform_settings(&self, platform: Platform) -> &PlatformSettings {
        match platform {
            Platform::Instagram => &self.instagram,
            Platform::TikTok => &self.tiktok,
            Platform::YouTube => &self.youtube,
        }
    }

    /// Detector thresholds for one platform, with overrides applied
    pub fn detector_config(&self, platform: Platform) -> DetectorConfig {
        let mut config = DetectorConfig::for_platform(platform);
        let overrides = &self.detector_overrides;

        if let Some(multiplier) = overrides.follower_spike_multiplier {
            config.follower_spike_multiplier = multiplier;
        }
        if let Some(likes) = overrides.like_delta_threshold {
            config.like_delta_threshold = likes;
        }
        if let Some(comments) = overrides.comment_delta_threshold {
            config.comment_delta_threshold = comments;
        }
        if let Some(views) = overrides.view_delta_threshold {
            config.view_delta_threshold = Some(views);
        }
        if let Some(gate) = overrides.time_gate_secs {
            config.time_gate_secs = Some(gate);
        }

        config
    }

    /// Reject configurations that cannot run
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.youtube.enabled && self.youtube_api_key.is_none() {
            return Err(ConfigError::MissingVariable("YOUTUBE_API_KEY".to_string()));
        }

        let platforms = [
            (Platform::Instagram, &self.instagram),
            (Platform::TikTok, &self.tiktok),
            (Platform::YouTube, &self.youtube),
        ];

        for (platform, settings) in platforms {
            if !settings.enabled {
                continue;
            }
            if settings.poll_interval_secs == 0 {
                return Err(ConfigError::InvalidValue {
                    variable: format!("{}_POLL_INTERVAL_SECS", platform.as_str().to_uppercase()),
                    value: "0".to_string(),
                });
            }
            if settings.staleness_secs <= 0 {
                return Err(ConfigError::InvalidValue {
                    variable: "REFRESH_STALENESS_HOURS".to_string(),
                    value: (settings.staleness_secs / 3_600).to_string(),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_config() -> PipelineConfig {
        let settings = PlatformSettings {
            enabled: true,
            poll_interval_secs: 600,
            staleness_secs: 86_400,
        };
        PipelineConfig {
            db_path: "/tmp/test.db".to_string(),
            http_timeout_secs: 10,
            instagram: settings.clone(),
            tiktok: settings.clone(),
            youtube: settings,
            instagram_app_id: "936619743392459".to_string(),
            instagram_session_id: None,
            tiktok_api_base: "https://www.tikwm.com".to_string(),
            youtube_api_key: Some("test-key".to_string()),
            detector_overrides: DetectorOverrides::default(),
        }
    }

    #[test]
    fn test_config_from_env() {
        // Defaults first, then custom values, inside one test so the env
        // mutations cannot race each other
        let all_vars = [
            "SOCIFLOW_DB_PATH",
            "HTTP_TIMEOUT_SECS",
            "ENABLE_INSTAGRAM",
            "ENABLE_TIKTOK",
            "ENABLE_YOUTUBE",
            "INSTAGRAM_POLL_INTERVAL_SECS",
            "TIKTOK_POLL_INTERVAL_SECS",
            "YOUTUBE_POLL_INTERVAL_SECS",
            "REFRESH_STALENESS_HOURS",
            "INSTAGRAM_APP_ID",
            "INSTAGRAM_SESSION_ID",
            "TIKTOK_API_BASE",
            "YOUTUBE_API_KEY",
            "BOT_FOLLOWER_SPIKE_MULTIPLIER",
            "BOT_LIKE_DELTA_THRESHOLD",
        ];
        for var in all_vars {
            env::remove_var(var);
        }

        let config = PipelineConfig::from_env();
        assert_eq!(config.db_path, "/var/lib/sociflow/sociflow.db");
        assert_eq!(config.http_timeout_secs, 10);
        assert!(config.instagram.enabled);
        assert_eq!(config.instagram.poll_interval_secs, 600);
        assert_eq!(config.tiktok.poll_interval_secs, 3_600);
        assert_eq!(config.youtube.poll_interval_secs, 3_600);
        assert_eq!(config.instagram.staleness_secs, 86_400);
        assert_eq!(config.tiktok_api_base, "https://www.tikwm.com");
        assert!(config.youtube_api_key.is_none());
        assert!(config.detector_overrides.follower_spike_multiplier.is_none());

        env::set_var("SOCIFLOW_DB_PATH", "/tmp/custom.db");
        env::set_var("ENABLE_TIKTOK", "false");
        env::set_var("INSTAGRAM_POLL_INTERVAL_SECS", "120");
        env::set_var("REFRESH_STALENESS_HOURS", "6");
        env::set_var("YOUTUBE_API_KEY", "live-key");
        env::set_var("BOT_FOLLOWER_SPIKE_MULTIPLIER", "2.0");

        let config = PipelineConfig::from_env();
        assert_eq!(config.db_path, "/tmp/custom.db");
        assert!(!config.tiktok.enabled);
        assert_eq!(config.instagram.poll_interval_secs, 120);
        assert_eq!(config.instagram.staleness_secs, 6 * 3_600);
        assert_eq!(config.youtube_api_key.as_deref(), Some("live-key"));
        assert_eq!(
            config.detector_overrides.follower_spike_multiplier,
            Some(2.0)
        );

        // Cleanup
        for var in all_vars {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_validate_requires_youtube_key() {
        let mut config = make_config();
        config.youtube_api_key = None;

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("YOUTUBE_API_KEY"));

        // Disabling YouTube lifts the requirement
        config.youtube.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_poll_interval() {
        let mut config = make_config();
        config.instagram.poll_interval_secs = 0;

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("INSTAGRAM_POLL_INTERVAL_SECS"));

        // Disabled platforms are not validated
        config.instagram.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_detector_overrides_apply() {
        let mut config = make_config();
        config.detector_overrides.follower_spike_multiplier = Some(2.0);
        config.detector_overrides.view_delta_threshold = Some(500);

        let instagram = config.detector_config(Platform::Instagram);
        assert_eq!(instagram.follower_spike_multiplier, 2.0);
        assert_eq!(instagram.view_delta_threshold, Some(500));

        // Unset overrides keep platform defaults
        let youtube = config.detector_config(Platform::YouTube);
        assert_eq!(youtube.like_delta_threshold, 100);
        assert_eq!(youtube.time_gate_secs, None);
    }
}
