//! Platform client seam
//!
//! Each platform adapter implements [`PlatformClient`]; the engine only ever
//! talks to the trait, so tests drive it with scripted mocks. A failed fetch
//! skips that entity for the cycle and never aborts the others.

use super::types::{DataError, Platform, PostSnapshot, ProfileSnapshot};
use async_trait::async_trait;
use std::time::Duration;

/// Browser-style user agent for platforms that reject bare clients
pub const USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/124.0.0.0 Safari/537.36";

/// Failure fetching or decoding one entity's platform data
#[derive(Debug)]
pub enum PlatformError {
    /// Transport-level failure (connect, timeout, TLS)
    Http(reqwest::Error),
    /// Platform answered with a non-success status
    Api { status: u16, message: String },
    /// Handle does not resolve to a profile
    MissingProfile(String),
    /// Response decoded but required fields were missing or malformed
    Data(DataError),
}

impl std::fmt::Display for PlatformError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlatformError::Http(err) => write!(f, "http error: {}", err),
            PlatformError::Api { status, message } => {
                write!(f, "api error ({}): {}", status, message)
            }
            PlatformError::MissingProfile(handle) => write!(f, "no profile for handle {}", handle),
            PlatformError::Data(err) => write!(f, "malformed record: {}", err),
        }
    }
}

impl std::error::Error for PlatformError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PlatformError::Http(err) => Some(err),
            PlatformError::Data(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for PlatformError {
    fn from(err: reqwest::Error) -> Self {
        PlatformError::Http(err)
    }
}

impl From<DataError> for PlatformError {
    fn from(err: DataError) -> Self {
        PlatformError::Data(err)
    }
}

/// Fetch surface of one platform
///
/// `fetch_recent_posts` returns most-recent-first, at most `count` items.
/// Implementations normalize platform JSON into the shared snapshot types;
/// the engine assembles them into a [`super::types::Snapshot`].
#[async_trait]
pub trait PlatformClient: Send + Sync {
    fn platform(&self) -> Platform;

    async fn fetch_profile(&self, handle: &str) -> Result<ProfileSnapshot, PlatformError>;

    async fn fetch_recent_posts(
        &self,
        handle: &str,
        count: usize,
    ) -> Result<Vec<PostSnapshot>, PlatformError>;
}

/// reqwest client with the pipeline's timeout and user agent applied
pub fn build_http_client(timeout_secs: u64) -> Result<reqwest::Client, PlatformError> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(USER_AGENT)
        .build()?;
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_variants() {
        let api = PlatformError::Api {
            status: 429,
            message: "rate limited".to_string(),
        };
        assert!(api.to_string().contains("429"));

        let missing = PlatformError::MissingProfile("ghost_user".to_string());
        assert!(missing.to_string().contains("ghost_user"));

        let data = PlatformError::from(DataError::MissingField("stats"));
        assert!(data.to_string().contains("stats"));
    }
}
