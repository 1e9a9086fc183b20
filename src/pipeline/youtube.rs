//! YouTube Data API v3 Integration
//!
//! Provides channel and video metrics including:
//! - Subscriber / video counts and lifetime channel views
//! - Channel title, description and thumbnail
//! - Recent uploads with view, like and comment counts
//!
//! ## API Reference
//!
//! Endpoints: https://www.googleapis.com/youtube/v3/channels?part=snippet,statistics&id={channel_id}
//!            https://www.googleapis.com/youtube/v3/search?part=id&channelId={channel_id}&order=date
//!            https://www.googleapis.com/youtube/v3/videos?part=snippet,statistics&id={video_ids}
//!
//! Every call carries an API key. Statistics counts arrive as JSON strings
//! and are parsed with a zero fallback.

use super::client::{PlatformClient, PlatformError};
use super::types::{Platform, PostSnapshot, ProfileSnapshot};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const API_BASE: &str = "https://www.googleapis.com/youtube/v3";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelListResponse {
    #[serde(default)]
    pub items: Vec<ChannelItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelItem {
    pub id: String,
    pub snippet: Option<ChannelSnippet>,
    pub statistics: Option<ChannelStatistics>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelSnippet {
    pub title: Option<String>,
    pub description: Option<String>,
    pub thumbnails: Option<Thumbnails>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thumbnails {
    pub high: Option<Thumbnail>,
    pub medium: Option<Thumbnail>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thumbnail {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelStatistics {
    #[serde(rename = "viewCount")]
    pub view_count: Option<String>,
    #[serde(rename = "subscriberCount")]
    pub subscriber_count: Option<String>,
    #[serde(rename = "videoCount")]
    pub video_count: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchListResponse {
    #[serde(default)]
    pub items: Vec<SearchItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchItem {
    pub id: SearchItemId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchItemId {
    pub kind: Option<String>,
    #[serde(rename = "videoId")]
    pub video_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoListResponse {
    #[serde(default)]
    pub items: Vec<VideoItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoItem {
    pub id: String,
    pub snippet: Option<VideoSnippet>,
    pub statistics: Option<VideoStatistics>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoSnippet {
    pub title: Option<String>,
    #[serde(rename = "publishedAt")]
    pub published_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoStatistics {
    #[serde(rename = "viewCount")]
    pub view_count: Option<String>,
    #[serde(rename = "likeCount")]
    pub like_count: Option<String>,
    #[serde(rename = "commentCount")]
    pub comment_count: Option<String>,
}

/// Parse a string-encoded API count, zero when absent or malformed
fn parse_count(value: &Option<String>) -> i64 {
    value
        .as_deref()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(0)
}

/// Parse an RFC 3339 `publishedAt` into a unix timestamp
fn parse_published_at(value: &Option<String>) -> Option<i64> {
    value
        .as_deref()
        .and_then(|raw| chrono::DateTime::parse_from_rfc3339(raw).ok())
        .map(|dt| dt.timestamp())
}

/// YouTube platform adapter
///
/// The tracked handle is the channel id. Recent uploads take two calls:
/// search for video ids ordered by date, then a videos.list for their
/// statistics.
pub struct YouTubeClient {
    http: reqwest::Client,
    api_key: String,
}

impl YouTubeClient {
    pub fn new(http: reqwest::Client, api_key: String) -> Self {
        Self { http, api_key }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<T, PlatformError> {
        let response = self.http.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(PlatformError::Api {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("request failed").to_string(),
            });
        }

        Ok(response.json().await?)
    }

    /// Most recent upload ids for a channel, newest first
    async fn search_recent_video_ids(
        &self,
        channel_id: &str,
        count: usize,
    ) -> Result<Vec<String>, PlatformError> {
        let url = format!(
            "{}/search?part=id&channelId={}&maxResults={}&order=date&key={}",
            API_BASE, channel_id, count, self.api_key
        );
        let body: SearchListResponse = self.get_json(&url).await?;

        let ids = body
            .items
            .into_iter()
            .filter(|item| item.id.kind.as_deref() == Some("youtube#video"))
            .filter_map(|item| item.id.video_id)
            .collect();
        Ok(ids)
    }
}

#[async_trait]
impl PlatformClient for YouTubeClient {
    fn platform(&self) -> Platform {
        Platform::YouTube
    }

    async fn fetch_profile(&self, handle: &str) -> Result<ProfileSnapshot, PlatformError> {
        let url = format!(
            "{}/channels?part=snippet,statistics&id={}&key={}",
            API_BASE, handle, self.api_key
        );
        let body: ChannelListResponse = self.get_json(&url).await?;

        let channel = body
            .items
            .into_iter()
            .next()
            .ok_or_else(|| PlatformError::MissingProfile(handle.to_string()))?;

        Ok(profile_from_channel(&channel))
    }

    async fn fetch_recent_posts(
        &self,
        handle: &str,
        count: usize,
    ) -> Result<Vec<PostSnapshot>, PlatformError> {
        let video_ids = self.search_recent_video_ids(handle, count).await?;
        if video_ids.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!(
            "{}/videos?part=snippet,statistics&id={}&key={}",
            API_BASE,
            video_ids.join(","),
            self.api_key
        );
        let body: VideoListResponse = self.get_json(&url).await?;

        Ok(posts_from_videos(&body.items, count))
    }
}

fn profile_from_channel(channel: &ChannelItem) -> ProfileSnapshot {
    let snippet = channel.snippet.as_ref();
    let stats = channel.statistics.as_ref();

    let thumbnail = snippet
        .and_then(|s| s.thumbnails.as_ref())
        .and_then(|t| t.high.as_ref().or(t.medium.as_ref()))
        .map(|t| t.url.clone());

    ProfileSnapshot {
        follower_count: stats.map(|s| parse_count(&s.subscriber_count)).unwrap_or(0),
        following_count: 0,
        media_count: stats.map(|s| parse_count(&s.video_count)).unwrap_or(0),
        total_views: stats.map(|s| parse_count(&s.view_count)).unwrap_or(0),
        display_name: snippet.and_then(|s| s.title.clone()),
        bio: snippet
            .and_then(|s| s.description.clone())
            .filter(|desc| !desc.is_empty()),
        profile_pic_url: thumbnail,
        website_url: None,
        is_verified: false,
        account_type: None,
    }
}

/// Map videos.list items onto post snapshots, preserving search order
fn posts_from_videos(items: &[VideoItem], count: usize) -> Vec<PostSnapshot> {
    items
        .iter()
        .take(count)
        .map(|item| {
            let snippet = item.snippet.as_ref();
            let stats = item.statistics.as_ref();

            PostSnapshot {
                post_id: item.id.clone(),
                posted_at: snippet.and_then(|s| parse_published_at(&s.published_at)),
                caption: snippet.and_then(|s| s.title.clone()),
                media_type: Some("video".to_string()),
                like_count: stats.map(|s| parse_count(&s.like_count)).unwrap_or(0),
                comment_count: stats.map(|s| parse_count(&s.comment_count)).unwrap_or(0),
                view_count: stats.map(|s| parse_count(&s.view_count)).unwrap_or(0),
            }
        })
        .collect()
}
