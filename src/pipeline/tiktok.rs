//! TikTok API Integration
//!
//! Provides profile and video metrics through a tikwm-compatible gateway
//! including:
//! - Follower / following / video counts
//! - Nickname, signature, avatar, verification flag
//! - Recent videos with play, digg and comment counts
//!
//! ## API Reference
//!
//! Endpoints: {base}/api/user/info?unique_id={handle}
//!            {base}/api/user/posts?unique_id={handle}&count={n}
//! Returns: Envelope with `code` (0 = ok), `msg`, and a `data` payload
//!
//! The gateway mixes naming styles: user/info answers in camelCase while
//! user/posts answers in snake_case.

use super::client::{PlatformClient, PlatformError};
use super::types::{Platform, PostSnapshot, ProfileSnapshot};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfoResponse {
    pub code: i64,
    pub msg: Option<String>,
    pub data: Option<UserInfoData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfoData {
    pub user: TikTokUser,
    pub stats: TikTokStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TikTokUser {
    pub id: Option<String>,
    #[serde(rename = "uniqueId")]
    pub unique_id: Option<String>,
    pub nickname: Option<String>,
    pub signature: Option<String>,
    #[serde(rename = "avatarLarger")]
    pub avatar_larger: Option<String>,
    pub verified: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TikTokStats {
    #[serde(rename = "followerCount")]
    pub follower_count: i64,
    #[serde(rename = "followingCount")]
    pub following_count: i64,
    #[serde(rename = "videoCount")]
    pub video_count: i64,
    #[serde(rename = "heartCount")]
    pub heart_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPostsResponse {
    pub code: i64,
    pub msg: Option<String>,
    pub data: Option<UserPostsData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPostsData {
    #[serde(default)]
    pub videos: Vec<TikTokVideo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TikTokVideo {
    pub video_id: String,
    pub title: Option<String>,
    pub create_time: Option<i64>,
    pub play_count: Option<i64>,
    pub digg_count: Option<i64>,
    pub comment_count: Option<i64>,
}

/// TikTok platform adapter
pub struct TikTokClient {
    http: reqwest::Client,
    base_url: String,
}

impl TikTokClient {
    pub fn new(http: reqwest::Client, base_url: String) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Issue one gateway request and unwrap the envelope
    async fn fetch_envelope<T: serde::de::DeserializeOwned>(
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
}

#[async_trait]
impl PlatformClient for TikTokClient {
    fn platform(&self) -> Platform {
        Platform::TikTok
    }

    async fn fetch_profile(&self, handle: &str) -> Result<ProfileSnapshot, PlatformError> {
        let url = format!("{}/api/user/info?unique_id={}", self.base_url, handle);
        let body: UserInfoResponse = self.fetch_envelope(&url).await?;

        if body.code != 0 {
            return Err(PlatformError::Api {
                status: 200,
                message: body.msg.unwrap_or_else(|| "request rejected".to_string()),
            });
        }

        let data = body
            .data
            .ok_or_else(|| PlatformError::MissingProfile(handle.to_string()))?;

        Ok(profile_from_info(&data))
    }

    async fn fetch_recent_posts(
        &self,
        handle: &str,
        count: usize,
    ) -> Result<Vec<PostSnapshot>, PlatformError> {
        let url = format!(
            "{}/api/user/posts?unique_id={}&count={}",
            self.base_url, handle, count
        );
        let body: UserPostsResponse = self.fetch_envelope(&url).await?;

        if body.code != 0 {
            return Err(PlatformError::Api {
                status: 200,
                message: body.msg.unwrap_or_else(|| "request rejected".to_string()),
            });
        }

        let videos = body.data.map(|data| data.videos).unwrap_or_default();
        Ok(posts_from_videos(&videos, count))
    }
}

fn profile_from_info(data: &UserInfoData) -> ProfileSnapshot {
    ProfileSnapshot {
        follower_count: data.stats.follower_count,
        following_count: data.stats.following_count,
        media_count: data.stats.video_count,
        total_views: 0,
        display_name: data.user.nickname.clone().filter(|name| !name.is_empty()),
        bio: data.user.signature.clone().filter(|sig| !sig.is_empty()),
        profile_pic_url: data.user.avatar_larger.clone(),
        website_url: None,
        is_verified: data.user.verified.unwrap_or(false),
        account_type: None,
    }
}

/// Map gateway videos onto post snapshots, newest first, at most `count`
fn posts_from_videos(videos: &[TikTokVideo], count: usize) -> Vec<PostSnapshot> {
    videos
        .iter()
        .take(count)
        .map(|video| PostSnapshot {
            post_id: video.video_id.clone(),
            posted_at: video.create_time,
            caption: video.title.clone().filter(|title| !title.is_empty()),
            media_type: Some("video".to_string()),
            like_count: video.digg_count.unwrap_or(0),
            comment_count: video.comment_count.unwrap_or(0),
            view_count: video.play_count.unwrap_or(0),
        })
        .collect()
}
