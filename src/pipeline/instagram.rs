//! Instagram Web API Integration
//!
//! Provides profile and timeline metrics from Instagram's web profile
//! endpoint including:
//! - Follower / following / media counts
//! - Biography, external link, verification and account type
//! - Recent posts with like and comment counts
//!
//! ## API Reference
//!
//! Endpoint: https://www.instagram.com/api/v1/users/web_profile_info/?username={handle}
//! Returns: Profile and first page of timeline media in one payload
//!
//! Requests must carry the `x-ig-app-id` header. An authenticated
//! `sessionid` cookie is optional and raises rate limits.

use super::client::{PlatformClient, PlatformError};
use super::types::{DataError, Platform, PostSnapshot, ProfileSnapshot};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Top-level web_profile_info response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebProfileResponse {
    pub data: Option<ProfileData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileData {
    pub user: Option<UserNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserNode {
    pub biography: Option<String>,
    pub edge_followed_by: CountNode,
    pub edge_follow: CountNode,
    pub external_url: Option<String>,
    pub full_name: Option<String>,
    pub is_business_account: Option<bool>,
    pub is_verified: Option<bool>,
    pub profile_pic_url_hd: Option<String>,
    pub edge_owner_to_timeline_media: TimelineMedia,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountNode {
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineMedia {
    pub count: i64,
    #[serde(default)]
    pub edges: Vec<MediaEdge>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaEdge {
    pub node: MediaNode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaNode {
    pub id: String,
    #[serde(rename = "__typename")]
    pub typename: Option<String>,
    pub taken_at_timestamp: Option<i64>,
    pub edge_liked_by: Option<CountNode>,
    pub edge_media_to_comment: Option<CountNode>,
    pub video_view_count: Option<i64>,
    pub edge_media_to_caption: Option<CaptionEdges>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptionEdges {
    #[serde(default)]
    pub edges: Vec<CaptionEdge>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptionEdge {
    pub node: CaptionNode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptionNode {
    pub text: String,
}

impl MediaNode {
    fn caption_text(&self) -> Option<String> {
        let edges = &self.edge_media_to_caption.as_ref()?.edges;
        edges.first().map(|edge| edge.node.text.clone())
    }
}

/// Instagram platform adapter
///
/// Profile and timeline arrive in the same payload, so both trait methods
/// hit the same endpoint and pick out their half.
pub struct InstagramClient {
    http: reqwest::Client,
    app_id: String,
    session_id: Option<String>,
}

impl InstagramClient {
    pub fn new(http: reqwest::Client, app_id: String, session_id: Option<String>) -> Self {
        Self {
            http,
            app_id,
            session_id,
        }
    }

    /// Fetch and unwrap the profile payload for one handle
    ///
    /// # Returns
    /// * `Ok(UserNode)` - Profile exists and decoded
    /// * `Err(PlatformError::MissingProfile)` - 404 or null user in payload
    /// * `Err(PlatformError::Data)` - 200 with no data section (login wall)
    async fn fetch_user(&self, handle: &str) -> Result<UserNode, PlatformError> {
        let url = format!(
            "https://www.instagram.com/api/v1/users/web_profile_info/?username={}",
            handle
        );

        let mut request = self.http.get(&url).header("x-ig-app-id", &self.app_id);
        if let Some(session) = &self.session_id {
            request = request.header(reqwest::header::COOKIE, format!("sessionid={}", session));
        }

        let response = request.send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(PlatformError::MissingProfile(handle.to_string()));
        }
        if !status.is_success() {
            return Err(PlatformError::Api {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("request failed").to_string(),
            });
        }

        let body: WebProfileResponse = response.json().await?;

        // A 200 with no data section is the anonymous-access wall, not a
        // missing profile; retrying with a session cookie can succeed
        let data = body.data.ok_or(DataError::MissingField("data"))?;

        data.user
            .ok_or_else(|| PlatformError::MissingProfile(handle.to_string()))
    }
}

#[async_trait]
impl PlatformClient for InstagramClient {
    fn platform(&self) -> Platform {
        Platform::Instagram
    }

    async fn fetch_profile(&self, handle: &str) -> Result<ProfileSnapshot, PlatformError> {
        let user = self.fetch_user(handle).await?;
        Ok(profile_from_user(&user))
    }

    async fn fetch_recent_posts(
        &self,
        handle: &str,
        count: usize,
    ) -> Result<Vec<PostSnapshot>, PlatformError> {
        let user = self.fetch_user(handle).await?;
        Ok(posts_from_user(&user, count))
    }
}

/// Map the profile half of the payload onto the shared snapshot type
fn profile_from_user(user: &UserNode) -> ProfileSnapshot {
    let account_type = if user.is_business_account.unwrap_or(false) {
        "business"
    } else {
        "personal"
    };

    ProfileSnapshot {
        follower_count: user.edge_followed_by.count,
        following_count: user.edge_follow.count,
        media_count: user.edge_owner_to_timeline_media.count,
        total_views: 0,
        display_name: user.full_name.clone().filter(|name| !name.is_empty()),
        bio: user.biography.clone().filter(|bio| !bio.is_empty()),
        profile_pic_url: user.profile_pic_url_hd.clone(),
        website_url: user.external_url.clone(),
        is_verified: user.is_verified.unwrap_or(false),
        account_type: Some(account_type.to_string()),
    }
}

/// Map timeline edges onto post snapshots, newest first, at most `count`
fn posts_from_user(user: &UserNode, count: usize) -> Vec<PostSnapshot> {
    user.edge_owner_to_timeline_media
        .edges
        .iter()
        .take(count)
        .map(|edge| {
            let node = &edge.node;
            PostSnapshot {
                post_id: node.id.clone(),
                posted_at: node.taken_at_timestamp,
                caption: node.caption_text(),
                media_type: node.typename.clone(),
                like_count: node.edge_liked_by.as_ref().map(|c| c.count).unwrap_or(0),
                comment_count: node
                    .edge_media_to_comment
                    .as_ref()
                    .map(|c| c.count)
                    .unwrap_or(0),
                view_count: node.video_view_count.unwrap_or(0),
            }
        })
        .collect()
}
