//! Pure metric derivation from a snapshot plus the prior history row
//!
//! No I/O and no clock access: everything is computed from the arguments, so
//! re-running on identical inputs always yields an identical result.

use super::types::{AggregatedMetrics, MetricsRecord, Snapshot};

/// Derive engagement and growth metrics for one refresh
///
/// `previous` is the entity's most recent stored record, or None on cold
/// start. Rules:
/// - averages use integer floor division and are 0 with no posts
/// - engagement rate is 0 when the account has no followers
/// - growth rate is 0 on cold start or when the prior follower count was 0
pub fn aggregate(snapshot: &Snapshot, previous: Option<&MetricsRecord>) -> AggregatedMetrics {
    let posts = &snapshot.recent_posts;

    let total_likes: i64 = posts.iter().map(|p| p.like_count).sum();
    let total_comments: i64 = posts.iter().map(|p| p.comment_count).sum();

    let (avg_likes, avg_comments) = if posts.is_empty() {
        (0, 0)
    } else {
        let n = posts.len() as i64;
        (total_likes / n, total_comments / n)
    };

    let followers = snapshot.profile.follower_count;
    let engagement_rate = if followers > 0 {
        (total_likes + total_comments) as f64 * 100.0 / followers as f64
    } else {
        0.0
    };

    let growth_rate = match previous {
        Some(prev) if prev.follower_count > 0 => {
            (followers - prev.follower_count) as f64 * 100.0 / prev.follower_count as f64
        }
        _ => 0.0,
    };

    AggregatedMetrics {
        total_likes,
        total_comments,
        avg_likes,
        avg_comments,
        engagement_rate,
        growth_rate,
    }
}
