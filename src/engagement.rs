//! Engagement tracking for posted replies.
//!
//! Reads back the public metrics of the most recent replies and appends one
//! snapshot row per reply to the engagement log.

use chrono::{DateTime, Utc};
use log::{info, warn};

use crate::config::BoxError;
use crate::orchestrator::MetricsClient;
use crate::store::{append_engagement, read_posted_replies, DataFiles, EngagementRecord};

/// Largest id batch accepted by the metrics lookup.
pub const MAX_TRACKED_REPLIES: usize = 100;

/// Snapshots engagement for the most recent posted replies.
///
/// # Parameters
///
/// - `metrics`: Source of public metrics
/// - `files`: Data directory layout
/// - `now`: Timestamp written on every snapshot row
/// - `limit`: How many of the newest replies to track (capped at [`MAX_TRACKED_REPLIES`])
///
/// # Returns
///
/// - `Ok(usize)`: Number of rows appended
/// - `Err(BoxError)`: If the lookup or the append fails
pub async fn track_engagement(
    metrics: &dyn MetricsClient,
    files: &DataFiles,
    now: DateTime<Utc>,
    limit: usize,
) -> Result<usize, BoxError> {
    let replies = read_posted_replies(&files.posted_replies());
    let limit = limit.min(MAX_TRACKED_REPLIES);

    let ids: Vec<String> = replies
        .iter()
        .rev()
        .map(|r| r.result_id.clone())
        .filter(|id| !id.is_empty())
        .take(limit)
        .collect();

    if ids.is_empty() {
        info!("No posted replies to track engagement for");
        return Ok(0);
    }

    let fetched = metrics.fetch_metrics(&ids).await?;
    if fetched.len() < ids.len() {
        warn!(
            "Metrics returned for {} of {} replies",
            fetched.len(),
            ids.len()
        );
    }

    let records: Vec<EngagementRecord> = fetched
        .into_iter()
        .map(|(tweet_id, m)| EngagementRecord {
            tweet_id,
            timestamp: now,
            likes: m.likes,
            retweets: m.retweets,
            replies: m.replies,
            quotes: m.quotes,
        })
        .collect();

    append_engagement(&files.engagement(), &records)?;
    info!("Recorded engagement for {} replies", records.len());
    Ok(records.len())
}
