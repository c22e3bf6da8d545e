//! Parsing of Twitter API v2 JSON responses into domain types.

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde_json::Value;

use crate::orchestrator::{CandidateItem, TweetMetrics};

/// Extracts candidate posts from a `/2/tweets/search/recent` response.
///
/// Tweets missing an id or text are skipped. A missing or unparseable
/// `created_at` falls back to the Unix epoch rather than dropping the tweet.
///
/// # Parameters
///
/// - `json_response`: The parsed response body
///
/// # Returns
///
/// The tweets in response order; empty when the response has no `data` array.
pub fn parse_search_response(json_response: &Value) -> Vec<CandidateItem> {
    let Some(tweets) = json_response.get("data").and_then(Value::as_array) else {
        debug!("Search response has no data array");
        return Vec::new();
    };

    tweets
        .iter()
        .filter_map(|tweet| {
            let id = tweet.get("id").and_then(Value::as_str)?;
            let text = tweet.get("text").and_then(Value::as_str)?;
            let author_id = tweet
                .get("author_id")
                .and_then(Value::as_str)
                .unwrap_or_default();
            let created_at = tweet
                .get("created_at")
                .and_then(Value::as_str)
                .and_then(|raw| match DateTime::parse_from_rfc3339(raw) {
                    Ok(dt) => Some(dt.with_timezone(&Utc)),
                    Err(e) => {
                        warn!("Failed to parse created_at '{}' for tweet {}: {}", raw, id, e);
                        None
                    }
                })
                .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

            Some(CandidateItem {
                id: id.to_string(),
                text: text.to_string(),
                author_id: author_id.to_string(),
                created_at,
            })
        })
        .collect()
}

/// Returns the id of the tweet created by a `POST /2/tweets` call.
pub fn parse_created_tweet_id(json_response: &Value) -> Option<String> {
    json_response
        .get("data")
        .and_then(|data| data.get("id"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Returns the username from a `/2/users/me` response.
pub fn parse_username(json_response: &Value) -> Option<String> {
    json_response
        .get("data")
        .and_then(|data| data.get("username"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Extracts `public_metrics` for every tweet in a `/2/tweets?ids=` lookup.
pub fn parse_public_metrics(json_response: &Value) -> Vec<(String, TweetMetrics)> {
    let Some(tweets) = json_response.get("data").and_then(Value::as_array) else {
        return Vec::new();
    };

    tweets
        .iter()
        .filter_map(|tweet| {
            let id = tweet.get("id").and_then(Value::as_str)?;
            let metrics = tweet.get("public_metrics")?;
            let count = |field: &str| metrics.get(field).and_then(Value::as_u64).unwrap_or(0);
            Some((
                id.to_string(),
                TweetMetrics {
                    likes: count("like_count"),
                    retweets: count("retweet_count"),
                    replies: count("reply_count"),
                    quotes: count("quote_count"),
                },
            ))
        })
        .collect()
}
