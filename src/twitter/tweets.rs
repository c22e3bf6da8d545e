//! Tweet operations for Twitter API.
//!
//! This module contains replying to tweets, looking up public metrics of posted
//! replies, and verifying the account credentials, using the Twitter API v2.

use async_trait::async_trait;
use log::{debug, info};
use serde_json::json;

use super::api::{sanitize_for_logging, TwitterClient, TwitterError, API_BASE};
use super::parsing::{parse_created_tweet_id, parse_public_metrics, parse_username};
use crate::config::BoxError;
use crate::orchestrator::{MetricsClient, PostedTweet, ReplyPoster, TweetMetrics};

/// Public URL of a tweet. Falls back to the handle-free form when the bot's username is unknown.
pub fn tweet_url(username: Option<&str>, tweet_id: &str) -> String {
    match username {
        Some(name) => format!("https://x.com/{}/status/{}", name, tweet_id),
        None => format!("https://x.com/i/web/status/{}", tweet_id),
    }
}

impl TwitterClient {
    /// Replies to a tweet using the Twitter/X API v2 endpoint.
    ///
    /// # Parameters
    ///
    /// - `text`: The text content of the reply tweet
    /// - `reply_to_tweet_id`: The ID of the tweet to reply to
    ///
    /// # Returns
    ///
    /// - `Ok(PostedTweet)`: The id and public URL of the new reply
    /// - `Err(TwitterError)`: If authentication fails, network error, or API error
    pub async fn reply_to_tweet(
        &self,
        text: &str,
        reply_to_tweet_id: &str,
    ) -> Result<PostedTweet, TwitterError> {
        info!(
            "Starting reply operation to tweet {} with text: '{}'",
            reply_to_tweet_id,
            sanitize_for_logging(text, 80)
        );

        let payload = json!({
            "text": text,
            "reply": {
                "in_reply_to_tweet_id": reply_to_tweet_id
            }
        });
        debug!("Request headers: Authorization: Bearer [REDACTED], Content-Type: application/json");

        let request_builder = self
            .http
            .post(format!("{}/tweets", API_BASE))
            .header("Content-Type", "application/json")
            .json(&payload);

        let response_text = self.send(request_builder, "reply_to_tweet").await?;
        let json_response: serde_json::Value = serde_json::from_str(&response_text)?;
        let id = parse_created_tweet_id(&json_response).ok_or(TwitterError::MissingField("data.id"))?;
        let url = tweet_url(self.config.bot_username.as_deref(), &id);

        info!("Posted reply {} to tweet {}", id, reply_to_tweet_id);
        Ok(PostedTweet { id, url })
    }

    /// Looks up public metrics for up to 100 tweet ids.
    pub async fn lookup_metrics(
        &self,
        ids: &[String],
    ) -> Result<Vec<(String, TweetMetrics)>, TwitterError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let joined = ids.iter().take(100).cloned().collect::<Vec<_>>().join(",");
        let url = format!(
            "{}/tweets?ids={}&tweet.fields=public_metrics",
            API_BASE,
            urlencoding::encode(&joined)
        );

        let response_text = self.send(self.http.get(&url), "lookup_metrics").await?;
        let json_response: serde_json::Value = serde_json::from_str(&response_text)?;
        Ok(parse_public_metrics(&json_response))
    }

    /// Verifies the credentials by fetching the authenticated user.
    ///
    /// # Returns
    ///
    /// - `Ok(String)`: The account's username
    /// - `Err(TwitterError)`: If the token is rejected or the call fails
    pub async fn verify_credentials(&self) -> Result<String, TwitterError> {
        let url = format!("{}/users/me", API_BASE);
        let response_text = self.send(self.http.get(&url), "verify_credentials").await?;
        let json_response: serde_json::Value = serde_json::from_str(&response_text)?;
        let username = parse_username(&json_response).ok_or(TwitterError::MissingField("data.username"))?;
        info!("Logged in as @{}", username);
        Ok(username)
    }
}

#[async_trait]
impl ReplyPoster for TwitterClient {
    async fn post(&self, target_id: &str, text: &str) -> Result<PostedTweet, BoxError> {
        Ok(self.reply_to_tweet(text, target_id).await?)
    }
}

#[async_trait]
impl MetricsClient for TwitterClient {
    async fn fetch_metrics(&self, ids: &[String]) -> Result<Vec<(String, TweetMetrics)>, BoxError> {
        Ok(self.lookup_metrics(ids).await?)
    }
}
