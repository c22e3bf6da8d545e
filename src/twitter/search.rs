//! Tweet search for Twitter API.
//!
//! This module contains the keyword search used to collect candidate posts
//! using the Twitter API v2 recent-search endpoint.

use async_trait::async_trait;
use log::{debug, info};

use super::api::{TwitterClient, TwitterError, API_BASE};
use super::parsing::parse_search_response;
use crate::orchestrator::{CandidateItem, SearchClient, SearchError};

/// Builds the recent-search query for a topic keyword: English, no retweets.
pub fn build_search_query(keyword: &str) -> String {
    format!("{} lang:en -is:retweet", keyword)
}

impl TwitterClient {
    /// Searches recent tweets matching `keyword`.
    ///
    /// # Parameters
    ///
    /// - `keyword`: Topic keyword or phrase
    /// - `limit`: Requested result count, clamped to the endpoint's 10..=100 range
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<CandidateItem>)`: Matching tweets (possibly empty)
    /// - `Err(TwitterError)`: If the request fails or is rate limited
    pub async fn search_recent(
        &self,
        keyword: &str,
        limit: usize,
    ) -> Result<Vec<CandidateItem>, TwitterError> {
        let query = build_search_query(keyword);
        let max_results = limit.clamp(10, 100);
        let url = format!(
            "{}/tweets/search/recent?query={}&max_results={}&tweet.fields=id,text,created_at,author_id",
            API_BASE,
            urlencoding::encode(&query),
            max_results
        );

        info!("Searching recent tweets for '{}'", keyword);
        debug!("Search URL: {}", url);

        let response_text = self
            .send(self.http.get(&url), &format!("search_recent:{}", keyword))
            .await?;
        let json_response: serde_json::Value = serde_json::from_str(&response_text)?;
        let items = parse_search_response(&json_response);
        info!("Found {} tweets for '{}'", items.len(), keyword);
        Ok(items)
    }
}

#[async_trait]
impl SearchClient for TwitterClient {
    async fn search(&self, keyword: &str, limit: usize) -> Result<Vec<CandidateItem>, SearchError> {
        self.search_recent(keyword, limit).await.map_err(|e| match e {
            TwitterError::RateLimited { .. } => SearchError::RateLimited,
            other => SearchError::Failed(other.to_string()),
        })
    }
}
