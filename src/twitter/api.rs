//! Core Twitter API utilities.
//!
//! This module contains the authenticated client and the request helper shared by
//! the search, reply and metrics operations. Upstream failures are mapped to
//! [`TwitterError`] so callers can tell a rate limit apart from everything else.

use log::{debug, error, info, warn};
use reqwest::{Client, StatusCode};
use thiserror::Error;

use crate::config::TwitterConfig;
use crate::oauth::build_oauth2_user_context_header;

pub(crate) const API_BASE: &str = "https://api.x.com/2";

/// Failure talking to the Twitter/X API.
#[derive(Debug, Error)]
pub enum TwitterError {
    #[error("rate limited during '{operation}'")]
    RateLimited { operation: String },
    #[error("unauthorized during '{operation}' - access token invalid or expired")]
    Unauthorized { operation: String },
    #[error("Twitter API error for operation '{operation}' ({status})")]
    Api { operation: String, status: StatusCode },
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid JSON in response: {0}")]
    Json(#[from] serde_json::Error),
    #[error("response missing field '{0}'")]
    MissingField(&'static str),
}

/// Sanitizes text for safe logging by truncating and escaping control characters.
///
/// # Parameters
///
/// - `text`: The text to sanitize
/// - `max_len`: Maximum length in characters before truncation
///
/// # Returns
///
/// A sanitized string safe for logging
pub fn sanitize_for_logging(text: &str, max_len: usize) -> String {
    let sanitized: String = text
        .chars()
        .map(|c| match c {
            '\n' | '\r' | '\t' => ' ',
            c if c.is_control() => '?',
            c => c,
        })
        .collect();

    if sanitized.chars().count() > max_len {
        let truncated: String = sanitized.chars().take(max_len).collect();
        format!(
            "{}... [truncated, {} total bytes]",
            truncated,
            text.len()
        )
    } else {
        sanitized
    }
}

/// Authenticated Twitter/X API v2 client.
#[derive(Debug, Clone)]
pub struct TwitterClient {
    pub(crate) config: TwitterConfig,
    pub(crate) http: Client,
}

impl TwitterClient {
    pub fn new(config: TwitterConfig) -> Self {
        TwitterClient {
            config,
            http: Client::new(),
        }
    }

    pub fn config(&self) -> &TwitterConfig {
        &self.config
    }

    pub(crate) fn auth_header(&self) -> String {
        build_oauth2_user_context_header(&self.config.access_token)
    }

    /// Sends `request_builder` and returns the body of a successful response.
    ///
    /// # Returns
    ///
    /// - `Ok(String)`: The API response body on success
    /// - `Err(TwitterError::RateLimited)`: On HTTP 429
    /// - `Err(TwitterError::Unauthorized)`: On HTTP 401
    /// - `Err(TwitterError)`: On any other failure
    pub(crate) async fn send(
        &self,
        request_builder: reqwest::RequestBuilder,
        operation_name: &str,
    ) -> Result<String, TwitterError> {
        info!(
            "Making authenticated request for operation: {}",
            operation_name
        );

        let response = request_builder
            .header("Authorization", self.auth_header())
            .send()
            .await?;

        let status = response.status();
        info!(
            "Received response with status: {} for operation: {}",
            status, operation_name
        );

        if status.is_success() {
            let response_text = response.text().await?;
            debug!(
                "Response summary for '{}': {} bytes received",
                operation_name,
                response_text.len()
            );
            return Ok(response_text);
        }

        let error_text = response.text().await.unwrap_or_default();
        debug!(
            "Error response for '{}': {}",
            operation_name,
            sanitize_for_logging(&error_text, 200)
        );

        match status {
            StatusCode::TOO_MANY_REQUESTS => {
                warn!("Rate limited by Twitter API during '{}'", operation_name);
                Err(TwitterError::RateLimited {
                    operation: operation_name.to_string(),
                })
            }
            StatusCode::UNAUTHORIZED => {
                error!(
                    "Received 401 Unauthorized for operation '{}' - access token may be expired",
                    operation_name
                );
                Err(TwitterError::Unauthorized {
                    operation: operation_name.to_string(),
                })
            }
            _ => {
                error!("Operation '{}' failed - Status: {}", operation_name, status);
                Err(TwitterError::Api {
                    operation: operation_name.to_string(),
                    status,
                })
            }
        }
    }
}
