//! Twitter/X API integration module.
//!
//! This module contains the client used for searching tweets, replying to them,
//! and reading back their public metrics, using OAuth 2.0 User Context
//! authentication.

mod api;
mod parsing;
mod search;
mod tweets;

pub use api::{sanitize_for_logging, TwitterClient, TwitterError};
pub use parsing::{
    parse_created_tweet_id, parse_public_metrics, parse_search_response, parse_username,
};
pub use search::build_search_query;
pub use tweets::tweet_url;
