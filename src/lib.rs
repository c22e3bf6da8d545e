//! # Liora Library
//!
//! An autonomous reply agent for Twitter/X. On a schedule it searches recent posts
//! for cancer-related topic keywords, keeps the ones where a person describes a
//! recent diagnosis or treatment, and replies with a short supportive message,
//! while staying inside hourly, daily, spacing and burst posting limits.
//!
//! ## Features
//!
//! - Keyword search through the Twitter/X API v2 with OAuth 2.0 User Context authentication
//! - Blacklist and priority-tier content classification
//! - Sliding-window rate limiting
//! - Persistent duplicate tracking
//! - Reply generation through OpenAI, with a fallback pool
//! - Preview mode with manual approval
//! - Engagement tracking and a read-only dashboard
//!
//! ## Configuration
//!
//! - `xapi_access_token`: Twitter API access token (required)
//! - `OPENAI_API_KEY`: Enables generated replies (optional)
//! - `LIORA_DATA_DIR`: Directory for all persisted logs (defaults to `data`)
//! - `PORT`: Dashboard port (defaults to 3000)
//!
//! ## API Endpoints
//!
//! - `GET /`: Recent replies as an HTML table
//! - `GET /health`: Returns service health status
//! - `GET /api/replies`, `/api/urls`, `/api/engagement`: Paginated logs
//! - `GET /api/stats`: Totals

pub mod classifier;
pub mod config;
pub mod cronjob;
pub mod dedup;
pub mod engagement;
pub mod handlers;
pub mod llm;
pub mod oauth;
pub mod orchestrator;
pub mod rate_limit;
pub mod reply;
pub mod store;
pub mod twitter;

// Re-export commonly used types and functions
pub use classifier::{ClassificationResult, ContentClassifier};
pub use config::{get_server_port, AppConfig, BoxError, TwitterConfig};
pub use cronjob::{run_scheduled_cycle, start_reply_cronjob};
pub use dedup::DuplicateTracker;
pub use handlers::{build_router, handle_health};
pub use oauth::build_oauth2_user_context_header;
pub use orchestrator::{Collaborators, CycleReport, Orchestrator};
pub use rate_limit::{RateLimiter, SystemClock};
pub use twitter::TwitterClient;

#[cfg(test)]
mod tests;
