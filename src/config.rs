//! Configuration module for the liora agent.
//!
//! This module contains configuration structures and environment variable handling
//! for the Twitter/X API integration, the language-model generator, the rate limiter
//! and the pacing of a reply cycle.

use log::{debug, error, info, warn};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Boxed error type used by the I/O plumbing throughout the crate.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Masks a secret for logging: keeps the first 8 and, for long values, the last 8 characters.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    let len = chars.len();
    let prefix: String = chars.iter().take(8).collect();
    if len > 16 {
        let suffix: String = chars[len - 8..].iter().collect();
        format!("{}...{}", prefix, suffix)
    } else {
        format!("{}...", prefix)
    }
}

/// Credentials for the Twitter/X API v2 endpoints.
///
/// All operations (search, reply, metrics lookup) use OAuth 2.0 User Context.
#[derive(Debug, Clone)]
pub struct TwitterConfig {
    /// The Access Token for OAuth 2.0 User Context authentication
    pub access_token: String,
    /// Handle of the bot account, used to build reply URLs
    pub bot_username: Option<String>,
}

impl TwitterConfig {
    /// Loads the Twitter credentials from `xapi_access_token` and `LIORA_BOT_USERNAME`.
    ///
    /// # Returns
    ///
    /// - `Ok(TwitterConfig)`: If the access token is present and non-empty
    /// - `Err(BoxError)`: If the access token is missing or empty
    pub fn from_env() -> Result<Self, BoxError> {
        let access_token = match env::var("xapi_access_token") {
            Ok(token) => {
                info!(
                    "Found xapi_access_token environment variable with length: {}",
                    token.len()
                );
                debug!("Access token (masked): {}", mask_secret(&token));

                if token.trim().is_empty() {
                    error!("Access token is empty");
                    return Err("Access token cannot be empty".into());
                }
                if token.len() < 10 {
                    warn!(
                        "Access token seems unusually short ({} characters)",
                        token.len()
                    );
                }
                token
            }
            Err(e) => {
                error!("Failed to load xapi_access_token from environment: {}", e);
                return Err(
                    format!("Missing xapi_access_token environment variable: {}", e).into(),
                );
            }
        };

        let bot_username = env::var("LIORA_BOT_USERNAME")
            .ok()
            .map(|name| name.trim().trim_start_matches('@').to_string())
            .filter(|name| !name.is_empty());

        Ok(TwitterConfig {
            access_token,
            bot_username,
        })
    }
}

/// Settings for the OpenAI chat-completions generator.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
}

impl OpenAiConfig {
    /// Returns `None` when `OPENAI_API_KEY` is unset or blank; replies then come from the fallback pool.
    pub fn from_env() -> Option<Self> {
        match env::var("OPENAI_API_KEY") {
            Ok(key) if !key.trim().is_empty() => {
                debug!("OpenAI API key (masked): {}", mask_secret(&key));
                Some(OpenAiConfig {
                    api_key: key,
                    model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-3.5-turbo".to_string()),
                })
            }
            _ => {
                warn!("No OPENAI_API_KEY set - replies will use the local fallback pool");
                None
            }
        }
    }
}

/// Limits enforced by the rate limiter. The defaults are the conservative production values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimits {
    pub max_per_hour: usize,
    pub max_per_day: u32,
    pub min_spacing_secs: i64,
    pub burst_cap: usize,
}

impl Default for RateLimits {
    fn default() -> Self {
        RateLimits {
            max_per_hour: 15,
            max_per_day: 80,
            min_spacing_secs: 120,
            burst_cap: 5,
        }
    }
}

/// What the GENERATE step hands its text to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Post replies immediately.
    AutoPost,
    /// Store replies for manual approval; approved ones are posted on the next cycle.
    Preview,
}

impl FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" | "autopost" | "auto-post" => Ok(RunMode::AutoPost),
            "preview" => Ok(RunMode::Preview),
            other => Err(format!("unknown run mode '{}'", other)),
        }
    }
}

/// What happens to a candidate the rate limiter turns away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitedPolicy {
    /// Leave the id unseen so the next cycle can pick it up again.
    Defer,
    /// Mark the id seen; it will never be retried.
    Drop,
}

impl FromStr for RateLimitedPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "defer" | "retry" => Ok(RateLimitedPolicy::Defer),
            "drop" => Ok(RateLimitedPolicy::Drop),
            other => Err(format!("unknown rate-limited policy '{}'", other)),
        }
    }
}

/// Deliberate delays that respect upstream rate constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingConfig {
    pub search_delay_min: Duration,
    pub search_delay_max: Duration,
    pub post_delay_min: Duration,
    pub post_delay_max: Duration,
    pub rate_limit_cooldown: Duration,
}

impl Default for PacingConfig {
    fn default() -> Self {
        PacingConfig {
            search_delay_min: Duration::from_secs(10),
            search_delay_max: Duration::from_secs(20),
            post_delay_min: Duration::from_secs(120),
            post_delay_max: Duration::from_secs(300),
            rate_limit_cooldown: Duration::from_secs(900),
        }
    }
}

impl PacingConfig {
    /// No delays at all; used for one-shot runs against fakes.
    pub fn immediate() -> Self {
        PacingConfig {
            search_delay_min: Duration::ZERO,
            search_delay_max: Duration::ZERO,
            post_delay_min: Duration::ZERO,
            post_delay_max: Duration::ZERO,
            rate_limit_cooldown: Duration::ZERO,
        }
    }
}

/// Behaviour of one collect → filter → generate → post → log cycle.
#[derive(Debug, Clone)]
pub struct CycleConfig {
    pub mode: RunMode,
    pub rate_limited_policy: RateLimitedPolicy,
    pub reset_seen_each_cycle: bool,
    pub recent_diagnosis_only: bool,
    pub keywords_per_cycle: usize,
    pub search_limit: usize,
    pub max_replies_per_cycle: usize,
    pub pacing: PacingConfig,
}

impl Default for CycleConfig {
    fn default() -> Self {
        CycleConfig {
            mode: RunMode::AutoPost,
            rate_limited_policy: RateLimitedPolicy::Defer,
            reset_seen_each_cycle: false,
            recent_diagnosis_only: false,
            keywords_per_cycle: 8,
            search_limit: 30,
            max_replies_per_cycle: 10,
            pacing: PacingConfig::default(),
        }
    }
}

/// Full runtime configuration of the `liora` binary.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub twitter: TwitterConfig,
    pub openai: Option<OpenAiConfig>,
    pub data_dir: PathBuf,
    pub rate_limits: RateLimits,
    pub cycle: CycleConfig,
    pub schedule: String,
    pub run_once: bool,
    pub port: u16,
}

impl AppConfig {
    /// Loads every setting from the environment.
    ///
    /// Missing credentials or unparseable values are configuration failures: the caller is
    /// expected to exit before entering any run cycle.
    pub fn from_env() -> Result<Self, BoxError> {
        info!("Loading liora configuration from environment variables");

        let twitter = TwitterConfig::from_env()?;
        let openai = OpenAiConfig::from_env();

        let defaults = RateLimits::default();
        let rate_limits = RateLimits {
            max_per_hour: env_or("LIORA_MAX_PER_HOUR", defaults.max_per_hour)?,
            max_per_day: env_or("LIORA_MAX_PER_DAY", defaults.max_per_day)?,
            min_spacing_secs: env_or("LIORA_MIN_SPACING_SECS", defaults.min_spacing_secs)?,
            burst_cap: env_or("LIORA_BURST_CAP", defaults.burst_cap)?,
        };

        let pacing = PacingConfig {
            search_delay_min: env_secs("LIORA_SEARCH_DELAY_MIN_SECS", 10)?,
            search_delay_max: env_secs("LIORA_SEARCH_DELAY_MAX_SECS", 20)?,
            post_delay_min: env_secs("LIORA_POST_DELAY_MIN_SECS", 120)?,
            post_delay_max: env_secs("LIORA_POST_DELAY_MAX_SECS", 300)?,
            rate_limit_cooldown: env_secs("LIORA_RATE_LIMIT_COOLDOWN_SECS", 900)?,
        };
        if pacing.search_delay_min > pacing.search_delay_max
            || pacing.post_delay_min > pacing.post_delay_max
        {
            return Err("pacing delay minimums must not exceed their maximums".into());
        }

        let cycle = CycleConfig {
            mode: env_or("LIORA_MODE", RunMode::AutoPost)?,
            rate_limited_policy: env_or("LIORA_RATE_LIMITED_POLICY", RateLimitedPolicy::Defer)?,
            reset_seen_each_cycle: env_or("LIORA_RESET_SEEN_EACH_CYCLE", false)?,
            recent_diagnosis_only: env_or("LIORA_RECENT_DIAGNOSIS_ONLY", false)?,
            keywords_per_cycle: env_or("LIORA_KEYWORDS_PER_CYCLE", 8)?,
            search_limit: env_or("LIORA_SEARCH_LIMIT", 30)?,
            max_replies_per_cycle: env_or("LIORA_MAX_REPLIES_PER_CYCLE", 10)?,
            pacing,
        };

        if cycle.reset_seen_each_cycle {
            warn!("LIORA_RESET_SEEN_EACH_CYCLE is enabled - deduplication will not hold across cycles");
        }

        let config = AppConfig {
            twitter,
            openai,
            data_dir: PathBuf::from(data_dir()),
            rate_limits,
            cycle,
            schedule: env::var("LIORA_SCHEDULE").unwrap_or_else(|_| "0 0 */4 * * *".to_string()),
            run_once: env_or("LIORA_RUN_ONCE", false)?,
            port: get_server_port()?,
        };

        info!(
            "Configuration loaded: mode {:?}, limits {}/hour {}/day, spacing {}s, burst {}",
            config.cycle.mode,
            config.rate_limits.max_per_hour,
            config.rate_limits.max_per_day,
            config.rate_limits.min_spacing_secs,
            config.rate_limits.burst_cap
        );
        Ok(config)
    }
}

/// Directory holding all persisted logs, from `LIORA_DATA_DIR` (default `data`).
pub fn data_dir() -> String {
    env::var("LIORA_DATA_DIR").unwrap_or_else(|_| "data".to_string())
}

/// Gets the server port from the `PORT` environment variable, defaulting to 3000.
///
/// # Returns
///
/// - `Ok(u16)`: The configured or default port
/// - `Err(BoxError)`: If `PORT` is set but is not a valid port number
pub fn get_server_port() -> Result<u16, BoxError> {
    env_or("PORT", 3000)
}

fn env_or<T>(name: &str, default: T) -> Result<T, BoxError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw.trim().parse::<T>().map_err(|e| {
            error!("Invalid value for {}: {}", name, e);
            format!("Invalid value for {} ('{}'): {}", name, raw, e).into()
        }),
        _ => Ok(default),
    }
}

fn env_secs(name: &str, default: u64) -> Result<Duration, BoxError> {
    env_or(name, default).map(Duration::from_secs)
}
