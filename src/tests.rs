//! # Tests Module
//!
//! This module contains the tests for the liora agent.
//!
//! ## Test Categories
//!
//! ### Unit Tests
//! - Classification tiers and exclusions
//! - Rate limiter windows, rollover and denial reporting
//! - Duplicate tracking across reloads
//! - Reply composition and response parsing
//! - File-backed logs and the pending table
//!
//! ### Integration Tests
//! - Full reply cycles against in-memory fakes for search, generation and posting
//! - HTTP endpoint testing for the dashboard
//!
//! ## Test Environment
//!
//! Every test that touches disk gets its own temporary directory. Time is driven
//! by a manual clock and all pacing delays are zero, so no test sleeps.

use crate::{
    classifier::{
        contains_words, ClassifierRules, ContentClassifier, REASON_BLACKLISTED,
        REASON_NO_TOPICAL_MATCH,
    },
    config::{
        get_server_port, mask_secret, BoxError, CycleConfig, PacingConfig, RateLimitedPolicy,
        RateLimits, RunMode,
    },
    cronjob::{run_scheduled_cycle, run_single_cycle},
    dedup::DuplicateTracker,
    engagement::track_engagement,
    handlers::{build_router, handle_health, paginate, PageParams},
    oauth::build_oauth2_user_context_header,
    orchestrator::{
        CandidateItem, Collaborators, MetricsClient, Orchestrator, PostedTweet, ReplyGenerator,
        ReplyPoster, SearchClient, SearchError, TweetMetrics,
    },
    rate_limit::{Clock, RateDenial, RateLimiter},
    reply::{
        clean_generated, compose_reply, pick_fallback, truncate_chars, CALLS_TO_ACTION,
        FALLBACK_REPLIES, MAX_REPLY_CHARS,
    },
    store::{
        append_engagement, append_posted_reply, read_engagement, read_posted_replies,
        read_reply_urls, DataFiles, EngagementRecord, PendingReply, PendingStatus, PendingStore,
        PostedReplyRecord,
    },
    twitter::{
        build_search_query, parse_created_tweet_id, parse_public_metrics, parse_search_response,
        parse_username, sanitize_for_logging, tweet_url,
    },
};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::Json,
    Router,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use http_body_util::BodyExt;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{watch, Mutex, Notify};
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

struct ManualClock(StdMutex<DateTime<Utc>>);

impl ManualClock {
    fn at(now: DateTime<Utc>) -> Arc<Self> {
        Arc::new(ManualClock(StdMutex::new(now)))
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

#[derive(Default)]
struct FakeSearch {
    items: Vec<CandidateItem>,
    rate_limited: Vec<String>,
    failing: Vec<String>,
    calls: StdMutex<Vec<String>>,
}

#[async_trait]
impl SearchClient for FakeSearch {
    async fn search(&self, keyword: &str, _limit: usize) -> Result<Vec<CandidateItem>, SearchError> {
        self.calls.lock().unwrap().push(keyword.to_string());
        if self.rate_limited.iter().any(|k| k == keyword) {
            return Err(SearchError::RateLimited);
        }
        if self.failing.iter().any(|k| k == keyword) {
            return Err(SearchError::Failed("connection reset".to_string()));
        }
        Ok(self.items.clone())
    }
}

struct FakeGenerator(Option<String>);

#[async_trait]
impl ReplyGenerator for FakeGenerator {
    async fn generate(&self, _prompt: &str, _system_instructions: &str) -> Option<String> {
        self.0.clone()
    }
}

type PostHook = Box<dyn Fn(&str) + Send + Sync>;

#[derive(Default)]
struct FakePoster {
    fail_ids: Vec<String>,
    posted: StdMutex<Vec<(String, String)>>,
    /// Runs before each post, e.g. to change state on disk mid-cycle.
    on_post: Option<PostHook>,
}

impl FakePoster {
    fn posted_targets(&self) -> Vec<String> {
        self.posted
            .lock()
            .unwrap()
            .iter()
            .map(|(target, _)| target.clone())
            .collect()
    }
}

#[async_trait]
impl ReplyPoster for FakePoster {
    async fn post(&self, target_id: &str, text: &str) -> Result<PostedTweet, BoxError> {
        if let Some(hook) = &self.on_post {
            hook(target_id);
        }
        if self.fail_ids.iter().any(|id| id == target_id) {
            return Err("upstream rejected the reply".into());
        }
        self.posted
            .lock()
            .unwrap()
            .push((target_id.to_string(), text.to_string()));
        let id = format!("reply-{}", target_id);
        Ok(PostedTweet {
            url: tweet_url(Some("liora"), &id),
            id,
        })
    }
}

#[derive(Default)]
struct FakeMetrics {
    requested: StdMutex<Vec<String>>,
}

#[async_trait]
impl MetricsClient for FakeMetrics {
    async fn fetch_metrics(&self, ids: &[String]) -> Result<Vec<(String, TweetMetrics)>, BoxError> {
        self.requested.lock().unwrap().extend(ids.iter().cloned());
        Ok(ids
            .iter()
            .enumerate()
            .map(|(i, id)| {
                (
                    id.clone(),
                    TweetMetrics {
                        likes: i as u64 + 1,
                        retweets: 0,
                        replies: 2,
                        quotes: 0,
                    },
                )
            })
            .collect())
    }
}

fn item(id: &str, text: &str) -> CandidateItem {
    CandidateItem {
        id: id.to_string(),
        text: text.to_string(),
        author_id: "author-1".to_string(),
        created_at: t0(),
    }
}

fn loose_limits() -> RateLimits {
    RateLimits {
        max_per_hour: 100,
        max_per_day: 100,
        min_spacing_secs: 0,
        burst_cap: 100,
    }
}

fn cycle_config(mode: RunMode) -> CycleConfig {
    CycleConfig {
        mode,
        rate_limited_policy: RateLimitedPolicy::Defer,
        reset_seen_each_cycle: false,
        recent_diagnosis_only: false,
        keywords_per_cycle: 8,
        search_limit: 30,
        max_replies_per_cycle: 10,
        pacing: PacingConfig::immediate(),
    }
}

struct Harness {
    _dir: tempfile::TempDir,
    files: DataFiles,
    search: Arc<FakeSearch>,
    poster: Arc<FakePoster>,
    shutdown: watch::Sender<bool>,
}

fn harness(search: FakeSearch, poster: FakePoster) -> (Harness, watch::Receiver<bool>) {
    harness_in(tempfile::tempdir().unwrap(), search, poster)
}

fn harness_in(
    dir: tempfile::TempDir,
    search: FakeSearch,
    poster: FakePoster,
) -> (Harness, watch::Receiver<bool>) {
    let files = DataFiles::new(dir.path().join("data"));
    let (shutdown, shutdown_rx) = watch::channel(false);
    (
        Harness {
            _dir: dir,
            files,
            search: Arc::new(search),
            poster: Arc::new(poster),
            shutdown,
        },
        shutdown_rx,
    )
}

fn orchestrator(
    h: &Harness,
    shutdown_rx: watch::Receiver<bool>,
    config: CycleConfig,
    limits: RateLimits,
    keywords: &[&str],
    generated: Option<&str>,
) -> Orchestrator {
    Orchestrator::new(
        config,
        limits,
        h.files.clone(),
        Collaborators {
            search: h.search.clone(),
            generator: Arc::new(FakeGenerator(generated.map(str::to_string))),
            poster: h.poster.clone(),
        },
        ManualClock::at(t0()),
        shutdown_rx,
    )
    .unwrap()
    .with_keywords(keywords.iter().map(|k| k.to_string()).collect())
    .with_rng(StdRng::seed_from_u64(7))
}

/// Creates a test application instance with all routes configured.
fn create_test_app(files: &DataFiles) -> Router {
    build_router(files.clone())
}

async fn get_json(app: Router, uri: &str) -> Value {
    let request = Request::builder()
        .uri(uri)
        .method("GET")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

fn slow_posting_config(mode: RunMode) -> CycleConfig {
    let mut config = cycle_config(mode);
    config.pacing.post_delay_min = std::time::Duration::from_secs(3600);
    config.pacing.post_delay_max = std::time::Duration::from_secs(3600);
    config
}

fn posted_record(id: &str, at: DateTime<Utc>) -> PostedReplyRecord {
    PostedReplyRecord {
        timestamp: at,
        original_item_id: id.to_string(),
        original_text: format!("post {}", id),
        reply_text: "Thinking of you.".to_string(),
        result_url: tweet_url(Some("liora"), &format!("r{}", id)),
        result_id: format!("r{}", id),
    }
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

#[test]
fn test_classify_tiers() {
    let classifier = ContentClassifier::default();

    let cases = [
        ("Just diagnosed with breast cancer today", 10),
        ("I'm on chemo and so tired", 8),
        ("My dad has cancer", 6),
        ("Started radiation yesterday", 5),
        ("Cancer research is underfunded", 3),
    ];
    for (text, priority) in cases {
        let result = classifier.classify(text);
        assert!(result.accepted, "expected '{}' to be accepted", text);
        assert_eq!(result.priority, priority, "wrong tier for '{}'", text);
    }

    assert_eq!(
        classifier.classify("Just diagnosed with breast cancer today").reason,
        "just happened"
    );
}

#[test]
fn test_blacklist_beats_every_tier() {
    let classifier = ContentClassifier::default();

    for text in [
        "Just diagnosed, fuck cancer",
        "I have cancer and trump is to blame",
        "Cancer season is here, check your horoscope",
        "my mom says crypto is a cancer",
    ] {
        let result = classifier.classify(text);
        assert!(!result.accepted, "expected '{}' to be rejected", text);
        assert_eq!(result.priority, 0);
        assert_eq!(result.reason, REASON_BLACKLISTED);
    }
}

#[test]
fn test_classify_no_topical_match() {
    let result = ContentClassifier::default().classify("What a lovely day at the beach");
    assert!(!result.accepted);
    assert_eq!(result.reason, REASON_NO_TOPICAL_MATCH);
}

#[test]
fn test_classify_is_case_insensitive() {
    let result = ContentClassifier::default().classify("JUST FOUND OUT. IT IS MALIGNANT");
    assert!(result.accepted);
    assert_eq!(result.priority, 10);
}

#[test]
fn test_recent_diagnosis_only_excludes_survivor_stories() {
    let text = "I'm a cancer survivor";
    assert!(ContentClassifier::default().classify(text).accepted);

    let strict = ContentClassifier::new(ClassifierRules::recent_diagnosis_only());
    let result = strict.classify(text);
    assert!(!result.accepted);
    assert_eq!(result.reason, REASON_BLACKLISTED);
}

#[test]
fn test_restricted_subject_guard() {
    let classifier = ContentClassifier::default();
    let text = "Praying for the president after his cancer news";
    assert!(classifier.classify(text).accepted);
    assert!(classifier.mentions_restricted_subject(text));
    assert!(!classifier.mentions_restricted_subject("My sister starts chemo tomorrow"));
}

#[test]
fn test_phrases_match_whole_words_only() {
    let classifier = ContentClassifier::default();

    // "just" inside "adjust" is not a recency marker
    assert_eq!(classifier.classify("Trying to adjust to life with cancer").priority, 3);
    assert_eq!(classifier.classify("Two tumors found on the scan").priority, 3);

    assert!(!classifier.mentions_restricted_subject("Smoking is a risk factor for lung cancer"));
    assert!(!classifier.mentions_restricted_subject("Ate a melon after chemo, felony-level tired"));
    assert!(classifier.mentions_restricted_subject("Elon posted about cancer research"));
    assert!(classifier.mentions_restricted_subject("Actors raising money for cancer"));
}

#[test]
fn test_contains_words() {
    assert!(contains_words("now cancer-free!", "cancer"));
    assert!(contains_words("@potus said", "@potus"));
    assert!(contains_words("my dad's scans", "scan"));
    assert!(!contains_words("justice for all", "just"));
    assert!(!contains_words("anything", ""));
}

// ---------------------------------------------------------------------------
// Rate limiter
// ---------------------------------------------------------------------------

#[test]
fn test_rate_limits_default() {
    let limits = RateLimits::default();
    assert_eq!(limits.max_per_hour, 15);
    assert_eq!(limits.max_per_day, 80);
    assert_eq!(limits.min_spacing_secs, 120);
    assert_eq!(limits.burst_cap, 5);
}

#[test]
fn test_hourly_limit_and_recovery() {
    let limits = RateLimits {
        max_per_hour: 3,
        ..loose_limits()
    };
    let mut limiter = RateLimiter::new(limits, t0());
    for offset in [0, 10, 20] {
        limiter.record(t0() + Duration::seconds(offset));
    }

    let check = limiter.check(t0() + Duration::seconds(30));
    assert_eq!(
        check.denials,
        vec![RateDenial::HourlyLimit { recent: 3, max: 3 }]
    );

    // The action at t0 leaves the window exactly one hour later.
    assert!(limiter.can_proceed(t0() + Duration::seconds(3600)));
    assert_eq!(limiter.state().recent_action_timestamps.len(), 2);
}

#[test]
fn test_daily_limit_rolls_over_at_midnight() {
    let late = Utc.with_ymd_and_hms(2024, 5, 1, 23, 0, 0).unwrap();
    let limits = RateLimits {
        max_per_day: 2,
        ..loose_limits()
    };
    let mut limiter = RateLimiter::new(limits, late);
    limiter.record(late);
    limiter.record(late + Duration::seconds(1));

    let check = limiter.check(late + Duration::seconds(2));
    assert_eq!(
        check.denials,
        vec![RateDenial::DailyLimit { count: 2, max: 2 }]
    );

    let next_day = Utc.with_ymd_and_hms(2024, 5, 2, 0, 30, 0).unwrap();
    assert!(limiter.check(next_day).is_allowed());
    assert_eq!(limiter.state().daily_action_count, 0);
    assert_eq!(
        limiter.state().daily_count_reset_date,
        next_day.date_naive()
    );
}

#[test]
fn test_min_spacing() {
    let limits = RateLimits {
        min_spacing_secs: 120,
        ..loose_limits()
    };
    let mut limiter = RateLimiter::new(limits, t0());
    assert!(limiter.can_proceed(t0()));
    limiter.record(t0());

    let check = limiter.check(t0() + Duration::seconds(60));
    assert_eq!(
        check.denials,
        vec![RateDenial::MinSpacing {
            elapsed_secs: 60,
            required_secs: 120
        }]
    );
    assert!(limiter.can_proceed(t0() + Duration::seconds(120)));
}

#[test]
fn test_burst_cap() {
    let limits = RateLimits {
        burst_cap: 2,
        ..loose_limits()
    };
    let mut limiter = RateLimiter::new(limits, t0());
    limiter.record(t0());
    limiter.record(t0() + Duration::seconds(1));

    let check = limiter.check(t0() + Duration::seconds(2));
    assert_eq!(check.denials, vec![RateDenial::BurstCap { recent: 2, cap: 2 }]);
    assert!(limiter.can_proceed(t0() + Duration::seconds(600)));
}

#[test]
fn test_every_failing_check_is_reported() {
    let limits = RateLimits {
        max_per_hour: 1,
        max_per_day: 1,
        min_spacing_secs: 120,
        burst_cap: 1,
    };
    let mut limiter = RateLimiter::new(limits, t0());
    limiter.record(t0());

    let check = limiter.check(t0() + Duration::seconds(1));
    assert!(!check.is_allowed());
    assert_eq!(check.denials.len(), 4);
    assert!(matches!(check.denials[0], RateDenial::HourlyLimit { .. }));
    assert!(matches!(check.denials[1], RateDenial::DailyLimit { .. }));
    assert!(matches!(check.denials[2], RateDenial::MinSpacing { .. }));
    assert!(matches!(check.denials[3], RateDenial::BurstCap { .. }));
}

#[test]
fn test_check_does_not_record() {
    let mut limiter = RateLimiter::new(RateLimits::default(), t0());
    for _ in 0..5 {
        assert!(limiter.can_proceed(t0()));
    }
    assert_eq!(limiter.state().daily_action_count, 0);
    assert!(limiter.state().recent_action_timestamps.is_empty());
}

// ---------------------------------------------------------------------------
// Duplicate tracker
// ---------------------------------------------------------------------------

#[test]
fn test_duplicate_tracker_persists_across_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("all_seen_ids.txt");

    let mut tracker = DuplicateTracker::load(&path).unwrap();
    assert!(tracker.is_empty());
    tracker.record("100").unwrap();
    tracker.record("200").unwrap();
    tracker.record("100").unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents.lines().count(), 2);

    let reloaded = DuplicateTracker::load(&path).unwrap();
    assert_eq!(reloaded.len(), 2);
    assert!(!reloaded.is_new("100"));
    assert!(!reloaded.is_new("200"));
    assert!(reloaded.is_new("300"));
}

#[test]
fn test_duplicate_tracker_ignores_blank_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("all_seen_ids.txt");
    std::fs::write(&path, "1\n\n  2  \n\n").unwrap();

    let tracker = DuplicateTracker::load(&path).unwrap();
    assert_eq!(tracker.len(), 2);
    assert!(!tracker.is_new("2"));
}

#[test]
fn test_duplicate_tracker_reset() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("all_seen_ids.txt");

    let mut tracker = DuplicateTracker::load(&path).unwrap();
    tracker.record("1").unwrap();
    tracker.reset().unwrap();
    assert!(tracker.is_new("1"));
    assert!(!path.exists());

    // Resetting twice is fine.
    tracker.reset().unwrap();
    assert!(DuplicateTracker::load(&path).unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Reply composition
// ---------------------------------------------------------------------------

#[test]
fn test_clean_generated() {
    assert_eq!(
        clean_generated("  \"Sending strength 😊\"  "),
        Some("Sending strength".to_string())
    );
    assert_eq!(clean_generated("😊🙏"), None);
    assert_eq!(clean_generated("   "), None);
}

#[test]
fn test_compose_reply_enforces_length() {
    let body = "word ".repeat(100);
    let reply = compose_reply(&body, CALLS_TO_ACTION[0]);
    assert!(reply.chars().count() <= MAX_REPLY_CHARS);

    let short = compose_reply("Thinking of you.", "DM me if you want the link.");
    assert_eq!(short, "Thinking of you. DM me if you want the link.");
}

#[test]
fn test_truncate_chars_respects_char_boundaries() {
    let text = "é".repeat(300);
    assert_eq!(truncate_chars(&text, 280).chars().count(), 280);
    assert_eq!(truncate_chars("short", 280), "short");
}

#[test]
fn test_pick_fallback_comes_from_pool() {
    let mut rng = StdRng::seed_from_u64(1);
    for _ in 0..10 {
        assert!(FALLBACK_REPLIES.contains(&pick_fallback(&mut rng)));
    }
}

// ---------------------------------------------------------------------------
// Twitter parsing and helpers
// ---------------------------------------------------------------------------

#[test]
fn test_parse_search_response() {
    let response = json!({
        "data": [
            {"id": "1", "text": "just diagnosed", "author_id": "9", "created_at": "2024-05-01T12:00:00.000Z"},
            {"id": "2"},
            {"id": "3", "text": "no date"}
        ],
        "meta": {"result_count": 3}
    });

    let items = parse_search_response(&response);
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].id, "1");
    assert_eq!(items[0].author_id, "9");
    assert_eq!(items[0].created_at, t0());
    assert_eq!(items[1].created_at, DateTime::<Utc>::UNIX_EPOCH);

    assert!(parse_search_response(&json!({"meta": {"result_count": 0}})).is_empty());
}

#[test]
fn test_parse_created_tweet_and_user() {
    assert_eq!(
        parse_created_tweet_id(&json!({"data": {"id": "123", "text": "hi"}})),
        Some("123".to_string())
    );
    assert_eq!(parse_created_tweet_id(&json!({"errors": []})), None);
    assert_eq!(
        parse_username(&json!({"data": {"id": "1", "username": "liora"}})),
        Some("liora".to_string())
    );
}

#[test]
fn test_parse_public_metrics() {
    let response = json!({
        "data": [
            {"id": "1", "public_metrics": {"like_count": 4, "retweet_count": 1, "reply_count": 2, "quote_count": 0}},
            {"id": "2"}
        ]
    });
    let metrics = parse_public_metrics(&response);
    assert_eq!(metrics.len(), 1);
    assert_eq!(
        metrics[0],
        (
            "1".to_string(),
            TweetMetrics {
                likes: 4,
                retweets: 1,
                replies: 2,
                quotes: 0
            }
        )
    );
}

#[test]
fn test_search_query_and_urls() {
    assert_eq!(build_search_query("chemo"), "chemo lang:en -is:retweet");
    assert_eq!(
        tweet_url(Some("liora"), "42"),
        "https://x.com/liora/status/42"
    );
    assert_eq!(tweet_url(None, "42"), "https://x.com/i/web/status/42");
}

#[test]
fn test_sanitize_for_logging() {
    assert_eq!(sanitize_for_logging("a\nb\tc", 50), "a b c");
    assert!(sanitize_for_logging(&"x".repeat(20), 5).starts_with("xxxxx... [truncated"));
}

#[test]
fn test_build_oauth2_user_context_header() {
    assert_eq!(
        build_oauth2_user_context_header("token123"),
        "Bearer token123"
    );
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[test]
fn test_run_mode_and_policy_parsing() {
    assert_eq!("preview".parse::<RunMode>().unwrap(), RunMode::Preview);
    assert_eq!(" AUTO ".parse::<RunMode>().unwrap(), RunMode::AutoPost);
    assert!("sometimes".parse::<RunMode>().is_err());

    assert_eq!(
        "drop".parse::<RateLimitedPolicy>().unwrap(),
        RateLimitedPolicy::Drop
    );
    assert_eq!(
        "defer".parse::<RateLimitedPolicy>().unwrap(),
        RateLimitedPolicy::Defer
    );
    assert!("ignore".parse::<RateLimitedPolicy>().is_err());
}

#[test]
fn test_mask_secret() {
    assert_eq!(mask_secret("abcdefghijklmnopqrstuvwxyz"), "abcdefgh...stuvwxyz");
    assert_eq!(mask_secret("short"), "short...");
}

/// Unit test for the get_server_port function.
#[test]
fn test_get_server_port() {
    std::env::remove_var("PORT");
    assert_eq!(get_server_port().unwrap(), 3000);

    std::env::set_var("PORT", "8080");
    assert_eq!(get_server_port().unwrap(), 8080);

    std::env::set_var("PORT", "not-a-port");
    assert!(get_server_port().is_err());

    std::env::remove_var("PORT");
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[test]
fn test_posted_reply_log_keeps_quoted_text() {
    let dir = tempfile::tempdir().unwrap();
    let files = DataFiles::new(dir.path());

    let mut record = posted_record("1", t0());
    record.original_text = "He said \"hang on\", then left".to_string();
    append_posted_reply(&files.posted_replies(), &record).unwrap();

    let rows = read_posted_replies(&files.posted_replies());
    assert_eq!(rows, vec![record]);
}

#[test]
fn test_readers_tolerate_missing_and_malformed_files() {
    let dir = tempfile::tempdir().unwrap();
    let files = DataFiles::new(dir.path());

    assert!(read_posted_replies(&files.posted_replies()).is_empty());
    assert!(read_reply_urls(&files.reply_urls()).is_empty());
    assert!(read_engagement(&files.engagement()).is_empty());

    std::fs::write(
        files.posted_replies(),
        "garbage\nnot-a-date,1,post,reply,https://x.com/i/web/status/1,1\n",
    )
    .unwrap();
    append_posted_reply(&files.posted_replies(), &posted_record("2", t0())).unwrap();

    let rows = read_posted_replies(&files.posted_replies());
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].original_item_id, "2");
}

#[test]
fn test_engagement_log() {
    let dir = tempfile::tempdir().unwrap();
    let files = DataFiles::new(dir.path());
    let records = vec![
        EngagementRecord {
            tweet_id: "r1".to_string(),
            timestamp: t0(),
            likes: 3,
            retweets: 1,
            replies: 0,
            quotes: 0,
        },
        EngagementRecord {
            tweet_id: "r2".to_string(),
            timestamp: t0(),
            likes: 0,
            retweets: 0,
            replies: 5,
            quotes: 1,
        },
    ];
    append_engagement(&files.engagement(), &records).unwrap();
    assert_eq!(read_engagement(&files.engagement()), records);
}

#[test]
fn test_pending_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pending_replies.jsonl");

    let mut store = PendingStore::load(&path).unwrap();
    for id in ["1", "2"] {
        store
            .add(PendingReply {
                item_id: id.to_string(),
                item_text: "I have cancer".to_string(),
                reply_text: "Thinking of you.".to_string(),
                priority: 8,
                created_at: t0(),
                status: PendingStatus::Pending,
            })
            .unwrap();
    }

    assert!(store.set_status("2", PendingStatus::Approved).unwrap());
    assert!(!store.set_status("missing", PendingStatus::Approved).unwrap());

    let reloaded = PendingStore::load(&path).unwrap();
    assert_eq!(reloaded.entries().len(), 2);
    assert_eq!(reloaded.with_status(PendingStatus::Pending).len(), 1);
    assert_eq!(
        reloaded.with_status(PendingStatus::Approved)[0].item_id,
        "2"
    );
}

#[test]
fn test_set_status_keeps_changes_from_another_writer() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pending_replies.jsonl");

    let mut agent = PendingStore::load(&path).unwrap();
    for id in ["1", "2"] {
        agent
            .add(PendingReply {
                item_id: id.to_string(),
                item_text: "I have cancer".to_string(),
                reply_text: "Thinking of you.".to_string(),
                priority: 8,
                created_at: t0(),
                status: PendingStatus::Approved,
            })
            .unwrap();
    }

    let mut reviewer = PendingStore::load(&path).unwrap();
    assert!(reviewer.set_status("2", PendingStatus::Rejected).unwrap());

    // `agent` still holds the old table in memory
    assert!(agent.set_status("1", PendingStatus::Posted).unwrap());
    assert_eq!(agent.status_of("2"), Some(PendingStatus::Rejected));

    let on_disk = PendingStore::load(&path).unwrap();
    assert_eq!(on_disk.status_of("1"), Some(PendingStatus::Posted));
    assert_eq!(on_disk.status_of("2"), Some(PendingStatus::Rejected));
    assert_eq!(on_disk.status_of("3"), None);
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_cycle_posts_only_new_accepted_posts() {
    let search = FakeSearch {
        items: vec![
            item("A", "Just diagnosed and fuck cancer"),
            item("B", "I have cancer"),
            item("C", "I'm on chemo and so tired"),
        ],
        ..Default::default()
    };
    let (h, rx) = harness(search, FakePoster::default());
    DuplicateTracker::load(h.files.seen_ids())
        .unwrap()
        .record("B")
        .unwrap();

    let mut orch = orchestrator(
        &h,
        rx,
        cycle_config(RunMode::AutoPost),
        RateLimits::default(),
        &["chemo"],
        Some("\"Thinking of you 💙\""),
    );
    let report = orch.run_cycle().await;

    assert_eq!(report.collected, 3);
    assert_eq!(report.duplicates, 1);
    assert_eq!(report.rejected, 1);
    assert_eq!(report.posted, 1);
    assert_eq!(h.poster.posted_targets(), vec!["C".to_string()]);

    let rows = read_posted_replies(&h.files.posted_replies());
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].original_item_id, "C");
    assert_eq!(rows[0].result_id, "reply-C");
    assert_eq!(rows[0].timestamp, t0());
    assert!(rows[0].reply_text.starts_with("Thinking of you"));
    assert!(CALLS_TO_ACTION.iter().any(|cta| rows[0].reply_text.ends_with(cta)));
    assert!(!rows[0].reply_text.contains('💙'));
    assert_eq!(
        read_reply_urls(&h.files.reply_urls()),
        vec!["https://x.com/liora/status/reply-C".to_string()]
    );

    assert!(!orch.seen().is_new("C"));
    assert!(orch.seen().is_new("A"));
    assert_eq!(orch.limiter().state().daily_action_count, 1);
}

#[tokio::test]
async fn test_cycle_uses_fallback_when_generator_fails() {
    let search = FakeSearch {
        items: vec![item("1", "Just found out my biopsy is malignant")],
        ..Default::default()
    };
    let (h, rx) = harness(search, FakePoster::default());
    let mut orch = orchestrator(&h, rx, cycle_config(RunMode::AutoPost), loose_limits(), &["biopsy"], None);

    assert_eq!(orch.run_cycle().await.posted, 1);
    let posted = h.poster.posted.lock().unwrap().clone();
    assert!(FALLBACK_REPLIES.iter().any(|f| posted[0].1.starts_with(f)));
    assert!(posted[0].1.chars().count() <= MAX_REPLY_CHARS);
}

#[tokio::test]
async fn test_highest_priority_first_and_spacing_defers_the_rest() {
    let search = FakeSearch {
        items: vec![
            item("low", "Cancer research is underfunded"),
            item("high", "Scan came back and it's everywhere"),
        ],
        ..Default::default()
    };
    let (h, rx) = harness(search, FakePoster::default());
    let mut orch = orchestrator(&h, rx, cycle_config(RunMode::AutoPost), RateLimits::default(), &["scan"], Some("Hang in there."));

    let report = orch.run_cycle().await;
    assert_eq!(report.posted, 1);
    assert_eq!(report.rate_limited, 1);
    assert_eq!(h.poster.posted_targets(), vec!["high".to_string()]);

    // Deferred: the next cycle may pick it up again.
    assert!(orch.seen().is_new("low"));
}

#[tokio::test]
async fn test_rate_limited_candidate_is_not_posted_or_marked() {
    let search = FakeSearch {
        items: vec![item("urgent", "Just diagnosed with stage 4 cancer")],
        ..Default::default()
    };
    let (h, rx) = harness(search, FakePoster::default());
    let limits = RateLimits {
        max_per_hour: 2,
        ..loose_limits()
    };
    let mut orch = orchestrator(&h, rx, cycle_config(RunMode::AutoPost), limits, &["stage 4"], Some("Hang in there."));
    orch.limiter_mut().record(t0() - Duration::minutes(20));
    orch.limiter_mut().record(t0() - Duration::minutes(10));

    let report = orch.run_cycle().await;
    assert_eq!(report.rate_limited, 1);
    assert_eq!(report.posted, 0);
    assert!(h.poster.posted_targets().is_empty());
    assert!(orch.seen().is_new("urgent"));
    assert!(read_posted_replies(&h.files.posted_replies()).is_empty());
}

#[tokio::test]
async fn test_drop_policy_marks_denied_candidates_seen() {
    let search = FakeSearch {
        items: vec![item("urgent", "Just diagnosed with stage 4 cancer")],
        ..Default::default()
    };
    let (h, rx) = harness(search, FakePoster::default());
    let config = CycleConfig {
        rate_limited_policy: RateLimitedPolicy::Drop,
        ..cycle_config(RunMode::AutoPost)
    };
    let mut orch = orchestrator(&h, rx, config, RateLimits::default(), &["stage 4"], Some("Hang in there."));
    orch.limiter_mut().record(t0() - Duration::seconds(30));

    let report = orch.run_cycle().await;
    assert_eq!(report.rate_limited, 1);
    assert!(h.poster.posted_targets().is_empty());
    assert!(!orch.seen().is_new("urgent"));
}

#[tokio::test]
async fn test_search_rate_limit_cools_down_and_continues() {
    let search = FakeSearch {
        items: vec![item("1", "I'm on chemo and so tired")],
        rate_limited: vec!["alpha".to_string()],
        failing: vec!["gamma".to_string()],
        ..Default::default()
    };
    let (h, rx) = harness(search, FakePoster::default());
    let mut orch = orchestrator(
        &h,
        rx,
        cycle_config(RunMode::AutoPost),
        loose_limits(),
        &["alpha", "beta", "gamma"],
        Some("Hang in there."),
    );

    let report = orch.run_cycle().await;
    assert_eq!(report.keywords_searched, 3);
    assert_eq!(report.search_cooldowns, 1);
    assert_eq!(report.search_failures, 1);
    assert_eq!(report.collected, 1);
    assert_eq!(report.posted, 1);
    assert_eq!(h.search.calls.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn test_post_failure_does_not_abort_batch() {
    let search = FakeSearch {
        items: vec![
            item("X", "Just found out it's cancer"),
            item("Y", "I have cancer and I'm scared"),
        ],
        ..Default::default()
    };
    let poster = FakePoster {
        fail_ids: vec!["X".to_string()],
        ..Default::default()
    };
    let (h, rx) = harness(search, poster);
    let mut orch = orchestrator(&h, rx, cycle_config(RunMode::AutoPost), RateLimits::default(), &["cancer"], Some("Hang in there."));

    let report = orch.run_cycle().await;
    assert_eq!(report.post_failures, 1);
    assert_eq!(report.posted, 1);
    assert!(orch.seen().is_new("X"));
    assert!(!orch.seen().is_new("Y"));

    let rows = read_posted_replies(&h.files.posted_replies());
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].original_item_id, "Y");
}

#[tokio::test]
async fn test_cycle_stops_at_reply_cap() {
    let search = FakeSearch {
        items: vec![
            item("1", "Just diagnosed with lymphoma"),
            item("2", "I have cancer"),
            item("3", "My mom has cancer"),
        ],
        ..Default::default()
    };
    let (h, rx) = harness(search, FakePoster::default());
    let config = CycleConfig {
        max_replies_per_cycle: 2,
        ..cycle_config(RunMode::AutoPost)
    };
    let mut orch = orchestrator(&h, rx, config, loose_limits(), &["cancer"], Some("Hang in there."));

    let report = orch.run_cycle().await;
    assert_eq!(report.posted, 2);
    assert_eq!(
        h.poster.posted_targets(),
        vec!["1".to_string(), "2".to_string()]
    );
    assert!(orch.seen().is_new("3"));
}

#[tokio::test]
async fn test_reset_seen_each_cycle() {
    let search = FakeSearch {
        items: vec![item("1", "I have cancer")],
        ..Default::default()
    };
    let (h, rx) = harness(search, FakePoster::default());
    DuplicateTracker::load(h.files.seen_ids())
        .unwrap()
        .record("1")
        .unwrap();
    let config = CycleConfig {
        reset_seen_each_cycle: true,
        ..cycle_config(RunMode::AutoPost)
    };
    let mut orch = orchestrator(&h, rx, config, loose_limits(), &["cancer"], Some("Hang in there."));

    let report = orch.run_cycle().await;
    assert_eq!(report.duplicates, 0);
    assert_eq!(report.posted, 1);
}

#[tokio::test]
async fn test_shutdown_before_cycle_does_nothing() {
    let search = FakeSearch {
        items: vec![item("1", "I have cancer")],
        ..Default::default()
    };
    let (h, rx) = harness(search, FakePoster::default());
    let mut orch = orchestrator(&h, rx, cycle_config(RunMode::AutoPost), loose_limits(), &["cancer"], Some("Hang in there."));
    h.shutdown.send(true).unwrap();

    let report = orch.run_cycle().await;
    assert!(report.cancelled);
    assert_eq!(report.collected, 0);
    assert!(h.search.calls.lock().unwrap().is_empty());
    assert!(h.poster.posted_targets().is_empty());
}

#[tokio::test]
async fn test_preview_then_approve_posts_on_next_cycle() {
    let search = FakeSearch {
        items: vec![item("1", "My sister has cancer and I don't know what to say")],
        ..Default::default()
    };
    let (h, rx) = harness(search, FakePoster::default());
    let mut orch = orchestrator(&h, rx, cycle_config(RunMode::Preview), loose_limits(), &["cancer"], Some("Hang in there."));

    let first = orch.run_cycle().await;
    assert_eq!(first.previewed, 1);
    assert_eq!(first.posted, 0);
    assert!(h.poster.posted_targets().is_empty());
    assert!(!orch.seen().is_new("1"));

    let mut review = PendingStore::load(h.files.pending()).unwrap();
    let pending = review.with_status(PendingStatus::Pending);
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].priority, 6);
    assert!(review.set_status("1", PendingStatus::Approved).unwrap());

    let second = orch.run_cycle().await;
    assert_eq!(second.approved_posted, 1);
    assert_eq!(second.duplicates, 1);
    assert_eq!(second.previewed, 0);
    assert_eq!(h.poster.posted_targets(), vec!["1".to_string()]);

    let after = PendingStore::load(h.files.pending()).unwrap();
    assert_eq!(after.with_status(PendingStatus::Posted).len(), 1);
    assert_eq!(read_posted_replies(&h.files.posted_replies()).len(), 1);
}

#[tokio::test]
async fn test_reply_rejected_during_approved_posting_is_not_posted() {
    let dir = tempfile::tempdir().unwrap();
    let pending_path = DataFiles::new(dir.path().join("data")).pending();
    let poster = FakePoster {
        // Review happens while the first approved reply is going out.
        on_post: Some(Box::new(move |target: &str| {
            if target == "1" {
                let mut review = PendingStore::load(&pending_path).unwrap();
                assert!(review.set_status("2", PendingStatus::Rejected).unwrap());
            }
        })),
        ..Default::default()
    };
    let search = FakeSearch {
        items: vec![item("1", "I have cancer"), item("2", "I have cancer too")],
        ..Default::default()
    };
    let (h, rx) = harness_in(dir, search, poster);
    let mut orch = orchestrator(&h, rx, cycle_config(RunMode::Preview), loose_limits(), &["cancer"], Some("Hang in there."));

    assert_eq!(orch.run_cycle().await.previewed, 2);
    let mut review = PendingStore::load(h.files.pending()).unwrap();
    assert!(review.set_status("1", PendingStatus::Approved).unwrap());
    assert!(review.set_status("2", PendingStatus::Approved).unwrap());

    let report = orch.run_cycle().await;
    assert_eq!(report.approved_posted, 1);
    assert_eq!(h.poster.posted_targets(), vec!["1".to_string()]);

    let after = PendingStore::load(h.files.pending()).unwrap();
    assert_eq!(after.status_of("1"), Some(PendingStatus::Posted));
    assert_eq!(after.status_of("2"), Some(PendingStatus::Rejected));
    assert_eq!(read_posted_replies(&h.files.posted_replies()).len(), 1);
}

#[tokio::test]
async fn test_last_approved_reply_skips_post_delay() {
    let search = FakeSearch {
        items: vec![item("1", "I have cancer")],
        ..Default::default()
    };
    let (h, rx) = harness(search, FakePoster::default());
    let mut orch = orchestrator(&h, rx, slow_posting_config(RunMode::Preview), loose_limits(), &["cancer"], Some("Hang in there."));

    assert_eq!(orch.run_cycle().await.previewed, 1);
    let mut review = PendingStore::load(h.files.pending()).unwrap();
    assert!(review.set_status("1", PendingStatus::Approved).unwrap());

    let report = tokio::time::timeout(std::time::Duration::from_secs(5), orch.run_cycle())
        .await
        .expect("cycle waited after its last approved reply");
    assert_eq!(report.approved_posted, 1);
}

#[tokio::test]
async fn test_shutdown_mid_cycle_finishes_current_candidate() {
    let (stop_tx, stop_rx) = watch::channel(false);
    let poster = FakePoster {
        on_post: Some(Box::new(move |_target: &str| {
            stop_tx.send_replace(true);
        })),
        ..Default::default()
    };
    let search = FakeSearch {
        items: vec![item("1", "I have cancer"), item("2", "I have cancer too")],
        ..Default::default()
    };
    let (h, _rx) = harness(search, poster);
    let mut orch = orchestrator(&h, stop_rx, cycle_config(RunMode::AutoPost), loose_limits(), &["cancer"], Some("Hang in there."));

    let report = orch.run_cycle().await;
    assert!(report.cancelled);
    assert_eq!(report.posted, 1);
    assert_eq!(h.poster.posted_targets(), vec!["1".to_string()]);
    assert_eq!(read_posted_replies(&h.files.posted_replies()).len(), 1);
    assert_eq!(orch.limiter().state().recent_action_timestamps.len(), 1);

    let seen = DuplicateTracker::load(h.files.seen_ids()).unwrap();
    assert!(!seen.is_new("1"));
    assert!(seen.is_new("2"));
}

#[tokio::test]
async fn test_single_cycle_stops_on_signal_between_candidates() {
    let signal = Arc::new(Notify::new());
    let poster = FakePoster {
        on_post: Some(Box::new({
            let signal = signal.clone();
            move |_target: &str| signal.notify_one()
        })),
        ..Default::default()
    };
    let search = FakeSearch {
        items: vec![item("1", "I have cancer"), item("2", "I have cancer too")],
        ..Default::default()
    };
    let (h, _rx) = harness(search, poster);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let orch = Mutex::new(orchestrator(&h, shutdown_rx, slow_posting_config(RunMode::AutoPost), loose_limits(), &["cancer"], Some("Hang in there.")));
    let metrics = FakeMetrics::default();

    // The hour-long post delay after "1" only ends through the signal.
    let report = tokio::time::timeout(
        std::time::Duration::from_secs(5),
        run_single_cycle(&orch, &metrics, &h.files, &shutdown_tx, signal.notified()),
    )
    .await
    .expect("cycle ignored the stop signal")
    .unwrap();

    assert!(report.cancelled);
    assert_eq!(report.posted, 1);
    assert!(*shutdown_tx.borrow());
    assert_eq!(h.poster.posted_targets(), vec!["1".to_string()]);
    assert!(orch.lock().await.seen().is_new("2"));
}

#[tokio::test]
async fn test_scheduled_cycle_skips_while_running() {
    let (h, rx) = harness(FakeSearch::default(), FakePoster::default());
    let orch = Mutex::new(orchestrator(&h, rx, cycle_config(RunMode::AutoPost), loose_limits(), &["cancer"], None));
    let metrics = FakeMetrics::default();

    {
        let _running = orch.lock().await;
        assert!(run_scheduled_cycle(&orch, &metrics, &h.files).await.is_none());
    }
    assert!(run_scheduled_cycle(&orch, &metrics, &h.files).await.is_some());
}

// ---------------------------------------------------------------------------
// Engagement
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_track_engagement_newest_first() {
    let dir = tempfile::tempdir().unwrap();
    let files = DataFiles::new(dir.path());
    let metrics = FakeMetrics::default();

    assert_eq!(track_engagement(&metrics, &files, t0(), 100).await.unwrap(), 0);
    assert!(!files.engagement().exists());

    for (i, id) in ["1", "2", "3"].iter().enumerate() {
        append_posted_reply(
            &files.posted_replies(),
            &posted_record(id, t0() + Duration::hours(i as i64)),
        )
        .unwrap();
    }

    let count = track_engagement(&metrics, &files, t0(), 2).await.unwrap();
    assert_eq!(count, 2);
    assert_eq!(
        *metrics.requested.lock().unwrap(),
        vec!["r3".to_string(), "r2".to_string()]
    );

    let rows = read_engagement(&files.engagement());
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].tweet_id, "r3");
    assert_eq!(rows[0].likes, 1);
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

/// Tests the health endpoint handler function directly.
#[test]
fn test_handle_health() {
    let Json(json_response): Json<Value> = tokio_test::block_on(handle_health());
    assert_eq!(json_response["status"], "healthy");
    assert_eq!(json_response["service"], "liora");
}

#[tokio::test]
async fn test_health_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_test_app(&DataFiles::new(dir.path()));
    let json_response = get_json(app, "/health").await;
    assert_eq!(json_response["status"], "healthy");
}

#[tokio::test]
async fn test_replies_endpoint_pagination() {
    let dir = tempfile::tempdir().unwrap();
    let files = DataFiles::new(dir.path());
    for (i, id) in ["1", "2", "3"].iter().enumerate() {
        append_posted_reply(
            &files.posted_replies(),
            &posted_record(id, t0() + Duration::hours(i as i64)),
        )
        .unwrap();
    }

    let first = get_json(create_test_app(&files), "/api/replies?page=1&per_page=2").await;
    let replies = first["replies"].as_array().unwrap();
    assert_eq!(replies.len(), 2);
    assert_eq!(replies[0]["original_tweet_id"], "3");
    assert_eq!(replies[1]["original_tweet_id"], "2");
    assert_eq!(replies[0]["reply_tweet_id"], "r3");
    assert_eq!(first["pagination"]["total"], 3);
    assert_eq!(first["pagination"]["pages"], 2);
    assert_eq!(first["pagination"]["has_next"], true);
    assert_eq!(first["pagination"]["has_prev"], false);

    let second = get_json(create_test_app(&files), "/api/replies?page=2&per_page=2").await;
    assert_eq!(second["replies"].as_array().unwrap().len(), 1);
    assert_eq!(second["replies"][0]["original_tweet_id"], "1");
    assert_eq!(second["pagination"]["has_next"], false);
    assert_eq!(second["pagination"]["has_prev"], true);

    let clamped = get_json(create_test_app(&files), "/api/replies?page=0&per_page=500").await;
    assert_eq!(clamped["pagination"]["page"], 1);
    assert_eq!(clamped["pagination"]["per_page"], 100);
    assert_eq!(clamped["replies"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_urls_endpoint_keeps_file_order() {
    let dir = tempfile::tempdir().unwrap();
    let files = DataFiles::new(dir.path());
    std::fs::write(files.reply_urls(), "https://x.com/a\n\nhttps://x.com/b\n").unwrap();

    let json_response = get_json(create_test_app(&files), "/api/urls").await;
    assert_eq!(
        json_response["urls"],
        json!(["https://x.com/a", "https://x.com/b"])
    );
    assert_eq!(json_response["pagination"]["per_page"], 20);
}

#[tokio::test]
async fn test_stats_with_missing_files() {
    let dir = tempfile::tempdir().unwrap();
    let json_response =
        get_json(create_test_app(&DataFiles::new(dir.path().join("absent"))), "/api/stats").await;

    assert_eq!(json_response["total_replies"], 0);
    assert_eq!(json_response["total_urls"], 0);
    assert_eq!(json_response["total_engagement_records"], 0);
    assert_eq!(json_response["total_pending"], 0);
    assert!(json_response["last_updated"].is_null());

    let engagement =
        get_json(create_test_app(&DataFiles::new(dir.path().join("absent"))), "/api/engagement").await;
    assert!(engagement["engagement"].as_array().unwrap().is_empty());
    assert_eq!(engagement["pagination"]["pages"], 0);
}

#[tokio::test]
async fn test_root_endpoint_escapes_html() {
    let dir = tempfile::tempdir().unwrap();
    let files = DataFiles::new(dir.path());
    let mut record = posted_record("1", t0());
    record.original_text = "<script>alert(1)</script>".to_string();
    append_posted_reply(&files.posted_replies(), &record).unwrap();

    let request = Request::builder()
        .uri("/")
        .method("GET")
        .body(Body::empty())
        .unwrap();
    let response = create_test_app(&files).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let html = String::from_utf8(body.to_vec()).unwrap();
    assert!(html.contains("&lt;script&gt;"));
    assert!(!html.contains("<script>"));
}

#[test]
fn test_paginate_past_the_end() {
    let params = PageParams {
        page: Some(5),
        per_page: Some(10),
    };
    let (items, pagination) = paginate(vec![1, 2, 3], &params, 10);
    assert!(items.is_empty());
    assert_eq!(pagination.total, 3);
    assert_eq!(pagination.pages, 1);
    assert!(!pagination.has_next);
    assert!(pagination.has_prev);
}
