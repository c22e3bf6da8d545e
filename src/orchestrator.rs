//! Reply cycle orchestration.
//!
//! One cycle collects candidate posts for a random sample of topic keywords,
//! drops duplicates, off-topic and restricted posts, and then, in priority order,
//! rate-checks, generates a reply, posts it and logs the result. In preview mode
//! the generated reply is stored for manual approval instead of being posted.
//!
//! A failure on one candidate never aborts the batch. An upstream rate limit
//! during collection pauses for the configured cooldown and then moves on to
//! the next keyword.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;

use crate::classifier::{ClassificationResult, ClassifierRules, ContentClassifier};
use crate::config::{BoxError, CycleConfig, RateLimitedPolicy, RateLimits, RunMode};
use crate::dedup::DuplicateTracker;
use crate::rate_limit::{Clock, RateLimiter};
use crate::reply::{
    build_prompt, clean_generated, compose_reply, pick_call_to_action, pick_fallback,
    SYSTEM_INSTRUCTIONS,
};
use crate::store::{
    append_posted_reply, append_reply_url, DataFiles, PendingReply, PendingStatus, PendingStore,
    PostedReplyRecord,
};
use crate::twitter::sanitize_for_logging;

/// A post fetched from search, eligible for classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateItem {
    pub id: String,
    pub text: String,
    pub author_id: String,
    pub created_at: DateTime<Utc>,
}

/// Result of a successful post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedTweet {
    pub id: String,
    pub url: String,
}

/// Public engagement counters of a tweet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TweetMetrics {
    pub likes: u64,
    pub retweets: u64,
    pub replies: u64,
    pub quotes: u64,
}

/// Failure reported by a [`SearchClient`].
#[derive(Debug, Error)]
pub enum SearchError {
    /// Upstream quota exhausted; the cycle cools down before the next keyword.
    #[error("search rate limited")]
    RateLimited,
    #[error("search failed: {0}")]
    Failed(String),
}

#[async_trait]
pub trait SearchClient: Send + Sync {
    async fn search(&self, keyword: &str, limit: usize) -> Result<Vec<CandidateItem>, SearchError>;
}

#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    /// Returns `None` when no usable text could be produced.
    async fn generate(&self, prompt: &str, system_instructions: &str) -> Option<String>;
}

#[async_trait]
pub trait ReplyPoster: Send + Sync {
    async fn post(&self, target_id: &str, text: &str) -> Result<PostedTweet, BoxError>;
}

#[async_trait]
pub trait MetricsClient: Send + Sync {
    async fn fetch_metrics(&self, ids: &[String]) -> Result<Vec<(String, TweetMetrics)>, BoxError>;
}

/// External collaborators a cycle talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub search: Arc<dyn SearchClient>,
    pub generator: Arc<dyn ReplyGenerator>,
    pub poster: Arc<dyn ReplyPoster>,
}

/// Topic keywords searched by the agent; each cycle samples a subset.
pub const TOPIC_KEYWORDS: &[&str] = &[
    "just diagnosed with cancer", "stage 4 cancer", "my cancer journey", "cancer treatment advice",
    "chemo side effects", "cancer trial", "breast cancer diagnosis", "pancreatic cancer help",
    "is there hope for cancer", "cancer battle", "terminal cancer", "fighting cancer",
    "my mom has cancer", "my dad has cancer", "my sister has cancer", "my brother has cancer",
    "my friend has cancer", "my partner has cancer", "cancer pain", "scan came back",
    "tumor found", "cancer diagnosis", "metastatic cancer", "oncology appointment",
    "chemo started", "radiation treatment", "cancer is back", "recurrence of cancer",
    "anyone survived stage 4", "clinical trials for cancer", "lung cancer diagnosis",
    "brain tumor diagnosis", "immunotherapy cancer", "oncologist appointment", "scared of cancer",
    "fear of chemo", "cancer prognosis", "can cancer be cured", "cancer came back",
    "colon cancer stage 3", "rare cancer diagnosis", "liver cancer stage 4", "pet scan cancer",
    "inoperable cancer", "palliative care cancer", "talking to kids about cancer",
];

/// Counters describing what one cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub keywords_searched: usize,
    pub collected: usize,
    pub duplicates: usize,
    pub rejected: usize,
    pub restricted: usize,
    pub rate_limited: usize,
    pub posted: usize,
    pub post_failures: usize,
    pub previewed: usize,
    pub approved_posted: usize,
    pub search_failures: usize,
    pub search_cooldowns: usize,
    pub cancelled: bool,
}

/// A candidate that passed every filter, with its classification.
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub item: CandidateItem,
    pub classification: ClassificationResult,
}

/// Runs reply cycles over the owned limiter, tracker and stores.
pub struct Orchestrator {
    config: CycleConfig,
    keywords: Vec<String>,
    classifier: ContentClassifier,
    limiter: RateLimiter,
    seen: DuplicateTracker,
    pending: PendingStore,
    files: DataFiles,
    collaborators: Collaborators,
    clock: Arc<dyn Clock>,
    rng: StdRng,
    shutdown: watch::Receiver<bool>,
}

impl Orchestrator {
    /// Loads the seen-id set and the pending table from `files` and wires the collaborators.
    ///
    /// # Returns
    ///
    /// - `Ok(Orchestrator)`: Ready to run cycles
    /// - `Err(BoxError)`: If persisted state exists but cannot be read
    pub fn new(
        config: CycleConfig,
        rate_limits: RateLimits,
        files: DataFiles,
        collaborators: Collaborators,
        clock: Arc<dyn Clock>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Self, BoxError> {
        let seen = DuplicateTracker::load(files.seen_ids())?;
        let pending = PendingStore::load(files.pending())?;
        let rules = if config.recent_diagnosis_only {
            ClassifierRules::recent_diagnosis_only()
        } else {
            ClassifierRules::default()
        };
        let limiter = RateLimiter::new(rate_limits, clock.now());

        Ok(Orchestrator {
            config,
            keywords: TOPIC_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            classifier: ContentClassifier::new(rules),
            limiter,
            seen,
            pending,
            files,
            collaborators,
            clock,
            rng: StdRng::from_entropy(),
            shutdown,
        })
    }

    /// Replaces the keyword pool.
    pub fn with_keywords(mut self, keywords: Vec<String>) -> Self {
        self.keywords = keywords;
        self
    }

    /// Replaces the random source, e.g. with a seeded one.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn limiter_mut(&mut self) -> &mut RateLimiter {
        &mut self.limiter
    }

    pub fn seen(&self) -> &DuplicateTracker {
        &self.seen
    }

    pub fn pending(&self) -> &PendingStore {
        &self.pending
    }

    /// Runs one full cycle and reports what happened.
    pub async fn run_cycle(&mut self) -> CycleReport {
        let mut report = CycleReport::default();
        info!("Starting reply cycle in {:?} mode", self.config.mode);

        if self.config.reset_seen_each_cycle {
            if let Err(e) = self.seen.reset() {
                error!("Failed to reset seen ids: {}", e);
            }
        }

        if self.config.mode == RunMode::Preview {
            self.post_approved(&mut report).await;
        }

        let batch = self.collect(&mut report).await;
        let candidates = self.filter(batch, &mut report);
        info!(
            "{} candidates survived filtering ({} duplicates, {} rejected, {} restricted)",
            candidates.len(),
            report.duplicates,
            report.rejected,
            report.restricted
        );
        self.process(candidates, &mut report).await;

        info!(
            "Reply cycle finished: {} posted, {} previewed, {} approved posted, {} rate limited, {} failed{}",
            report.posted,
            report.previewed,
            report.approved_posted,
            report.rate_limited,
            report.post_failures,
            if report.cancelled { " (cancelled)" } else { "" }
        );
        report
    }

    fn is_cancelled(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Sleeps a random duration in `[min, max]`, returning early on shutdown.
    async fn pause(&mut self, min: Duration, max: Duration) {
        if max.is_zero() {
            return;
        }
        let delay = if max > min {
            self.rng.gen_range(min..=max)
        } else {
            min
        };
        debug!("Pausing for {}s", delay.as_secs());

        let mut shutdown = self.shutdown.clone();
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = async {
                if shutdown.wait_for(|stop| *stop).await.is_err() {
                    std::future::pending::<()>().await;
                }
            } => {
                info!("Pause interrupted by shutdown");
            }
        }
    }

    fn sample_keywords(&mut self) -> Vec<String> {
        let amount = self.config.keywords_per_cycle.min(self.keywords.len());
        self.keywords
            .choose_multiple(&mut self.rng, amount)
            .cloned()
            .collect()
    }

    /// COLLECT: searches a keyword sample. Posts found under several keywords are kept once.
    pub async fn collect(&mut self, report: &mut CycleReport) -> Vec<CandidateItem> {
        let keywords = self.sample_keywords();
        let mut batch = Vec::new();
        let mut batch_ids = HashSet::new();
        let pacing = self.config.pacing;

        for (i, keyword) in keywords.iter().enumerate() {
            if self.is_cancelled() {
                report.cancelled = true;
                break;
            }

            info!("Searching: {}", keyword);
            report.keywords_searched += 1;
            match self
                .collaborators
                .search
                .search(keyword, self.config.search_limit)
                .await
            {
                Ok(items) => {
                    info!("Found {} posts for '{}'", items.len(), keyword);
                    for item in items {
                        if batch_ids.insert(item.id.clone()) {
                            batch.push(item);
                        }
                    }
                }
                Err(SearchError::RateLimited) => {
                    warn!(
                        "Rate limit hit for keyword '{}'. Cooling down for {}s",
                        keyword,
                        pacing.rate_limit_cooldown.as_secs()
                    );
                    report.search_cooldowns += 1;
                    self.pause(pacing.rate_limit_cooldown, pacing.rate_limit_cooldown)
                        .await;
                    continue;
                }
                Err(SearchError::Failed(msg)) => {
                    error!("Search failed for '{}': {}", keyword, msg);
                    report.search_failures += 1;
                }
            }

            if i + 1 < keywords.len() {
                self.pause(pacing.search_delay_min, pacing.search_delay_max)
                    .await;
            }
        }

        report.collected = batch.len();
        batch
    }

    /// CLASSIFY_AND_FILTER: drops seen, rejected and restricted posts, then orders
    /// the rest by descending priority, keeping collection order among equals.
    pub fn filter(&self, batch: Vec<CandidateItem>, report: &mut CycleReport) -> Vec<ScoredCandidate> {
        let mut accepted = Vec::new();

        for item in batch {
            if !self.seen.is_new(&item.id) {
                debug!("Skipping {} - already seen", item.id);
                report.duplicates += 1;
                continue;
            }

            let classification = self.classifier.classify(&item.text);
            if !classification.accepted {
                debug!(
                    "Skipping {} ({}): {}",
                    item.id,
                    classification.reason,
                    sanitize_for_logging(&item.text, 80)
                );
                report.rejected += 1;
                continue;
            }

            if self.classifier.mentions_restricted_subject(&item.text) {
                debug!("Skipping {} - mentions a restricted subject", item.id);
                report.restricted += 1;
                continue;
            }

            accepted.push(ScoredCandidate {
                item,
                classification,
            });
        }

        accepted.sort_by(|a, b| b.classification.priority.cmp(&a.classification.priority));
        accepted
    }

    async fn process(&mut self, candidates: Vec<ScoredCandidate>, report: &mut CycleReport) {
        let total = candidates.len();
        let mut handled = 0;

        for (i, candidate) in candidates.into_iter().enumerate() {
            if self.is_cancelled() {
                report.cancelled = true;
                break;
            }
            if handled >= self.config.max_replies_per_cycle {
                info!(
                    "Reached {} replies this cycle, leaving {} candidates for later",
                    handled,
                    total - i
                );
                break;
            }

            let item = &candidate.item;
            info!(
                "Candidate {} (priority {}, {}): {}",
                item.id,
                candidate.classification.priority,
                candidate.classification.reason,
                sanitize_for_logging(&item.text, 120)
            );

            match self.config.mode {
                RunMode::Preview => {
                    let reply = self.generate_reply(&item.text).await;
                    let entry = PendingReply {
                        item_id: item.id.clone(),
                        item_text: item.text.clone(),
                        reply_text: reply,
                        priority: candidate.classification.priority,
                        created_at: self.clock.now(),
                        status: PendingStatus::Pending,
                    };
                    if let Err(e) = self.pending.add(entry) {
                        error!("Failed to store pending reply for {}: {}", item.id, e);
                        continue;
                    }
                    self.mark_seen(&item.id);
                    report.previewed += 1;
                    handled += 1;
                }
                RunMode::AutoPost => {
                    let check = self.limiter.check(self.clock.now());
                    if !check.is_allowed() {
                        report.rate_limited += 1;
                        match self.config.rate_limited_policy {
                            RateLimitedPolicy::Defer => {
                                info!("Deferring {} to a later cycle", item.id)
                            }
                            RateLimitedPolicy::Drop => {
                                info!("Dropping {} after rate-limit denial", item.id);
                                self.mark_seen(&item.id);
                            }
                        }
                        continue;
                    }

                    let reply = self.generate_reply(&item.text).await;
                    if self.post_and_record(&item.id, &item.text, &reply).await {
                        report.posted += 1;
                        handled += 1;
                        if i + 1 < total {
                            let pacing = self.config.pacing;
                            self.pause(pacing.post_delay_min, pacing.post_delay_max)
                                .await;
                        }
                    } else {
                        report.post_failures += 1;
                    }
                }
            }
        }
    }

    /// Posts replies approved in preview mode, subject to the rate limiter.
    ///
    /// Review happens out of process, so the table is re-read before every post
    /// and entries that are no longer approved are skipped.
    async fn post_approved(&mut self, report: &mut CycleReport) {
        if let Err(e) = self.pending.reload() {
            error!("Failed to reload pending replies: {}", e);
            return;
        }

        let approved = self.pending.with_status(PendingStatus::Approved);
        if approved.is_empty() {
            return;
        }
        let total = approved.len();
        info!("Posting {} approved replies", total);

        for (i, entry) in approved.into_iter().enumerate() {
            if self.is_cancelled() {
                report.cancelled = true;
                return;
            }
            if let Err(e) = self.pending.reload() {
                error!("Failed to reload pending replies: {}", e);
                return;
            }
            if self.pending.status_of(&entry.item_id) != Some(PendingStatus::Approved) {
                info!("Reply to {} is no longer approved, skipping", entry.item_id);
                continue;
            }
            if !self.limiter.check(self.clock.now()).is_allowed() {
                info!("Approved reply to {} held for a later cycle", entry.item_id);
                report.rate_limited += 1;
                continue;
            }
            if self
                .post_and_record(&entry.item_id, &entry.item_text, &entry.reply_text)
                .await
            {
                if let Err(e) = self.pending.set_status(&entry.item_id, PendingStatus::Posted) {
                    error!("Failed to mark {} as posted: {}", entry.item_id, e);
                }
                report.approved_posted += 1;
                if i + 1 < total {
                    let pacing = self.config.pacing;
                    self.pause(pacing.post_delay_min, pacing.post_delay_max)
                        .await;
                }
            } else {
                report.post_failures += 1;
            }
        }
    }

    /// GENERATE: model text (or a fallback), plus a call-to-action, cut to length.
    async fn generate_reply(&mut self, post_text: &str) -> String {
        let prompt = build_prompt(post_text);
        let generated = self
            .collaborators
            .generator
            .generate(&prompt, SYSTEM_INSTRUCTIONS)
            .await;
        let body = match generated.as_deref().and_then(clean_generated) {
            Some(body) => body,
            None => {
                warn!("No usable generated text, using a fallback reply");
                pick_fallback(&mut self.rng).to_string()
            }
        };
        let call_to_action = pick_call_to_action(&mut self.rng);
        compose_reply(&body, call_to_action)
    }

    /// POST + LOG. Returns `true` when the reply went out.
    async fn post_and_record(&mut self, item_id: &str, item_text: &str, reply_text: &str) -> bool {
        let posted = match self.collaborators.poster.post(item_id, reply_text).await {
            Ok(posted) => posted,
            Err(e) => {
                error!("Error replying to {}: {}", item_id, e);
                return false;
            }
        };

        let now = self.clock.now();
        self.limiter.record(now);
        self.mark_seen(item_id);

        let record = PostedReplyRecord {
            timestamp: now,
            original_item_id: item_id.to_string(),
            original_text: item_text.replace('\n', " ").trim().to_string(),
            reply_text: reply_text.to_string(),
            result_url: posted.url.clone(),
            result_id: posted.id.clone(),
        };
        if let Err(e) = append_posted_reply(&self.files.posted_replies(), &record) {
            error!("Failed to log reply to {}: {}", item_id, e);
        }
        if let Err(e) = append_reply_url(&self.files.reply_urls(), &posted.url) {
            error!("Failed to log reply URL {}: {}", posted.url, e);
        }

        info!("Replied to {}: {}", item_id, posted.url);
        true
    }

    fn mark_seen(&mut self, id: &str) {
        if let Err(e) = self.seen.record(id) {
            error!("Failed to persist seen id {}: {}", id, e);
        }
    }
}
