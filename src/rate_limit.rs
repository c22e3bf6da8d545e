//! Sliding-window rate limiting for posted replies.
//!
//! [`RateLimiter`] owns its [`RateLimiterState`] and is the only thing that mutates it.
//! Time always comes in from the caller, usually through a [`Clock`], so tests can
//! drive the windows deterministically.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use log::{debug, info, warn};
use std::collections::VecDeque;
use std::fmt;

use crate::config::RateLimits;

const HOURLY_WINDOW_SECS: i64 = 3600;
const BURST_WINDOW_SECS: i64 = 600;

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// One failed rate-limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateDenial {
    HourlyLimit { recent: usize, max: usize },
    DailyLimit { count: u32, max: u32 },
    MinSpacing { elapsed_secs: i64, required_secs: i64 },
    BurstCap { recent: usize, cap: usize },
}

impl fmt::Display for RateDenial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateDenial::HourlyLimit { recent, max } => {
                write!(f, "hourly limit reached ({}/{} in the last hour)", recent, max)
            }
            RateDenial::DailyLimit { count, max } => {
                write!(f, "daily limit reached ({}/{} today)", count, max)
            }
            RateDenial::MinSpacing {
                elapsed_secs,
                required_secs,
            } => write!(
                f,
                "minimum spacing not met ({}s since last action, {}s required)",
                elapsed_secs, required_secs
            ),
            RateDenial::BurstCap { recent, cap } => {
                write!(f, "burst cap reached ({}/{} in the last 10 minutes)", recent, cap)
            }
        }
    }
}

/// Outcome of [`RateLimiter::check`]: every failing check, in evaluation order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateCheck {
    pub denials: Vec<RateDenial>,
}

impl RateCheck {
    pub fn is_allowed(&self) -> bool {
        self.denials.is_empty()
    }
}

/// Process-lifetime limiter state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimiterState {
    /// Recorded action times, oldest first.
    pub recent_action_timestamps: VecDeque<DateTime<Utc>>,
    pub daily_action_count: u32,
    pub daily_count_reset_date: NaiveDate,
}

impl RateLimiterState {
    pub fn new(today: NaiveDate) -> Self {
        RateLimiterState {
            recent_action_timestamps: VecDeque::new(),
            daily_action_count: 0,
            daily_count_reset_date: today,
        }
    }
}

/// Hourly, daily, spacing and burst limits over recorded actions.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    limits: RateLimits,
    state: RateLimiterState,
}

impl RateLimiter {
    /// Creates a limiter whose daily counter starts on the UTC date of `now`.
    pub fn new(limits: RateLimits, now: DateTime<Utc>) -> Self {
        RateLimiter {
            limits,
            state: RateLimiterState::new(now.date_naive()),
        }
    }

    pub fn limits(&self) -> RateLimits {
        self.limits
    }

    pub fn state(&self) -> &RateLimiterState {
        &self.state
    }

    /// Runs all four checks against `now` and reports each one that fails.
    ///
    /// Pruning of the hourly window and the daily rollover happen here, so the
    /// state is always current when the counts are read.
    ///
    /// Minimum spacing is the gap between `now` (the action about to happen) and
    /// the most recent recorded action, not the gap between the last two recorded
    /// ones. A pair of recorded actions that were too close together never blocks
    /// later actions.
    pub fn check(&mut self, now: DateTime<Utc>) -> RateCheck {
        self.roll_day(now);
        self.prune(now);

        let mut denials = Vec::new();

        let recent = self.state.recent_action_timestamps.len();
        if recent >= self.limits.max_per_hour {
            denials.push(RateDenial::HourlyLimit {
                recent,
                max: self.limits.max_per_hour,
            });
        }

        if self.state.daily_action_count >= self.limits.max_per_day {
            denials.push(RateDenial::DailyLimit {
                count: self.state.daily_action_count,
                max: self.limits.max_per_day,
            });
        }

        // The prospective action at `now` pairs with the latest recorded one.
        if let Some(last) = self.state.recent_action_timestamps.back() {
            let elapsed = (now - *last).num_seconds();
            if elapsed < self.limits.min_spacing_secs {
                denials.push(RateDenial::MinSpacing {
                    elapsed_secs: elapsed,
                    required_secs: self.limits.min_spacing_secs,
                });
            }
        }

        let burst_window = Duration::seconds(BURST_WINDOW_SECS);
        let in_burst = self
            .state
            .recent_action_timestamps
            .iter()
            .filter(|t| now - **t < burst_window)
            .count();
        if in_burst >= self.limits.burst_cap {
            denials.push(RateDenial::BurstCap {
                recent: in_burst,
                cap: self.limits.burst_cap,
            });
        }

        for denial in &denials {
            warn!("Rate limiter denied action: {}", denial);
        }
        RateCheck { denials }
    }

    /// `true` when every check passes at `now`.
    pub fn can_proceed(&mut self, now: DateTime<Utc>) -> bool {
        self.check(now).is_allowed()
    }

    /// Records a completed action at `now`. Call only after the action succeeded.
    pub fn record(&mut self, now: DateTime<Utc>) {
        self.roll_day(now);
        self.state.recent_action_timestamps.push_back(now);
        self.state.daily_action_count += 1;
        debug!(
            "Recorded action at {} ({} today, {} in window)",
            now,
            self.state.daily_action_count,
            self.state.recent_action_timestamps.len()
        );
    }

    fn roll_day(&mut self, now: DateTime<Utc>) {
        let today = now.date_naive();
        if today > self.state.daily_count_reset_date {
            info!(
                "New day {} - resetting daily action count (was {})",
                today, self.state.daily_action_count
            );
            self.state.daily_action_count = 0;
            self.state.daily_count_reset_date = today;
        }
    }

    fn prune(&mut self, now: DateTime<Utc>) {
        let window = Duration::seconds(HOURLY_WINDOW_SECS);
        while let Some(oldest) = self.state.recent_action_timestamps.front() {
            if now - *oldest >= window {
                self.state.recent_action_timestamps.pop_front();
            } else {
                break;
            }
        }
    }
}
