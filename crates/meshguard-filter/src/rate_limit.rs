//! Per-sender rate limiting
//!
//! Two independent guards over the same timestamp window:
//! - burst: short sub-window, checked first since it is the more specific
//!   violation
//! - sustained: the full rolling window

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use meshguard_core::{RateLimitConfig, Timestamp};

use crate::SenderProfile;

/// Which limit was hit
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitViolation {
    /// Too many messages inside the burst sub-window
    Burst { max: usize, window: Duration },
    /// Too many messages inside the sustained window
    Window { max: usize, window: Duration },
}

impl fmt::Display for RateLimitViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateLimitViolation::Burst { max, window } => write!(
                f,
                "Burst detected (more than {max} messages in {}s)",
                window.as_secs_f64()
            ),
            RateLimitViolation::Window { max, window } => write!(
                f,
                "Rate limit exceeded ({max}/{}s)",
                window.as_secs_f64()
            ),
        }
    }
}

/// Outcome of a rate-limit check
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitResult {
    pub allowed: bool,
    pub violation: Option<RateLimitViolation>,
    /// Time until the oldest offending entry ages out
    pub wait: Duration,
}

impl RateLimitResult {
    pub fn allow() -> Self {
        RateLimitResult {
            allowed: true,
            violation: None,
            wait: Duration::ZERO,
        }
    }

    fn deny(violation: RateLimitViolation, wait: Duration) -> Self {
        RateLimitResult {
            allowed: false,
            violation: Some(violation),
            wait,
        }
    }

    #[inline]
    pub fn is_burst(&self) -> bool {
        matches!(self.violation, Some(RateLimitViolation::Burst { .. }))
    }

    #[inline]
    pub fn wait_seconds(&self) -> f64 {
        self.wait.as_secs_f64()
    }

    /// Human-readable reason, empty when allowed
    pub fn reason(&self) -> String {
        self.violation.map(|v| v.to_string()).unwrap_or_default()
    }
}

/// Sliding-window rate limiter
#[derive(Clone, Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        RateLimiter { config }
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Check and, if allowed, record an arrival at `now`
    ///
    /// Disabled limiters allow everything and leave the profile untouched.
    pub fn check(&self, profile: &mut SenderProfile, now: Timestamp) -> RateLimitResult {
        if !self.config.enabled {
            return RateLimitResult::allow();
        }

        let window = profile.timestamps_mut();
        self.prune(window, now);

        let result = self.evaluate(window, now);
        if result.allowed {
            window.push_back(now);
        }
        result
    }

    /// Advisory mode: always record the arrival, report what `check` would
    /// have decided
    ///
    /// Used for senders exempt from throttling whose volume is still worth
    /// logging. The window is capped at `max_messages` so it stays bounded.
    pub fn observe(&self, profile: &mut SenderProfile, now: Timestamp) -> RateLimitResult {
        if !self.config.enabled {
            return RateLimitResult::allow();
        }

        let window = profile.timestamps_mut();
        self.prune(window, now);

        let result = self.evaluate(window, now);
        window.push_back(now);
        while window.len() > self.config.max_messages {
            window.pop_front();
        }
        result
    }

    /// Drop timestamps that have left the sustained window
    fn prune(&self, window: &mut VecDeque<Timestamp>, now: Timestamp) {
        let span = self.config.window;
        window.retain(|ts| now.duration_since(*ts) < span);
    }

    fn evaluate(&self, window: &VecDeque<Timestamp>, now: Timestamp) -> RateLimitResult {
        let cfg = &self.config;

        // Burst sub-window
        let mut burst_count = 0usize;
        let mut burst_oldest: Option<Timestamp> = None;
        for ts in window.iter().filter(|ts| now.duration_since(**ts) < cfg.burst_window) {
            burst_count += 1;
            burst_oldest = Some(burst_oldest.map_or(*ts, |o| o.min(*ts)));
        }

        if burst_count >= cfg.burst_max {
            let age = burst_oldest.map_or(Duration::ZERO, |o| now.duration_since(o));
            return RateLimitResult::deny(
                RateLimitViolation::Burst {
                    max: cfg.burst_max,
                    window: cfg.burst_window,
                },
                cfg.burst_window.saturating_sub(age),
            );
        }

        // Sustained window
        if window.len() >= cfg.max_messages {
            let age = window
                .iter()
                .min()
                .map_or(Duration::ZERO, |oldest| now.duration_since(*oldest));
            return RateLimitResult::deny(
                RateLimitViolation::Window {
                    max: cfg.max_messages,
                    window: cfg.window,
                },
                cfg.window.saturating_sub(age),
            );
        }

        RateLimitResult::allow()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}
