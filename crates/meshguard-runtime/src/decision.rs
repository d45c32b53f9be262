//! Admission decisions

use std::fmt;
use std::time::Duration;

use meshguard_core::{ReputationLevel, SenderId, Timestamp};
use meshguard_filter::RateLimitViolation;

/// Why a message was refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    /// Operator blocklist or manual block flag
    BlockedManual { reason: String },
    /// Reputation fell to the block threshold
    BlockedReputation,
    /// Burst or sustained rate limit
    RateLimited(RateLimitViolation),
    /// Same normalized content seen inside the dedup window
    Duplicate,
}

impl DenyReason {
    /// Stable machine-readable tag
    pub fn kind(&self) -> &'static str {
        match self {
            DenyReason::BlockedManual { .. } => "blocked-manual",
            DenyReason::BlockedReputation => "blocked-reputation",
            DenyReason::RateLimited(RateLimitViolation::Burst { .. }) => "rate-limited-burst",
            DenyReason::RateLimited(RateLimitViolation::Window { .. }) => "rate-limited-window",
            DenyReason::Duplicate => "duplicate",
        }
    }

    pub fn is_block(&self) -> bool {
        matches!(
            self,
            DenyReason::BlockedManual { .. } | DenyReason::BlockedReputation
        )
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::BlockedManual { reason } => write!(f, "Blocked: {reason}"),
            DenyReason::BlockedReputation => f.write_str("Blocked: Reputation too low"),
            DenyReason::RateLimited(violation) => violation.fmt(f),
            DenyReason::Duplicate => f.write_str("Duplicate message"),
        }
    }
}

/// Result of the admission pipeline for one message
#[derive(Debug, Clone, PartialEq)]
pub struct AdmissionDecision {
    pub allowed: bool,
    pub reason: Option<DenyReason>,
    pub sender_level: ReputationLevel,
    /// Sender is on the allowlist
    pub is_trusted: bool,
    pub is_duplicate: bool,
    pub rate_limited: bool,
    /// Suggested back-off for rate-limited senders
    pub wait: Duration,
}

impl AdmissionDecision {
    pub fn admit(sender_level: ReputationLevel, is_trusted: bool) -> Self {
        AdmissionDecision {
            allowed: true,
            reason: None,
            sender_level,
            is_trusted,
            is_duplicate: false,
            rate_limited: false,
            wait: Duration::ZERO,
        }
    }

    pub fn deny(reason: DenyReason, sender_level: ReputationLevel, is_trusted: bool) -> Self {
        AdmissionDecision {
            allowed: false,
            is_duplicate: reason == DenyReason::Duplicate,
            rate_limited: matches!(reason, DenyReason::RateLimited(_)),
            reason: Some(reason),
            sender_level,
            is_trusted,
            wait: Duration::ZERO,
        }
    }

    pub fn with_wait(mut self, wait: Duration) -> Self {
        self.wait = wait;
        self
    }

    /// Human-readable reason, empty when admitted
    pub fn reason_text(&self) -> String {
        self.reason.as_ref().map(ToString::to_string).unwrap_or_default()
    }

    pub fn is_burst(&self) -> bool {
        matches!(
            self.reason,
            Some(DenyReason::RateLimited(RateLimitViolation::Burst { .. }))
        )
    }

    #[inline]
    pub fn wait_seconds(&self) -> f64 {
        self.wait.as_secs_f64()
    }
}

/// Published to observers whenever a message is refused
#[derive(Debug, Clone)]
pub struct DenialEvent {
    pub sender: SenderId,
    pub reason: DenyReason,
    pub sender_level: ReputationLevel,
    pub at: Timestamp,
}
