//! Reporting types for operators and dashboards

use meshguard_core::{ReputationLevel, SenderId, Timestamp};
use serde::{Deserialize, Serialize};

/// Number of recent flags reported per sender
pub const RECENT_FLAGS: usize = 10;

/// Cumulative denial counters
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DenialCounters {
    pub blocked: u64,
    pub rate_limited: u64,
    pub deduped: u64,
}

impl DenialCounters {
    pub fn denied(&self) -> u64 {
        self.blocked + self.rate_limited + self.deduped
    }
}

/// Count of tracked senders per reputation level
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelHistogram {
    pub trusted: usize,
    pub normal: usize,
    pub suspicious: usize,
    pub blocked: usize,
}

impl LevelHistogram {
    pub fn record(&mut self, level: ReputationLevel) {
        match level {
            ReputationLevel::Trusted => self.trusted += 1,
            ReputationLevel::Normal => self.normal += 1,
            ReputationLevel::Suspicious => self.suspicious += 1,
            ReputationLevel::Blocked => self.blocked += 1,
        }
    }

    pub fn get(&self, level: ReputationLevel) -> usize {
        match level {
            ReputationLevel::Trusted => self.trusted,
            ReputationLevel::Normal => self.normal,
            ReputationLevel::Suspicious => self.suspicious,
            ReputationLevel::Blocked => self.blocked,
        }
    }

    pub fn total(&self) -> usize {
        self.trusted + self.normal + self.suspicious + self.blocked
    }
}

impl FromIterator<ReputationLevel> for LevelHistogram {
    fn from_iter<I: IntoIterator<Item = ReputationLevel>>(iter: I) -> Self {
        let mut histogram = LevelHistogram::default();
        for level in iter {
            histogram.record(level);
        }
        histogram
    }
}

/// Aggregate admission-layer status
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HardeningStats {
    pub tracked_senders: usize,
    /// Blocklist size
    pub blocked_senders: usize,
    /// Allowlist size
    pub trusted_senders: usize,
    pub counters: DenialCounters,
    pub levels: LevelHistogram,
    pub dedup_entries: usize,
    pub observer_failures: u64,
    pub rate_limit_enabled: bool,
    pub reputation_enabled: bool,
    pub dedup_enabled: bool,
}

/// Per-sender report
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SenderStats {
    pub sender_id: SenderId,
    pub reputation: f64,
    pub level: ReputationLevel,
    pub message_count: u64,
    pub first_seen: Timestamp,
    pub last_seen: Timestamp,
    pub flags_count: usize,
    pub recent_flags: Vec<String>,
    pub is_blocked: bool,
    pub is_trusted: bool,
}
