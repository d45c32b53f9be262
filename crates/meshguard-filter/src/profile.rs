//! Sender profiles - per-sender state tracked across messages

use std::collections::{HashMap, VecDeque};

use meshguard_core::{Fingerprint, ProfileConfig, SenderId, Timestamp};
use serde::{Deserialize, Serialize};

/// Caps applied to a profile's histories
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HistoryLimits {
    pub max_flags: usize,
    pub max_hashes: usize,
}

impl From<&ProfileConfig> for HistoryLimits {
    fn from(config: &ProfileConfig) -> Self {
        HistoryLimits {
            max_flags: config.max_flags,
            max_hashes: config.max_hashes,
        }
    }
}

impl Default for HistoryLimits {
    fn default() -> Self {
        HistoryLimits::from(&ProfileConfig::default())
    }
}

/// Behaviour of one sender over time
///
/// INVARIANT: `manually_blocked` and `manually_trusted` are never both set,
/// and `reputation` stays within [0, 1]. Both are enforced by the setters.
#[derive(Clone, Debug)]
pub struct SenderProfile {
    pub sender_id: SenderId,
    pub first_seen: Timestamp,
    pub last_seen: Timestamp,
    /// Messages that went through analysis; never decremented
    pub message_count: u64,
    reputation: f64,
    flags_received: VecDeque<String>,
    recent_timestamps: VecDeque<Timestamp>,
    /// Kept for pattern features; dedup decisions use the global cache
    recent_hashes: VecDeque<Fingerprint>,
    manually_blocked: bool,
    manually_trusted: bool,
    limits: HistoryLimits,
}

impl SenderProfile {
    pub fn new(sender_id: SenderId, reputation: f64, limits: HistoryLimits, now: Timestamp) -> Self {
        SenderProfile {
            sender_id,
            first_seen: now,
            last_seen: now,
            message_count: 0,
            reputation: clamp_unit(reputation),
            flags_received: VecDeque::new(),
            recent_timestamps: VecDeque::new(),
            recent_hashes: VecDeque::new(),
            manually_blocked: false,
            manually_trusted: false,
            limits,
        }
    }

    #[inline]
    pub fn reputation(&self) -> f64 {
        self.reputation
    }

    /// Set reputation, clamped to [0, 1]; non-finite values are ignored
    pub fn set_reputation(&mut self, value: f64) {
        if value.is_finite() {
            self.reputation = clamp_unit(value);
        }
    }

    #[inline]
    pub fn is_manually_blocked(&self) -> bool {
        self.manually_blocked
    }

    #[inline]
    pub fn is_manually_trusted(&self) -> bool {
        self.manually_trusted
    }

    /// Blocking clears any manual trust
    pub fn set_manually_blocked(&mut self, blocked: bool) {
        self.manually_blocked = blocked;
        if blocked {
            self.manually_trusted = false;
        }
    }

    /// Trusting clears any manual block
    pub fn set_manually_trusted(&mut self, trusted: bool) {
        self.manually_trusted = trusted;
        if trusted {
            self.manually_blocked = false;
        }
    }

    /// Append flags, evicting the oldest beyond the cap
    pub fn record_flags<I, S>(&mut self, flags: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.flags_received.extend(flags.into_iter().map(Into::into));
        while self.flags_received.len() > self.limits.max_flags {
            self.flags_received.pop_front();
        }
    }

    pub fn flags(&self) -> impl Iterator<Item = &str> {
        self.flags_received.iter().map(String::as_str)
    }

    pub fn flags_count(&self) -> usize {
        self.flags_received.len()
    }

    /// The `n` most recent flags, oldest first
    pub fn recent_flags(&self, n: usize) -> Vec<String> {
        let skip = self.flags_received.len().saturating_sub(n);
        self.flags_received.iter().skip(skip).cloned().collect()
    }

    pub fn record_fingerprint(&mut self, fingerprint: Fingerprint) {
        self.recent_hashes.push_back(fingerprint);
        while self.recent_hashes.len() > self.limits.max_hashes {
            self.recent_hashes.pop_front();
        }
    }

    pub fn recent_hashes(&self) -> &VecDeque<Fingerprint> {
        &self.recent_hashes
    }

    pub fn recent_timestamps(&self) -> &VecDeque<Timestamp> {
        &self.recent_timestamps
    }

    pub(crate) fn timestamps_mut(&mut self) -> &mut VecDeque<Timestamp> {
        &mut self.recent_timestamps
    }

    /// Reputation has fallen below the neutral starting point
    pub fn is_penalized(&self, neutral: f64) -> bool {
        self.reputation < neutral
    }

    /// Persistable view of this profile
    pub fn to_snapshot(&self) -> ProfileSnapshot {
        ProfileSnapshot {
            sender_id: self.sender_id.clone(),
            message_count: self.message_count,
            reputation: self.reputation,
            flags_received: self.flags_received.iter().cloned().collect(),
            recent_hashes: self.recent_hashes.iter().copied().collect(),
            manually_blocked: self.manually_blocked,
            manually_trusted: self.manually_trusted,
        }
    }

    /// Rebuild from a snapshot; timing history starts afresh at `now`
    pub fn from_snapshot(snapshot: ProfileSnapshot, limits: HistoryLimits, now: Timestamp) -> Self {
        let mut profile = SenderProfile::new(snapshot.sender_id, snapshot.reputation, limits, now);
        profile.message_count = snapshot.message_count;
        profile.set_reputation(snapshot.reputation);
        profile.record_flags(snapshot.flags_received);
        for fp in snapshot.recent_hashes {
            profile.record_fingerprint(fp);
        }
        // Block wins if a hand-edited snapshot sets both
        profile.set_manually_trusted(snapshot.manually_trusted);
        profile.set_manually_blocked(snapshot.manually_blocked);
        profile
    }
}

/// Serialized form of a [`SenderProfile`]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProfileSnapshot {
    pub sender_id: SenderId,
    pub message_count: u64,
    pub reputation: f64,
    #[serde(default)]
    pub flags_received: Vec<String>,
    #[serde(default)]
    pub recent_hashes: Vec<Fingerprint>,
    #[serde(default)]
    pub manually_blocked: bool,
    #[serde(default)]
    pub manually_trusted: bool,
}

/// All known sender profiles, bounded in count
#[derive(Debug)]
pub struct ProfileStore {
    profiles: HashMap<SenderId, SenderProfile>,
    limits: HistoryLimits,
    max_profiles: usize,
    neutral: f64,
}

impl ProfileStore {
    pub fn new(config: &ProfileConfig, neutral: f64) -> Self {
        ProfileStore {
            profiles: HashMap::new(),
            limits: HistoryLimits::from(config),
            max_profiles: config.max_profiles.max(1),
            neutral,
        }
    }

    /// Neutral reputation new profiles start at
    #[inline]
    pub fn neutral(&self) -> f64 {
        self.neutral
    }

    #[inline]
    pub fn limits(&self) -> HistoryLimits {
        self.limits
    }

    pub fn get(&self, sender: &SenderId) -> Option<&SenderProfile> {
        self.profiles.get(sender)
    }

    pub fn get_mut(&mut self, sender: &SenderId) -> Option<&mut SenderProfile> {
        self.profiles.get_mut(sender)
    }

    pub fn contains(&self, sender: &SenderId) -> bool {
        self.profiles.contains_key(sender)
    }

    /// Get a profile, creating it on first contact
    pub fn get_or_create(&mut self, sender: &SenderId, now: Timestamp) -> &mut SenderProfile {
        if !self.profiles.contains_key(sender) && self.profiles.len() >= self.max_profiles {
            self.evict_one();
        }

        let (neutral, limits) = (self.neutral, self.limits);
        self.profiles
            .entry(sender.clone())
            .or_insert_with(|| SenderProfile::new(sender.clone(), neutral, limits, now))
    }

    /// Insert a fully built profile (restore path), replacing any existing one
    pub fn insert(&mut self, profile: SenderProfile) {
        if !self.profiles.contains_key(&profile.sender_id)
            && self.profiles.len() >= self.max_profiles
        {
            self.evict_one();
        }
        self.profiles.insert(profile.sender_id.clone(), profile);
    }

    pub fn remove(&mut self, sender: &SenderId) -> Option<SenderProfile> {
        self.profiles.remove(sender)
    }

    pub fn clear(&mut self) {
        self.profiles.clear();
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SenderId, &SenderProfile)> {
        self.profiles.iter()
    }

    pub fn values(&self) -> impl Iterator<Item = &SenderProfile> {
        self.profiles.values()
    }

    /// Drop the stalest profile without a manual flag
    ///
    /// Clean profiles go before penalized ones. Manually flagged profiles
    /// stay: the access lists hold them and re-flag on recreation anyway.
    fn evict_one(&mut self) -> bool {
        let neutral = self.neutral;
        let victim = self
            .profiles
            .values()
            .filter(|p| !p.manually_blocked && !p.manually_trusted)
            .min_by_key(|p| (p.is_penalized(neutral), p.last_seen))
            .map(|p| (p.sender_id.clone(), p.is_penalized(neutral)));

        match victim {
            Some((sender, penalized)) => {
                tracing::debug!(sender = %sender, penalized, "evicting stale sender profile");
                self.profiles.remove(&sender);
                true
            }
            None => false,
        }
    }
}

#[inline]
fn clamp_unit(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}
