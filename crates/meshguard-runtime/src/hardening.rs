//! Hardening orchestrator
//!
//! Composes the cheap filters into one admission decision per message and
//! feeds oracle verdicts back into reputation. Check order is fixed and
//! short-circuits on the first denial:
//!
//! 1. allowlist (advisory rate limiting, dedup still enforced)
//! 2. blocklist, then computed BLOCKED level
//! 3. rate limit
//! 4. global dedup
//!
//! All mutable state sits behind one lock; the message rate on mesh radio
//! hardware is far below what a single mutex can serve.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use meshguard_core::{
    Clock, GuardResult, HardeningConfig, MonotonicClock, ReputationLevel, SenderId, Timestamp,
};
use meshguard_filter::{
    AccessLists, Deduplicator, ProfileStore, RateLimiter, ReputationTracker, SenderProfile,
};
use parking_lot::Mutex;

use crate::{
    AdmissionDecision, DenialCounters, DenialEvent, DenialObserver, DenyReason, HardeningSnapshot,
    HardeningStats, LevelHistogram, ObserverSet, RiskAssessment, SenderStats, SnapshotStore,
    RECENT_FLAGS,
};

/// Everything the pipeline mutates
#[derive(Debug)]
struct HardeningState {
    profiles: ProfileStore,
    access: AccessLists,
    dedup: Deduplicator,
    counters: DenialCounters,
}

impl HardeningState {
    fn new(config: &HardeningConfig) -> Self {
        HardeningState {
            profiles: ProfileStore::new(&config.profiles, config.reputation.initial),
            access: AccessLists::new(),
            dedup: Deduplicator::new(config.dedup.clone()),
            counters: DenialCounters::default(),
        }
    }
}

/// Fetch or lazily create a profile, carrying over any manual list entry
fn attach<'a>(
    profiles: &'a mut ProfileStore,
    access: &AccessLists,
    sender: &SenderId,
    now: Timestamp,
) -> &'a mut SenderProfile {
    let fresh = !profiles.contains(sender);
    let profile = profiles.get_or_create(sender, now);
    if fresh {
        if access.is_blocked(sender) {
            profile.set_manually_blocked(true);
        } else if access.is_trusted(sender) {
            profile.set_manually_trusted(true);
        }
    }
    profile
}

/// Admission-control layer in front of the risk oracle
pub struct Hardening {
    config: HardeningConfig,
    rate_limiter: RateLimiter,
    reputation: ReputationTracker,
    state: Mutex<HardeningState>,
    clock: Arc<dyn Clock>,
    observers: ObserverSet,
    observer_failures: AtomicU64,
}

impl Hardening {
    /// Create with a validated config and the process monotonic clock
    pub fn new(config: HardeningConfig) -> GuardResult<Self> {
        Self::with_clock(config, Arc::new(MonotonicClock::new()))
    }

    /// Create with an explicit clock
    pub fn with_clock(config: HardeningConfig, clock: Arc<dyn Clock>) -> GuardResult<Self> {
        config.validate()?;
        Ok(Self::build(config, clock))
    }

    fn build(config: HardeningConfig, clock: Arc<dyn Clock>) -> Self {
        tracing::debug!(
            rate_limit = config.rate_limit.enabled,
            reputation = config.reputation.enabled,
            dedup = config.dedup.enabled,
            "hardening layer initialised"
        );
        Hardening {
            rate_limiter: RateLimiter::new(config.rate_limit.clone()),
            reputation: ReputationTracker::new(config.reputation.clone()),
            state: Mutex::new(HardeningState::new(&config)),
            config,
            clock,
            observers: ObserverSet::new(),
            observer_failures: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &HardeningConfig {
        &self.config
    }

    #[inline]
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Register a callback for denied messages
    pub fn subscribe<O: DenialObserver + 'static>(&self, observer: O) {
        self.observers.register(Arc::new(observer));
    }

    // ------------------------------------------------------------------
    // Admission
    // ------------------------------------------------------------------

    /// Run the admission pipeline for one message
    pub fn pre_process(&self, message: &str, sender: &SenderId) -> AdmissionDecision {
        self.pre_process_at(message, sender, self.clock.now())
    }

    /// Run the admission pipeline at an explicit time
    pub fn pre_process_at(
        &self,
        message: &str,
        sender: &SenderId,
        now: Timestamp,
    ) -> AdmissionDecision {
        let decision = {
            let mut state = self.state.lock();
            self.admit(&mut state, message, sender, now)
        };

        if let Some(reason) = &decision.reason {
            tracing::debug!(sender = %sender, kind = reason.kind(), %reason, "message denied");
            if !self.observers.is_empty() {
                let event = DenialEvent {
                    sender: sender.clone(),
                    reason: reason.clone(),
                    sender_level: decision.sender_level,
                    at: now,
                };
                let failed = self.observers.notify(&event);
                if failed > 0 {
                    self.observer_failures
                        .fetch_add(failed as u64, Ordering::Relaxed);
                }
            }
        }

        decision
    }

    fn admit(
        &self,
        state: &mut HardeningState,
        message: &str,
        sender: &SenderId,
        now: Timestamp,
    ) -> AdmissionDecision {
        let HardeningState {
            profiles,
            access,
            dedup,
            counters,
        } = state;

        // 1. Allowlist: throughput is only observed, content is still deduped
        if access.is_trusted(sender) {
            if self.rate_limiter.is_enabled() {
                let profile = attach(profiles, access, sender, now);
                let advisory = self.rate_limiter.observe(profile, now);
                if !advisory.allowed {
                    tracing::info!(
                        sender = %sender,
                        reason = %advisory.reason(),
                        "trusted sender over rate limit, not enforced"
                    );
                }
            }
            if dedup.is_enabled() {
                let profile = attach(profiles, access, sender, now);
                if dedup.check(message, profile, now).is_duplicate {
                    counters.deduped += 1;
                    return AdmissionDecision::deny(
                        DenyReason::Duplicate,
                        ReputationLevel::Trusted,
                        true,
                    );
                }
            }
            return AdmissionDecision::admit(ReputationLevel::Trusted, true);
        }

        // 2. Manual block, then reputation collapse
        if let Some(reason) = access.block_reason(sender) {
            counters.blocked += 1;
            return AdmissionDecision::deny(
                DenyReason::BlockedManual {
                    reason: reason.to_string(),
                },
                ReputationLevel::Blocked,
                false,
            );
        }
        if self.reputation.is_enabled() {
            let profile = attach(profiles, access, sender, now);
            if self.reputation.level(profile) == ReputationLevel::Blocked {
                counters.blocked += 1;
                return AdmissionDecision::deny(
                    DenyReason::BlockedReputation,
                    ReputationLevel::Blocked,
                    false,
                );
            }
        }

        // 3. Throughput
        if self.rate_limiter.is_enabled() {
            let profile = attach(profiles, access, sender, now);
            let result = self.rate_limiter.check(profile, now);
            if let Some(violation) = result.violation {
                counters.rate_limited += 1;
                let level = self.reputation.level(profile);
                return AdmissionDecision::deny(DenyReason::RateLimited(violation), level, false)
                    .with_wait(result.wait);
            }
        }

        // 4. Content, across all senders
        if dedup.is_enabled() {
            let profile = attach(profiles, access, sender, now);
            if dedup.check(message, profile, now).is_duplicate {
                counters.deduped += 1;
                let level = self.reputation.level(profile);
                return AdmissionDecision::deny(DenyReason::Duplicate, level, false);
            }
        }

        let level = profiles
            .get(sender)
            .map_or(ReputationLevel::Normal, |p| self.reputation.level(p));
        AdmissionDecision::admit(level, false)
    }

    /// Feed an oracle verdict for an admitted message back into reputation
    ///
    /// Returns the sender's new reputation, or `None` when reputation
    /// tracking is disabled.
    pub fn post_process(&self, sender: &SenderId, assessment: &RiskAssessment) -> Option<f64> {
        if !self.reputation.is_enabled() {
            return None;
        }

        let now = self.clock.now();
        let mut state = self.state.lock();
        let HardeningState {
            profiles, access, ..
        } = &mut *state;
        let profile = attach(profiles, access, sender, now);

        let before = self.reputation.level(profile);
        let reputation =
            self.reputation
                .update(profile, assessment.level, &assessment.flags, now);
        let after = self.reputation.level(profile);

        if before != after {
            tracing::info!(
                sender = %sender,
                from = %before,
                to = %after,
                reputation,
                "sender level changed"
            );
        }
        Some(reputation)
    }

    // ------------------------------------------------------------------
    // Management
    // ------------------------------------------------------------------

    pub fn block_sender(&self, sender: &SenderId, reason: impl Into<String>) {
        let reason = reason.into();
        let mut state = self.state.lock();
        let HardeningState {
            profiles, access, ..
        } = &mut *state;
        access.block(profiles, sender, reason.as_str());
        tracing::info!(sender = %sender, %reason, "sender blocked");
    }

    /// Full pardon; returns whether the sender was blocked
    pub fn unblock_sender(&self, sender: &SenderId) -> bool {
        let mut state = self.state.lock();
        let HardeningState {
            profiles, access, ..
        } = &mut *state;
        let was_blocked = access.unblock(profiles, sender);
        if was_blocked {
            tracing::info!(sender = %sender, "sender unblocked");
        }
        was_blocked
    }

    pub fn trust_sender(&self, sender: &SenderId, reason: impl Into<String>) {
        let reason = reason.into();
        let mut state = self.state.lock();
        let HardeningState {
            profiles, access, ..
        } = &mut *state;
        access.trust(profiles, sender, reason.as_str());
        tracing::info!(sender = %sender, %reason, "sender trusted");
    }

    /// Returns whether the sender was trusted
    pub fn untrust_sender(&self, sender: &SenderId) -> bool {
        let mut state = self.state.lock();
        let HardeningState {
            profiles, access, ..
        } = &mut *state;
        let was_trusted = access.untrust(profiles, sender);
        if was_trusted {
            tracing::info!(sender = %sender, "sender untrusted");
        }
        was_trusted
    }

    pub fn is_blocked(&self, sender: &SenderId) -> bool {
        self.state.lock().access.is_blocked(sender)
    }

    pub fn is_trusted(&self, sender: &SenderId) -> bool {
        self.state.lock().access.is_trusted(sender)
    }

    // ------------------------------------------------------------------
    // Reporting
    // ------------------------------------------------------------------

    /// Report for one sender; `None` if it has never been tracked
    pub fn get_sender_stats(&self, sender: &SenderId) -> Option<SenderStats> {
        let state = self.state.lock();
        let profile = state.profiles.get(sender)?;
        Some(SenderStats {
            sender_id: sender.clone(),
            reputation: profile.reputation(),
            level: self.reputation.level(profile),
            message_count: profile.message_count,
            first_seen: profile.first_seen,
            last_seen: profile.last_seen,
            flags_count: profile.flags_count(),
            recent_flags: profile.recent_flags(RECENT_FLAGS),
            is_blocked: state.access.is_blocked(sender),
            is_trusted: state.access.is_trusted(sender),
        })
    }

    pub fn get_stats(&self) -> HardeningStats {
        let state = self.state.lock();
        let levels: LevelHistogram = state
            .profiles
            .values()
            .map(|p| self.reputation.level(p))
            .collect();

        HardeningStats {
            tracked_senders: state.profiles.len(),
            blocked_senders: state.access.blocked_count(),
            trusted_senders: state.access.trusted_count(),
            counters: state.counters,
            levels,
            dedup_entries: state.dedup.len(),
            observer_failures: self.observer_failures.load(Ordering::Relaxed),
            rate_limit_enabled: self.config.rate_limit.enabled,
            reputation_enabled: self.config.reputation.enabled,
            dedup_enabled: self.config.dedup.enabled,
        }
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    pub fn snapshot(&self) -> HardeningSnapshot {
        let state = self.state.lock();
        let mut profiles: Vec<_> = state.profiles.values().map(|p| p.to_snapshot()).collect();
        profiles.sort_by(|a, b| a.sender_id.cmp(&b.sender_id));

        HardeningSnapshot {
            profiles,
            blocklist: state
                .access
                .blocked()
                .map(|(id, reason)| (id.clone(), reason.to_string()))
                .collect(),
            allowlist: state
                .access
                .trusted()
                .map(|(id, reason)| (id.clone(), reason.to_string()))
                .collect(),
            ..HardeningSnapshot::default()
        }
    }

    /// Replace profiles and access lists with a snapshot
    ///
    /// The lists are authoritative: a profile flag without a matching list
    /// entry is promoted to one. The dedup cache is left untouched.
    pub fn restore(&self, snapshot: HardeningSnapshot) -> GuardResult<()> {
        snapshot.check_version()?;
        let now = self.clock.now();

        let mut state = self.state.lock();
        let HardeningState {
            profiles, access, ..
        } = &mut *state;
        profiles.clear();
        *access = AccessLists::new();

        let limits = profiles.limits();
        for snap in snapshot.profiles {
            profiles.insert(SenderProfile::from_snapshot(snap, limits, now));
        }
        for (sender, reason) in &snapshot.allowlist {
            access.trust(profiles, sender, reason.as_str());
        }
        for (sender, reason) in &snapshot.blocklist {
            access.block(profiles, sender, reason.as_str());
        }

        let orphaned: Vec<(SenderId, bool)> = profiles
            .values()
            .filter(|p| {
                (p.is_manually_blocked() && !access.is_blocked(&p.sender_id))
                    || (p.is_manually_trusted() && !access.is_trusted(&p.sender_id))
            })
            .map(|p| (p.sender_id.clone(), p.is_manually_blocked()))
            .collect();
        for (sender, blocked) in orphaned {
            if blocked {
                access.block(profiles, &sender, "Manual");
            } else {
                access.trust(profiles, &sender, "Manual");
            }
        }

        tracing::info!(
            profiles = profiles.len(),
            blocked = access.blocked_count(),
            trusted = access.trusted_count(),
            "hardening state restored"
        );
        Ok(())
    }

    /// Restore from a store; returns whether a snapshot was found
    pub fn load_from(&self, store: &dyn SnapshotStore) -> GuardResult<bool> {
        match store.load()? {
            Some(snapshot) => {
                self.restore(snapshot)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn save_to(&self, store: &dyn SnapshotStore) -> GuardResult<()> {
        store.save(&self.snapshot())
    }
}

impl Default for Hardening {
    fn default() -> Self {
        Self::build(HardeningConfig::default(), Arc::new(MonotonicClock::new()))
    }
}

impl std::fmt::Debug for Hardening {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hardening")
            .field("config", &self.config)
            .field("observers", &self.observers)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshguard_core::{GuardError, ManualClock, RiskLevel};
    use proptest::prelude::*;
    use std::sync::atomic::AtomicUsize;

    fn setup(config: HardeningConfig) -> (Hardening, ManualClock) {
        let clock = ManualClock::new();
        let hardening = Hardening::with_clock(config, Arc::new(clock.clone())).unwrap();
        (hardening, clock)
    }

    fn id(s: &str) -> SenderId {
        SenderId::new(s)
    }

    fn critical() -> RiskAssessment {
        RiskAssessment::new(RiskLevel::Critical, 0.95).with_flags(["coercion"])
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = HardeningConfig::default();
        config.rate_limit.max_messages = 0;
        assert!(matches!(
            Hardening::new(config),
            Err(GuardError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_fresh_sender_admitted_normal() {
        let (h, _) = setup(HardeningConfig::default());
        let d = h.pre_process("Disponible maiz 50kg", &id("farm_001"));
        assert!(d.allowed);
        assert_eq!(d.sender_level, ReputationLevel::Normal);
        assert!(!d.is_trusted);
        assert_eq!(d.reason, None);
    }

    #[test]
    fn test_burst_then_spread() {
        let (h, clock) = setup(HardeningConfig::default());
        let s = id("farm_001");
        for i in 0..5 {
            assert!(h.pre_process(&format!("msg {i}"), &s).allowed);
            clock.advance_secs(0.5);
        }
        let d = h.pre_process("msg 5", &s);
        assert!(!d.allowed);
        assert!(d.rate_limited && d.is_burst());
        assert!(d.wait_seconds() > 0.0);
        assert_eq!(h.get_stats().counters.rate_limited, 1);

        let (h, clock) = setup(HardeningConfig::default());
        for i in 0..5 {
            assert!(h.pre_process(&format!("msg {i}"), &s).allowed);
            clock.advance_secs(2.5);
        }
    }

    #[test]
    fn test_duplicate_across_senders() {
        let (h, clock) = setup(HardeningConfig::default());
        assert!(h.pre_process("Oferta especial A1:100", &id("a")).allowed);
        clock.advance_secs(30.0);

        let d = h.pre_process("  OFERTA   especial a1:100 ", &id("b"));
        assert!(!d.allowed);
        assert!(d.is_duplicate);
        assert_eq!(d.reason, Some(DenyReason::Duplicate));
        assert_eq!(h.get_stats().counters.deduped, 1);

        clock.advance_secs(300.0);
        assert!(h.pre_process("Oferta especial A1:100", &id("c")).allowed);
    }

    #[test]
    fn test_manual_block_beats_everything() {
        let (h, _) = setup(HardeningConfig::default());
        let s = id("spam_bot");
        h.pre_process("hello", &s);
        h.block_sender(&s, "Known scammer");

        for i in 0..10 {
            let d = h.pre_process(&format!("unique {i}"), &s);
            assert!(!d.allowed);
            assert_eq!(d.sender_level, ReputationLevel::Blocked);
            assert_eq!(d.reason_text(), "Blocked: Known scammer");
            assert_eq!(d.reason.as_ref().map(DenyReason::kind), Some("blocked-manual"));
        }
        // Rejected before rate limiting: no budget consumed
        let stats = h.get_stats();
        assert_eq!(stats.counters.blocked, 10);
        assert_eq!(stats.counters.rate_limited, 0);
    }

    #[test]
    fn test_block_applies_to_unseen_sender() {
        let (h, _) = setup(HardeningConfig::default());
        let s = id("ghost");
        h.block_sender(&s, "Manual");
        assert!(!h.pre_process("hi", &s).allowed);
        assert!(h.get_sender_stats(&s).is_none());
    }

    #[test]
    fn test_unblock_is_full_pardon() {
        let (h, _) = setup(HardeningConfig::default());
        let s = id("farm_009");
        h.pre_process("first", &s);
        for _ in 0..2 {
            h.post_process(&s, &critical());
        }
        h.block_sender(&s, "Manual");
        assert!(h.unblock_sender(&s));

        let stats = h.get_sender_stats(&s).unwrap();
        assert_eq!(stats.reputation, 0.5);
        assert_eq!(stats.level, ReputationLevel::Normal);
        assert!(!stats.is_blocked);
        assert!(h.pre_process("second", &s).allowed);
        assert!(!h.unblock_sender(&s));
    }

    #[test]
    fn test_critical_streak_blocks_by_reputation() {
        let (h, _) = setup(HardeningConfig::default());
        let s = id("farm_013");
        assert!(h.pre_process("start", &s).allowed);

        let mut prev = 0.5;
        for _ in 0..3 {
            let rep = h.post_process(&s, &critical()).unwrap();
            assert!(rep < prev);
            prev = rep;
        }
        assert_eq!(h.get_sender_stats(&s).unwrap().level, ReputationLevel::Blocked);

        let d = h.pre_process("anything new", &s);
        assert!(!d.allowed);
        assert_eq!(d.reason, Some(DenyReason::BlockedReputation));
        assert_eq!(d.reason_text(), "Blocked: Reputation too low");
        // Computed block never lands on the manual list
        assert!(!h.is_blocked(&s));
    }

    #[test]
    fn test_denials_leave_reputation_alone() {
        let (h, _) = setup(HardeningConfig::default());
        let s = id("farm_002");
        h.pre_process("report", &s);
        h.post_process(&s, &RiskAssessment::new(RiskLevel::Moderate, 0.4).with_flags(["odd"]));
        let before = h.get_sender_stats(&s).unwrap();

        // Duplicates, then a burst, then a manual block
        for _ in 0..3 {
            assert!(!h.pre_process("report", &s).allowed);
        }
        for i in 0..10 {
            h.pre_process(&format!("flood {i}"), &s);
        }
        h.block_sender(&s, "Manual");
        assert!(!h.pre_process("blocked now", &s).allowed);

        let after = h.get_sender_stats(&s).unwrap();
        assert_eq!(after.reputation, before.reputation);
        assert_eq!(after.message_count, before.message_count);
        assert_eq!(after.flags_count, before.flags_count);
    }

    #[test]
    fn test_trusted_sender_still_deduped() {
        let (h, _) = setup(HardeningConfig::default());
        let s = id("coop_office");
        h.trust_sender(&s, "Cooperative office");

        let first = h.pre_process("Asamblea el sabado", &s);
        assert!(first.allowed && first.is_trusted);
        assert_eq!(first.sender_level, ReputationLevel::Trusted);

        let second = h.pre_process("Asamblea el sabado", &s);
        assert!(!second.allowed);
        assert!(second.is_duplicate && second.is_trusted);
        assert_eq!(second.sender_level, ReputationLevel::Trusted);
        assert_eq!(second.reason, Some(DenyReason::Duplicate));
    }

    #[test]
    fn test_trusted_sender_not_throttled() {
        let (h, _) = setup(HardeningConfig::default());
        let s = id("coop_office");
        h.trust_sender(&s, "Manual");
        for i in 0..40 {
            assert!(h.pre_process(&format!("bulletin {i}"), &s).allowed);
        }
        assert_eq!(h.get_stats().counters.rate_limited, 0);
        let stats = h.get_sender_stats(&s).unwrap();
        assert_eq!(stats.level, ReputationLevel::Trusted);
    }

    #[test]
    fn test_trust_lifts_block() {
        let (h, _) = setup(HardeningConfig::default());
        let s = id("farm_004");
        h.pre_process("a", &s);
        h.block_sender(&s, "Manual");
        h.trust_sender(&s, "Verified in person");
        assert!(!h.is_blocked(&s));
        assert!(h.pre_process("b", &s).allowed);
        assert!(h.untrust_sender(&s));
        assert!(!h.is_trusted(&s));
    }

    #[test]
    fn test_all_filters_disabled() {
        let (h, _) = setup(HardeningConfig::with_filters(false, false, false));
        let s = id("farm_001");
        for _ in 0..50 {
            let d = h.pre_process("same text", &s);
            assert!(d.allowed);
            assert_eq!(d.sender_level, ReputationLevel::Normal);
        }
        assert_eq!(h.post_process(&s, &critical()), None);

        let stats = h.get_stats();
        assert_eq!(stats.tracked_senders, 0);
        assert_eq!(stats.dedup_entries, 0);
        assert_eq!(stats.counters, DenialCounters::default());
        assert!(h.get_sender_stats(&s).is_none());

        h.block_sender(&s, "Manual");
        assert!(!h.pre_process("same text", &s).allowed);
    }

    #[test]
    fn test_low_power_preset_skips_reputation() {
        let (h, _) = setup(HardeningConfig::for_power_mode(meshguard_core::PowerMode::LowPower));
        let s = id("farm_001");
        h.pre_process("x", &s);
        assert_eq!(h.post_process(&s, &critical()), None);
        assert_eq!(h.get_sender_stats(&s).unwrap().reputation, 0.5);
    }

    #[test]
    fn test_empty_sender_is_ordinary() {
        let (h, _) = setup(HardeningConfig::default());
        let anon = SenderId::default();
        assert!(h.pre_process("", &anon).allowed);
        assert!(!h.pre_process("", &anon).allowed);
        assert!(h.get_sender_stats(&anon).is_some());
    }

    #[test]
    fn test_profile_table_bounded_under_rotating_senders() {
        let mut config = HardeningConfig::default();
        config.profiles.max_profiles = 4;
        let (h, clock) = setup(config);
        let moderate = RiskAssessment::new(RiskLevel::Moderate, 0.4);

        for i in 0..1000 {
            let s = id(&format!("spam_{i}"));
            assert!(h.pre_process(&format!("premio {i}"), &s).allowed);
            h.post_process(&s, &moderate);
            clock.advance_secs(0.01);
        }

        assert_eq!(h.get_stats().tracked_senders, 4);
        assert!(h.get_sender_stats(&id("spam_999")).is_some());
        assert!(h.get_sender_stats(&id("spam_0")).is_none());
    }

    #[test]
    fn test_blocked_profile_survives_churn() {
        let mut config = HardeningConfig::default();
        config.profiles.max_profiles = 2;
        let (h, _) = setup(config);
        let bot = id("spam_bot");
        h.pre_process("first contact", &bot);
        h.block_sender(&bot, "Known scammer");
        for i in 0..5 {
            h.pre_process(&format!("hola {i}"), &id(&format!("farm_{i}")));
        }

        assert_eq!(h.get_stats().tracked_senders, 2);
        assert!(!h.pre_process("free money", &bot).allowed);
        let stats = h.get_sender_stats(&bot).unwrap();
        assert!(stats.is_blocked);
        assert_eq!(stats.level, ReputationLevel::Blocked);
    }

    #[test]
    fn test_stats_histogram() {
        let (h, _) = setup(HardeningConfig::default());
        h.pre_process("a", &id("good"));
        h.pre_process("b", &id("bad"));
        for _ in 0..3 {
            h.post_process(&id("bad"), &critical());
        }
        h.pre_process("c", &id("office"));
        h.trust_sender(&id("office"), "Manual");

        let stats = h.get_stats();
        assert_eq!(stats.tracked_senders, 3);
        assert_eq!(stats.trusted_senders, 1);
        assert_eq!(stats.levels.normal, 1);
        assert_eq!(stats.levels.blocked, 1);
        assert_eq!(stats.levels.trusted, 1);
        assert_eq!(stats.levels.total(), 3);
    }

    #[test]
    fn test_sender_stats_recent_flags() {
        let (h, _) = setup(HardeningConfig::default());
        let s = id("farm_001");
        h.pre_process("x", &s);
        for i in 0..15 {
            h.post_process(
                &s,
                &RiskAssessment::new(RiskLevel::Low, 0.1).with_flags([format!("flag{i}")]),
            );
        }
        let stats = h.get_sender_stats(&s).unwrap();
        assert_eq!(stats.flags_count, 15);
        assert_eq!(stats.recent_flags.len(), 10);
        assert_eq!(stats.recent_flags.last().map(String::as_str), Some("flag14"));
        assert_eq!(stats.message_count, 15);
    }

    #[test]
    fn test_observers_notified_and_isolated() {
        let (h, _) = setup(HardeningConfig::default());
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();

        h.subscribe(|_: &DenialEvent| -> GuardResult<()> {
            Err(GuardError::Observer("unreachable dashboard".into()))
        });
        h.subscribe(move |event: &DenialEvent| -> GuardResult<()> {
            assert_eq!(event.reason, DenyReason::Duplicate);
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        assert!(h.pre_process("same", &id("a")).allowed);
        assert!(!h.pre_process("same", &id("b")).allowed);

        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(h.get_stats().observer_failures, 1);
    }

    #[test]
    fn test_observer_may_call_back_in() {
        let clock = ManualClock::new();
        let h = Arc::new(
            Hardening::with_clock(HardeningConfig::default(), Arc::new(clock)).unwrap(),
        );
        let inner = Arc::downgrade(&h);
        h.subscribe(move |event: &DenialEvent| -> GuardResult<()> {
            if let Some(h) = inner.upgrade() {
                h.block_sender(&event.sender, "Auto: duplicate");
            }
            Ok(())
        });

        h.pre_process("same", &id("a"));
        h.pre_process("same", &id("b"));
        assert!(h.is_blocked(&id("b")));
    }

    #[test]
    fn test_snapshot_restore() {
        let (h, _) = setup(HardeningConfig::default());
        h.pre_process("a", &id("farm_001"));
        h.post_process(&id("farm_001"), &critical());
        h.pre_process("b", &id("office"));
        h.trust_sender(&id("office"), "Manual");
        h.block_sender(&id("spam_bot"), "Known scammer");

        let snap = h.snapshot();
        assert_eq!(snap.profiles.len(), 2);

        let (restored, _) = setup(HardeningConfig::default());
        restored.restore(snap.clone()).unwrap();
        assert_eq!(restored.snapshot(), snap);

        let stats = restored.get_sender_stats(&id("farm_001")).unwrap();
        assert!((stats.reputation - 0.35).abs() < 1e-9);
        assert!(restored.is_trusted(&id("office")));
        assert!(!restored.pre_process("x", &id("spam_bot")).allowed);
    }

    #[test]
    fn test_restore_promotes_orphaned_flags() {
        let (h, _) = setup(HardeningConfig::default());
        h.pre_process("a", &id("x"));
        let mut snap = h.snapshot();
        snap.profiles[0].manually_blocked = true;

        h.restore(snap).unwrap();
        assert!(h.is_blocked(&id("x")));
        assert!(!h.pre_process("b", &id("x")).allowed);
    }

    #[test]
    fn test_restore_rejects_unknown_version() {
        let (h, _) = setup(HardeningConfig::default());
        let snap = HardeningSnapshot {
            version: 7,
            ..HardeningSnapshot::default()
        };
        assert!(matches!(h.restore(snap), Err(GuardError::SnapshotVersion(7))));
    }

    #[test]
    fn test_shared_across_threads() {
        let h = Arc::new(Hardening::default());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let h = h.clone();
                std::thread::spawn(move || {
                    for i in 0..25 {
                        h.pre_process(&format!("t{t} m{i}"), &SenderId::new(format!("node-{t}")));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(h.get_stats().tracked_senders, 4);
    }

    fn risk_strategy() -> impl Strategy<Value = RiskLevel> {
        prop_oneof![
            Just(RiskLevel::Low),
            Just(RiskLevel::Moderate),
            Just(RiskLevel::High),
            Just(RiskLevel::Critical),
        ]
    }

    proptest! {
        #[test]
        fn prop_manual_block_always_denies(
            texts in proptest::collection::vec("[a-z ]{0,12}", 1..40),
            gaps in proptest::collection::vec(0u64..10_000_000, 1..40),
        ) {
            let (h, clock) = setup(HardeningConfig::default());
            let s = id("blocked");
            h.block_sender(&s, "Manual");
            for (text, gap) in texts.iter().zip(gaps.iter().cycle()) {
                clock.advance(std::time::Duration::from_micros(*gap));
                prop_assert!(!h.pre_process(text, &s).allowed);
            }
        }

        #[test]
        fn prop_reputation_bounded_through_pipeline(
            verdicts in proptest::collection::vec(risk_strategy(), 1..60),
        ) {
            let (h, clock) = setup(HardeningConfig::default());
            let s = id("s");
            for (i, level) in verdicts.into_iter().enumerate() {
                clock.advance_secs(4.0);
                if h.pre_process(&format!("m{i}"), &s).allowed {
                    h.post_process(&s, &RiskAssessment::new(level, 0.5));
                }
                if let Some(stats) = h.get_sender_stats(&s) {
                    prop_assert!((0.0..=1.0).contains(&stats.reputation));
                }
            }
        }
    }
}
