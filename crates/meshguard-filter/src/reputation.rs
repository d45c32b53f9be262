//! Reputation tracking
//!
//! Clean messages relax a sender toward neutral; risky ones push it down.
//! Nothing ever raises reputation above neutral automatically: trust beyond
//! that comes from the allowlist only.

use meshguard_core::{ReputationConfig, ReputationLevel, RiskLevel, Timestamp};

use crate::SenderProfile;

/// Reputation model and level thresholds
#[derive(Clone, Debug)]
pub struct ReputationTracker {
    config: ReputationConfig,
}

impl ReputationTracker {
    pub fn new(config: ReputationConfig) -> Self {
        ReputationTracker { config }
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn config(&self) -> &ReputationConfig {
        &self.config
    }

    /// Discrete level for a profile; manual overrides win
    ///
    /// With reputation tracking disabled only the manual overrides apply and
    /// everyone else is NORMAL.
    pub fn level(&self, profile: &SenderProfile) -> ReputationLevel {
        if profile.is_manually_blocked() {
            return ReputationLevel::Blocked;
        }
        if profile.is_manually_trusted() {
            return ReputationLevel::Trusted;
        }
        if !self.config.enabled {
            return ReputationLevel::Normal;
        }
        self.level_for(profile.reputation())
    }

    /// Level for a raw reputation value
    pub fn level_for(&self, reputation: f64) -> ReputationLevel {
        let cfg = &self.config;
        if reputation > cfg.threshold_trusted {
            ReputationLevel::Trusted
        } else if reputation > cfg.threshold_normal {
            ReputationLevel::Normal
        } else if reputation > cfg.threshold_block {
            ReputationLevel::Suspicious
        } else {
            ReputationLevel::Blocked
        }
    }

    /// Next reputation value after one analysed message
    pub fn next_reputation(&self, current: f64, risk: RiskLevel, has_flags: bool) -> f64 {
        let cfg = &self.config;
        let next = match risk {
            RiskLevel::Low if !has_flags => self.relax(current),
            // Clean level but flagged content: hold steady
            RiskLevel::Low => current,
            RiskLevel::Moderate => current - cfg.penalty_mild,
            RiskLevel::High | RiskLevel::Critical => current - cfg.penalty_severe,
        };
        next.clamp(0.0, 1.0)
    }

    /// Step toward neutral by `decay_step`
    fn relax(&self, current: f64) -> f64 {
        let neutral = self.config.initial;
        let step = self.config.decay_step;
        let distance = neutral - current;

        if distance == 0.0 {
            return current;
        }
        if !self.config.snap_to_neutral {
            return current + step.copysign(distance);
        }
        if distance > 0.0 {
            (current + step).min(neutral)
        } else {
            (current - step).max(neutral)
        }
    }

    /// Apply an oracle verdict to the profile
    ///
    /// Returns the new reputation. No-op when tracking is disabled.
    pub fn update(
        &self,
        profile: &mut SenderProfile,
        risk: RiskLevel,
        flags: &[String],
        now: Timestamp,
    ) -> f64 {
        if !self.config.enabled {
            return profile.reputation();
        }

        profile.last_seen = now;
        profile.message_count += 1;
        profile.record_flags(flags.iter().cloned());

        let next = self.next_reputation(profile.reputation(), risk, !flags.is_empty());
        profile.set_reputation(next);
        profile.reputation()
    }
}

impl Default for ReputationTracker {
    fn default() -> Self {
        Self::new(ReputationConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HistoryLimits;
    use meshguard_core::SenderId;
    use proptest::prelude::*;

    fn fresh() -> SenderProfile {
        SenderProfile::new(SenderId::new("s"), 0.5, HistoryLimits::default(), Timestamp::ZERO)
    }

    fn flags(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_level_thresholds() {
        let t = ReputationTracker::default();
        assert_eq!(t.level_for(0.71), ReputationLevel::Trusted);
        assert_eq!(t.level_for(0.7), ReputationLevel::Normal);
        assert_eq!(t.level_for(0.41), ReputationLevel::Normal);
        assert_eq!(t.level_for(0.4), ReputationLevel::Suspicious);
        assert_eq!(t.level_for(0.21), ReputationLevel::Suspicious);
        assert_eq!(t.level_for(0.2), ReputationLevel::Blocked);
        assert_eq!(t.level_for(0.0), ReputationLevel::Blocked);
    }

    #[test]
    fn test_manual_overrides_first() {
        let t = ReputationTracker::default();
        let mut p = fresh();
        p.set_reputation(0.9);
        p.set_manually_blocked(true);
        assert_eq!(t.level(&p), ReputationLevel::Blocked);

        p.set_reputation(0.0);
        p.set_manually_trusted(true);
        assert_eq!(t.level(&p), ReputationLevel::Trusted);
    }

    #[test]
    fn test_penalties() {
        let t = ReputationTracker::default();
        let mut p = fresh();

        t.update(&mut p, RiskLevel::Moderate, &[], Timestamp::ZERO);
        assert!((p.reputation() - 0.45).abs() < 1e-9);

        t.update(&mut p, RiskLevel::High, &flags(&["urgency"]), Timestamp::ZERO);
        assert!((p.reputation() - 0.30).abs() < 1e-9);
        assert_eq!(p.message_count, 2);
        assert_eq!(p.flags_count(), 1);
    }

    #[test]
    fn test_critical_streak_reaches_blocked() {
        let t = ReputationTracker::default();
        let mut p = fresh();
        let mut prev = p.reputation();

        for _ in 0..3 {
            let next = t.update(&mut p, RiskLevel::Critical, &flags(&["coercion"]), Timestamp::ZERO);
            assert!(next < prev);
            prev = next;
        }
        assert!(p.reputation() <= 0.2);
        assert_eq!(t.level(&p), ReputationLevel::Blocked);
    }

    #[test]
    fn test_clean_message_relaxes_toward_neutral() {
        let t = ReputationTracker::default();
        let mut p = fresh();

        p.set_reputation(0.3);
        t.update(&mut p, RiskLevel::Low, &[], Timestamp::ZERO);
        assert!((p.reputation() - 0.31).abs() < 1e-9);

        p.set_reputation(0.8);
        t.update(&mut p, RiskLevel::Low, &[], Timestamp::ZERO);
        assert!((p.reputation() - 0.79).abs() < 1e-9);

        p.set_reputation(0.5);
        t.update(&mut p, RiskLevel::Low, &[], Timestamp::ZERO);
        assert_eq!(p.reputation(), 0.5);
    }

    #[test]
    fn test_low_with_flags_holds() {
        let t = ReputationTracker::default();
        let mut p = fresh();
        p.set_reputation(0.3);
        t.update(&mut p, RiskLevel::Low, &flags(&["odd-format"]), Timestamp::ZERO);
        assert_eq!(p.reputation(), 0.3);
        assert_eq!(p.flags_count(), 1);
    }

    #[test]
    fn test_decay_snaps_to_neutral() {
        let t = ReputationTracker::default();
        assert_eq!(t.next_reputation(0.495, RiskLevel::Low, false), 0.5);
        assert_eq!(t.next_reputation(0.505, RiskLevel::Low, false), 0.5);
    }

    #[test]
    fn test_decay_without_snap_overshoots() {
        let t = ReputationTracker::new(ReputationConfig {
            snap_to_neutral: false,
            ..ReputationConfig::default()
        });
        let next = t.next_reputation(0.495, RiskLevel::Low, false);
        assert!((next - 0.505).abs() < 1e-9);
    }

    #[test]
    fn test_disabled_tracker_no_mutation() {
        let t = ReputationTracker::new(ReputationConfig {
            enabled: false,
            ..ReputationConfig::default()
        });
        let mut p = fresh();
        t.update(&mut p, RiskLevel::Critical, &flags(&["x"]), Timestamp::from_millis(9));
        assert_eq!(p.reputation(), 0.5);
        assert_eq!(p.message_count, 0);
        assert_eq!(p.flags_count(), 0);
        assert_eq!(p.last_seen, Timestamp::ZERO);

        p.set_reputation(0.1);
        assert_eq!(t.level(&p), ReputationLevel::Normal);
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
        fn prop_reputation_stays_in_unit_interval(
            start in 0.0f64..=1.0,
            steps in proptest::collection::vec((risk_strategy(), any::<bool>()), 0..100),
            snap in any::<bool>(),
        ) {
            let t = ReputationTracker::new(ReputationConfig { snap_to_neutral: snap, ..ReputationConfig::default() });
            let mut p = fresh();
            p.set_reputation(start);
            for (risk, flagged) in steps {
                let f = if flagged { flags(&["f"]) } else { Vec::new() };
                t.update(&mut p, risk, &f, Timestamp::ZERO);
                prop_assert!((0.0..=1.0).contains(&p.reputation()));
            }
        }

        #[test]
        fn prop_clean_messages_never_cross_neutral_with_snap(start in 0.0f64..=1.0, n in 0usize..200) {
            let t = ReputationTracker::default();
            let mut rep = start;
            let above = start > 0.5;
            for _ in 0..n {
                rep = t.next_reputation(rep, RiskLevel::Low, false);
                if above {
                    prop_assert!(rep >= 0.5);
                } else {
                    prop_assert!(rep <= 0.5);
                }
            }
        }
    }
}
