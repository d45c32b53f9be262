//! End-to-end admission scenarios
//!
//! Each scenario drives a full [`HardenedGuard`] on a manual clock and
//! reports whether the expected admission behaviour held. They are plain
//! functions so a field diagnostic tool can run them on device too.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use meshguard_core::{
    Direction, GuardError, GuardResult, HardeningConfig, ManualClock, ReputationLevel, RiskLevel,
    SenderId,
};
use meshguard_runtime::{
    DenialEvent, DenyReason, HardenedGuard, JsonFileStore, ProcessedMessage, RiskAssessment,
    RiskOracle,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::{KeywordOracle, MeshTrafficSimulator, ScriptedOracle, TrafficConfig};

// ============================================================================
// HARNESS
// ============================================================================

/// A guard on a manual clock
pub struct Scenario<O> {
    pub guard: HardenedGuard<O>,
    pub clock: ManualClock,
}

impl<O: RiskOracle> Scenario<O> {
    pub fn new(oracle: O, config: HardeningConfig) -> GuardResult<Self> {
        let clock = ManualClock::new();
        let guard = HardenedGuard::with_clock(oracle, config, Arc::new(clock.clone()))?;
        Ok(Scenario { guard, clock })
    }

    pub fn send(&self, sender: &str, text: &str) -> ProcessedMessage {
        self.guard
            .process(text, Direction::Inbound, &SenderId::new(sender), None, None)
    }

    pub fn wait(&self, secs: f64) {
        self.clock.advance_secs(secs);
    }

    pub fn reputation(&self, sender: &str) -> Option<f64> {
        self.guard
            .get_sender_stats(&SenderId::new(sender))
            .map(|s| s.reputation)
    }
}

fn scripted() -> GuardResult<Scenario<ScriptedOracle>> {
    Scenario::new(ScriptedOracle::default(), HardeningConfig::default())
}

// ============================================================================
// SCENARIOS
// ============================================================================

/// Random verdict streams never push reputation out of [0, 1]
pub fn scenario_reputation_bounded(seed: u64) -> GuardResult<bool> {
    let mut rng = StdRng::seed_from_u64(seed);
    let s = scripted()?;
    let levels = RiskLevel::ALL;

    for i in 0..200 {
        let level = levels[rng.gen_range(0..levels.len())];
        s.guard.oracle().push(RiskAssessment::new(level, 0.5));
        s.send("farm_001", &format!("report {i}"));
        s.wait(rng.gen_range(3.5..8.0));

        if let Some(rep) = s.reputation("farm_001") {
            if !(0.0..=1.0).contains(&rep) {
                return Ok(false);
            }
        }
    }
    Ok(true)
}

/// A manual block holds against fresh content, spacing and good reputation
pub fn scenario_manual_block_holds() -> GuardResult<bool> {
    let s = scripted()?;
    s.send("farm_007", "hello");
    s.guard.block_sender(&SenderId::new("farm_007"), "Known scammer");

    for i in 0..20 {
        s.wait(120.0);
        if !s.send("farm_007", &format!("new content {i}")).blocked {
            return Ok(false);
        }
    }
    Ok(s.guard.oracle().calls() == 1)
}

/// Unblock restores neutral reputation and NORMAL level
pub fn scenario_unblock_pardons() -> GuardResult<bool> {
    let s = scripted()?;
    let id = SenderId::new("farm_008");
    s.guard
        .oracle()
        .push_many([critical(), critical()]);
    s.send("farm_008", "a");
    s.wait(10.0);
    s.send("farm_008", "b");

    s.guard.block_sender(&id, "Manual");
    s.guard.unblock_sender(&id);

    Ok(s.guard
        .get_sender_stats(&id)
        .is_some_and(|st| st.reputation == 0.5 && st.level == ReputationLevel::Normal))
}

/// Five messages in five seconds pass, the sixth is a burst; spread out
/// they all pass
pub fn scenario_burst_detection() -> GuardResult<bool> {
    let s = scripted()?;
    for i in 0..5 {
        if s.send("farm_010", &format!("m{i}")).blocked {
            return Ok(false);
        }
        s.wait(0.8);
    }
    let sixth = s.send("farm_010", "m5");
    let burst = matches!(
        sixth.block_reason.as_ref().map(DenyReason::kind),
        Some("rate-limited-burst")
    );

    let spread = scripted()?;
    let all_pass = (0..5).all(|i| {
        let ok = !spread.send("farm_011", &format!("m{i}")).blocked;
        spread.wait(2.5);
        ok
    });

    Ok(burst && all_pass)
}

/// Case and whitespace variants from another sender are duplicates
pub fn scenario_cross_sender_dedup() -> GuardResult<bool> {
    let s = scripted()?;
    let first = s.send("farm_001", "Vendo 20 sacos de PAPA");
    s.wait(45.0);
    let relayed = s.send("relay_03", "  vendo 20   sacos de papa ");
    Ok(!first.blocked && relayed.block_reason == Some(DenyReason::Duplicate))
}

/// Denied messages leave reputation, count and flags untouched
pub fn scenario_denials_are_inert() -> GuardResult<bool> {
    let s = scripted()?;
    let id = SenderId::new("farm_020");

    // Four clean messages, then a flagged one fills the burst window
    for i in 0..4 {
        s.send("farm_020", &format!("aviso {i}"));
    }
    s.guard
        .oracle()
        .push(RiskAssessment::new(RiskLevel::Moderate, 0.3).with_flags(["odd-price"]));
    s.send("farm_020", "precio raro");
    let before = s.guard.get_sender_stats(&id);

    // Burst denials
    for i in 0..8 {
        s.send("farm_020", &format!("flood {i}"));
    }
    // Duplicate denial once the burst window has passed
    s.wait(6.0);
    let dup = s.send("farm_020", "precio raro");
    // Manual block
    s.guard.block_sender(&id, "Manual");
    s.send("farm_020", "otra cosa");

    let after = s.guard.get_sender_stats(&id);
    Ok(dup.block_reason == Some(DenyReason::Duplicate)
        && match (before, after) {
            (Some(b), Some(a)) => {
                b.reputation == a.reputation
                    && b.message_count == a.message_count
                    && b.flags_count == a.flags_count
            }
            _ => false,
        })
}

/// Consecutive CRITICAL verdicts lower reputation each time until BLOCKED
pub fn scenario_critical_streak() -> GuardResult<bool> {
    let s = scripted()?;
    let id = SenderId::new("spam_01");
    s.guard.oracle().push_many([critical(), critical(), critical()]);

    let mut prev = 0.5;
    let mut sent = 0;
    while sent < 3 {
        let result = s.send("spam_01", &format!("pague ahora {sent}"));
        s.wait(10.0);
        if result.blocked {
            break;
        }
        match s.reputation("spam_01") {
            Some(rep) if rep < prev => prev = rep,
            _ => return Ok(false),
        }
        sent += 1;
    }

    let level = s.guard.get_sender_stats(&id).map(|st| st.level);
    Ok(prev <= 0.2 && level == Some(ReputationLevel::Blocked))
}

/// Trust bypasses throttling but not dedup
pub fn scenario_trusted_still_deduped() -> GuardResult<bool> {
    let s = scripted()?;
    s.guard
        .trust_sender(&SenderId::new("coop_office"), "Cooperative office");

    let first = s.send("coop_office", "Asamblea general el sabado");
    let second = s.send("coop_office", "Asamblea general el sabado");
    let throttled = (0..30).any(|i| s.send("coop_office", &format!("aviso {i}")).blocked);

    Ok(!first.blocked
        && first.is_trusted
        && second.blocked
        && second.is_trusted
        && second.sender_level == ReputationLevel::Trusted
        && second.block_reason == Some(DenyReason::Duplicate)
        && !throttled)
}

/// With every filter off everything passes and nothing is tracked
pub fn scenario_filters_disabled() -> GuardResult<bool> {
    let s = Scenario::new(
        ScriptedOracle::new(RiskAssessment::new(RiskLevel::Critical, 1.0)),
        HardeningConfig::with_filters(false, false, false),
    )?;

    let all_pass = (0..50).all(|_| {
        let r = s.send("farm_001", "same message");
        !r.blocked && r.sender_level == ReputationLevel::Normal
    });
    let stats = s.guard.get_status().hardening;
    Ok(all_pass && stats.tracked_senders == 0 && stats.dedup_entries == 0)
}

/// A failing observer does not stop admission or other observers
pub fn scenario_observer_isolation() -> GuardResult<bool> {
    let s = scripted()?;
    let delivered = Arc::new(AtomicUsize::new(0));
    let counter = delivered.clone();

    s.guard.subscribe(|_: &DenialEvent| -> GuardResult<()> {
        Err(GuardError::Observer("dashboard unreachable".into()))
    });
    s.guard.subscribe(|_: &DenialEvent| -> GuardResult<()> {
        panic!("dashboard bug")
    });
    s.guard.subscribe(move |_: &DenialEvent| -> GuardResult<()> {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    s.send("farm_001", "hola");
    let dup = s.send("farm_002", "hola");
    let next = s.send("farm_003", "otra");

    Ok(dup.blocked
        && !next.blocked
        && delivered.load(Ordering::SeqCst) == 1
        && s.guard.get_status().hardening.observer_failures == 2)
}

/// Reputation and lists survive a save/load cycle through a JSON file
pub fn scenario_snapshot_restart(dir: &std::path::Path) -> GuardResult<bool> {
    let store = JsonFileStore::new(dir.join("meshguard-state.json"));

    let before = scripted()?;
    before.guard.oracle().push(critical());
    before.send("farm_030", "pague ya");
    before
        .guard
        .block_sender(&SenderId::new("spam_bot"), "Known scammer");
    before
        .guard
        .trust_sender(&SenderId::new("coop_office"), "Manual");
    before.guard.save_to(&store)?;

    let after = scripted()?;
    if !after.guard.load_from(&store)? {
        return Ok(false);
    }

    Ok(after.reputation("farm_030") == before.reputation("farm_030")
        && after.send("spam_bot", "hola").blocked
        && after.send("coop_office", "aviso").is_trusted)
}

/// Spam campaign on a busy mesh: honest traffic untouched, spam contained
pub fn scenario_hostile_mesh(seed: u64) -> GuardResult<bool> {
    let mut sim = MeshTrafficSimulator::new(TrafficConfig::hostile().with_seed(seed));
    let guard = HardenedGuard::with_clock(
        KeywordOracle::default(),
        HardeningConfig::default(),
        Arc::new(sim.clock()),
    )?;
    let report = sim.run(&guard);

    Ok(report.honest.admitted == report.honest.sent
        && report.relay.admitted == 0
        && report.spammer.admitted <= 2 * sim.config().spammers)
}

/// Run every self-contained scenario
pub fn run_all(seed: u64) -> Vec<(&'static str, GuardResult<bool>)> {
    vec![
        ("reputation_bounded", scenario_reputation_bounded(seed)),
        ("manual_block_holds", scenario_manual_block_holds()),
        ("unblock_pardons", scenario_unblock_pardons()),
        ("burst_detection", scenario_burst_detection()),
        ("cross_sender_dedup", scenario_cross_sender_dedup()),
        ("denials_are_inert", scenario_denials_are_inert()),
        ("critical_streak", scenario_critical_streak()),
        ("trusted_still_deduped", scenario_trusted_still_deduped()),
        ("filters_disabled", scenario_filters_disabled()),
        ("observer_isolation", scenario_observer_isolation()),
        ("hostile_mesh", scenario_hostile_mesh(seed)),
    ]
}

fn critical() -> RiskAssessment {
    RiskAssessment::new(RiskLevel::Critical, 0.95).with_flags(["coercion"])
}
