#![no_main]

use std::sync::Arc;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use meshguard_core::{HardeningConfig, ManualClock, RiskLevel, SenderId};
use meshguard_runtime::{Hardening, RiskAssessment};

#[derive(Debug, Arbitrary)]
enum Op {
    Message { sender: u8, text: String, gap_ms: u16 },
    Verdict { sender: u8, level: u8, flagged: bool },
    Block { sender: u8 },
    Unblock { sender: u8 },
    Trust { sender: u8 },
    Untrust { sender: u8 },
}

#[derive(Debug, Arbitrary)]
struct Input {
    rate_limit: bool,
    reputation: bool,
    dedup: bool,
    ops: Vec<Op>,
}

fn sender(n: u8) -> SenderId {
    SenderId::new(format!("node-{}", n % 8))
}

fuzz_target!(|input: Input| {
    let clock = ManualClock::new();
    let config = HardeningConfig::with_filters(input.rate_limit, input.reputation, input.dedup);
    let hardening = Hardening::with_clock(config, Arc::new(clock.clone())).expect("default config");

    for op in input.ops {
        match op {
            Op::Message { sender: s, text, gap_ms } => {
                clock.advance(std::time::Duration::from_millis(gap_ms as u64));
                let id = sender(s);
                let decision = hardening.pre_process(&text, &id);
                if hardening.is_blocked(&id) {
                    assert!(!decision.allowed);
                }
            }
            Op::Verdict { sender: s, level, flagged } => {
                let level = RiskLevel::ALL[level as usize % RiskLevel::ALL.len()];
                let mut verdict = RiskAssessment::new(level, 0.5);
                if flagged {
                    verdict = verdict.with_flags(["fuzz"]);
                }
                hardening.post_process(&sender(s), &verdict);
            }
            Op::Block { sender: s } => hardening.block_sender(&sender(s), "fuzz"),
            Op::Unblock { sender: s } => {
                hardening.unblock_sender(&sender(s));
            }
            Op::Trust { sender: s } => hardening.trust_sender(&sender(s), "fuzz"),
            Op::Untrust { sender: s } => {
                hardening.untrust_sender(&sender(s));
            }
        }
    }

    for profile in hardening.snapshot().profiles {
        assert!((0.0..=1.0).contains(&profile.reputation));
        assert!(!(profile.manually_blocked && profile.manually_trusted));
    }
});
