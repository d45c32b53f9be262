//! Stand-in risk oracles
//!
//! The real semantic analyser lives outside this workspace. These oracles
//! are deterministic so scenarios and simulations are reproducible.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use meshguard_core::{Direction, Language, RiskLevel};
use meshguard_runtime::{Metadata, RiskAssessment, RiskOracle};
use parking_lot::Mutex;

/// One keyword rule
#[derive(Clone, Debug)]
pub struct KeywordRule {
    pub keyword: String,
    pub level: RiskLevel,
    pub flag: String,
}

impl KeywordRule {
    pub fn new(keyword: &str, level: RiskLevel, flag: &str) -> Self {
        KeywordRule {
            keyword: keyword.to_lowercase(),
            level,
            flag: flag.to_string(),
        }
    }
}

/// Word-match oracle: the most severe matching rule wins
#[derive(Clone, Debug)]
pub struct KeywordOracle {
    rules: Vec<KeywordRule>,
}

impl KeywordOracle {
    pub fn new(rules: Vec<KeywordRule>) -> Self {
        KeywordOracle { rules }
    }

    /// Common scam vocabulary on cooperative channels
    pub fn scam_vocabulary() -> Self {
        Self::new(vec![
            KeywordRule::new("urgente", RiskLevel::Moderate, "urgency"),
            KeywordRule::new("premio", RiskLevel::Moderate, "prize-bait"),
            KeywordRule::new("transferencia", RiskLevel::High, "payment-request"),
            KeywordRule::new("deposito", RiskLevel::High, "payment-request"),
            KeywordRule::new("pin", RiskLevel::Critical, "credential-request"),
            KeywordRule::new("clave", RiskLevel::Critical, "credential-request"),
        ])
    }

    fn channel_risk(level: RiskLevel) -> f64 {
        match level {
            RiskLevel::Low => 0.05,
            RiskLevel::Moderate => 0.4,
            RiskLevel::High => 0.75,
            RiskLevel::Critical => 0.95,
        }
    }
}

impl Default for KeywordOracle {
    fn default() -> Self {
        Self::scam_vocabulary()
    }
}

impl RiskOracle for KeywordOracle {
    fn score(&self, text: &str, _: Direction, _: Language, _: &Metadata) -> RiskAssessment {
        let words: Vec<String> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
            .collect();

        let mut level = RiskLevel::Low;
        let mut flags: Vec<String> = Vec::new();
        for rule in &self.rules {
            if words.iter().any(|w| *w == rule.keyword) {
                level = level.max(rule.level);
                if !flags.contains(&rule.flag) {
                    flags.push(rule.flag.clone());
                }
            }
        }

        RiskAssessment::new(level, Self::channel_risk(level)).with_flags(flags)
    }

    fn name(&self) -> &str {
        "keyword"
    }
}

/// Replays queued verdicts in order, then a fallback
#[derive(Debug)]
pub struct ScriptedOracle {
    script: Mutex<VecDeque<RiskAssessment>>,
    fallback: RiskAssessment,
    calls: AtomicUsize,
}

impl ScriptedOracle {
    pub fn new(fallback: RiskAssessment) -> Self {
        ScriptedOracle {
            script: Mutex::new(VecDeque::new()),
            fallback,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn push(&self, assessment: RiskAssessment) {
        self.script.lock().push_back(assessment);
    }

    pub fn push_many<I: IntoIterator<Item = RiskAssessment>>(&self, assessments: I) {
        self.script.lock().extend(assessments);
    }

    /// Times `score` has been called
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().len()
    }
}

impl Default for ScriptedOracle {
    fn default() -> Self {
        Self::new(RiskAssessment::low())
    }
}

impl RiskOracle for ScriptedOracle {
    fn score(&self, _: &str, _: Direction, _: Language, _: &Metadata) -> RiskAssessment {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
