//! Hardened guard: admission pipeline wrapped around a risk oracle
//!
//! One entry point per message. Denied messages never reach the oracle.

use std::sync::Arc;

use meshguard_core::{
    Clock, Direction, GuardResult, HardeningConfig, Language, MessageLevel, ReputationLevel,
    SenderId,
};
use serde::Serialize;

use crate::{
    DenialObserver, DenyReason, Hardening, HardeningSnapshot, HardeningStats, Metadata,
    RiskOracle, SenderStats, SnapshotStore,
};

/// Outcome of processing one message end to end
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProcessedMessage {
    /// Refused by the admission pipeline
    pub blocked: bool,
    #[serde(serialize_with = "reason_text")]
    pub block_reason: Option<DenyReason>,
    pub level: MessageLevel,
    pub channel_risk: f64,
    pub flags: Vec<String>,
    pub handoff: bool,
    pub sender_level: ReputationLevel,
    pub is_trusted: bool,
}

fn reason_text<S: serde::Serializer>(reason: &Option<DenyReason>, s: S) -> Result<S::Ok, S::Error> {
    match reason {
        Some(reason) => s.serialize_some(&reason.to_string()),
        None => s.serialize_none(),
    }
}

impl ProcessedMessage {
    fn denied(reason: DenyReason, sender_level: ReputationLevel, is_trusted: bool) -> Self {
        ProcessedMessage {
            blocked: true,
            block_reason: Some(reason),
            level: MessageLevel::Blocked,
            channel_risk: 1.0,
            flags: Vec::new(),
            handoff: false,
            sender_level,
            is_trusted,
        }
    }
}

/// Aggregated status for dashboards
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GuardStatus {
    pub oracle: String,
    pub hardening: HardeningStats,
}

/// Risk oracle shielded by the hardening layer
#[derive(Debug)]
pub struct HardenedGuard<O> {
    oracle: O,
    hardening: Hardening,
}

impl<O: RiskOracle> HardenedGuard<O> {
    pub fn new(oracle: O, config: HardeningConfig) -> GuardResult<Self> {
        Ok(HardenedGuard {
            oracle,
            hardening: Hardening::new(config)?,
        })
    }

    pub fn with_clock(oracle: O, config: HardeningConfig, clock: Arc<dyn Clock>) -> GuardResult<Self> {
        Ok(HardenedGuard {
            oracle,
            hardening: Hardening::with_clock(config, clock)?,
        })
    }

    /// Wrap an already configured hardening layer
    pub fn from_parts(oracle: O, hardening: Hardening) -> Self {
        HardenedGuard { oracle, hardening }
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub fn hardening(&self) -> &Hardening {
        &self.hardening
    }

    /// Admit, score and learn from one message
    pub fn process(
        &self,
        text: &str,
        direction: Direction,
        sender: &SenderId,
        language: Option<Language>,
        metadata: Option<&Metadata>,
    ) -> ProcessedMessage {
        let decision = self.hardening.pre_process(text, sender);
        if let Some(reason) = decision.reason {
            return ProcessedMessage::denied(reason, decision.sender_level, decision.is_trusted);
        }

        let empty = Metadata::new();
        let assessment = self.oracle.score(
            text,
            direction,
            language.unwrap_or_default(),
            metadata.unwrap_or(&empty),
        );
        self.hardening.post_process(sender, &assessment);

        ProcessedMessage {
            blocked: false,
            block_reason: None,
            level: assessment.level.into(),
            channel_risk: assessment.channel_risk,
            flags: assessment.flags,
            handoff: assessment.handoff,
            sender_level: decision.sender_level,
            is_trusted: decision.is_trusted,
        }
    }

    pub fn get_status(&self) -> GuardStatus {
        GuardStatus {
            oracle: self.oracle.name().to_string(),
            hardening: self.hardening.get_stats(),
        }
    }

    pub fn block_sender(&self, sender: &SenderId, reason: impl Into<String>) {
        self.hardening.block_sender(sender, reason)
    }

    pub fn unblock_sender(&self, sender: &SenderId) -> bool {
        self.hardening.unblock_sender(sender)
    }

    pub fn trust_sender(&self, sender: &SenderId, reason: impl Into<String>) {
        self.hardening.trust_sender(sender, reason)
    }

    pub fn untrust_sender(&self, sender: &SenderId) -> bool {
        self.hardening.untrust_sender(sender)
    }

    pub fn get_sender_stats(&self, sender: &SenderId) -> Option<SenderStats> {
        self.hardening.get_sender_stats(sender)
    }

    pub fn subscribe<D: DenialObserver + 'static>(&self, observer: D) {
        self.hardening.subscribe(observer)
    }

    pub fn snapshot(&self) -> HardeningSnapshot {
        self.hardening.snapshot()
    }

    pub fn load_from(&self, store: &dyn SnapshotStore) -> GuardResult<bool> {
        self.hardening.load_from(store)
    }

    pub fn save_to(&self, store: &dyn SnapshotStore) -> GuardResult<()> {
        self.hardening.save_to(store)
    }
}
