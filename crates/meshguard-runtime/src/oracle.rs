//! Risk oracle interface
//!
//! The oracle turns message text into a risk level and flags. It is
//! expensive and opaque; the admission pipeline exists to call it less.

use std::collections::BTreeMap;
use std::sync::Arc;

use meshguard_core::{Direction, Language, RiskLevel};
use serde::{Deserialize, Serialize};

/// Free-form message metadata forwarded to the oracle
pub type Metadata = BTreeMap<String, String>;

/// Oracle verdict for one message
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    /// Channel risk score in [0, 1]
    pub channel_risk: f64,
    pub flags: Vec<String>,
    /// Escalate to a human
    pub handoff: bool,
}

impl RiskAssessment {
    /// Clean verdict
    pub fn low() -> Self {
        RiskAssessment {
            level: RiskLevel::Low,
            channel_risk: 0.0,
            flags: Vec::new(),
            handoff: false,
        }
    }

    pub fn new(level: RiskLevel, channel_risk: f64) -> Self {
        RiskAssessment {
            level,
            channel_risk: channel_risk.clamp(0.0, 1.0),
            flags: Vec::new(),
            handoff: level.is_severe(),
        }
    }

    pub fn with_flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.flags.extend(flags.into_iter().map(Into::into));
        self
    }

    pub fn with_handoff(mut self, handoff: bool) -> Self {
        self.handoff = handoff;
        self
    }
}

/// Semantic risk scorer
///
/// Must not touch admission state; it may be called zero or many times per
/// message.
pub trait RiskOracle: Send + Sync {
    fn score(
        &self,
        text: &str,
        direction: Direction,
        language: Language,
        metadata: &Metadata,
    ) -> RiskAssessment;

    fn name(&self) -> &str {
        "oracle"
    }
}

impl<T: RiskOracle + ?Sized> RiskOracle for Arc<T> {
    fn score(
        &self,
        text: &str,
        direction: Direction,
        language: Language,
        metadata: &Metadata,
    ) -> RiskAssessment {
        (**self).score(text, direction, language, metadata)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<T: RiskOracle + ?Sized> RiskOracle for Box<T> {
    fn score(
        &self,
        text: &str,
        direction: Direction,
        language: Language,
        metadata: &Metadata,
    ) -> RiskAssessment {
        (**self).score(text, direction, language, metadata)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
