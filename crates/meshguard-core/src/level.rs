//! Risk and trust classifications
//!
//! `RiskLevel` is the vocabulary shared with the risk oracle. The admission
//! layer branches on it exhaustively, so adding a level is a compile error
//! everywhere it matters.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::GuardError;

/// Risk level reported by the oracle for a single message
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
    Critical,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 4] = [
        RiskLevel::Low,
        RiskLevel::Moderate,
        RiskLevel::High,
        RiskLevel::Critical,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Moderate => "MODERATE",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }

    /// High and Critical both count as severe for reputation purposes
    #[inline]
    pub fn is_severe(self) -> bool {
        matches!(self, RiskLevel::High | RiskLevel::Critical)
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = GuardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOW" => Ok(RiskLevel::Low),
            "MODERATE" => Ok(RiskLevel::Moderate),
            "HIGH" => Ok(RiskLevel::High),
            "CRITICAL" => Ok(RiskLevel::Critical),
            _ => Err(GuardError::UnknownRiskLevel(s.to_owned())),
        }
    }
}

/// Discrete trust level derived from a sender's reputation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReputationLevel {
    Trusted,
    Normal,
    Suspicious,
    Blocked,
}

impl ReputationLevel {
    pub const ALL: [ReputationLevel; 4] = [
        ReputationLevel::Trusted,
        ReputationLevel::Normal,
        ReputationLevel::Suspicious,
        ReputationLevel::Blocked,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ReputationLevel::Trusted => "trusted",
            ReputationLevel::Normal => "normal",
            ReputationLevel::Suspicious => "suspicious",
            ReputationLevel::Blocked => "blocked",
        }
    }
}

impl fmt::Display for ReputationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Level attached to a processed message: the oracle's verdict, or
/// `Blocked` when the admission pipeline refused it before scoring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageLevel {
    Low,
    Moderate,
    High,
    Critical,
    Blocked,
}

impl From<RiskLevel> for MessageLevel {
    fn from(level: RiskLevel) -> Self {
        match level {
            RiskLevel::Low => MessageLevel::Low,
            RiskLevel::Moderate => MessageLevel::Moderate,
            RiskLevel::High => MessageLevel::High,
            RiskLevel::Critical => MessageLevel::Critical,
        }
    }
}

impl fmt::Display for MessageLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MessageLevel::Low => "LOW",
            MessageLevel::Moderate => "MODERATE",
            MessageLevel::High => "HIGH",
            MessageLevel::Critical => "CRITICAL",
            MessageLevel::Blocked => "BLOCKED",
        };
        f.write_str(s)
    }
}

/// Direction of a message relative to this node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Inbound,
    Outbound,
}

/// Language hint forwarded to the oracle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// Let the oracle detect it
    #[default]
    Auto,
    Spanish,
    English,
    Portuguese,
    Quechua,
}
