//! Hardening configuration and deployment presets
//!
//! Every constant the filters use is a field here so that a deployment
//! profile can override it. Durations are written as seconds (floats) in
//! JSON; any field left out takes its default.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{GuardError, GuardResult};

/// Sliding-window and burst limits per sender
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,
    /// Sustained-rate window
    #[serde(with = "secs")]
    pub window: Duration,
    /// Max messages per sender inside `window`
    pub max_messages: usize,
    /// Spike-detection sub-window
    #[serde(with = "secs")]
    pub burst_window: Duration,
    /// Max messages per sender inside `burst_window`
    pub burst_max: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        RateLimitConfig {
            enabled: true,
            window: Duration::from_secs(60),
            max_messages: 20,
            burst_window: Duration::from_secs(5),
            burst_max: 5,
        }
    }
}

/// Global content-duplicate suppression
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    pub enabled: bool,
    #[serde(with = "secs")]
    pub window: Duration,
    /// Hard cap on cached fingerprints, oldest evicted first
    pub max_entries: usize,
}

impl Default for DedupConfig {
    fn default() -> Self {
        DedupConfig {
            enabled: true,
            window: Duration::from_secs(300),
            max_entries: 4096,
        }
    }
}

/// Reputation dynamics and level thresholds
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReputationConfig {
    pub enabled: bool,
    /// Starting (neutral) reputation
    pub initial: f64,
    /// Drift toward neutral per clean message
    pub decay_step: f64,
    /// Penalty for MODERATE risk
    pub penalty_mild: f64,
    /// Penalty for HIGH / CRITICAL risk
    pub penalty_severe: f64,
    /// At or below this the sender is BLOCKED
    pub threshold_block: f64,
    /// Above this the sender is at least NORMAL
    pub threshold_normal: f64,
    /// Above this the sender is TRUSTED
    pub threshold_trusted: f64,
    /// Land exactly on neutral instead of stepping past it
    pub snap_to_neutral: bool,
}

impl Default for ReputationConfig {
    fn default() -> Self {
        ReputationConfig {
            enabled: true,
            initial: 0.5,
            decay_step: 0.01,
            penalty_mild: 0.05,
            penalty_severe: 0.15,
            threshold_block: 0.2,
            threshold_normal: 0.4,
            threshold_trusted: 0.7,
            snap_to_neutral: true,
        }
    }
}

/// Bounds on per-sender history and on the profile table itself
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    pub max_flags: usize,
    pub max_hashes: usize,
    pub max_profiles: usize,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        ProfileConfig {
            max_flags: 100,
            max_hashes: 50,
            max_profiles: 10_000,
        }
    }
}

/// Node power mode, selecting how much filtering the hardware can afford
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerMode {
    Full,
    #[default]
    Balanced,
    LowPower,
    UltraLow,
}

impl FromStr for PowerMode {
    type Err = GuardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "full" => Ok(PowerMode::Full),
            "balanced" => Ok(PowerMode::Balanced),
            "low_power" => Ok(PowerMode::LowPower),
            "ultra_low" => Ok(PowerMode::UltraLow),
            _ => Err(GuardError::UnknownPowerMode(s.to_owned())),
        }
    }
}

/// Complete hardening configuration
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HardeningConfig {
    pub rate_limit: RateLimitConfig,
    pub dedup: DedupConfig,
    pub reputation: ReputationConfig,
    pub profiles: ProfileConfig,
}

impl HardeningConfig {
    /// Defaults with the three filters switched individually
    pub fn with_filters(rate_limit: bool, reputation: bool, dedup: bool) -> Self {
        let mut config = HardeningConfig::default();
        config.rate_limit.enabled = rate_limit;
        config.reputation.enabled = reputation;
        config.dedup.enabled = dedup;
        config
    }

    /// Preset for a node power mode
    pub fn for_power_mode(mode: PowerMode) -> Self {
        match mode {
            PowerMode::Full | PowerMode::Balanced => HardeningConfig::default(),
            // Reputation tracking is the first thing to go on battery
            PowerMode::LowPower => {
                let mut config = HardeningConfig::with_filters(true, false, true);
                config.dedup.max_entries = 512;
                config.profiles.max_profiles = 1_000;
                config
            }
            PowerMode::UltraLow => {
                let mut config = HardeningConfig::with_filters(false, false, false);
                config.profiles.max_profiles = 256;
                config
            }
        }
    }

    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> GuardResult<Self> {
        let config: HardeningConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> GuardResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| GuardError::io(path, e))?;
        Self::from_json_str(&json)
    }

    /// Check internal consistency
    pub fn validate(&self) -> GuardResult<()> {
        let rl = &self.rate_limit;
        if rl.window.is_zero() || rl.burst_window.is_zero() {
            return invalid("rate limit windows must be non-zero");
        }
        if rl.burst_window > rl.window {
            return invalid("burst window must not exceed the rate limit window");
        }
        if rl.max_messages == 0 || rl.burst_max == 0 {
            return invalid("rate limit maxima must be non-zero");
        }

        if self.dedup.window.is_zero() {
            return invalid("dedup window must be non-zero");
        }
        if self.dedup.max_entries == 0 {
            return invalid("dedup cache must hold at least one entry");
        }

        let rep = &self.reputation;
        for (name, value) in [
            ("initial", rep.initial),
            ("threshold_block", rep.threshold_block),
            ("threshold_normal", rep.threshold_normal),
            ("threshold_trusted", rep.threshold_trusted),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return invalid(format!("reputation {name} must lie in [0, 1], got {value}"));
            }
        }
        if !(rep.threshold_block < rep.threshold_normal
            && rep.threshold_normal < rep.threshold_trusted)
        {
            return invalid("reputation thresholds must be strictly increasing");
        }
        for (name, value) in [
            ("decay_step", rep.decay_step),
            ("penalty_mild", rep.penalty_mild),
            ("penalty_severe", rep.penalty_severe),
        ] {
            if !value.is_finite() || value < 0.0 {
                return invalid(format!("reputation {name} must be a non-negative number"));
            }
        }

        let p = &self.profiles;
        if p.max_flags == 0 || p.max_hashes == 0 || p.max_profiles == 0 {
            return invalid("profile caps must be non-zero");
        }

        Ok(())
    }
}

fn invalid(msg: impl Into<String>) -> GuardResult<()> {
    Err(GuardError::InvalidConfig(msg.into()))
}

/// Durations as floating-point seconds
mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = HardeningConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.rate_limit.max_messages, 20);
        assert_eq!(config.dedup.window, Duration::from_secs(300));
        assert_eq!(config.reputation.initial, 0.5);
    }

    #[test]
    fn test_power_mode_presets() {
        let full = HardeningConfig::for_power_mode(PowerMode::Full);
        assert!(full.rate_limit.enabled && full.reputation.enabled && full.dedup.enabled);

        let low = HardeningConfig::for_power_mode(PowerMode::LowPower);
        assert!(low.rate_limit.enabled);
        assert!(!low.reputation.enabled);
        assert!(low.dedup.enabled);

        let ultra = HardeningConfig::for_power_mode(PowerMode::UltraLow);
        assert!(!ultra.rate_limit.enabled && !ultra.reputation.enabled && !ultra.dedup.enabled);

        for mode in [PowerMode::Full, PowerMode::Balanced, PowerMode::LowPower, PowerMode::UltraLow] {
            assert!(HardeningConfig::for_power_mode(mode).validate().is_ok());
        }
    }

    #[test]
    fn test_power_mode_parse() {
        assert_eq!("ultra-low".parse::<PowerMode>().unwrap(), PowerMode::UltraLow);
        assert_eq!("LOW_POWER".parse::<PowerMode>().unwrap(), PowerMode::LowPower);
        assert!("turbo".parse::<PowerMode>().is_err());
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let config = HardeningConfig::from_json_str(
            r#"{ "rate_limit": { "window": 30.0, "max_messages": 10 }, "dedup": { "enabled": false } }"#,
        )
        .unwrap();

        assert_eq!(config.rate_limit.window, Duration::from_secs(30));
        assert_eq!(config.rate_limit.max_messages, 10);
        assert_eq!(config.rate_limit.burst_max, 5);
        assert!(!config.dedup.enabled);
        assert_eq!(config.dedup.window, Duration::from_secs(300));
        assert!(config.reputation.enabled);
    }

    #[test]
    fn test_json_roundtrip_keeps_seconds() {
        let json = serde_json::to_value(HardeningConfig::default()).unwrap();
        assert_eq!(json["rate_limit"]["burst_window"], 5.0);
        assert_eq!(json["dedup"]["window"], 300.0);
    }

    #[test]
    fn test_validate_rejects_bad_thresholds() {
        let mut config = HardeningConfig::default();
        config.reputation.threshold_normal = 0.1;
        assert!(matches!(config.validate(), Err(GuardError::InvalidConfig(_))));

        let mut config = HardeningConfig::default();
        config.reputation.initial = 1.5;
        assert!(config.validate().is_err());

        let mut config = HardeningConfig::default();
        config.reputation.penalty_severe = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_windows() {
        let mut config = HardeningConfig::default();
        config.rate_limit.burst_window = Duration::from_secs(120);
        assert!(config.validate().is_err());

        let mut config = HardeningConfig::default();
        config.dedup.max_entries = 0;
        assert!(config.validate().is_err());

        assert!(HardeningConfig::from_json_str(r#"{ "dedup": { "window": -1.0 } }"#).is_err());
    }
}
