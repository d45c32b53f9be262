//! Logging setup
//!
//! Library code only emits `tracing` events. Binaries and test harnesses
//! call [`init_logging`] once to install a subscriber.

use meshguard_core::{GuardError, GuardResult};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Subscriber settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl LoggingConfig {
    /// Structured output for unattended nodes
    pub fn json() -> Self {
        LoggingConfig {
            json: true,
            ..Self::default()
        }
    }
}

/// Install the global subscriber
///
/// `RUST_LOG` overrides `config.level`. Fails if a subscriber is already
/// installed or the directive does not parse.
pub fn init_logging(config: &LoggingConfig) -> GuardResult<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|e| GuardError::Logging(format!("invalid filter '{}': {e}", config.level)))?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| GuardError::Logging(e.to_string()))
}
