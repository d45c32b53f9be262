//! Error types for MeshGuard
//!
//! Admission outcomes are never errors; these cover the edges only
//! (configuration, persistence, logging, observers).

use std::path::PathBuf;

use thiserror::Error;

/// MeshGuard errors
#[derive(Error, Debug)]
pub enum GuardError {
    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown risk level: {0}")]
    UnknownRiskLevel(String),

    #[error("Unknown power mode: {0}")]
    UnknownPowerMode(String),

    #[error("Invalid fingerprint: {0}")]
    InvalidFingerprint(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Persistence errors
    #[error("Unsupported snapshot version: {0}")]
    SnapshotVersion(u32),

    // Collaborator errors
    #[error("Observer failed: {0}")]
    Observer(String),

    #[error("Logging initialization failed: {0}")]
    Logging(String),
}

impl GuardError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GuardError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for MeshGuard operations
pub type GuardResult<T> = Result<T, GuardError>;
