//! MeshGuard Core - Fundamental types and primitives
//!
//! This crate defines the types shared by every admission layer:
//! - Identifiers (SenderId, Fingerprint)
//! - Time primitives (Timestamp, Clock)
//! - Risk and reputation levels
//! - Deployment configuration and power-mode presets

pub mod config;
pub mod error;
pub mod id;
pub mod level;
pub mod time;

pub use config::*;
pub use error::*;
pub use id::*;
pub use level::*;
pub use time::*;
