//! MeshGuard Test Harness - simulation and end-to-end validation
//!
//! This crate provides:
//! - Deterministic stand-in risk oracles
//! - Seeded mesh traffic simulation (honest nodes, relays, spammers)
//! - End-to-end admission scenarios

pub mod integration;
pub mod oracle;
pub mod simulator;

pub use integration::*;
pub use oracle::*;
pub use simulator::*;
