//! MeshGuard Filters - cheap, stateful checks run before risk analysis
//!
//! Provides the building blocks of the admission pipeline:
//! - Sender profiles with bounded histories
//! - Sliding-window rate limiting with burst detection
//! - Global content deduplication
//! - Reputation decay and penalties
//! - Manual blocklist / allowlist

pub mod access;
pub mod dedup;
pub mod profile;
pub mod rate_limit;
pub mod reputation;

pub use access::*;
pub use dedup::*;
pub use profile::*;
pub use rate_limit::*;
pub use reputation::*;
