//! MeshGuard Runtime - admission pipeline and operator surface
//!
//! Per incoming message:
//! 1. Allowlist (trusted senders skip throttling, not dedup)
//! 2. Blocklist / reputation block
//! 3. Rate limit (burst, then sustained)
//! 4. Global duplicate check
//! 5. Risk oracle (admitted messages only)
//! 6. Reputation feedback from the oracle's verdict

pub mod decision;
pub mod guard;
pub mod hardening;
pub mod logging;
pub mod observer;
pub mod oracle;
pub mod snapshot;
pub mod stats;

pub use decision::*;
pub use guard::*;
pub use hardening::*;
pub use logging::*;
pub use observer::*;
pub use oracle::*;
pub use snapshot::*;
pub use stats::*;
