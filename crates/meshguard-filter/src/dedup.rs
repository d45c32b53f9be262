//! Global content deduplication
//!
//! A message relayed by several mesh neighbours arrives several times,
//! possibly attributed to different senders. The cache is therefore keyed
//! by content only and shared across all senders.

use std::collections::{HashMap, VecDeque};

use meshguard_core::{DedupConfig, Fingerprint, Timestamp};
use sha2::{Digest, Sha256};

use crate::SenderProfile;

/// Canonical form used for fingerprinting: lower-cased, trimmed, with
/// whitespace runs collapsed to a single space
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Fingerprint of the normalized text (SHA-256 prefix)
pub fn fingerprint(text: &str) -> Fingerprint {
    let digest = Sha256::digest(normalize(text).as_bytes());
    let mut bytes = [0u8; Fingerprint::LEN];
    bytes.copy_from_slice(&digest[..Fingerprint::LEN]);
    Fingerprint(bytes)
}

/// Outcome of a duplicate check
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DedupResult {
    pub is_duplicate: bool,
    /// `None` when deduplication is disabled
    pub fingerprint: Option<Fingerprint>,
    /// When the original was first seen, for duplicates
    pub first_seen: Option<Timestamp>,
}

impl DedupResult {
    fn disabled() -> Self {
        DedupResult {
            is_duplicate: false,
            fingerprint: None,
            first_seen: None,
        }
    }
}

/// Time-windowed fingerprint cache
#[derive(Debug)]
pub struct Deduplicator {
    config: DedupConfig,
    /// fingerprint -> first seen
    seen: HashMap<Fingerprint, Timestamp>,
    /// Insertion order for expiry and cap eviction
    order: VecDeque<(Fingerprint, Timestamp)>,
}

impl Deduplicator {
    pub fn new(config: DedupConfig) -> Self {
        Deduplicator {
            config,
            seen: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn config(&self) -> &DedupConfig {
        &self.config
    }

    /// Check `text` against the cache and remember it if new
    ///
    /// New content is also appended to the sender's hash history. Disabled
    /// deduplication reports "not duplicate" without touching any state.
    pub fn check(&mut self, text: &str, sender: &mut SenderProfile, now: Timestamp) -> DedupResult {
        if !self.config.enabled {
            return DedupResult::disabled();
        }

        self.prune(now);

        let fp = fingerprint(text);
        if let Some(first_seen) = self.seen.get(&fp) {
            return DedupResult {
                is_duplicate: true,
                fingerprint: Some(fp),
                first_seen: Some(*first_seen),
            };
        }

        while self.order.len() >= self.config.max_entries {
            match self.order.pop_front() {
                Some((old, _)) => {
                    self.seen.remove(&old);
                }
                None => break,
            }
        }
        self.seen.insert(fp, now);
        self.order.push_back((fp, now));
        sender.record_fingerprint(fp);

        DedupResult {
            is_duplicate: false,
            fingerprint: Some(fp),
            first_seen: None,
        }
    }

    /// Whether `text` is currently cached, without recording anything
    pub fn contains(&self, text: &str, now: Timestamp) -> bool {
        self.seen
            .get(&fingerprint(text))
            .is_some_and(|first| now.duration_since(*first) < self.config.window)
    }

    /// Evict entries older than the dedup window
    pub fn prune(&mut self, now: Timestamp) {
        let window = self.config.window;
        while let Some((fp, ts)) = self.order.front().copied() {
            if now.duration_since(ts) < window {
                break;
            }
            self.order.pop_front();
            self.seen.remove(&fp);
        }
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn clear(&mut self) {
        self.seen.clear();
        self.order.clear();
    }
}

impl Default for Deduplicator {
    fn default() -> Self {
        Self::new(DedupConfig::default())
    }
}
