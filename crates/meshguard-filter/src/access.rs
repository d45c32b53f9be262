//! Manual blocklist / allowlist
//!
//! Operator decisions override computed trust. A sender is on at most one
//! list at a time. Entries only change through these calls; a reputation
//! collapse makes a sender BLOCKED without ever adding it to the blocklist.

use std::collections::HashMap;

use meshguard_core::SenderId;

use crate::ProfileStore;

/// The two manual lists, sender -> reason
#[derive(Debug, Default, Clone)]
pub struct AccessLists {
    blocklist: HashMap<SenderId, String>,
    allowlist: HashMap<SenderId, String>,
}

impl AccessLists {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block a sender; drops it from the allowlist
    ///
    /// Only an existing profile is flagged. A sender never seen before is
    /// still refused through the list lookup.
    pub fn block(&mut self, profiles: &mut ProfileStore, sender: &SenderId, reason: impl Into<String>) {
        self.blocklist.insert(sender.clone(), reason.into());
        self.allowlist.remove(sender);
        if let Some(profile) = profiles.get_mut(sender) {
            profile.set_manually_blocked(true);
        }
    }

    /// Full pardon: off the blocklist and back to neutral reputation
    ///
    /// Returns whether the sender was on the blocklist.
    pub fn unblock(&mut self, profiles: &mut ProfileStore, sender: &SenderId) -> bool {
        let was_blocked = self.blocklist.remove(sender).is_some();
        let neutral = profiles.neutral();
        if let Some(profile) = profiles.get_mut(sender) {
            profile.set_manually_blocked(false);
            profile.set_reputation(neutral);
        }
        was_blocked
    }

    /// Trust a sender; drops it from the blocklist
    pub fn trust(&mut self, profiles: &mut ProfileStore, sender: &SenderId, reason: impl Into<String>) {
        self.allowlist.insert(sender.clone(), reason.into());
        self.blocklist.remove(sender);
        if let Some(profile) = profiles.get_mut(sender) {
            profile.set_manually_trusted(true);
        }
    }

    /// Returns whether the sender was on the allowlist
    pub fn untrust(&mut self, profiles: &mut ProfileStore, sender: &SenderId) -> bool {
        let was_trusted = self.allowlist.remove(sender).is_some();
        if let Some(profile) = profiles.get_mut(sender) {
            profile.set_manually_trusted(false);
        }
        was_trusted
    }

    /// Block reason, if blocked
    pub fn block_reason(&self, sender: &SenderId) -> Option<&str> {
        self.blocklist.get(sender).map(String::as_str)
    }

    /// Trust reason, if trusted
    pub fn trust_reason(&self, sender: &SenderId) -> Option<&str> {
        self.allowlist.get(sender).map(String::as_str)
    }

    #[inline]
    pub fn is_blocked(&self, sender: &SenderId) -> bool {
        self.blocklist.contains_key(sender)
    }

    #[inline]
    pub fn is_trusted(&self, sender: &SenderId) -> bool {
        self.allowlist.contains_key(sender)
    }

    pub fn blocked_count(&self) -> usize {
        self.blocklist.len()
    }

    pub fn trusted_count(&self) -> usize {
        self.allowlist.len()
    }

    pub fn blocked(&self) -> impl Iterator<Item = (&SenderId, &str)> {
        self.blocklist.iter().map(|(id, reason)| (id, reason.as_str()))
    }

    pub fn trusted(&self) -> impl Iterator<Item = (&SenderId, &str)> {
        self.allowlist.iter().map(|(id, reason)| (id, reason.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshguard_core::{ProfileConfig, Timestamp};

    fn setup() -> (AccessLists, ProfileStore) {
        (AccessLists::new(), ProfileStore::new(&ProfileConfig::default(), 0.5))
    }

    #[test]
    fn test_lists_mutually_exclusive() {
        let (mut lists, mut profiles) = setup();
        let id = SenderId::new("farm_003");

        lists.trust(&mut profiles, &id, "co-op office");
        assert!(lists.is_trusted(&id));

        lists.block(&mut profiles, &id, "Known scammer");
        assert!(lists.is_blocked(&id));
        assert!(!lists.is_trusted(&id));
        assert_eq!(lists.block_reason(&id), Some("Known scammer"));

        lists.trust(&mut profiles, &id, "reinstated");
        assert!(lists.is_trusted(&id));
        assert!(!lists.is_blocked(&id));
    }

    #[test]
    fn test_block_unknown_sender_creates_no_profile() {
        let (mut lists, mut profiles) = setup();
        let id = SenderId::new("ghost");
        lists.block(&mut profiles, &id, "Manual");
        assert!(lists.is_blocked(&id));
        assert!(profiles.get(&id).is_none());
    }

    #[test]
    fn test_block_flags_existing_profile() {
        let (mut lists, mut profiles) = setup();
        let id = SenderId::new("a");
        profiles.get_or_create(&id, Timestamp::ZERO).set_manually_trusted(true);

        lists.block(&mut profiles, &id, "Manual");
        let p = profiles.get(&id).unwrap();
        assert!(p.is_manually_blocked());
        assert!(!p.is_manually_trusted());
    }

    #[test]
    fn test_unblock_is_full_pardon() {
        let (mut lists, mut profiles) = setup();
        let id = SenderId::new("a");
        profiles.get_or_create(&id, Timestamp::ZERO).set_reputation(0.05);
        lists.block(&mut profiles, &id, "Manual");

        assert!(lists.unblock(&mut profiles, &id));
        assert!(!lists.is_blocked(&id));
        let p = profiles.get(&id).unwrap();
        assert!(!p.is_manually_blocked());
        assert_eq!(p.reputation(), 0.5);

        assert!(!lists.unblock(&mut profiles, &id));
    }

    #[test]
    fn test_untrust_clears_flag() {
        let (mut lists, mut profiles) = setup();
        let id = SenderId::new("a");
        profiles.get_or_create(&id, Timestamp::ZERO);
        lists.trust(&mut profiles, &id, "Manual");
        assert!(profiles.get(&id).unwrap().is_manually_trusted());

        assert!(lists.untrust(&mut profiles, &id));
        assert!(!profiles.get(&id).unwrap().is_manually_trusted());
        assert_eq!(lists.trusted_count(), 0);
    }
}
