//! Guardian registry
//!
//! Owns the set of valid guardian digests and the time-delayed removal
//! workflow. Authorization is not checked here; callers pass through the
//! [`AccessGate`](crate::gate::AccessGate) first. The registry only enforces
//! its own invariants:
//!
//! - no digest appears twice
//! - a digest with a pending removal cannot transfer its own guardianship
//! - a removal executes only once its schedule has elapsed

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use warden_core::{CustodyError, GuardianDigest, Result, GUARDIAN_REMOVAL_DELAY_SECS};

/// Set of guardian digests plus their pending removal schedules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardianRegistry {
    guardians: BTreeSet<GuardianDigest>,
    removals: BTreeMap<GuardianDigest, u64>,
}

impl GuardianRegistry {
    /// Seed the registry. Rejects duplicate digests.
    pub fn new(digests: impl IntoIterator<Item = GuardianDigest>) -> Result<Self> {
        let mut guardians = BTreeSet::new();
        for digest in digests {
            if !guardians.insert(digest) {
                return Err(CustodyError::construction(format!(
                    "duplicate guardian digest {digest}"
                )));
            }
        }
        Ok(Self {
            guardians,
            removals: BTreeMap::new(),
        })
    }

    /// Whether `digest` is currently a guardian.
    pub fn contains(&self, digest: &GuardianDigest) -> bool {
        self.guardians.contains(digest)
    }

    /// Number of guardians.
    pub fn len(&self) -> usize {
        self.guardians.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.guardians.is_empty()
    }

    /// Iterate over guardian digests.
    pub fn iter(&self) -> impl Iterator<Item = &GuardianDigest> {
        self.guardians.iter()
    }

    /// Scheduled removal time for `digest`, if queued.
    pub fn removal_scheduled_at(&self, digest: &GuardianDigest) -> Option<u64> {
        self.removals.get(digest).copied().filter(|at| *at != 0)
    }

    /// Replace `from` with `to` on behalf of the guardian holding `from`.
    pub fn transfer(&mut self, from: &GuardianDigest, to: GuardianDigest) -> Result<()> {
        if self.removal_scheduled_at(from).is_some() {
            return Err(CustodyError::PendingRemoval { digest: *from });
        }
        if !self.contains(from) {
            return Err(CustodyError::UnknownGuardian { digest: *from });
        }
        self.swap(from, to)
    }

    /// Queue `digest` for removal at `now + GUARDIAN_REMOVAL_DELAY_SECS`.
    ///
    /// Re-queueing resets the timer. Returns the scheduled time.
    pub fn queue_removal(&mut self, digest: GuardianDigest, now: u64) -> Result<u64> {
        if !self.contains(&digest) {
            return Err(CustodyError::UnknownGuardian { digest });
        }
        let ready_at = now.saturating_add(GUARDIAN_REMOVAL_DELAY_SECS);
        self.removals.insert(digest, ready_at);
        Ok(ready_at)
    }

    /// Remove `old` and insert `new` once `old`'s removal delay has elapsed.
    pub fn execute_removal(
        &mut self,
        old: &GuardianDigest,
        new: GuardianDigest,
        now: u64,
    ) -> Result<()> {
        let ready_at = self
            .removal_scheduled_at(old)
            .ok_or(CustodyError::NotQueued { digest: *old })?;
        if now < ready_at {
            return Err(CustodyError::DelayNotElapsed {
                digest: *old,
                ready_at,
                now,
            });
        }
        self.swap(old, new)?;
        self.removals.remove(old);
        Ok(())
    }

    /// Clear any removal schedule for `digest`. Returns whether one existed.
    pub fn cancel_removal(&mut self, digest: &GuardianDigest) -> bool {
        self.removals
            .remove(digest)
            .is_some_and(|ready_at| ready_at != 0)
    }

    fn swap(&mut self, old: &GuardianDigest, new: GuardianDigest) -> Result<()> {
        if self.contains(&new) {
            return Err(CustodyError::AlreadyGuardian { digest: new });
        }
        self.guardians.remove(old);
        self.guardians.insert(new);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use warden_core::AccountId;

    fn digest(label: &str) -> GuardianDigest {
        GuardianDigest::of(&AccountId::from_label(label))
    }

    fn registry() -> GuardianRegistry {
        GuardianRegistry::new([digest("g1"), digest("g2"), digest("g3")]).unwrap()
    }

    #[test]
    fn test_duplicate_seed_rejected() {
        let err = GuardianRegistry::new([digest("g1"), digest("g1")]).unwrap_err();
        assert_matches!(err, CustodyError::ConstructionInvariantViolated { .. });
    }

    #[test]
    fn test_transfer_swaps_digest() {
        let mut reg = registry();
        reg.transfer(&digest("g1"), digest("g1-new")).unwrap();
        assert!(!reg.contains(&digest("g1")));
        assert!(reg.contains(&digest("g1-new")));
        assert_eq!(reg.len(), 3);
    }

    #[test]
    fn test_transfer_onto_existing_guardian_rejected() {
        let mut reg = registry();
        let err = reg.transfer(&digest("g1"), digest("g2")).unwrap_err();
        assert_matches!(err, CustodyError::AlreadyGuardian { .. });
        assert!(reg.contains(&digest("g1")));
        assert_eq!(reg.len(), 3);
    }

    #[test]
    fn test_transfer_blocked_while_removal_pending() {
        let mut reg = registry();
        reg.queue_removal(digest("g1"), 100).unwrap();
        let err = reg.transfer(&digest("g1"), digest("g9")).unwrap_err();
        assert_matches!(err, CustodyError::PendingRemoval { .. });
    }

    #[test]
    fn test_requeue_resets_timer() {
        let mut reg = registry();
        reg.queue_removal(digest("g3"), 100).unwrap();
        let ready = reg.queue_removal(digest("g3"), 500).unwrap();
        assert_eq!(ready, 500 + GUARDIAN_REMOVAL_DELAY_SECS);
        assert_eq!(reg.removal_scheduled_at(&digest("g3")), Some(ready));
    }

    #[test]
    fn test_queue_unknown_guardian_rejected() {
        let mut reg = registry();
        let err = reg.queue_removal(digest("stranger"), 0).unwrap_err();
        assert_matches!(err, CustodyError::UnknownGuardian { .. });
    }

    #[test]
    fn test_execute_removal_boundary() {
        let mut reg = registry();
        let ready = reg.queue_removal(digest("g3"), 1_000).unwrap();

        let err = reg
            .execute_removal(&digest("g3"), digest("g4"), ready - 1)
            .unwrap_err();
        assert_matches!(err, CustodyError::DelayNotElapsed { .. });

        reg.execute_removal(&digest("g3"), digest("g4"), ready)
            .unwrap();
        assert!(!reg.contains(&digest("g3")));
        assert!(reg.contains(&digest("g4")));
        assert_eq!(reg.removal_scheduled_at(&digest("g3")), None);
    }

    #[test]
    fn test_execute_unqueued_removal_rejected() {
        let mut reg = registry();
        let err = reg
            .execute_removal(&digest("g3"), digest("g4"), u64::MAX)
            .unwrap_err();
        assert_matches!(err, CustodyError::NotQueued { .. });
    }

    #[test]
    fn test_cancel_removal_is_idempotent() {
        let mut reg = registry();
        assert!(!reg.cancel_removal(&digest("g2")));
        reg.queue_removal(digest("g2"), 0).unwrap();
        assert!(reg.cancel_removal(&digest("g2")));
        assert!(!reg.cancel_removal(&digest("g2")));
        assert_eq!(reg.removal_scheduled_at(&digest("g2")), None);
    }
}
