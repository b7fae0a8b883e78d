//! Labelled accounts and guardian sets
//!
//! Accounts are derived from human-readable labels so tests and replay
//! scripts can name parties instead of spelling out addresses.

use warden_core::{AccountId, GuardianDigest};

/// Account derived from `label`.
pub fn account(label: &str) -> AccountId {
    AccountId::from_label(label)
}

/// The conventional deploying controller.
pub fn controller() -> AccountId {
    account("controller")
}

/// Guardian accounts labelled `g1` through `g{count}`.
pub fn guardians(count: usize) -> Vec<AccountId> {
    (1..=count).map(|i| account(&format!("g{i}"))).collect()
}

/// Digests of `accounts`, in order.
pub fn digests(accounts: &[AccountId]) -> Vec<GuardianDigest> {
    accounts.iter().map(GuardianDigest::of).collect()
}

/// A guardian set paired with its digests.
#[derive(Debug, Clone)]
pub struct GuardianFixture {
    /// Guardian accounts
    pub accounts: Vec<AccountId>,
    /// Their digests, index-aligned with `accounts`
    pub digests: Vec<GuardianDigest>,
}

impl GuardianFixture {
    /// `count` guardians labelled `g1..`.
    pub fn new(count: usize) -> Self {
        let accounts = guardians(count);
        let digests = digests(&accounts);
        Self { accounts, digests }
    }

    /// Guardian account at `index`.
    pub fn account(&self, index: usize) -> AccountId {
        self.accounts[index]
    }

    /// Digest of the guardian at `index`.
    pub fn digest(&self, index: usize) -> GuardianDigest {
        self.digests[index]
    }

    /// The first `count` guardian accounts.
    pub fn first(&self, count: usize) -> Vec<AccountId> {
        self.accounts[..count].to_vec()
    }
}
