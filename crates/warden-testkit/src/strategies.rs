//! Proptest strategies

use proptest::collection::{btree_set, vec};
use proptest::prelude::*;
use warden_core::{AccountId, GuardianDigest, ACCOUNT_ID_LEN};

/// Arbitrary non-zero account.
pub fn arb_account() -> impl Strategy<Value = AccountId> {
    any::<[u8; ACCOUNT_ID_LEN]>()
        .prop_map(AccountId::new)
        .prop_filter("zero account", |a| !a.is_zero())
}

/// Between `min` and `max` distinct guardian accounts.
pub fn arb_guardian_accounts(min: usize, max: usize) -> impl Strategy<Value = Vec<AccountId>> {
    btree_set(any::<[u8; ACCOUNT_ID_LEN]>(), min..=max)
        .prop_map(|set| set.into_iter().map(AccountId::new).collect())
}

/// A guardian set with a threshold in `1..=len`.
pub fn arb_guardians_and_threshold(
    max: usize,
) -> impl Strategy<Value = (Vec<AccountId>, usize)> {
    arb_guardian_accounts(1, max).prop_flat_map(|accounts| {
        let len = accounts.len();
        (Just(accounts), 1..=len)
    })
}

/// Digests for an arbitrary guardian set.
pub fn arb_digests(min: usize, max: usize) -> impl Strategy<Value = Vec<GuardianDigest>> {
    arb_guardian_accounts(min, max)
        .prop_map(|accounts| accounts.iter().map(GuardianDigest::of).collect())
}

/// Arbitrary list of indices into a set of `len` items, repeats allowed.
pub fn arb_index_list(len: usize, max_items: usize) -> impl Strategy<Value = Vec<usize>> {
    vec(0..len, 0..=max_items)
}
