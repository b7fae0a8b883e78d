//! Account and guardian identifiers
//!
//! Raw account identifiers are only ever held for the controller, for call
//! targets, and for guardians that have acted (voted or revealed). Guardian
//! membership itself is keyed by [`GuardianDigest`].

use crate::errors::CustodyError;
use crate::hash;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Length in bytes of a raw account identifier.
pub const ACCOUNT_ID_LEN: usize = 20;

/// 32-byte hash value.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Hash32(pub [u8; 32]);

impl Hash32 {
    /// Hash arbitrary bytes with the system hash algorithm.
    pub fn from_bytes(data: &[u8]) -> Self {
        Self(hash::hash(data))
    }

    /// Borrow the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl FromStr for Hash32 {
    type Err = CustodyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s.strip_prefix("0x").unwrap_or(s))
            .map_err(|e| CustodyError::invalid(format!("hash is not hex: {e}")))?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|raw: Vec<u8>| {
            CustodyError::invalid(format!("hash must be 32 bytes, got {}", raw.len()))
        })?;
        Ok(Self(bytes))
    }
}

// Identifiers serialize as hex strings so they can key JSON maps.
impl Serialize for Hash32 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash32 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl fmt::Debug for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash32({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Raw identifier of an account: a controller, a guardian, or a call target.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct AccountId(pub [u8; ACCOUNT_ID_LEN]);

impl AccountId {
    /// The all-zero account.
    pub const ZERO: AccountId = AccountId([0u8; ACCOUNT_ID_LEN]);

    /// Wrap raw bytes.
    pub const fn new(bytes: [u8; ACCOUNT_ID_LEN]) -> Self {
        Self(bytes)
    }

    /// Derive a deterministic account from a human-readable label.
    ///
    /// The account is the first 20 bytes of the label's hash. Used by tooling
    /// and tests that name accounts rather than carry key material.
    pub fn from_label(label: &str) -> Self {
        let digest = hash::hash(label.as_bytes());
        let mut bytes = [0u8; ACCOUNT_ID_LEN];
        bytes.copy_from_slice(&digest[..ACCOUNT_ID_LEN]);
        Self(bytes)
    }

    /// Borrow the raw bytes.
    pub fn as_bytes(&self) -> &[u8; ACCOUNT_ID_LEN] {
        &self.0
    }

    /// Whether this is the all-zero account.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ACCOUNT_ID_LEN]
    }

    /// Lowercase hex encoding with a `0x` prefix.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", self.to_hex())
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for AccountId {
    type Err = CustodyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(stripped)
            .map_err(|e| CustodyError::invalid(format!("account id is not hex: {e}")))?;
        let bytes: [u8; ACCOUNT_ID_LEN] = bytes.try_into().map_err(|raw: Vec<u8>| {
            CustodyError::invalid(format!(
                "account id must be {ACCOUNT_ID_LEN} bytes, got {}",
                raw.len()
            ))
        })?;
        Ok(Self(bytes))
    }
}

impl Serialize for AccountId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for AccountId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Cryptographic digest of a guardian's account identifier.
///
/// The unit of guardian membership. The registry never stores the preimage.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GuardianDigest(pub Hash32);

impl GuardianDigest {
    /// Digest of an account identifier.
    pub fn of(account: &AccountId) -> Self {
        Self(Hash32::from_bytes(account.as_bytes()))
    }

    /// Wrap a precomputed digest.
    pub const fn from_hash(hash: Hash32) -> Self {
        Self(hash)
    }

    /// The underlying hash.
    pub fn as_hash(&self) -> &Hash32 {
        &self.0
    }
}

impl fmt::Debug for GuardianDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GuardianDigest({})", &self.0.to_hex()[..16])
    }
}

impl fmt::Display for GuardianDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
