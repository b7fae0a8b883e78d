//! Unified error system for custody operations
//!
//! A single error type covers every rejected operation. Every failure aborts
//! the enclosing operation with no persisted state change; the variant names
//! the failure kind and carries enough context for a human-readable reason.

use crate::identifiers::{AccountId, GuardianDigest};
use serde::{Deserialize, Serialize};

/// Unified error type for all custody operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum CustodyError {
    /// Caller fails a role predicate (controller or guardian check)
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Which predicate failed and for whom
        message: String,
    },

    /// Operation is not allowed in the current recovery phase
    #[error("Invalid mode: {message}")]
    InvalidMode {
        /// Required versus actual phase
        message: String,
    },

    /// Voter list shorter than the threshold
    #[error("Quorum not met: {provided} voters supplied, {required} required")]
    QuorumNotMet {
        /// Configured threshold
        required: usize,
        /// Length of the supplied voter list
        provided: usize,
    },

    /// Voter's proposal belongs to a different round
    #[error("Round mismatch for voter {voter}: proposal from round {found}, current round {expected}")]
    RoundMismatch {
        /// Voter whose proposal is stale
        voter: AccountId,
        /// Current recovery round
        expected: u64,
        /// Round recorded in the voter's proposal
        found: u64,
    },

    /// Voter proposed a different controller
    #[error("Disagreement: voter {voter} proposed {proposed}, execution requested {requested}")]
    Disagreement {
        /// Voter whose proposal disagrees
        voter: AccountId,
        /// Controller the voter proposed
        proposed: AccountId,
        /// Controller the execution asked for
        requested: AccountId,
    },

    /// Voter's proposal was already counted
    #[error("Duplicate voter: proposal from {voter} has already been counted")]
    DuplicateVoter {
        /// Voter listed more than once, or already consumed
        voter: AccountId,
    },

    /// Guardian is queued for removal
    #[error("Pending removal: guardian {digest} is queued for removal")]
    PendingRemoval {
        /// Guardian with a pending removal schedule
        digest: GuardianDigest,
    },

    /// No removal is queued for the guardian
    #[error("Not queued: no removal scheduled for guardian {digest}")]
    NotQueued {
        /// Guardian without a removal schedule
        digest: GuardianDigest,
    },

    /// Removal delay has not yet elapsed
    #[error("Delay not elapsed: removal of {digest} executable at {ready_at}, now {now}")]
    DelayNotElapsed {
        /// Guardian queued for removal
        digest: GuardianDigest,
        /// Earliest executable time (seconds)
        ready_at: u64,
        /// Clock reading at the attempt (seconds)
        now: u64,
    },

    /// Digest is already a guardian
    #[error("Already guardian: {digest} is already in the guardian set")]
    AlreadyGuardian {
        /// Digest that would have been inserted twice
        digest: GuardianDigest,
    },

    /// Digest is not a guardian
    #[error("Unknown guardian: {digest} is not in the guardian set")]
    UnknownGuardian {
        /// Digest that was expected to be a guardian
        digest: GuardianDigest,
    },

    /// Forwarded call reported failure
    #[error("External call failed: {message}")]
    ExternalCallFailed {
        /// Target-provided failure description
        message: String,
    },

    /// Forwarded-call operation re-entered while already executing
    #[error("Reentrant call: external transaction already in progress")]
    ReentrantCall,

    /// Constructor or restore arguments violate module invariants
    #[error("Construction invariant violated: {message}")]
    ConstructionInvariantViolated {
        /// Violated invariant
        message: String,
    },

    /// Malformed input
    #[error("Invalid: {message}")]
    Invalid {
        /// Description of the malformed input
        message: String,
    },

    /// Configuration could not be loaded or failed validation
    #[error("Config error: {message}")]
    Config {
        /// Description of the configuration problem
        message: String,
    },

    /// Serialization or deserialization failed
    #[error("Serialization error: {message}")]
    Serialization {
        /// Description of the encoding failure
        message: String,
    },
}

/// Fieldless classification of [`CustodyError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Unauthorized,
    InvalidMode,
    QuorumNotMet,
    RoundMismatch,
    Disagreement,
    DuplicateVoter,
    PendingRemoval,
    NotQueued,
    DelayNotElapsed,
    AlreadyGuardian,
    UnknownGuardian,
    ExternalCallFailed,
    ReentrantCall,
    ConstructionInvariantViolated,
    Invalid,
    Config,
    Serialization,
}

impl CustodyError {
    /// Create an unauthorized error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Create an invalid-mode error
    pub fn invalid_mode(message: impl Into<String>) -> Self {
        Self::InvalidMode {
            message: message.into(),
        }
    }

    /// Create an external-call failure
    pub fn external_call_failed(message: impl Into<String>) -> Self {
        Self::ExternalCallFailed {
            message: message.into(),
        }
    }

    /// Create a construction-invariant error
    pub fn construction(message: impl Into<String>) -> Self {
        Self::ConstructionInvariantViolated {
            message: message.into(),
        }
    }

    /// Create an invalid input error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// The failure class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::InvalidMode { .. } => ErrorKind::InvalidMode,
            Self::QuorumNotMet { .. } => ErrorKind::QuorumNotMet,
            Self::RoundMismatch { .. } => ErrorKind::RoundMismatch,
            Self::Disagreement { .. } => ErrorKind::Disagreement,
            Self::DuplicateVoter { .. } => ErrorKind::DuplicateVoter,
            Self::PendingRemoval { .. } => ErrorKind::PendingRemoval,
            Self::NotQueued { .. } => ErrorKind::NotQueued,
            Self::DelayNotElapsed { .. } => ErrorKind::DelayNotElapsed,
            Self::AlreadyGuardian { .. } => ErrorKind::AlreadyGuardian,
            Self::UnknownGuardian { .. } => ErrorKind::UnknownGuardian,
            Self::ExternalCallFailed { .. } => ErrorKind::ExternalCallFailed,
            Self::ReentrantCall => ErrorKind::ReentrantCall,
            Self::ConstructionInvariantViolated { .. } => ErrorKind::ConstructionInvariantViolated,
            Self::Invalid { .. } => ErrorKind::Invalid,
            Self::Config { .. } => ErrorKind::Config,
            Self::Serialization { .. } => ErrorKind::Serialization,
        }
    }
}

/// Standard Result type for custody operations
pub type Result<T> = std::result::Result<T, CustodyError>;

impl From<serde_json::Error> for CustodyError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

impl From<toml::de::Error> for CustodyError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(err.to_string())
    }
}

impl From<std::io::Error> for CustodyError {
    fn from(err: std::io::Error) -> Self {
        Self::config(format!("I/O error: {err}"))
    }
}
