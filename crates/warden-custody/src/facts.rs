//! Custody facts
//!
//! Every committed operation appends exactly one [`CustodyFact`] to the
//! module's journal. The journal is append-only: records are numbered from
//! zero and never rewritten, so off-module observers can follow it
//! incrementally with [`FactJournal::since`]. The one exception is a failed
//! external call: facts committed by operations the call target invoked are
//! dropped together with the call.

use crate::state::RecoveryPhase;
use serde::{Deserialize, Serialize};
use warden_core::{AccountId, CustodyError, GuardianDigest, Hash32, Result};

/// Type identifier for custody facts
pub const CUSTODY_FACT_TYPE_ID: &str = "custody";

/// Custody domain facts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustodyFact {
    // ========================================================================
    // Lifecycle
    // ========================================================================
    /// Module constructed
    Constructed {
        /// Initial controller (the deployer)
        controller: AccountId,
        /// Number of guardians seeded
        guardian_count: usize,
        /// Immutable quorum threshold
        threshold: usize,
    },

    // ========================================================================
    // Control surface
    // ========================================================================
    /// Controller forwarded a call
    ExternalTxExecuted {
        /// Controller that issued the call, as checked before forwarding
        controller: AccountId,
        /// Call target
        target: AccountId,
        /// Value forwarded
        value: u128,
        /// Hash of the forwarded payload
        payload_hash: Hash32,
        /// Length of the target's response
        return_len: usize,
    },

    // ========================================================================
    // Recovery
    // ========================================================================
    /// Guardian opened a recovery round
    RecoveryInitiated {
        /// Initiating guardian
        guardian: AccountId,
        /// Controller proposed by the initiator
        proposed_controller: AccountId,
        /// Newly opened round
        round: u64,
    },

    /// Guardian recorded a proposal in the current round
    RecoverySupported {
        /// Supporting guardian
        guardian: AccountId,
        /// Controller proposed by the supporter
        proposed_controller: AccountId,
        /// Current round
        round: u64,
    },

    /// Recovery abandoned
    RecoveryCancelled {
        /// Account that cancelled
        actor: AccountId,
        /// Round that was cancelled
        round: u64,
    },

    /// Recovery reached quorum and replaced the controller
    RecoveryExecuted {
        /// Guardian that submitted the execution
        actor: AccountId,
        /// Controller before execution
        previous_controller: AccountId,
        /// Controller after execution
        new_controller: AccountId,
        /// Voters counted toward quorum, in submission order
        voters: Vec<AccountId>,
        /// Round that completed
        round: u64,
    },

    // ========================================================================
    // Guardian registry
    // ========================================================================
    /// Controller queued a guardian for removal
    RemovalQueued {
        /// Guardian queued for removal
        digest: GuardianDigest,
        /// Earliest execution time (seconds)
        ready_at: u64,
    },

    /// Controller executed a queued removal
    RemovalExecuted {
        /// Guardian removed
        removed: GuardianDigest,
        /// Replacement guardian
        added: GuardianDigest,
    },

    /// Controller cleared a removal schedule
    RemovalCancelled {
        /// Guardian whose schedule was cleared
        digest: GuardianDigest,
        /// Whether a schedule existed
        was_queued: bool,
    },

    /// Guardian rotated its own identity
    GuardianshipTransferred {
        /// Digest that left the set
        from: GuardianDigest,
        /// Digest that joined the set
        to: GuardianDigest,
    },

    /// Guardian published its digest-to-account link
    GuardianRevealed {
        /// Revealing guardian
        guardian: AccountId,
        /// The guardian's digest
        digest: GuardianDigest,
    },
}

impl CustodyFact {
    /// Stable kebab-case name of this fact variant
    pub fn sub_type(&self) -> &'static str {
        match self {
            CustodyFact::Constructed { .. } => "constructed",
            CustodyFact::ExternalTxExecuted { .. } => "external-tx-executed",
            CustodyFact::RecoveryInitiated { .. } => "recovery-initiated",
            CustodyFact::RecoverySupported { .. } => "recovery-supported",
            CustodyFact::RecoveryCancelled { .. } => "recovery-cancelled",
            CustodyFact::RecoveryExecuted { .. } => "recovery-executed",
            CustodyFact::RemovalQueued { .. } => "removal-queued",
            CustodyFact::RemovalExecuted { .. } => "removal-executed",
            CustodyFact::RemovalCancelled { .. } => "removal-cancelled",
            CustodyFact::GuardianshipTransferred { .. } => "guardianship-transferred",
            CustodyFact::GuardianRevealed { .. } => "guardian-revealed",
        }
    }
}

/// A fact as stored in the journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactRecord {
    /// Position in the journal, starting at 0
    pub sequence: u64,
    /// Clock reading when the fact was committed (seconds)
    pub recorded_at: u64,
    /// Recovery phase after the operation committed
    pub phase: RecoveryPhase,
    /// The fact itself
    pub fact: CustodyFact,
}

impl FactRecord {
    /// Encode as a single JSON line for off-module sinks.
    pub fn to_json_line(&self) -> Result<String> {
        serde_json::to_string(self).map_err(CustodyError::from)
    }

    /// Decode a record produced by [`FactRecord::to_json_line`].
    pub fn from_json_line(line: &str) -> Result<Self> {
        serde_json::from_str(line).map_err(CustodyError::from)
    }
}

/// Append-only fact log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactJournal {
    records: Vec<FactRecord>,
}

impl FactJournal {
    /// Empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fact and return its record.
    pub fn append(&mut self, fact: CustodyFact, recorded_at: u64, phase: RecoveryPhase) -> &FactRecord {
        let sequence = self.records.len() as u64;
        self.records.push(FactRecord {
            sequence,
            recorded_at,
            phase,
            fact,
        });
        &self.records[self.records.len() - 1]
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the journal is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records.
    pub fn records(&self) -> &[FactRecord] {
        &self.records
    }

    /// Records with `sequence >= from`.
    pub fn since(&self, from: u64) -> &[FactRecord] {
        let start = usize::try_from(from)
            .unwrap_or(usize::MAX)
            .min(self.records.len());
        &self.records[start..]
    }

    /// Drop every record with `sequence >= len`.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.records.truncate(len);
    }

    /// Most recent record.
    pub fn last(&self) -> Option<&FactRecord> {
        self.records.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn revealed(label: &str) -> CustodyFact {
        let guardian = AccountId::from_label(label);
        CustodyFact::GuardianRevealed {
            guardian,
            digest: GuardianDigest::of(&guardian),
        }
    }

    #[test]
    fn test_sequence_numbers_are_dense() {
        let mut journal = FactJournal::new();
        for label in ["a", "b", "c"] {
            journal.append(revealed(label), 10, RecoveryPhase::default());
        }
        let sequences: Vec<u64> = journal.records().iter().map(|r| r.sequence).collect();
        assert_eq!(sequences, vec![0, 1, 2]);
        assert_eq!(journal.since(1).len(), 2);
        assert!(journal.since(99).is_empty());
    }

    #[test]
    fn test_json_line_roundtrip() {
        let mut journal = FactJournal::new();
        let record = journal
            .append(
                CustodyFact::RecoveryInitiated {
                    guardian: AccountId::from_label("g1"),
                    proposed_controller: AccountId::from_label("x"),
                    round: 1,
                },
                42,
                RecoveryPhase::InRecovery { round: 1 },
            )
            .clone();

        let line = record.to_json_line().unwrap();
        assert!(line.contains("\"recovery_initiated\":{"));
        assert!(!line.contains('\n'));
        assert_eq!(FactRecord::from_json_line(&line).unwrap(), record);
    }

    #[test]
    fn test_sub_types() {
        assert_eq!(revealed("a").sub_type(), "guardian-revealed");
        assert_eq!(
            CustodyFact::RemovalCancelled {
                digest: GuardianDigest::of(&AccountId::from_label("g")),
                was_queued: false,
            }
            .sub_type(),
            "removal-cancelled"
        );
    }
}
