//! Recovery coordinator
//!
//! Round-based proposal and quorum logic that replaces the controller.
//!
//! Each guardian account owns exactly one proposal slot; a newer proposal
//! overwrites the older one. Proposals are never deleted. They go stale once
//! the round counter moves past the round they were cast in, which is how
//! round isolation is enforced without any cleanup pass.
//!
//! # Quorum counting
//!
//! `execute` walks the voter list in order and, for each voter, checks round,
//! agreement and the `consumed` flag, then marks the proposal consumed
//! *before* looking at the next entry. A voter listed twice therefore trips
//! `DuplicateVoter` on its second occurrence. Callers run `execute` against a
//! working copy and discard it on error, so no partial marking survives.

use crate::registry::GuardianRegistry;
use crate::state::{PhaseEvent, RecoveryPhase};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use warden_core::{AccountId, CustodyError, GuardianDigest, Result};

/// A guardian's latest proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Proposal {
    /// Controller the guardian wants installed
    pub proposed_controller: AccountId,
    /// Round the proposal was cast in
    pub round: u64,
    /// Whether this proposal was counted toward a completed recovery
    pub consumed: bool,
}

/// Recovery phase plus per-guardian proposals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryCoordinator {
    phase: RecoveryPhase,
    proposals: BTreeMap<AccountId, Proposal>,
}

impl RecoveryCoordinator {
    /// Coordinator in `Normal` with no proposals.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase.
    pub fn phase(&self) -> RecoveryPhase {
        self.phase
    }

    /// Latest proposal recorded for `guardian`.
    pub fn proposal(&self, guardian: &AccountId) -> Option<&Proposal> {
        self.proposals.get(guardian)
    }

    /// Iterate over all recorded proposals.
    pub fn proposals(&self) -> impl Iterator<Item = (&AccountId, &Proposal)> {
        self.proposals.iter()
    }

    /// Open a new round and record the initiator's proposal. Returns the round.
    pub fn initiate(&mut self, guardian: AccountId, proposed_controller: AccountId) -> Result<u64> {
        self.phase = self.phase.apply(PhaseEvent::Initiate)?;
        let round = self.phase.round();
        self.record(guardian, proposed_controller, round);
        Ok(round)
    }

    /// Record a proposal in the current round. Returns the round.
    pub fn support(&mut self, guardian: AccountId, proposed_controller: AccountId) -> Result<u64> {
        let RecoveryPhase::InRecovery { round } = self.phase else {
            return Err(CustodyError::invalid_mode(format!(
                "cannot support recovery while {}",
                self.phase
            )));
        };
        self.record(guardian, proposed_controller, round);
        Ok(round)
    }

    /// Abandon the current round. Proposals are left in place. Returns the round.
    pub fn cancel(&mut self) -> Result<u64> {
        let round = self.phase.round();
        self.phase = self.phase.apply(PhaseEvent::Cancel)?;
        Ok(round)
    }

    /// Count `voters` toward installing `new_controller`.
    ///
    /// Every voter must currently be a guardian, hold an unconsumed proposal
    /// for `new_controller` from the current round, and appear once. On
    /// success the phase returns to `Normal` and the round is returned.
    pub fn execute(
        &mut self,
        new_controller: &AccountId,
        voters: &[AccountId],
        threshold: usize,
        registry: &GuardianRegistry,
    ) -> Result<u64> {
        let RecoveryPhase::InRecovery { round } = self.phase else {
            return Err(CustodyError::invalid_mode(format!(
                "cannot execute recovery while {}",
                self.phase
            )));
        };

        if voters.len() < threshold {
            return Err(CustodyError::QuorumNotMet {
                required: threshold,
                provided: voters.len(),
            });
        }

        for voter in voters {
            if !registry.contains(&GuardianDigest::of(voter)) {
                return Err(CustodyError::unauthorized(format!(
                    "voter {voter} is not a current guardian"
                )));
            }

            let proposal = self.proposals.get(voter).copied().unwrap_or_default();
            if proposal.round != round {
                return Err(CustodyError::RoundMismatch {
                    voter: *voter,
                    expected: round,
                    found: proposal.round,
                });
            }
            if proposal.proposed_controller != *new_controller {
                return Err(CustodyError::Disagreement {
                    voter: *voter,
                    proposed: proposal.proposed_controller,
                    requested: *new_controller,
                });
            }
            if proposal.consumed {
                return Err(CustodyError::DuplicateVoter { voter: *voter });
            }

            self.proposals.insert(
                *voter,
                Proposal {
                    consumed: true,
                    ..proposal
                },
            );
        }

        self.phase = self.phase.apply(PhaseEvent::Execute)?;
        Ok(round)
    }

    fn record(&mut self, guardian: AccountId, proposed_controller: AccountId, round: u64) {
        self.proposals.insert(
            guardian,
            Proposal {
                proposed_controller,
                round,
                consumed: false,
            },
        );
    }
}
