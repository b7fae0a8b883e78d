//! Custody module
//!
//! Composes the access gate, guardian registry, recovery coordinator and
//! control surface into the operations callers invoke.
//!
//! ## Execution model
//!
//! Persistent state sits behind one mutex, so admitted operations apply
//! serially. Each mutating operation runs against a working copy of the
//! state; the copy replaces the live state and the operation's fact is
//! journaled only if every check passed. A rejected operation leaves both
//! state and journal untouched.
//!
//! The forwarded call in [`CustodyModule::execute_external_tx`] runs without
//! the state lock so that the target may call back into the module; the
//! control surface's in-progress marker stops it from forwarding again.

use crate::control::ControlSurface;
use crate::coordinator::{Proposal, RecoveryCoordinator};
use crate::facts::{CustodyFact, FactJournal, FactRecord, CUSTODY_FACT_TYPE_ID};
use crate::gate::AccessGate;
use crate::registry::GuardianRegistry;
use crate::snapshot::CustodySnapshot;
use crate::state::{RecoveryPhase, RequiredMode};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use warden_core::{
    AccountId, CallEffects, ConfigValidation, CustodyConfig, CustodyError, GuardianDigest, Hash32,
    PhysicalClockEffects, Result,
};

/// Persistent state of a custody module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustodyState {
    controller: AccountId,
    threshold: usize,
    registry: GuardianRegistry,
    coordinator: RecoveryCoordinator,
}

impl CustodyState {
    /// Current controller.
    pub fn controller(&self) -> &AccountId {
        &self.controller
    }

    /// Quorum threshold.
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Guardian registry.
    pub fn registry(&self) -> &GuardianRegistry {
        &self.registry
    }

    /// Recovery coordinator.
    pub fn coordinator(&self) -> &RecoveryCoordinator {
        &self.coordinator
    }

    fn gate(&self) -> AccessGate<'_> {
        AccessGate::new(&self.controller, &self.registry, self.coordinator.phase())
    }

    /// Check the invariants every reachable state satisfies.
    pub(crate) fn validate(&self, config: &CustodyConfig) -> Result<()> {
        if self.threshold == 0 {
            return Err(CustodyError::construction("threshold must be greater than zero"));
        }
        if self.threshold > self.registry.len() {
            return Err(CustodyError::construction(format!(
                "threshold {} exceeds guardian count {}",
                self.threshold,
                self.registry.len()
            )));
        }
        if self.threshold > config.max_voters {
            return Err(CustodyError::construction(format!(
                "threshold {} exceeds max_voters {}",
                self.threshold, config.max_voters
            )));
        }
        let round = self.coordinator.phase().round();
        if let Some((guardian, proposal)) = self
            .coordinator
            .proposals()
            .find(|(_, proposal)| proposal.round > round)
        {
            return Err(CustodyError::construction(format!(
                "proposal from {guardian} is for round {}, ahead of round {round}",
                proposal.round
            )));
        }
        if matches!(self.coordinator.phase(), RecoveryPhase::InRecovery { round: 0 }) {
            return Err(CustodyError::construction("recovery in progress at round 0"));
        }
        Ok(())
    }
}

/// A guardian-recoverable custody module.
pub struct CustodyModule<C, E> {
    config: CustodyConfig,
    clock: C,
    state: Mutex<CustodyState>,
    journal: Mutex<FactJournal>,
    control: ControlSurface<E>,
}

impl<C, E> CustodyModule<C, E>
where
    C: PhysicalClockEffects,
    E: CallEffects,
{
    /// Construct a module controlled by `deployer`.
    ///
    /// Requires distinct guardian digests and `0 < threshold <= guardian count`.
    pub fn new(
        deployer: AccountId,
        guardians: impl IntoIterator<Item = GuardianDigest>,
        threshold: usize,
        config: CustodyConfig,
        clock: C,
        calls: E,
    ) -> Result<Self> {
        config
            .validate()
            .map_err(|e| CustodyError::construction(e.to_string()))?;
        let state = CustodyState {
            controller: deployer,
            threshold,
            registry: GuardianRegistry::new(guardians)?,
            coordinator: RecoveryCoordinator::new(),
        };
        state.validate(&config)?;

        let module = Self {
            config,
            clock,
            state: Mutex::new(state),
            journal: Mutex::new(FactJournal::new()),
            control: ControlSurface::new(calls),
        };
        let guardian_count = module.guardian_count();
        module.record(
            "construct",
            CustodyFact::Constructed {
                controller: deployer,
                guardian_count,
                threshold,
            },
        );
        Ok(module)
    }

    /// Rebuild a module from a snapshot, re-checking its invariants.
    pub fn restore(
        snapshot: CustodySnapshot,
        config: CustodyConfig,
        clock: C,
        calls: E,
    ) -> Result<Self> {
        config
            .validate()
            .map_err(|e| CustodyError::construction(e.to_string()))?;
        let (state, journal) = snapshot.into_parts();
        state.validate(&config)?;

        tracing::info!(
            controller = %state.controller,
            round = state.coordinator.phase().round(),
            journal_len = journal.len(),
            "Custody module restored"
        );

        Ok(Self {
            config,
            clock,
            state: Mutex::new(state),
            journal: Mutex::new(journal),
            control: ControlSurface::new(calls),
        })
    }

    // ------------------------------------------------------------------------
    // Control surface
    // ------------------------------------------------------------------------

    /// Forward `value` and `payload` to `target` on the controller's behalf.
    ///
    /// The caller is checked against the controller before the reentrancy
    /// marker is taken. Operations the target invokes on this module while
    /// the call is in flight commit provisionally: if the call fails, state
    /// and journal are restored to what they were when it started.
    pub fn execute_external_tx(
        &self,
        caller: &AccountId,
        target: &AccountId,
        value: u128,
        payload: &[u8],
    ) -> Result<Vec<u8>> {
        let checkpoint = {
            let state = self.state.lock();
            if let Err(err) = state.gate().require_controller(caller) {
                return Err(self.rejected("execute_external_tx", err));
            }
            state.clone()
        };

        let guard = self.control.enter().map_err(|err| {
            tracing::warn!(caller = %caller, target = %target, "Reentrant external transaction rejected");
            self.rejected("execute_external_tx", err)
        })?;
        let journal_len = self.journal.lock().len();

        let return_data = match self.control.forward(&guard, target, value, payload) {
            Ok(data) => data,
            Err(err) => {
                self.roll_back(checkpoint, journal_len);
                return Err(self.rejected("execute_external_tx", err));
            }
        };

        self.record(
            "execute_external_tx",
            CustodyFact::ExternalTxExecuted {
                controller: *caller,
                target: *target,
                value,
                payload_hash: Hash32::from_bytes(payload),
                return_len: return_data.len(),
            },
        );
        Ok(return_data)
    }

    // ------------------------------------------------------------------------
    // Recovery
    // ------------------------------------------------------------------------

    /// Open a new recovery round proposing `proposed_controller`. Returns the round.
    pub fn initiate_recovery(
        &self,
        caller: &AccountId,
        proposed_controller: &AccountId,
    ) -> Result<u64> {
        self.apply("initiate_recovery", |state, _now| {
            let gate = state.gate();
            gate.require_guardian(caller)?;
            gate.require_mode(RequiredMode::Normal)?;

            let round = state.coordinator.initiate(*caller, *proposed_controller)?;
            Ok((
                round,
                CustodyFact::RecoveryInitiated {
                    guardian: *caller,
                    proposed_controller: *proposed_controller,
                    round,
                },
            ))
        })
    }

    /// Record the caller's proposal in the current round. Returns the round.
    pub fn support_recovery(
        &self,
        caller: &AccountId,
        proposed_controller: &AccountId,
    ) -> Result<u64> {
        self.apply("support_recovery", |state, _now| {
            let gate = state.gate();
            gate.require_guardian(caller)?;
            gate.require_mode(RequiredMode::InRecovery)?;

            let round = state.coordinator.support(*caller, *proposed_controller)?;
            Ok((
                round,
                CustodyFact::RecoverySupported {
                    guardian: *caller,
                    proposed_controller: *proposed_controller,
                    round,
                },
            ))
        })
    }

    /// Abandon the current recovery. Who may call is set by the cancel policy.
    pub fn cancel_recovery(&self, caller: &AccountId) -> Result<u64> {
        let policy = self.config.cancel_policy;
        self.apply("cancel_recovery", |state, _now| {
            let gate = state.gate();
            gate.require_canceller(caller, policy)?;
            gate.require_mode(RequiredMode::InRecovery)?;

            let round = state.coordinator.cancel()?;
            Ok((
                round,
                CustodyFact::RecoveryCancelled {
                    actor: *caller,
                    round,
                },
            ))
        })
    }

    /// Install `new_controller` if `voters` form a valid quorum. Returns the round.
    pub fn execute_recovery(
        &self,
        caller: &AccountId,
        new_controller: &AccountId,
        voters: &[AccountId],
    ) -> Result<u64> {
        let max_voters = self.config.max_voters;
        self.apply("execute_recovery", |state, _now| {
            let gate = state.gate();
            gate.require_guardian(caller)?;
            gate.require_mode(RequiredMode::InRecovery)?;
            if voters.len() > max_voters {
                return Err(CustodyError::invalid(format!(
                    "voter list of {} exceeds max_voters {max_voters}",
                    voters.len()
                )));
            }

            let round = state.coordinator.execute(
                new_controller,
                voters,
                state.threshold,
                &state.registry,
            )?;
            let previous_controller = std::mem::replace(&mut state.controller, *new_controller);
            Ok((
                round,
                CustodyFact::RecoveryExecuted {
                    actor: *caller,
                    previous_controller,
                    new_controller: *new_controller,
                    voters: voters.to_vec(),
                    round,
                },
            ))
        })
    }

    // ------------------------------------------------------------------------
    // Guardian registry
    // ------------------------------------------------------------------------

    /// Schedule removal of `digest`. Returns the earliest execution time.
    pub fn queue_removal(&self, caller: &AccountId, digest: &GuardianDigest) -> Result<u64> {
        self.apply("queue_removal", |state, now| {
            state.gate().require_controller(caller)?;
            let ready_at = state.registry.queue_removal(*digest, now)?;
            Ok((
                ready_at,
                CustodyFact::RemovalQueued {
                    digest: *digest,
                    ready_at,
                },
            ))
        })
    }

    /// Replace queued guardian `old` with `new` once its delay has elapsed.
    pub fn execute_removal(
        &self,
        caller: &AccountId,
        old: &GuardianDigest,
        new: &GuardianDigest,
    ) -> Result<()> {
        self.apply("execute_removal", |state, now| {
            state.gate().require_controller(caller)?;
            state.registry.execute_removal(old, *new, now)?;
            Ok((
                (),
                CustodyFact::RemovalExecuted {
                    removed: *old,
                    added: *new,
                },
            ))
        })
    }

    /// Clear any removal schedule for `digest`. Returns whether one existed.
    pub fn cancel_removal(&self, caller: &AccountId, digest: &GuardianDigest) -> Result<bool> {
        self.apply("cancel_removal", |state, _now| {
            state.gate().require_controller(caller)?;
            let was_queued = state.registry.cancel_removal(digest);
            Ok((
                was_queued,
                CustodyFact::RemovalCancelled {
                    digest: *digest,
                    was_queued,
                },
            ))
        })
    }

    /// Replace the caller's own digest with `new_digest`.
    pub fn transfer_guardianship(&self, caller: &AccountId, new_digest: &GuardianDigest) -> Result<()> {
        self.apply("transfer_guardianship", |state, _now| {
            let gate = state.gate();
            let digest = gate.require_guardian(caller)?;
            gate.require_mode(RequiredMode::Normal)?;

            state.registry.transfer(&digest, *new_digest)?;
            Ok((
                (),
                CustodyFact::GuardianshipTransferred {
                    from: digest,
                    to: *new_digest,
                },
            ))
        })
    }

    /// Publish the caller's digest-to-account link. Returns the digest.
    pub fn reveal_identity(&self, caller: &AccountId) -> Result<GuardianDigest> {
        let allowed = self.config.allow_identity_reveal;
        self.apply("reveal_identity", |state, _now| {
            if !allowed {
                return Err(CustodyError::unauthorized("identity reveal is disabled"));
            }
            let digest = state.gate().require_guardian(caller)?;
            Ok((
                digest,
                CustodyFact::GuardianRevealed {
                    guardian: *caller,
                    digest,
                },
            ))
        })
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// Current controller.
    pub fn controller(&self) -> AccountId {
        self.state.lock().controller
    }

    /// Quorum threshold.
    pub fn threshold(&self) -> usize {
        self.state.lock().threshold
    }

    /// Current recovery phase.
    pub fn phase(&self) -> RecoveryPhase {
        self.state.lock().coordinator.phase()
    }

    /// Current or most recent recovery round.
    pub fn round(&self) -> u64 {
        self.phase().round()
    }

    /// Whether a recovery is in progress.
    pub fn in_recovery(&self) -> bool {
        self.phase().in_recovery()
    }

    /// Whether `digest` is a guardian.
    pub fn is_guardian(&self, digest: &GuardianDigest) -> bool {
        self.state.lock().registry.contains(digest)
    }

    /// Number of guardians.
    pub fn guardian_count(&self) -> usize {
        self.state.lock().registry.len()
    }

    /// Scheduled removal time for `digest`, if queued.
    pub fn removal_scheduled_at(&self, digest: &GuardianDigest) -> Option<u64> {
        self.state.lock().registry.removal_scheduled_at(digest)
    }

    /// Latest proposal recorded for `guardian`.
    pub fn proposal(&self, guardian: &AccountId) -> Option<Proposal> {
        self.state.lock().coordinator.proposal(guardian).copied()
    }

    /// Active configuration.
    pub fn config(&self) -> &CustodyConfig {
        &self.config
    }

    /// The clock this module reads.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// The call primitive this module forwards through.
    pub fn calls(&self) -> &E {
        self.control.calls()
    }

    /// All journaled facts.
    pub fn facts(&self) -> Vec<FactRecord> {
        self.journal.lock().records().to_vec()
    }

    /// Journaled facts with `sequence >= from`.
    pub fn facts_since(&self, from: u64) -> Vec<FactRecord> {
        self.journal.lock().since(from).to_vec()
    }

    /// Serializable copy of state and journal.
    pub fn snapshot(&self) -> CustodySnapshot {
        let state = self.state.lock();
        let journal = self.journal.lock();
        CustodySnapshot::new(state.clone(), journal.clone())
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    fn apply<R>(
        &self,
        operation: &'static str,
        op: impl FnOnce(&mut CustodyState, u64) -> Result<(R, CustodyFact)>,
    ) -> Result<R> {
        let now = self.clock.now_secs();
        let mut state = self.state.lock();
        let mut working = state.clone();

        match op(&mut working, now) {
            Ok((value, fact)) => {
                *state = working;
                let phase = state.coordinator.phase();
                let mut journal = self.journal.lock();
                let record = journal.append(fact, now, phase);
                tracing::info!(
                    fact_type = CUSTODY_FACT_TYPE_ID,
                    operation,
                    sequence = record.sequence,
                    sub_type = record.fact.sub_type(),
                    round = phase.round(),
                    in_recovery = phase.in_recovery(),
                    "Custody operation committed"
                );
                Ok(value)
            }
            Err(err) => Err(self.rejected(operation, err)),
        }
    }

    fn record(&self, operation: &'static str, fact: CustodyFact) {
        let now = self.clock.now_secs();
        let state = self.state.lock();
        let phase = state.coordinator.phase();
        let mut journal = self.journal.lock();
        let record = journal.append(fact, now, phase);
        tracing::info!(
            fact_type = CUSTODY_FACT_TYPE_ID,
            operation,
            sequence = record.sequence,
            sub_type = record.fact.sub_type(),
            "Custody operation committed"
        );
    }

    /// Restore `checkpoint` and drop facts appended after `journal_len`.
    fn roll_back(&self, checkpoint: CustodyState, journal_len: usize) {
        let mut state = self.state.lock();
        let mut journal = self.journal.lock();
        let discarded = journal.len().saturating_sub(journal_len);
        journal.truncate(journal_len);
        *state = checkpoint;
        if discarded > 0 {
            tracing::warn!(
                discarded,
                "Rolled back operations committed during a failed external call"
            );
        }
    }

    fn rejected(&self, operation: &'static str, err: CustodyError) -> CustodyError {
        tracing::debug!(operation, kind = ?err.kind(), error = %err, "Custody operation rejected");
        err
    }
}

impl<C, E> std::fmt::Debug for CustodyModule<C, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("CustodyModule")
            .field("controller", &state.controller)
            .field("threshold", &state.threshold)
            .field("guardians", &state.registry.len())
            .field("phase", &state.coordinator.phase())
            .finish_non_exhaustive()
    }
}
