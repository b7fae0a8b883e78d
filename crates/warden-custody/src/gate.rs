//! Access gate
//!
//! Stateless predicates evaluated before any mutating operation touches
//! registry or coordinator state. A failing predicate aborts the operation.

use crate::registry::GuardianRegistry;
use crate::state::{RecoveryPhase, RequiredMode};
use warden_core::{AccountId, CancelPolicy, CustodyError, GuardianDigest, Result};

/// Read-only view over the state the predicates need.
#[derive(Debug, Clone, Copy)]
pub struct AccessGate<'a> {
    controller: &'a AccountId,
    registry: &'a GuardianRegistry,
    phase: RecoveryPhase,
}

impl<'a> AccessGate<'a> {
    /// Build a gate over the current controller, guardian set and phase.
    pub fn new(
        controller: &'a AccountId,
        registry: &'a GuardianRegistry,
        phase: RecoveryPhase,
    ) -> Self {
        Self {
            controller,
            registry,
            phase,
        }
    }

    /// Caller must be the controller.
    pub fn require_controller(&self, caller: &AccountId) -> Result<()> {
        if caller != self.controller {
            return Err(CustodyError::unauthorized(format!(
                "{caller} is not the controller"
            )));
        }
        Ok(())
    }

    /// Caller's digest must be in the guardian set. Returns the digest.
    pub fn require_guardian(&self, caller: &AccountId) -> Result<GuardianDigest> {
        let digest = GuardianDigest::of(caller);
        if !self.registry.contains(&digest) {
            return Err(CustodyError::unauthorized(format!(
                "{caller} is not a guardian"
            )));
        }
        Ok(digest)
    }

    /// Current phase must satisfy `mode`.
    pub fn require_mode(&self, mode: RequiredMode) -> Result<()> {
        if !self.phase.satisfies(mode) {
            return Err(CustodyError::invalid_mode(format!(
                "operation requires {mode}, module is {}",
                self.phase
            )));
        }
        Ok(())
    }

    /// Caller must hold the role `policy` names for cancelling a recovery.
    pub fn require_canceller(&self, caller: &AccountId, policy: CancelPolicy) -> Result<()> {
        match policy {
            CancelPolicy::Controller => self.require_controller(caller),
            CancelPolicy::Guardian => self.require_guardian(caller).map(|_| ()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn setup() -> (AccountId, GuardianRegistry) {
        let controller = AccountId::from_label("owner");
        let registry = GuardianRegistry::new([GuardianDigest::of(&AccountId::from_label("g1"))])
            .unwrap();
        (controller, registry)
    }

    #[test]
    fn test_controller_check() {
        let (controller, registry) = setup();
        let gate = AccessGate::new(&controller, &registry, RecoveryPhase::default());
        assert!(gate.require_controller(&controller).is_ok());
        assert_matches!(
            gate.require_controller(&AccountId::from_label("g1")),
            Err(CustodyError::Unauthorized { .. })
        );
    }

    #[test]
    fn test_guardian_check_hashes_caller() {
        let (controller, registry) = setup();
        let gate = AccessGate::new(&controller, &registry, RecoveryPhase::default());
        let g1 = AccountId::from_label("g1");
        assert_eq!(gate.require_guardian(&g1).unwrap(), GuardianDigest::of(&g1));
        assert_matches!(
            gate.require_guardian(&controller),
            Err(CustodyError::Unauthorized { .. })
        );
    }

    #[test]
    fn test_mode_check() {
        let (controller, registry) = setup();
        let gate = AccessGate::new(&controller, &registry, RecoveryPhase::InRecovery { round: 1 });
        assert!(gate.require_mode(RequiredMode::InRecovery).is_ok());
        assert_matches!(
            gate.require_mode(RequiredMode::Normal),
            Err(CustodyError::InvalidMode { .. })
        );
    }

    #[test]
    fn test_cancel_policy_selects_role() {
        let (controller, registry) = setup();
        let gate = AccessGate::new(&controller, &registry, RecoveryPhase::InRecovery { round: 1 });
        let g1 = AccountId::from_label("g1");

        assert!(gate.require_canceller(&controller, CancelPolicy::Controller).is_ok());
        assert!(gate.require_canceller(&g1, CancelPolicy::Controller).is_err());
        assert!(gate.require_canceller(&g1, CancelPolicy::Guardian).is_ok());
        assert!(gate.require_canceller(&controller, CancelPolicy::Guardian).is_err());
    }
}
