//! Snapshot round trips and untrusted restore input.

use assert_matches::assert_matches;
use std::sync::Arc;
use warden_core::{CustodyConfig, CustodyError, GUARDIAN_REMOVAL_DELAY_SECS};
use warden_custody::{CustodyModule, CustodySnapshot, RecoveryPhase};
use warden_testkit::{account, controller, ControllableClock, GuardianFixture, ScriptedCallTarget};

type Module = CustodyModule<ControllableClock, Arc<ScriptedCallTarget>>;

fn busy_module() -> (Module, GuardianFixture) {
    let g = GuardianFixture::new(3);
    let module = CustodyModule::new(
        controller(),
        g.digests.clone(),
        2,
        CustodyConfig::default(),
        ControllableClock::new(500),
        Arc::new(ScriptedCallTarget::new()),
    )
    .expect("valid construction");

    module.queue_removal(&controller(), &g.digest(2)).unwrap();
    module.initiate_recovery(&g.account(0), &account("x")).unwrap();
    module.support_recovery(&g.account(1), &account("y")).unwrap();
    (module, g)
}

fn restore(snapshot: CustodySnapshot) -> warden_core::Result<Module> {
    CustodyModule::restore(
        snapshot,
        CustodyConfig::default(),
        ControllableClock::new(500),
        Arc::new(ScriptedCallTarget::new()),
    )
}

fn tampered(snapshot: &CustodySnapshot, edit: impl FnOnce(&mut serde_json::Value)) -> CustodySnapshot {
    let mut value = serde_json::to_value(snapshot).expect("snapshot serializes");
    edit(&mut value);
    CustodySnapshot::from_json(&value.to_string()).expect("still well-formed")
}

#[test]
fn restored_module_continues_where_it_left_off() {
    let (module, g) = busy_module();
    let json = module.snapshot().to_json().expect("encode");

    let restored = restore(CustodySnapshot::from_json(&json).expect("decode")).expect("valid snapshot");
    assert_eq!(restored.snapshot(), module.snapshot());
    assert_eq!(restored.phase(), RecoveryPhase::InRecovery { round: 1 });
    assert_eq!(
        restored.removal_scheduled_at(&g.digest(2)),
        Some(500 + GUARDIAN_REMOVAL_DELAY_SECS)
    );
    assert_eq!(restored.proposal(&g.account(1)).unwrap().proposed_controller, account("y"));

    let next = restored.facts().len() as u64;
    restored.support_recovery(&g.account(1), &account("x")).unwrap();
    restored
        .execute_recovery(&g.account(0), &account("x"), &g.first(2))
        .unwrap();
    assert_eq!(restored.controller(), account("x"));
    assert_eq!(restored.facts_since(next).len(), 2);
    assert_eq!(restored.facts_since(next)[0].sequence, next);
}

#[test]
fn restore_rejects_impossible_threshold() {
    let (module, _) = busy_module();
    let snapshot = module.snapshot();

    for threshold in [0, 4] {
        let bad = tampered(&snapshot, |v| v["state"]["threshold"] = threshold.into());
        assert_matches!(
            restore(bad),
            Err(CustodyError::ConstructionInvariantViolated { .. })
        );
    }
}

#[test]
fn restore_rejects_proposal_from_the_future() {
    let (module, _) = busy_module();
    let bad = tampered(&module.snapshot(), |v| {
        v["state"]["coordinator"]["phase"] = serde_json::json!({ "phase": "normal", "last_round": 0 });
    });
    assert_matches!(
        restore(bad),
        Err(CustodyError::ConstructionInvariantViolated { .. })
    );
}

#[test]
fn restore_rejects_recovery_at_round_zero() {
    let g = GuardianFixture::new(2);
    let module = CustodyModule::new(
        controller(),
        g.digests.clone(),
        1,
        CustodyConfig::default(),
        ControllableClock::new(0),
        Arc::new(ScriptedCallTarget::new()),
    )
    .unwrap();
    let bad = tampered(&module.snapshot(), |v| {
        v["state"]["coordinator"]["phase"] = serde_json::json!({ "phase": "in_recovery", "round": 0 });
    });
    assert_matches!(
        restore(bad),
        Err(CustodyError::ConstructionInvariantViolated { .. })
    );
}

#[test]
fn restore_checks_against_supplied_config() {
    let (module, _) = busy_module();
    let err = CustodyModule::restore(
        module.snapshot(),
        CustodyConfig {
            max_voters: 1,
            ..CustodyConfig::default()
        },
        ControllableClock::new(500),
        Arc::new(ScriptedCallTarget::new()),
    )
    .unwrap_err();
    assert_matches!(err, CustodyError::ConstructionInvariantViolated { .. });
}

#[test]
fn unknown_snapshot_version_rejected() {
    let (module, _) = busy_module();
    let mut value = serde_json::to_value(module.snapshot()).unwrap();
    value["version"] = 99.into();
    assert_matches!(
        CustodySnapshot::from_json(&value.to_string()),
        Err(CustodyError::Serialization { .. })
    );
}
