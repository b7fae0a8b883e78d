//! Script replay against an in-process custody module

use crate::script::{account, digest, Script, Step};
use anyhow::Result;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use warden_core::{
    AccountId, CallEffects, CallOutcome, CustodyConfig, ErrorKind, PhysicalClockEffects,
};
use warden_custody::{CustodyModule, FactRecord};

/// Clock the script advances with `advance_time` steps.
#[derive(Debug, Default)]
pub struct ScriptClock {
    now: AtomicU64,
}

impl ScriptClock {
    pub fn new(start: u64) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    /// Move forward by `secs`, saturating at `u64::MAX`. Returns the new reading.
    pub fn advance(&self, secs: u64) -> u64 {
        let previous = self
            .now
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |now| {
                Some(now.saturating_add(secs))
            })
            .unwrap_or_else(|now| now);
        previous.saturating_add(secs)
    }
}

impl PhysicalClockEffects for ScriptClock {
    fn now_secs(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Call target that accepts every call and echoes the payload.
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoTarget;

impl CallEffects for EchoTarget {
    fn call(&self, target: &AccountId, value: u128, payload: &[u8]) -> CallOutcome {
        tracing::debug!(target = %target, value, payload_len = payload.len(), "Echo target called");
        CallOutcome::success(payload)
    }
}

/// Result of one script step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub index: usize,
    pub op: &'static str,
    pub result: std::result::Result<String, (ErrorKind, String)>,
}

/// Everything a replay produced.
#[derive(Debug)]
pub struct ReplayReport {
    pub outcomes: Vec<StepOutcome>,
    pub facts: Vec<FactRecord>,
}

impl ReplayReport {
    /// Number of rejected steps.
    pub fn rejected(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_err()).count()
    }

    pub fn print(&self) -> Result<()> {
        for outcome in &self.outcomes {
            match &outcome.result {
                Ok(detail) => println!("[{}] {} ok {detail}", outcome.index, outcome.op),
                Err((kind, message)) => {
                    println!("[{}] {} rejected {kind:?}: {message}", outcome.index, outcome.op)
                }
            }
        }
        for record in &self.facts {
            println!("{}", record.to_json_line()?);
        }
        Ok(())
    }
}

/// Build a module from `script` and apply every step in order.
///
/// Construction failure is an error; rejected steps are reported and the
/// replay continues.
pub fn run(script: &Script, config: CustodyConfig) -> Result<ReplayReport> {
    let clock = Arc::new(ScriptClock::new(script.start_time));
    let module = CustodyModule::new(
        account(&script.deployer),
        script.guardians.iter().map(|label| digest(label)),
        script.threshold,
        config,
        Arc::clone(&clock),
        EchoTarget,
    )?;

    let mut outcomes = Vec::with_capacity(script.steps.len());
    for (index, step) in script.steps.iter().enumerate() {
        let result = apply(&module, &clock, step).map_err(|err| (err.kind(), err.to_string()));
        if let Err((kind, message)) = &result {
            tracing::info!(index, op = step.name(), ?kind, %message, "Step rejected");
        }
        outcomes.push(StepOutcome {
            index,
            op: step.name(),
            result,
        });
    }

    Ok(ReplayReport {
        outcomes,
        facts: module.facts(),
    })
}

fn apply(
    module: &CustodyModule<Arc<ScriptClock>, EchoTarget>,
    clock: &ScriptClock,
    step: &Step,
) -> warden_core::Result<String> {
    match step {
        Step::InitiateRecovery {
            caller,
            proposed_controller,
        } => module
            .initiate_recovery(&account(caller), &account(proposed_controller))
            .map(|round| format!("round={round}")),
        Step::SupportRecovery {
            caller,
            proposed_controller,
        } => module
            .support_recovery(&account(caller), &account(proposed_controller))
            .map(|round| format!("round={round}")),
        Step::CancelRecovery { caller } => module
            .cancel_recovery(&account(caller))
            .map(|round| format!("round={round}")),
        Step::ExecuteRecovery {
            caller,
            new_controller,
            voters,
        } => {
            let voters: Vec<AccountId> = voters.iter().map(|v| account(v)).collect();
            module
                .execute_recovery(&account(caller), &account(new_controller), &voters)
                .map(|round| format!("round={round} controller={}", module.controller()))
        }
        Step::QueueRemoval { caller, guardian } => module
            .queue_removal(&account(caller), &digest(guardian))
            .map(|ready_at| format!("ready_at={ready_at}")),
        Step::ExecuteRemoval {
            caller,
            guardian,
            replacement,
        } => module
            .execute_removal(&account(caller), &digest(guardian), &digest(replacement))
            .map(|()| format!("guardians={}", module.guardian_count())),
        Step::CancelRemoval { caller, guardian } => module
            .cancel_removal(&account(caller), &digest(guardian))
            .map(|was_queued| format!("was_queued={was_queued}")),
        Step::TransferGuardianship { caller, new_label } => module
            .transfer_guardianship(&account(caller), &digest(new_label))
            .map(|()| format!("digest={}", digest(new_label))),
        Step::RevealIdentity { caller } => module
            .reveal_identity(&account(caller))
            .map(|d| format!("digest={d}")),
        Step::ExecuteExternalTx {
            caller,
            target,
            value,
            payload,
        } => module
            .execute_external_tx(
                &account(caller),
                &account(target),
                u128::from(*value),
                payload.as_bytes(),
            )
            .map(|data| format!("return_len={}", data.len())),
        Step::AdvanceTime { secs } => Ok(format!("now={}", clock.advance(*secs))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::CancelPolicy;
    use warden_custody::CustodyFact;

    fn script(steps: &str) -> Script {
        Script::parse(&format!(
            r#"{{ "deployer": "owner", "guardians": ["g1", "g2", "g3"], "threshold": 2,
                  "start_time": 100, "steps": [{steps}] }}"#
        ))
        .unwrap()
    }

    #[test]
    fn test_recovery_script_replays() {
        let report = run(
            &script(
                r#"{ "op": "initiate_recovery", "caller": "g1", "proposed_controller": "x" },
                   { "op": "support_recovery", "caller": "g2", "proposed_controller": "x" },
                   { "op": "execute_recovery", "caller": "g1", "new_controller": "x", "voters": ["g1", "g2"] },
                   { "op": "execute_external_tx", "caller": "x", "target": "token", "payload": "hi" }"#,
            ),
            CustodyConfig::default(),
        )
        .unwrap();

        assert_eq!(report.rejected(), 0);
        assert_eq!(report.facts.len(), 5);
        assert_eq!(report.outcomes[3].result, Ok("return_len=2".to_string()));
        assert!(matches!(
            report.facts[3].fact,
            CustodyFact::RecoveryExecuted { round: 1, .. }
        ));
    }

    #[test]
    fn test_rejected_steps_are_reported_and_replay_continues() {
        let report = run(
            &script(
                r#"{ "op": "queue_removal", "caller": "owner", "guardian": "g3" },
                   { "op": "execute_removal", "caller": "owner", "guardian": "g3", "replacement": "g4" },
                   { "op": "advance_time", "secs": 259200 },
                   { "op": "execute_removal", "caller": "owner", "guardian": "g3", "replacement": "g4" }"#,
            ),
            CustodyConfig::default(),
        )
        .unwrap();

        assert_eq!(report.rejected(), 1);
        assert!(matches!(
            report.outcomes[1].result,
            Err((ErrorKind::DelayNotElapsed, _))
        ));
        assert_eq!(report.outcomes[2].result, Ok("now=259300".to_string()));
        assert_eq!(report.outcomes[3].result, Ok("guardians=3".to_string()));
    }

    #[test]
    fn test_cancel_policy_from_config() {
        let steps = r#"{ "op": "initiate_recovery", "caller": "g1", "proposed_controller": "x" },
                       { "op": "cancel_recovery", "caller": "g2" }"#;

        let report = run(&script(steps), CustodyConfig::default()).unwrap();
        assert_eq!(report.rejected(), 1);

        let config = CustodyConfig {
            cancel_policy: CancelPolicy::Guardian,
            ..CustodyConfig::default()
        };
        let report = run(&script(steps), config).unwrap();
        assert_eq!(report.rejected(), 0);
    }

    #[test]
    fn test_script_clock_never_moves_backwards() {
        let clock = ScriptClock::new(u64::MAX - 10);
        assert_eq!(clock.advance(5), u64::MAX - 5);
        assert_eq!(clock.advance(u64::MAX), u64::MAX);
        assert_eq!(clock.now_secs(), u64::MAX);
        assert_eq!(clock.advance(1), u64::MAX);
    }

    #[test]
    fn test_huge_advance_keeps_removal_delay_elapsed() {
        let report = run(
            &script(
                r#"{ "op": "queue_removal", "caller": "owner", "guardian": "g3" },
                   { "op": "advance_time", "secs": 18446744073709551615 },
                   { "op": "execute_removal", "caller": "owner", "guardian": "g3", "replacement": "g4" }"#,
            ),
            CustodyConfig::default(),
        )
        .unwrap();

        assert_eq!(report.rejected(), 0);
        assert_eq!(report.outcomes[1].result, Ok(format!("now={}", u64::MAX)));
    }

    #[test]
    fn test_invalid_construction_fails_replay() {
        let bad = Script::parse(r#"{ "deployer": "o", "guardians": ["g1", "g1"], "threshold": 1 }"#)
            .unwrap();
        assert!(run(&bad, CustodyConfig::default()).is_err());
    }
}
