//! Replay script format
//!
//! Parties are named by labels; each label maps to the account derived from
//! it, and guardian digests are taken over those accounts.
//!
//! ```json
//! {
//!   "deployer": "controller",
//!   "guardians": ["g1", "g2", "g3"],
//!   "threshold": 2,
//!   "start_time": 1700000000,
//!   "steps": [
//!     { "op": "initiate_recovery", "caller": "g1", "proposed_controller": "x" },
//!     { "op": "advance_time", "secs": 60 }
//!   ]
//! }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use warden_core::{AccountId, GuardianDigest};

/// A full replay script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Script {
    pub deployer: String,
    pub guardians: Vec<String>,
    pub threshold: usize,
    #[serde(default)]
    pub start_time: u64,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Script {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read script {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid script {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// One operation in a script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case", deny_unknown_fields)]
pub enum Step {
    InitiateRecovery {
        caller: String,
        proposed_controller: String,
    },
    SupportRecovery {
        caller: String,
        proposed_controller: String,
    },
    CancelRecovery {
        caller: String,
    },
    ExecuteRecovery {
        caller: String,
        new_controller: String,
        voters: Vec<String>,
    },
    QueueRemoval {
        caller: String,
        guardian: String,
    },
    ExecuteRemoval {
        caller: String,
        guardian: String,
        replacement: String,
    },
    CancelRemoval {
        caller: String,
        guardian: String,
    },
    TransferGuardianship {
        caller: String,
        new_label: String,
    },
    RevealIdentity {
        caller: String,
    },
    ExecuteExternalTx {
        caller: String,
        target: String,
        #[serde(default)]
        value: u64,
        #[serde(default)]
        payload: String,
    },
    AdvanceTime {
        secs: u64,
    },
}

impl Step {
    /// Operation name as written in the script.
    pub fn name(&self) -> &'static str {
        match self {
            Step::InitiateRecovery { .. } => "initiate_recovery",
            Step::SupportRecovery { .. } => "support_recovery",
            Step::CancelRecovery { .. } => "cancel_recovery",
            Step::ExecuteRecovery { .. } => "execute_recovery",
            Step::QueueRemoval { .. } => "queue_removal",
            Step::ExecuteRemoval { .. } => "execute_removal",
            Step::CancelRemoval { .. } => "cancel_removal",
            Step::TransferGuardianship { .. } => "transfer_guardianship",
            Step::RevealIdentity { .. } => "reveal_identity",
            Step::ExecuteExternalTx { .. } => "execute_external_tx",
            Step::AdvanceTime { .. } => "advance_time",
        }
    }
}

/// Account named by `label`.
pub fn account(label: &str) -> AccountId {
    AccountId::from_label(label)
}

/// Guardian digest of the account named by `label`.
pub fn digest(label: &str) -> GuardianDigest {
    GuardianDigest::of(&account(label))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::Write;

    #[test]
    fn test_parse_tagged_steps() {
        let script = Script::parse(
            r#"{
                "deployer": "owner",
                "guardians": ["g1", "g2"],
                "threshold": 1,
                "steps": [
                    { "op": "execute_recovery", "caller": "g1", "new_controller": "x", "voters": ["g1"] },
                    { "op": "execute_external_tx", "caller": "x", "target": "token" },
                    { "op": "advance_time", "secs": 5 }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(script.start_time, 0);
        assert_eq!(script.steps.len(), 3);
        assert_matches!(&script.steps[1], Step::ExecuteExternalTx { value: 0, payload, .. } if payload.is_empty());
        assert_eq!(script.steps[2].name(), "advance_time");
    }

    #[test]
    fn test_unknown_op_rejected() {
        let err = Script::parse(
            r#"{ "deployer": "o", "guardians": ["g1"], "threshold": 1,
                 "steps": [ { "op": "self_destruct", "caller": "o" } ] }"#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "deployer": "o", "guardians": ["g1"], "threshold": 1 }}"#).unwrap();
        let script = Script::load(file.path()).unwrap();
        assert!(script.steps.is_empty());
        assert_eq!(digest("g1"), GuardianDigest::of(&account("g1")));
    }
}
