//! Recovery phase and its transition table
//!
//! The whole recovery mode lives in one value so that every transition can be
//! read off [`RecoveryPhase::apply`] and tested without any storage.
//!
//! ```text
//!                    Initiate (round += 1)
//!   Normal{last} ─────────────────────────────▶ InRecovery{last + 1}
//!        ▲                                            │
//!        └──────────── Cancel | Execute ──────────────┘
//! ```
//!
//! Every other (phase, event) pair is rejected with `InvalidMode`.

use serde::{Deserialize, Serialize};
use std::fmt;
use warden_core::{CustodyError, Result};

/// Recovery mode of a custody module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum RecoveryPhase {
    /// Controller in charge
    Normal {
        /// Most recent recovery round (0 if none)
        last_round: u64,
    },
    /// A recovery round is collecting proposals
    InRecovery {
        /// Round opened by the initiating guardian
        round: u64,
    },
}

/// Phase-changing events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseEvent {
    /// A guardian opens a new recovery round
    Initiate,
    /// The recovery is abandoned
    Cancel,
    /// The recovery reached quorum and replaced the controller
    Execute,
}

/// Phase an operation requires before it may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredMode {
    /// Operation requires `Normal`
    Normal,
    /// Operation requires `InRecovery`
    InRecovery,
}

impl Default for RecoveryPhase {
    fn default() -> Self {
        Self::Normal { last_round: 0 }
    }
}

impl RecoveryPhase {
    /// Current round while in recovery, otherwise the most recent one.
    pub fn round(&self) -> u64 {
        match *self {
            Self::Normal { last_round } => last_round,
            Self::InRecovery { round } => round,
        }
    }

    /// Whether a recovery is in progress.
    pub fn in_recovery(&self) -> bool {
        matches!(self, Self::InRecovery { .. })
    }

    /// Whether this phase satisfies `mode`.
    pub fn satisfies(&self, mode: RequiredMode) -> bool {
        match mode {
            RequiredMode::Normal => !self.in_recovery(),
            RequiredMode::InRecovery => self.in_recovery(),
        }
    }

    /// Transition table.
    pub fn apply(self, event: PhaseEvent) -> Result<Self> {
        match (self, event) {
            (Self::Normal { last_round }, PhaseEvent::Initiate) => {
                let round = last_round.checked_add(1).ok_or_else(|| {
                    CustodyError::invalid_mode("recovery round counter exhausted")
                })?;
                Ok(Self::InRecovery { round })
            }
            (Self::InRecovery { round }, PhaseEvent::Cancel | PhaseEvent::Execute) => {
                Ok(Self::Normal { last_round: round })
            }
            (phase, event) => Err(CustodyError::invalid_mode(format!(
                "cannot {event} while {phase}"
            ))),
        }
    }
}

impl fmt::Display for RecoveryPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal { last_round } => write!(f, "normal (last round {last_round})"),
            Self::InRecovery { round } => write!(f, "in recovery (round {round})"),
        }
    }
}

impl fmt::Display for PhaseEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Initiate => "initiate recovery",
            Self::Cancel => "cancel recovery",
            Self::Execute => "execute recovery",
        })
    }
}

impl fmt::Display for RequiredMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Normal => "normal",
            Self::InRecovery => "in recovery",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_initiate_increments_round() {
        let phase = RecoveryPhase::default().apply(PhaseEvent::Initiate).unwrap();
        assert_eq!(phase, RecoveryPhase::InRecovery { round: 1 });

        let phase = RecoveryPhase::Normal { last_round: 7 }
            .apply(PhaseEvent::Initiate)
            .unwrap();
        assert_eq!(phase.round(), 8);
    }

    #[test]
    fn test_cancel_and_execute_keep_round() {
        let active = RecoveryPhase::InRecovery { round: 3 };
        for event in [PhaseEvent::Cancel, PhaseEvent::Execute] {
            let next = active.apply(event).unwrap();
            assert_eq!(next, RecoveryPhase::Normal { last_round: 3 });
        }
    }

    #[test]
    fn test_invalid_transitions_rejected() {
        let normal = RecoveryPhase::default();
        assert_matches!(
            normal.apply(PhaseEvent::Cancel),
            Err(CustodyError::InvalidMode { .. })
        );
        assert_matches!(
            normal.apply(PhaseEvent::Execute),
            Err(CustodyError::InvalidMode { .. })
        );
        assert_matches!(
            RecoveryPhase::InRecovery { round: 1 }.apply(PhaseEvent::Initiate),
            Err(CustodyError::InvalidMode { .. })
        );
    }

    #[test]
    fn test_round_overflow_rejected() {
        let phase = RecoveryPhase::Normal {
            last_round: u64::MAX,
        };
        assert!(phase.apply(PhaseEvent::Initiate).is_err());
    }

    #[test]
    fn test_mode_predicate() {
        assert!(RecoveryPhase::default().satisfies(RequiredMode::Normal));
        assert!(!RecoveryPhase::default().satisfies(RequiredMode::InRecovery));
        assert!(RecoveryPhase::InRecovery { round: 1 }.satisfies(RequiredMode::InRecovery));
    }
}
