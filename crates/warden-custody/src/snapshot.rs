//! Serializable snapshots of a custody module.
//!
//! A snapshot carries the full persistent state and the fact journal so a
//! restored module keeps its sequence numbering. Snapshots are untrusted
//! input: [`CustodyModule::restore`](crate::CustodyModule::restore) re-checks
//! every construction invariant before accepting one.

use crate::facts::FactJournal;
use crate::module::CustodyState;
use serde::{Deserialize, Serialize};
use warden_core::{CustodyError, Result};

/// Snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Persistent state plus journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustodySnapshot {
    version: u32,
    state: CustodyState,
    journal: FactJournal,
}

impl CustodySnapshot {
    pub(crate) fn new(state: CustodyState, journal: FactJournal) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            state,
            journal,
        }
    }

    /// Captured state.
    pub fn state(&self) -> &CustodyState {
        &self.state
    }

    /// Captured journal.
    pub fn journal(&self) -> &FactJournal {
        &self.journal
    }

    /// Encode as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(CustodyError::from)
    }

    /// Decode from JSON, rejecting unknown versions.
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Self = serde_json::from_str(json)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(CustodyError::serialization(format!(
                "unsupported snapshot version {}, expected {SNAPSHOT_VERSION}",
                snapshot.version
            )));
        }
        Ok(snapshot)
    }

    pub(crate) fn into_parts(self) -> (CustodyState, FactJournal) {
        (self.state, self.journal)
    }
}
