//! # Warden Custody - Feature Layer
//!
//! A custody module in which a single controller authorizes arbitrary
//! outgoing calls while a private committee of guardians can replace the
//! controller if its credential is lost.
//!
//! ## Components
//!
//! - **GuardianRegistry**: guardian digests and the time-delayed removal workflow
//! - **AccessGate**: controller, guardian and recovery-mode predicates
//! - **RecoveryCoordinator**: round-based proposal/quorum state machine
//! - **ControlSurface**: reentrancy-guarded call forwarding
//! - **CustodyModule**: composes the above and applies each operation atomically
//!
//! ## Design Principles
//!
//! - Guardian identities are stored only as digests; a raw guardian account
//!   appears once it votes or reveals itself
//! - Every operation either commits fully, with exactly one journaled fact,
//!   or is rejected with no visible effect
//! - Recovery mode is one explicit value (`RecoveryPhase`) with a single
//!   transition table
//! - Quorum is k-of-n over the voter list; duplicates are caught by
//!   marking each counted proposal consumed before reading the next

#![forbid(unsafe_code)]

/// Reentrancy-guarded call forwarding
pub mod control;

/// Round-based recovery proposals and quorum counting
pub mod coordinator;

/// Append-only custody facts
pub mod facts;

/// Role and mode predicates
pub mod gate;

/// Composed custody module
pub mod module;

/// Guardian digests and removal scheduling
pub mod registry;

/// Serializable module snapshots
pub mod snapshot;

/// Recovery phase transition table
pub mod state;

pub use warden_core::{CustodyError, ErrorKind, Result};

pub use control::{ControlSurface, ExecutionGuard};
pub use coordinator::{Proposal, RecoveryCoordinator};
pub use facts::{CustodyFact, FactJournal, FactRecord, CUSTODY_FACT_TYPE_ID};
pub use gate::AccessGate;
pub use module::{CustodyModule, CustodyState};
pub use registry::GuardianRegistry;
pub use snapshot::{CustodySnapshot, SNAPSHOT_VERSION};
pub use state::{PhaseEvent, RecoveryPhase, RequiredMode};
