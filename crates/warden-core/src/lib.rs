//! # Warden Core - Foundation Layer
//!
//! Foundational types and effect interfaces shared by the custody crates.
//!
//! ## What Belongs Here
//!
//! - Account and guardian identifiers (`AccountId`, `GuardianDigest`, `Hash32`)
//! - The unified error type (`CustodyError`) and its `ErrorKind` classification
//! - The pure hash trait used for guardian identity digests
//! - Effect interfaces for the external collaborators: the ambient clock and
//!   the arbitrary-call primitive
//! - Layered configuration (`CustodyConfig`)
//!
//! ## What Does NOT Belong Here
//!
//! - Registry, recovery or control-surface state machines (warden-custody)
//! - Controllable clocks and mock call targets (warden-testkit)

#![forbid(unsafe_code)]

/// Layered configuration for custody modules
pub mod config;

/// Effect interfaces for external collaborators
pub mod effects;

/// Unified error handling
pub mod errors;

/// Pure synchronous hash trait for identity digests
pub mod hash;

/// Account and guardian identifiers
pub mod identifiers;

pub use config::{CancelPolicy, ConfigValidation, CustodyConfig, GUARDIAN_REMOVAL_DELAY_SECS};
pub use effects::{CallEffects, CallOutcome, PhysicalClockEffects, SystemClock};
pub use errors::{CustodyError, ErrorKind, Result};
pub use identifiers::{AccountId, GuardianDigest, Hash32, ACCOUNT_ID_LEN};
