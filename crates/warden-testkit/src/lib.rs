//! # Warden Testkit
//!
//! Test utilities for the custody crates.
//!
//! - [`ControllableClock`]: a clock tests advance explicitly
//! - [`ScriptedCallTarget`]: a call primitive that records every forwarded
//!   call and answers from a script or a hook (used to simulate reentry)
//! - [`fixtures`]: labelled accounts and guardian digest sets
//! - [`strategies`]: proptest strategies over accounts and guardian sets
//!
//! This crate depends only on `warden-core` so any custody crate can take it
//! as a dev-dependency.

#![forbid(unsafe_code)]

pub mod calls;
pub mod fixtures;
pub mod strategies;
pub mod time;

pub use calls::{CallHook, RecordedCall, ScriptedCallTarget};
pub use fixtures::{account, controller, digests, guardians, GuardianFixture};
pub use time::ControllableClock;
