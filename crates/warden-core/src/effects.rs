//! Effect interfaces for the custody module's external collaborators.
//!
//! # Effect Classification
//!
//! - `PhysicalClockEffects`: the ambient, monotonically non-decreasing clock
//!   read when a guardian removal is executed
//! - `CallEffects`: the arbitrary-target call primitive behind
//!   `executeExternalTx`
//!
//! Both are synchronous. Custody operations are applied serially and must
//! complete or abort within one step, so nothing here may suspend.
//! Controllable and mock implementations live in `warden-testkit`.

use crate::identifiers::AccountId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Wall-clock time in whole seconds since the Unix epoch.
pub trait PhysicalClockEffects: Send + Sync {
    /// Current time. Must never decrease between calls.
    fn now_secs(&self) -> u64;
}

/// Outcome reported by the call primitive.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CallOutcome {
    /// Whether the target accepted the call
    pub success: bool,
    /// Raw response (or failure data) from the target
    pub return_data: Vec<u8>,
}

impl CallOutcome {
    /// Successful outcome carrying `return_data`.
    pub fn success(return_data: impl Into<Vec<u8>>) -> Self {
        Self {
            success: true,
            return_data: return_data.into(),
        }
    }

    /// Failed outcome carrying `return_data` as the failure payload.
    pub fn failure(return_data: impl Into<Vec<u8>>) -> Self {
        Self {
            success: false,
            return_data: return_data.into(),
        }
    }
}

/// Arbitrary-target call primitive: `(target, value, payload) -> (success, returnData)`.
pub trait CallEffects: Send + Sync {
    /// Forward `value` and `payload` to `target`.
    fn call(&self, target: &AccountId, value: u128, payload: &[u8]) -> CallOutcome;
}

/// Production clock backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Create a new system clock
    pub fn new() -> Self {
        Self
    }
}

impl PhysicalClockEffects for SystemClock {
    fn now_secs(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_secs()
    }
}

impl<T: PhysicalClockEffects + ?Sized> PhysicalClockEffects for Arc<T> {
    fn now_secs(&self) -> u64 {
        (**self).now_secs()
    }
}

impl<T: CallEffects + ?Sized> CallEffects for Arc<T> {
    fn call(&self, target: &AccountId, value: u128, payload: &[u8]) -> CallOutcome {
        (**self).call(target, value, payload)
    }
}
