//! Control surface
//!
//! Forwards controller-authorized calls to arbitrary targets through the
//! [`CallEffects`] primitive. The forwarded call may call back into the
//! custody module, so forwarding holds an in-progress marker for its whole
//! duration; a nested forward while the marker is held fails with
//! `ReentrantCall`. The marker is released by [`ExecutionGuard`]'s `Drop`, so
//! every exit path clears it.

use std::sync::atomic::{AtomicBool, Ordering};
use warden_core::{AccountId, CallEffects, CustodyError, Result};

/// Scoped hold on the control surface's in-progress marker.
#[derive(Debug)]
pub struct ExecutionGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> ExecutionGuard<'a> {
    /// Acquire `flag`, failing if it is already held.
    pub fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| CustodyError::ReentrantCall)?;
        Ok(Self { flag })
    }
}

impl Drop for ExecutionGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Reentrancy-guarded wrapper around the call primitive.
#[derive(Debug, Default)]
pub struct ControlSurface<E> {
    calls: E,
    in_progress: AtomicBool,
}

impl<E: CallEffects> ControlSurface<E> {
    /// Wrap a call primitive.
    pub fn new(calls: E) -> Self {
        Self {
            calls,
            in_progress: AtomicBool::new(false),
        }
    }

    /// Mark the surface busy for the lifetime of the returned guard.
    pub fn enter(&self) -> Result<ExecutionGuard<'_>> {
        ExecutionGuard::acquire(&self.in_progress)
    }

    /// Whether a forwarded call is currently executing.
    pub fn is_executing(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    /// Forward one call while `guard` is held. Returns the target's response.
    pub fn forward(
        &self,
        _guard: &ExecutionGuard<'_>,
        target: &AccountId,
        value: u128,
        payload: &[u8],
    ) -> Result<Vec<u8>> {
        let outcome = self.calls.call(target, value, payload);
        if !outcome.success {
            return Err(CustodyError::external_call_failed(format!(
                "call to {target} reverted{}",
                describe_failure(&outcome.return_data)
            )));
        }
        Ok(outcome.return_data)
    }

    /// The wrapped call primitive.
    pub fn calls(&self) -> &E {
        &self.calls
    }
}

fn describe_failure(data: &[u8]) -> String {
    if data.is_empty() {
        return String::new();
    }
    match std::str::from_utf8(data) {
        Ok(text) if text.chars().all(|c| !c.is_control()) => format!(": {text}"),
        _ => format!(": 0x{}", hex::encode(data)),
    }
}
