//! Scripted call targets
//!
//! Stand-ins for the arbitrary-call primitive. Every forwarded call is
//! recorded. Responses come from, in order of precedence: an installed hook,
//! a per-target scripted outcome, or a default echo of the payload.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use warden_core::{AccountId, CallEffects, CallOutcome};

/// Closure invoked for every forwarded call while installed.
pub type CallHook = Arc<dyn Fn(&AccountId, u128, &[u8]) -> CallOutcome + Send + Sync>;

/// One forwarded call as observed by the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// Call target
    pub target: AccountId,
    /// Value forwarded
    pub value: u128,
    /// Payload forwarded
    pub payload: Vec<u8>,
}

/// Recording, scriptable call primitive.
#[derive(Default)]
pub struct ScriptedCallTarget {
    calls: Mutex<Vec<RecordedCall>>,
    responses: Mutex<HashMap<AccountId, CallOutcome>>,
    hook: Mutex<Option<CallHook>>,
}

impl ScriptedCallTarget {
    /// Target that echoes every payload back as a success.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer calls to `target` with `outcome`.
    pub fn respond(&self, target: AccountId, outcome: CallOutcome) {
        self.responses.lock().insert(target, outcome);
    }

    /// Make every call to `target` fail with `reason`.
    pub fn fail(&self, target: AccountId, reason: &str) {
        self.respond(target, CallOutcome::failure(reason.as_bytes().to_vec()));
    }

    /// Route every call through `hook` until [`clear_hook`](Self::clear_hook).
    pub fn set_hook(&self, hook: CallHook) {
        *self.hook.lock() = Some(hook);
    }

    /// Remove the installed hook.
    pub fn clear_hook(&self) {
        *self.hook.lock() = None;
    }

    /// Calls observed so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Number of calls observed so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

impl CallEffects for ScriptedCallTarget {
    fn call(&self, target: &AccountId, value: u128, payload: &[u8]) -> CallOutcome {
        self.calls.lock().push(RecordedCall {
            target: *target,
            value,
            payload: payload.to_vec(),
        });

        // Release the hook lock before invoking it; the hook may call back in.
        let hook = self.hook.lock().clone();
        if let Some(hook) = hook {
            return hook(target, value, payload);
        }

        self.responses
            .lock()
            .get(target)
            .cloned()
            .unwrap_or_else(|| CallOutcome::success(payload))
    }
}

impl std::fmt::Debug for ScriptedCallTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedCallTarget")
            .field("calls", &self.call_count())
            .field("hooked", &self.hook.lock().is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_echo_and_recording() {
        let target = ScriptedCallTarget::new();
        let token = AccountId::from_label("token");
        let outcome = target.call(&token, 7, b"mint");
        assert_eq!(outcome, CallOutcome::success(b"mint".to_vec()));
        assert_eq!(
            target.calls(),
            vec![RecordedCall {
                target: token,
                value: 7,
                payload: b"mint".to_vec(),
            }]
        );
    }

    #[test]
    fn test_scripted_failure() {
        let target = ScriptedCallTarget::new();
        let token = AccountId::from_label("token");
        target.fail(token, "paused");
        assert!(!target.call(&token, 0, b"").success);
        assert!(target.call(&AccountId::from_label("other"), 0, b"").success);
    }

    #[test]
    fn test_hook_takes_precedence() {
        let target = ScriptedCallTarget::new();
        target.set_hook(Arc::new(|_: &AccountId, _: u128, _: &[u8]| {
            CallOutcome::success(b"hooked".to_vec())
        }));
        assert_eq!(target.call(&AccountId::ZERO, 0, b"x").return_data, b"hooked");
        target.clear_hook();
        assert_eq!(target.call(&AccountId::ZERO, 0, b"x").return_data, b"x");
        assert_eq!(target.call_count(), 2);
    }
}
