//! Controllable clock for deterministic testing

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use warden_core::PhysicalClockEffects;

/// Clock whose reading only changes when a test moves it.
///
/// Clones share the same reading, so a test can keep one handle while the
/// module under test owns another.
#[derive(Debug, Clone, Default)]
pub struct ControllableClock {
    current: Arc<AtomicU64>,
}

impl ControllableClock {
    /// Start at `initial_secs`.
    pub fn new(initial_secs: u64) -> Self {
        Self {
            current: Arc::new(AtomicU64::new(initial_secs)),
        }
    }

    /// Move forward by `secs`.
    pub fn advance(&self, secs: u64) {
        self.current.fetch_add(secs, Ordering::SeqCst);
    }

    /// Jump to `secs`. Panics if that would move the clock backwards.
    pub fn set(&self, secs: u64) {
        let previous = self.current.swap(secs, Ordering::SeqCst);
        assert!(
            secs >= previous,
            "clock must not go backwards ({previous} -> {secs})"
        );
    }

    /// Current reading.
    pub fn now(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }
}

impl PhysicalClockEffects for ControllableClock {
    fn now_secs(&self) -> u64 {
        self.now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_reading() {
        let clock = ControllableClock::new(100);
        let handle = clock.clone();
        handle.advance(50);
        assert_eq!(clock.now_secs(), 150);
        clock.set(200);
        assert_eq!(handle.now(), 200);
    }

    #[test]
    #[should_panic(expected = "backwards")]
    fn test_set_rejects_going_backwards() {
        let clock = ControllableClock::new(100);
        clock.set(99);
    }
}
