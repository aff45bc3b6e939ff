//! Deterministic timer provider.
//!
//! Nothing fires on its own: the owner decides when a timer expires by
//! calling [`ManualTimers::fire`]. Useful in tests and simulations where wall
//! clock time must not influence the outcome.

use super::{TimerHandle, TimerProvider, TimerTarget};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Default)]
struct Ledger {
    next: u64,
    armed: BTreeMap<u64, (TimerTarget, Duration)>,
    cancelled: Vec<TimerHandle>,
    refuse: bool,
}

#[derive(Default)]
pub struct ManualTimers {
    ledger: Mutex<Ledger>,
}

impl ManualTimers {
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider that refuses every start request.
    pub fn refusing() -> Self {
        let timers = Self::default();
        timers.ledger.lock().refuse = true;
        timers
    }

    /// Handles of armed timers, oldest first.
    pub fn armed(&self) -> Vec<TimerHandle> {
        self.ledger.lock().armed.keys().map(|&s| TimerHandle(s)).collect()
    }

    pub fn period(&self, handle: TimerHandle) -> Option<Duration> {
        self.ledger.lock().armed.get(&handle.0).map(|(_, period)| *period)
    }

    pub fn cancelled(&self) -> Vec<TimerHandle> {
        self.ledger.lock().cancelled.clone()
    }

    /// Posts the expiry of an armed timer into its target mailbox.
    /// The timer stays armed.
    pub fn fire(&self, handle: TimerHandle) -> bool {
        let ledger = self.ledger.lock();
        let Some((target, period)) = ledger.armed.get(&handle.0) else {
            return false;
        };
        match target.context.post(target.expiry(handle, *period)) {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!(sequence = handle.0, %error, "manual timer expiry dropped");
                false
            }
        }
    }
}

impl TimerProvider for ManualTimers {
    fn start(&self, target: TimerTarget, period: Duration) -> Option<TimerHandle> {
        let mut ledger = self.ledger.lock();
        if ledger.refuse {
            return None;
        }
        ledger.next += 1;
        let sequence = ledger.next;
        ledger.armed.insert(sequence, (target, period));
        Some(TimerHandle(sequence))
    }

    fn cancel(&self, handle: TimerHandle) -> bool {
        let mut ledger = self.ledger.lock();
        let removed = ledger.armed.remove(&handle.0).is_some();
        if removed {
            ledger.cancelled.push(handle);
        }
        removed
    }
}
