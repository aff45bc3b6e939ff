//! Background timer service.
//!
//! One thread sleeps until the earliest deadline and posts an expiry event
//! into the target context's mailbox. Timers are periodic until cancelled.

use super::{TimerHandle, TimerProvider, TimerTarget};
use parking_lot::{Condvar, Mutex};
use std::collections::BTreeMap;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

struct Armed {
    target: TimerTarget,
    period: Duration,
    deadline: Instant,
}

#[derive(Default)]
struct Table {
    next: u64,
    timers: BTreeMap<u64, Armed>,
    shutdown: bool,
}

struct Shared {
    table: Mutex<Table>,
    wake: Condvar,
}

/// Default [`TimerProvider`] backed by a dedicated thread.
pub struct TimerService {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl TimerService {
    pub fn start() -> io::Result<Self> {
        let shared = Arc::new(Shared {
            table: Mutex::new(Table::default()),
            wake: Condvar::new(),
        });
        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("statewright-timer".to_string())
            .spawn(move || run(&worker_shared))?;
        Ok(Self {
            shared,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Number of armed timers.
    pub fn armed(&self) -> usize {
        self.shared.table.lock().timers.len()
    }
}

impl TimerProvider for TimerService {
    fn start(&self, target: TimerTarget, period: Duration) -> Option<TimerHandle> {
        if period.is_zero() {
            return None;
        }
        let mut table = self.shared.table.lock();
        if table.shutdown {
            return None;
        }
        table.next += 1;
        let sequence = table.next;
        table.timers.insert(
            sequence,
            Armed {
                target,
                period,
                deadline: Instant::now() + period,
            },
        );
        drop(table);
        self.shared.wake.notify_one();
        Some(TimerHandle(sequence))
    }

    fn cancel(&self, handle: TimerHandle) -> bool {
        self.shared.table.lock().timers.remove(&handle.0).is_some()
    }
}

impl Drop for TimerService {
    fn drop(&mut self) {
        self.shared.table.lock().shutdown = true;
        self.shared.wake.notify_all();
        if let Some(worker) = self.worker.lock().take() {
            if worker.join().is_err() {
                tracing::error!("timer thread panicked");
            }
        }
    }
}

fn run(shared: &Shared) {
    let mut table = shared.table.lock();
    loop {
        if table.shutdown {
            break;
        }

        let now = Instant::now();
        for (&sequence, armed) in table.timers.iter_mut() {
            if armed.deadline > now {
                continue;
            }
            armed.deadline = now + armed.period;
            let expiry = armed.target.expiry(TimerHandle(sequence), armed.period);
            if let Err(error) = armed.target.context.post(expiry) {
                tracing::warn!(sequence, %error, "dropping timer expiry");
            }
        }

        match table.timers.values().map(|armed| armed.deadline).min() {
            Some(deadline) => {
                shared.wake.wait_until(&mut table, deadline);
            }
            None => shared.wake.wait(&mut table),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::EventId;
    use crate::engine::AppId;
    use crate::platform::{ContextHandle, TimerKind};

    fn target(inbox: &ContextHandle, kind: TimerKind) -> TimerTarget {
        TimerTarget {
            context: inbox.clone(),
            app: AppId::default(),
            kind,
        }
    }

    #[test]
    fn state_timer_posts_expiry_with_handle_as_sequence() {
        let service = TimerService::start().unwrap();
        let inbox = ContextHandle::new(8);
        let handle = service
            .start(target(&inbox, TimerKind::State), Duration::from_millis(5))
            .unwrap();

        let expiry = inbox.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(expiry.id(), EventId::STATE_TIMER);
        assert_eq!(expiry.sequence(), handle.sequence());
        assert_eq!(expiry.dest(), Some(AppId::default()));
        assert!(service.cancel(handle));
    }

    #[test]
    fn regular_timer_posts_timer_events() {
        let service = TimerService::start().unwrap();
        let inbox = ContextHandle::new(8);
        let handle = service
            .start(target(&inbox, TimerKind::Event), Duration::from_millis(5))
            .unwrap();

        let expiry = inbox.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(expiry.id(), EventId::TIMER);
        assert_eq!(expiry.params(), Some((handle.sequence() as u32, 5)));
        service.cancel(handle);
    }

    #[test]
    fn cancelled_timer_stays_silent() {
        let service = TimerService::start().unwrap();
        let inbox = ContextHandle::new(8);
        let handle = service
            .start(target(&inbox, TimerKind::State), Duration::from_millis(50))
            .unwrap();
        assert!(service.cancel(handle));
        assert!(!service.cancel(handle));
        assert_eq!(service.armed(), 0);
        assert!(inbox.recv_timeout(Duration::from_millis(100)).is_none());
    }

    #[test]
    fn handles_are_unique_and_non_zero() {
        let service = TimerService::start().unwrap();
        let inbox = ContextHandle::new(8);
        let a = service
            .start(target(&inbox, TimerKind::State), Duration::from_secs(60))
            .unwrap();
        let b = service
            .start(target(&inbox, TimerKind::State), Duration::from_secs(60))
            .unwrap();
        assert_ne!(a, b);
        assert_ne!(a.sequence(), 0);
    }

    #[test]
    fn zero_period_is_refused() {
        let service = TimerService::start().unwrap();
        let inbox = ContextHandle::new(8);
        assert!(service
            .start(target(&inbox, TimerKind::State), Duration::ZERO)
            .is_none());
    }
}
