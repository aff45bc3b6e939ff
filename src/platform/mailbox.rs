//! Per-thread external event mailbox.
//!
//! Every execution context owns one mailbox. Other threads, timers and
//! interrupt-like producers post into it; the owning run loop blocks on it.

use super::PostError;
use crate::core::{Event, EventId};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

struct Mailbox {
    id: Uuid,
    capacity: usize,
    queue: Mutex<VecDeque<Event>>,
    ready: Condvar,
}

/// Shareable handle to an execution context's mailbox.
///
/// # Example
///
/// ```rust
/// use statewright::core::{Event, EventId};
/// use statewright::platform::ContextHandle;
///
/// let inbox = ContextHandle::new(4);
/// inbox.post(Event::int(EventId::new(1), 0, 0)).unwrap();
/// assert_eq!(inbox.len(), 1);
/// assert_eq!(inbox.try_recv().map(|e| e.id()), Some(EventId::new(1)));
/// ```
#[derive(Clone)]
pub struct ContextHandle {
    inner: Arc<Mailbox>,
}

impl ContextHandle {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mailbox {
                id: Uuid::new_v4(),
                capacity,
                queue: Mutex::new(VecDeque::with_capacity(capacity)),
                ready: Condvar::new(),
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Queues an event.
    ///
    /// A `TIMER` event whose sequence number is already waiting is dropped,
    /// so a slow consumer never accumulates expiries of the same timer.
    /// `EXIT_LOOP` is accepted even when the mailbox is full.
    pub fn post(&self, event: Event) -> Result<(), PostError> {
        if !event.id().is_valid() {
            return Err(PostError::InvalidEvent);
        }

        let mut queue = self.inner.queue.lock();
        if event.id() == EventId::TIMER
            && queue
                .iter()
                .any(|queued| queued.id() == EventId::TIMER && queued.sequence() == event.sequence())
        {
            tracing::trace!(sequence = event.sequence(), "timer expiry already queued");
            return Ok(());
        }
        if queue.len() >= self.inner.capacity && event.id() != EventId::EXIT_LOOP {
            return Err(PostError::Full {
                capacity: self.inner.capacity,
            });
        }
        queue.push_back(event);
        drop(queue);
        self.inner.ready.notify_one();
        Ok(())
    }

    /// Asks the owning run loop to return.
    pub fn exit_loop(&self) -> Result<(), PostError> {
        self.post(Event::int(EventId::EXIT_LOOP, 0, 0))
    }

    /// Blocks until an event is available.
    pub fn recv(&self) -> Event {
        let mut queue = self.inner.queue.lock();
        loop {
            if let Some(event) = queue.pop_front() {
                return event;
            }
            self.inner.ready.wait(&mut queue);
        }
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<Event> {
        let deadline = Instant::now() + timeout;
        let mut queue = self.inner.queue.lock();
        loop {
            if let Some(event) = queue.pop_front() {
                return Some(event);
            }
            if self.inner.ready.wait_until(&mut queue, deadline).timed_out() {
                return queue.pop_front();
            }
        }
    }

    pub fn try_recv(&self) -> Option<Event> {
        self.inner.queue.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.inner.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PartialEq for ContextHandle {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for ContextHandle {}

impl fmt::Debug for ContextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextHandle")
            .field("id", &self.inner.id)
            .field("capacity", &self.inner.capacity)
            .finish()
    }
}
