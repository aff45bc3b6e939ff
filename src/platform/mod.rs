//! Collaborators the engine is parameterised by.
//!
//! The engine never blocks, sleeps or talks to other threads by itself. It
//! asks an [`EventSource`] for the next external event, hands cross-thread
//! posts to an [`EventPoster`], arms state timeouts through a
//! [`TimerProvider`] and lets an optional [`EventFilter`] veto deliveries.
//! [`Platform`] bundles one of each; the defaults are mailbox based.

mod mailbox;
mod manual;
mod timer;

pub use mailbox::ContextHandle;
pub use manual::ManualTimers;
pub use timer::TimerService;

use crate::core::{Event, EventId, Origin};
use crate::engine::{AppId, Application};
use serde::{Deserialize, Serialize};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors posting into a mailbox.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PostError {
    #[error("mailbox full ({capacity} events)")]
    Full { capacity: usize },
    #[error("event id is not valid")]
    InvalidEvent,
}

/// Result of asking a source for the next external event.
#[derive(Debug)]
pub enum Incoming {
    Event(Event),
    /// The run loop should return.
    Exit,
    /// Nothing available right now (non-blocking polls only).
    Empty,
}

/// Supplies external events to a run loop.
pub trait EventSource: Send + Sync {
    /// Blocks until an event for `inbox` arrives.
    fn wait(&self, inbox: &ContextHandle) -> Incoming;

    /// Returns immediately.
    fn poll(&self, inbox: &ContextHandle) -> Incoming;

    /// Called once an external event has been dispatched.
    fn release(&self, _event: Event) {}
}

/// Delivers events to other execution contexts.
pub trait EventPoster: Send + Sync {
    fn post(&self, target: &ContextHandle, event: Event) -> Result<(), PostError>;
}

/// Default source and poster: the per-context mailboxes.
#[derive(Clone, Copy, Debug, Default)]
pub struct MailboxTransport;

impl MailboxTransport {
    fn incoming(event: Option<Event>) -> Incoming {
        match event {
            None => Incoming::Empty,
            Some(event) if event.id() == EventId::EXIT_LOOP => Incoming::Exit,
            Some(event) => Incoming::Event(event.with_origin(Origin::External)),
        }
    }
}

impl EventSource for MailboxTransport {
    fn wait(&self, inbox: &ContextHandle) -> Incoming {
        Self::incoming(Some(inbox.recv()))
    }

    fn poll(&self, inbox: &ContextHandle) -> Incoming {
        Self::incoming(inbox.try_recv())
    }
}

impl EventPoster for MailboxTransport {
    fn post(&self, target: &ContextHandle, event: Event) -> Result<(), PostError> {
        target.post(event)
    }
}

/// Identifies an armed timer. Never zero; doubles as the sequence number of
/// the expiry events it produces.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub struct TimerHandle(pub(crate) u64);

impl TimerHandle {
    pub fn sequence(self) -> u64 {
        self.0
    }
}

/// Which event a timer produces.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum TimerKind {
    /// Built-in state timeout: `STATE_TIMER`.
    State,
    /// Timer started by a handler: `TIMER`.
    Event,
}

/// Where a timer's expiries go.
#[derive(Clone, Debug)]
pub struct TimerTarget {
    pub context: ContextHandle,
    pub app: AppId,
    pub kind: TimerKind,
}

impl TimerTarget {
    /// Expiry event addressed to the target application. Parameters carry the
    /// sequence number and the period in milliseconds.
    pub fn expiry(&self, handle: TimerHandle, period: Duration) -> Event {
        let id = match self.kind {
            TimerKind::State => EventId::STATE_TIMER,
            TimerKind::Event => EventId::TIMER,
        };
        let millis = u32::try_from(period.as_millis()).unwrap_or(u32::MAX);
        Event::int(id, handle.0 as u32, millis)
            .with_sequence(handle.0)
            .to_app(self.app)
    }
}

/// Arms and cancels timers.
pub trait TimerProvider: Send + Sync {
    /// Arms a periodic timer. `None` if the timer could not be started.
    fn start(&self, target: TimerTarget, period: Duration) -> Option<TimerHandle>;

    fn cancel(&self, handle: TimerHandle) -> bool;
}

/// Vetoes the delivery of an event to an application.
pub trait EventFilter: Send + Sync {
    fn allows(&self, app: &Application, event: &Event) -> bool;
}

impl<F> EventFilter for F
where
    F: Fn(&Application, &Event) -> bool + Send + Sync,
{
    fn allows(&self, app: &Application, event: &Event) -> bool {
        self(app, event)
    }
}

/// The collaborators an engine runs with. Cheap to clone and shared with
/// the threads of separate-thread regions.
#[derive(Clone)]
pub struct Platform {
    pub(crate) source: Arc<dyn EventSource>,
    pub(crate) poster: Arc<dyn EventPoster>,
    pub(crate) timers: Arc<dyn TimerProvider>,
    pub(crate) filter: Option<Arc<dyn EventFilter>>,
}

impl Platform {
    /// Mailbox transport with the given timer provider.
    pub fn new(timers: Arc<dyn TimerProvider>) -> Self {
        Self {
            source: Arc::new(MailboxTransport),
            poster: Arc::new(MailboxTransport),
            timers,
            filter: None,
        }
    }

    /// Mailbox transport with a background [`TimerService`].
    pub fn standard() -> io::Result<Self> {
        Ok(Self::new(Arc::new(TimerService::start()?)))
    }

    pub fn with_source(mut self, source: Arc<dyn EventSource>) -> Self {
        self.source = source;
        self
    }

    pub fn with_poster(mut self, poster: Arc<dyn EventPoster>) -> Self {
        self.poster = poster;
        self
    }

    pub fn with_filter(mut self, filter: Arc<dyn EventFilter>) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn timers(&self) -> &Arc<dyn TimerProvider> {
        &self.timers
    }
}
