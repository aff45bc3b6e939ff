//! Per-thread execution context.

use super::app::{AppId, Application};
use crate::config::EngineConfig;
use crate::core::{Event, EventId, Origin, StateGraph, StateId, TraceLog, TraceReason, TraceRecord};
use crate::platform::{ContextHandle, Platform, PostError};
use chrono::Utc;
use slotmap::SlotMap;
use std::any::Any;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

/// Called when an event is about to be dispatched.
pub type ArrivalHook = Box<dyn FnMut(Origin, &Event) + Send>;

/// Called after an application handled an event.
pub type HandledHook = Box<dyn FnMut(Origin, &Event, &Application) + Send>;

#[derive(Default)]
pub(crate) struct Hooks {
    pub(crate) arrival: Option<ArrivalHook>,
    pub(crate) handled: Option<HandledHook>,
}

/// A thread's execution context.
///
/// An engine owns the applications created on its thread, the stack of
/// active ones, the focused application, the internal event queue and the
/// thread's mailbox. It is driven from a single thread; other threads reach
/// it only through its [`ContextHandle`].
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use statewright::builder::{simple_transition, GraphBuilder};
/// use statewright::core::{Event, EventId};
/// use statewright::platform::{ManualTimers, Platform};
/// use statewright::{Engine, EngineConfig};
///
/// const POWER: EventId = EventId::new(1);
///
/// let mut builder = GraphBuilder::new();
/// let root = builder.root("Player");
/// let off = builder.leaf("Off", root);
/// let on = builder.leaf("On", root);
/// builder
///     .initial(root, off)
///     .transition(off, simple_transition(POWER, on))
///     .transition(on, simple_transition(POWER, off));
/// let graph = Arc::new(builder.build().unwrap());
///
/// let mut engine = Engine::new(EngineConfig::default(), Platform::new(Arc::new(ManualTimers::new())));
/// let player = engine.create_app("Player", None, &graph, root);
/// engine.activate(player, None).unwrap();
///
/// assert!(engine.dispatch(&Event::int(POWER, 0, 0), player).unwrap());
/// assert_eq!(engine.app(player).and_then(|a| a.state_name()), Some("On"));
/// ```
pub struct Engine {
    pub(crate) config: EngineConfig,
    pub(crate) platform: Platform,
    pub(crate) handle: ContextHandle,
    pub(crate) apps: SlotMap<AppId, Application>,
    /// Active applications, most recently activated last.
    pub(crate) active: Vec<AppId>,
    pub(crate) focused: Option<AppId>,
    pub(crate) queue: VecDeque<Event>,
    pub(crate) hooks: Hooks,
    pub(crate) trace: Option<TraceLog>,
}

impl Engine {
    pub fn new(config: EngineConfig, platform: Platform) -> Self {
        let handle = ContextHandle::new(config.mailbox_capacity);
        Self::with_handle(config, platform, handle)
    }

    /// Creates an engine reading from an existing mailbox.
    pub fn with_handle(config: EngineConfig, platform: Platform, handle: ContextHandle) -> Self {
        let trace = config
            .record_trace
            .then(|| TraceLog::new(config.trace_capacity));
        Self {
            config,
            platform,
            handle,
            apps: SlotMap::with_key(),
            active: Vec::new(),
            focused: None,
            queue: VecDeque::new(),
            hooks: Hooks::default(),
            trace,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    /// This context's mailbox, for other threads to post into.
    pub fn handle(&self) -> &ContextHandle {
        &self.handle
    }

    /// Creates an inactive application bound to `root` of `graph`.
    pub fn create_app(
        &mut self,
        name: &str,
        region_index: Option<usize>,
        graph: &Arc<StateGraph>,
        root: StateId,
    ) -> AppId {
        let name = self.truncate(name);
        self.apps.insert(Application::new(
            name,
            region_index,
            Some(Arc::clone(graph)),
            Some(root),
        ))
    }

    /// Creates an application without a state machine.
    pub(crate) fn create_bare_app(&mut self, name: &str) -> AppId {
        let name = self.truncate(name);
        self.apps.insert(Application::new(name, None, None, None))
    }

    fn truncate(&self, name: &str) -> String {
        name.chars().take(self.config.max_app_name_len).collect()
    }

    /// Removes an inactive application. Active applications are kept.
    pub fn destroy_app(&mut self, app: AppId) -> bool {
        match self.apps.get(app) {
            Some(record) if record.active => {
                tracing::warn!(app = %record.name, "refusing to destroy an active application");
                false
            }
            Some(_) => self.apps.remove(app).is_some(),
            None => false,
        }
    }

    pub fn app(&self, app: AppId) -> Option<&Application> {
        self.apps.get(app)
    }

    pub fn find_app(&self, name: &str) -> Option<AppId> {
        self.apps
            .iter()
            .find(|(_, record)| record.name == name)
            .map(|(id, _)| id)
    }

    pub fn is_active(&self, app: AppId) -> bool {
        self.apps.get(app).map_or(false, |record| record.active)
    }

    /// Active applications, most recently activated first.
    pub fn active_apps(&self) -> impl Iterator<Item = AppId> + '_ {
        self.active.iter().rev().copied()
    }

    pub fn focused(&self) -> Option<AppId> {
        self.focused
    }

    pub fn set_app_data<T: Any + Send>(&mut self, app: AppId, data: T) {
        if let Some(record) = self.apps.get_mut(app) {
            record.data = Some(Box::new(data));
        }
    }

    pub fn app_data<T: Any>(&self, app: AppId) -> Option<&T> {
        self.apps.get(app)?.data.as_ref()?.downcast_ref()
    }

    pub fn app_data_mut<T: Any>(&mut self, app: AppId) -> Option<&mut T> {
        self.apps.get_mut(app)?.data.as_mut()?.downcast_mut()
    }

    /// Names of the current state's branch, root first.
    pub fn state_path(&self, app: AppId) -> Vec<&str> {
        let Some(record) = self.apps.get(app) else {
            return Vec::new();
        };
        match (&record.graph, record.state) {
            (Some(graph), Some(state)) => graph
                .ancestors(state)
                .iter()
                .rev()
                .map(|&s| graph.name(s))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Active applications with their state paths, most recent first.
    pub fn snapshot(&self) -> Vec<(String, Vec<String>)> {
        self.active_apps()
            .filter_map(|app| {
                let record = self.apps.get(app)?;
                let path = self.state_path(app).into_iter().map(String::from).collect();
                Some((record.name.clone(), path))
            })
            .collect()
    }

    /// Queues an event for this thread's applications. Fails when the event
    /// id is invalid or the internal queue is full.
    pub fn post(&mut self, event: Event) -> bool {
        if !event.id().is_valid() {
            return false;
        }
        if self.queue.len() >= self.config.event_pool_size {
            tracing::warn!(event = %event.id(), capacity = self.config.event_pool_size, "internal event queue full");
            return false;
        }
        self.queue.push_back(event.with_origin(Origin::Internal));
        true
    }

    /// Creates an integer-payload event if the internal queue has room for it.
    pub fn create_int_event(
        &self,
        id: EventId,
        param1: u32,
        param2: u32,
        dest: Option<AppId>,
    ) -> Option<Event> {
        self.event_slot(id)?;
        let event = Event::int(id, param1, param2);
        Some(match dest {
            Some(app) => event.to_app(app),
            None => event,
        })
    }

    /// Creates a byte-payload event if the internal queue has room for it.
    pub fn create_bytes_event(
        &self,
        id: EventId,
        data: Vec<u8>,
        dest: Option<AppId>,
    ) -> Option<Event> {
        self.event_slot(id)?;
        let event = Event::bytes(id, data);
        Some(match dest {
            Some(app) => event.to_app(app),
            None => event,
        })
    }

    fn event_slot(&self, id: EventId) -> Option<()> {
        (id.is_valid() && self.queue.len() < self.config.event_pool_size).then_some(())
    }

    /// Posts an event into another context's mailbox through the platform.
    pub fn post_to(&self, target: &ContextHandle, event: Event) -> Result<(), PostError> {
        self.platform.poster.post(target, event)
    }

    pub fn pending_internal(&self) -> usize {
        self.queue.len()
    }

    /// Replaces the event-arrival hook, returning the previous one.
    pub fn set_arrival_hook(&mut self, hook: Option<ArrivalHook>) -> Option<ArrivalHook> {
        std::mem::replace(&mut self.hooks.arrival, hook)
    }

    /// Replaces the event-handled hook, returning the previous one.
    pub fn set_handled_hook(&mut self, hook: Option<HandledHook>) -> Option<HandledHook> {
        std::mem::replace(&mut self.hooks.handled, hook)
    }

    pub(crate) fn notify_arrival(&mut self, event: &Event) {
        if let Some(hook) = self.hooks.arrival.as_mut() {
            hook(event.origin(), event);
        }
    }

    pub(crate) fn notify_handled(&mut self, event: &Event, app: AppId) {
        if let (Some(hook), Some(record)) = (self.hooks.handled.as_mut(), self.apps.get(app)) {
            hook(event.origin(), event, record);
        }
    }

    pub fn trace_log(&self) -> Option<&TraceLog> {
        self.trace.as_ref()
    }

    pub fn trace_log_mut(&mut self) -> Option<&mut TraceLog> {
        self.trace.as_mut()
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn trace(
        &mut self,
        app: AppId,
        graph: &StateGraph,
        from: Option<StateId>,
        to: Option<StateId>,
        reason: TraceReason,
        event: Option<&Event>,
        started: Instant,
    ) {
        let Some(record) = self.apps.get(app) else {
            return;
        };
        let from = from.map(|s| graph.name(s));
        let to = to.map(|s| graph.name(s));
        let depth = record.depth();
        let event_id = event.map(Event::id);
        let sequence = event.map_or(0, Event::sequence);

        match reason {
            TraceReason::GuardRejected | TraceReason::NotMatched => tracing::trace!(
                app = %record.name,
                state = ?from,
                event = ?event_id,
                ?reason,
                "event not handled"
            ),
            _ => tracing::debug!(
                app = %record.name,
                ?from,
                ?to,
                depth,
                event = ?event_id,
                sequence,
                ?reason,
                "state change"
            ),
        }

        if let Some(log) = self.trace.as_mut() {
            log.record(TraceRecord {
                timestamp: Utc::now(),
                context: self.handle.id(),
                app: record.name.clone(),
                from: from.map(String::from),
                to: to.map(String::from),
                depth,
                event: event_id,
                sequence,
                reason,
                elapsed_us: u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX),
            });
        }
    }
}
