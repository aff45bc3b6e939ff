//! Handler access to the engine.

use super::app::{AppId, Application};
use super::context::Engine;
use crate::core::{Event, StateId};
use crate::platform::{ContextHandle, PostError, TimerHandle, TimerKind, TimerTarget};
use std::any::Any;
use std::time::Duration;

/// What an action, guard or condition sees while it runs: the application
/// it runs for and the engine of the current thread.
pub struct Scope<'e> {
    engine: &'e mut Engine,
    app: AppId,
}

impl<'e> Scope<'e> {
    pub(crate) fn new(engine: &'e mut Engine, app: AppId) -> Self {
        Self { engine, app }
    }

    pub fn app(&self) -> AppId {
        self.app
    }

    pub fn application(&self) -> Option<&Application> {
        self.engine.app(self.app)
    }

    pub fn name(&self) -> &str {
        self.application().map_or("", Application::name)
    }

    pub fn state(&self) -> Option<StateId> {
        self.application().and_then(Application::state)
    }

    pub fn state_name(&self) -> Option<&str> {
        self.application().and_then(Application::state_name)
    }

    pub fn data<T: Any>(&self) -> Option<&T> {
        self.engine.app_data(self.app)
    }

    pub fn data_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.engine.app_data_mut(self.app)
    }

    /// Replaces the application's data.
    pub fn set_data<T: Any + Send>(&mut self, data: T) {
        self.engine.set_app_data(self.app, data);
    }

    /// Queues an event on this thread's internal queue.
    pub fn post(&mut self, event: Event) -> bool {
        self.engine.post(event)
    }

    /// Posts an event into another context's mailbox.
    pub fn post_to(&self, target: &ContextHandle, event: Event) -> Result<(), PostError> {
        self.engine.post_to(target, event)
    }

    /// This thread's mailbox.
    pub fn context(&self) -> &ContextHandle {
        self.engine.handle()
    }

    /// Starts a periodic timer delivering `TIMER` events to this application.
    pub fn start_timer(&mut self, period: Duration) -> Option<TimerHandle> {
        let target = TimerTarget {
            context: self.engine.handle().clone(),
            app: self.app,
            kind: TimerKind::Event,
        };
        self.engine.platform.timers.start(target, period)
    }

    pub fn cancel_timer(&mut self, handle: TimerHandle) -> bool {
        self.engine.platform.timers.cancel(handle)
    }

    /// Full engine access, for activating or deactivating other applications.
    pub fn engine(&mut self) -> &mut Engine {
        self.engine
    }
}
