//! Event routing and the run loop.

use super::app::AppId;
use super::context::Engine;
use super::error::EngineError;
use crate::core::{Category, Event};
use crate::platform::Incoming;
use std::sync::Arc;

/// Result of one non-blocking [`Engine::poll`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PollOutcome {
    /// External events delivered.
    pub handled: usize,
    /// The exit request was seen; the caller should stop polling.
    pub exit: bool,
}

impl Engine {
    /// Runs this thread's event loop until an exit request arrives.
    ///
    /// Each iteration drains the internal queue, waits for the next external
    /// event and delivers it.
    pub fn run(&mut self) -> Result<(), EngineError> {
        tracing::debug!(context = %self.handle.id(), "event loop started");
        let source = Arc::clone(&self.platform.source);
        loop {
            if let Err(error) = self.dispatch_internal() {
                tracing::error!(%error, "event loop stopped");
                return Err(error);
            }
            match source.wait(&self.handle) {
                Incoming::Exit => break,
                Incoming::Empty => continue,
                Incoming::Event(event) => {
                    let outcome = self.deliver(&event);
                    source.release(event);
                    if let Err(error) = outcome {
                        tracing::error!(%error, "event loop stopped");
                        return Err(error);
                    }
                }
            }
        }
        tracing::debug!(context = %self.handle.id(), "event loop stopped");
        Ok(())
    }

    /// Delivers every external event already waiting, without blocking.
    pub fn poll(&mut self) -> Result<PollOutcome, EngineError> {
        let mut outcome = PollOutcome::default();
        self.dispatch_internal()?;
        let source = Arc::clone(&self.platform.source);
        loop {
            match source.poll(&self.handle) {
                Incoming::Empty => break,
                Incoming::Exit => {
                    outcome.exit = true;
                    break;
                }
                Incoming::Event(event) => {
                    self.deliver(&event)?;
                    self.dispatch_internal()?;
                    source.release(event);
                    outcome.handled += 1;
                }
            }
        }
        Ok(outcome)
    }

    /// Routes one event.
    ///
    /// Addressed events go to their application only. UI events go to the
    /// focused application. Everything else is offered to the active
    /// applications, most recently activated first, until one consumes it.
    pub fn deliver(&mut self, event: &Event) -> Result<(), EngineError> {
        self.notify_arrival(event);

        if let Some(app) = event.dest() {
            if self.is_active(app) {
                self.dispatch(event, app)?;
            } else {
                tracing::trace!(event = %event.id(), "destination application not active");
            }
            return Ok(());
        }

        if event.category() == Category::Ui {
            if let Some(app) = self.focused {
                self.dispatch(event, app)?;
            }
            return Ok(());
        }

        let targets: Vec<AppId> = self.active_apps().collect();
        for app in targets {
            if !self.is_active(app) {
                continue;
            }
            self.dispatch(event, app)?;
            if event.is_consumed() {
                break;
            }
        }
        Ok(())
    }

    /// Delivers queued internal events until the queue is empty.
    pub fn dispatch_internal(&mut self) -> Result<(), EngineError> {
        while let Some(event) = self.queue.pop_front() {
            self.deliver(&event)?;
        }
        Ok(())
    }
}
