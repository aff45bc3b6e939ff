//! Activation, deactivation and focus.

use super::app::{AppId, Application};
use super::context::Engine;
use super::error::EngineError;
use crate::core::{Category, Event, EventId, StateGraph, StateId, TraceReason};
use std::sync::Arc;
use std::time::Instant;

impl Engine {
    /// Activates an application, entering its root and default children
    /// down to a leaf. Internal events posted by entry actions are
    /// dispatched before returning.
    ///
    /// Returns `Ok(false)` if the application does not exist or is already
    /// active. If entering fails, the states entered so far are exited
    /// again and the application is left inactive.
    pub fn activate(&mut self, app: AppId, parent: Option<AppId>) -> Result<bool, EngineError> {
        let Some(record) = self.apps.get(app) else {
            return Ok(false);
        };
        if record.active {
            tracing::warn!(app = %record.name, "application already active");
            return Ok(false);
        }
        self.check_root(record)?;

        let Some(record) = self.apps.get_mut(app) else {
            return Ok(false);
        };
        record.reset();
        record.parent = parent;
        record.active = true;
        let start = record.graph.clone().zip(record.root);
        tracing::debug!(app = %record.name, ?parent, "activating application");
        self.active.push(app);

        if let Some((graph, root)) = start {
            if let Err(error) = self.enter_root(&graph, app, root) {
                tracing::error!(app = %self.app_name(app), %error, "activation failed");
                if let Err(cleanup) = self.retire(app) {
                    tracing::error!(app = %self.app_name(app), error = %cleanup, "could not undo a failed activation");
                }
                return Err(error);
            }
        }

        self.dispatch_internal()?;

        if self.config.focus_on_activate {
            self.set_focus(app)?;
        }
        Ok(true)
    }

    fn enter_root(
        &mut self,
        graph: &Arc<StateGraph>,
        app: AppId,
        root: StateId,
    ) -> Result<(), EngineError> {
        let started = Instant::now();
        let root = graph.resolve(root);
        let mut reason = TraceReason::Activated;
        if let Some(step) = self.enter_states(graph, app, None, &[root], None, &mut reason, started)? {
            self.run_transition(graph, app, step, None, reason, 1, started)?;
        }
        Ok(())
    }

    /// An application must start at a root of its own graph, and that
    /// tree must fit within `max_tree_depth`.
    fn check_root(&self, record: &Application) -> Result<(), EngineError> {
        let (Some(graph), Some(root)) = (&record.graph, record.root) else {
            return Ok(());
        };
        let invalid = |reason: String| -> Result<(), EngineError> {
            tracing::error!(app = %record.name, %reason, "invalid application root");
            Err(EngineError::InvalidRoot {
                app: record.name.clone(),
                reason,
            })
        };
        if root.index() >= graph.len() {
            return invalid(format!("state #{} does not belong to its graph", root.index()));
        }
        let root = graph.resolve(root);
        if let Some(parent) = graph.parent(root) {
            return invalid(format!(
                "'{}' is nested in '{}'",
                graph.name(root),
                graph.name(parent)
            ));
        }

        let depth = graph
            .ids()
            .filter(|&state| graph.is_within(state, root))
            .map(|state| graph.level(state) + 1)
            .max()
            .unwrap_or(1);
        if depth > self.config.max_tree_depth {
            tracing::error!(app = %record.name, depth, max = self.config.max_tree_depth, "state tree too deep");
            return Err(EngineError::TreeTooDeep {
                app: record.name.clone(),
                depth,
                max: self.config.max_tree_depth,
            });
        }
        Ok(())
    }

    /// Deactivates an application, exiting from its leaf to its root.
    ///
    /// Only leaf applications may be deactivated: the request is rejected
    /// while any active application names this one as its parent.
    pub fn deactivate(&mut self, app: AppId) -> Result<bool, EngineError> {
        let Some(record) = self.apps.get(app) else {
            return Ok(false);
        };
        if !record.active {
            return Ok(false);
        }
        // Region hosts are torn down with the orthogonal state that owns them.
        let owned = |other: AppId| record.regions.iter().any(|set| set.ortho == other);
        let has_children = self
            .active
            .iter()
            .filter(|&&other| !owned(other))
            .filter_map(|&other| self.apps.get(other))
            .any(|other| other.parent == Some(app));
        if has_children {
            tracing::error!(app = %record.name, "cannot deactivate an application with active children");
            return Ok(false);
        }

        self.retire(app)?;
        self.dispatch_internal()?;
        Ok(true)
    }

    /// Unlinks an application and exits all of its states.
    pub(crate) fn retire(&mut self, app: AppId) -> Result<(), EngineError> {
        self.active.retain(|&other| other != app);

        if self.focused == Some(app) {
            match self.apps.get(app).and_then(|record| record.parent) {
                Some(parent) => {
                    self.set_focus(parent)?;
                }
                None => self.focused = None,
            }
        }

        let Some(record) = self.apps.get(app) else {
            return Ok(());
        };
        tracing::debug!(app = %record.name, "deactivating application");
        if let (Some(graph), Some(state)) = (record.graph.clone(), record.state) {
            let path = graph.ancestors(state);
            self.exit_states(&graph, app, &path, None, Instant::now())?;
        }

        if let Some(record) = self.apps.get_mut(app) {
            record.reset();
            record.active = false;
        }
        Ok(())
    }

    /// Moves focus to `app`: the previously focused application receives
    /// `KILL_FOCUS`, then `app` receives `SET_FOCUS`.
    pub fn set_focus(&mut self, app: AppId) -> Result<bool, EngineError> {
        if !self.apps.contains_key(app) {
            return Ok(false);
        }
        if let Some(previous) = self.focused {
            let kill = Event::int(EventId::KILL_FOCUS, 0, 0)
                .with_category(Category::Ui)
                .to_app(previous);
            self.dispatch(&kill, previous)?;
        }
        let set = Event::int(EventId::SET_FOCUS, 0, 0)
            .with_category(Category::Ui)
            .to_app(app);
        self.dispatch(&set, app)?;
        self.focused = Some(app);
        Ok(true)
    }
}
