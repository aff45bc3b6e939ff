//! Event dispatch: handler lookup and transition execution.
//!
//! A transition exits the states below the common ancestor of source and
//! destination (innermost first), runs the handler, then enters the states
//! down to the destination (outermost first) and on through default children
//! to a leaf. Reaching a pseudo state continues with another transition
//! sourced at the pseudo state, up to the configured number of hops.

use super::app::AppId;
use super::context::Engine;
use super::error::EngineError;
use super::scope::Scope;
use crate::core::{Action, Event, EventId, StateGraph, StateId, StateKind, Target, TraceReason, Trigger};
use crate::platform::{TimerHandle, TimerKind, TimerTarget};
use std::sync::Arc;
use std::time::Instant;

/// A transition about to run.
pub(crate) struct Step {
    pub(crate) source: StateId,
    pub(crate) target: Target,
    pub(crate) action: Option<Action>,
}

enum Entered {
    /// Entered an ordinary state; continue into this child, if any.
    Descend(Option<StateId>),
    /// Entered a pseudo state, which chose its outgoing transition.
    Hop(Step),
}

impl Engine {
    /// Dispatches one event to one application.
    ///
    /// Returns `Ok(true)` if a handler fired. An inactive application, a
    /// filtered event, a missing handler or a rejecting guard yield
    /// `Ok(false)`.
    pub fn dispatch(&mut self, event: &Event, app: AppId) -> Result<bool, EngineError> {
        let Some(record) = self.apps.get(app) else {
            return Ok(false);
        };
        if !record.active {
            return Ok(false);
        }
        let (Some(graph), Some(current)) = (record.graph.clone(), record.state) else {
            return Ok(false);
        };
        if let Some(filter) = &self.platform.filter {
            if !filter.allows(record, event) {
                tracing::trace!(app = %record.name, event = %event.id(), "event filtered");
                return Ok(false);
            }
        }

        let started = Instant::now();
        let Some(step) = self.find_handler(&graph, app, current, event, started) else {
            return Ok(false);
        };

        if step.target == Target::Internal {
            if let Some(action) = &step.action {
                self.invoke(app, action, Some(event));
            }
            self.trace(
                app,
                &graph,
                Some(current),
                Some(current),
                TraceReason::InternalTransition,
                Some(event),
                started,
            );
        } else {
            if let Some(record) = self.apps.get_mut(app) {
                record.history = Some(current);
            }
            self.run_transition(&graph, app, step, Some(event), TraceReason::Hit, 0, started)?;
        }

        self.notify_handled(event, app);
        Ok(true)
    }

    /// Searches the tables from the current state up to the root.
    fn find_handler(
        &mut self,
        graph: &StateGraph,
        app: AppId,
        current: StateId,
        event: &Event,
        started: Instant,
    ) -> Option<Step> {
        let mut level = Some(current);
        while let Some(state) = level {
            for entry in graph.table(state) {
                let matched = match entry.trigger {
                    Trigger::Event(id) => id == event.id(),
                    Trigger::StateTimeout(_) => {
                        event.id() == EventId::STATE_TIMER
                            && self.armed_sequence(app, graph.level(state)) == Some(event.sequence())
                    }
                    Trigger::ExplicitExit(id, source) => {
                        if id == event.id() && !graph.is_within(current, source) {
                            self.trace(
                                app,
                                graph,
                                Some(current),
                                None,
                                TraceReason::NotMatched,
                                Some(event),
                                started,
                            );
                            return None;
                        }
                        false
                    }
                    _ => false,
                };
                if !matched {
                    continue;
                }

                if let Some(guard) = &entry.guard {
                    if !guard.check(&Scope::new(self, app), event) {
                        self.trace(
                            app,
                            graph,
                            Some(current),
                            None,
                            TraceReason::GuardRejected,
                            Some(event),
                            started,
                        );
                        return None;
                    }
                }
                return Some(Step {
                    source: current,
                    target: entry.target,
                    action: entry.action.clone(),
                });
            }
            level = graph.parent(state);
        }
        None
    }

    fn armed_sequence(&self, app: AppId, level: usize) -> Option<u64> {
        let record = self.apps.get(app)?;
        record
            .timers
            .get(level)
            .copied()
            .flatten()
            .map(TimerHandle::sequence)
    }

    /// Executes a transition and any pseudo-state hops that follow it.
    /// `hops` counts pseudo states already traversed.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn run_transition(
        &mut self,
        graph: &Arc<StateGraph>,
        app: AppId,
        mut step: Step,
        event: Option<&Event>,
        mut reason: TraceReason,
        mut hops: usize,
        started: Instant,
    ) -> Result<(), EngineError> {
        loop {
            let Target::State(dest) = step.target else {
                if let Some(action) = &step.action {
                    self.invoke(app, action, event);
                }
                return Ok(());
            };

            let (exits, entries) = graph.transition_path(step.source, dest);
            self.exit_states(graph, app, &exits, event, started)?;
            if let Some(action) = &step.action {
                self.invoke(app, action, event);
            }

            let from = Some(step.source);
            match self.enter_states(graph, app, from, &entries, event, &mut reason, started)? {
                None => return Ok(()),
                Some(next) => {
                    hops += 1;
                    if hops > self.config.max_pseudo_hops {
                        let app_name = self.app_name(app);
                        let state = graph.name(next.source).to_string();
                        tracing::error!(app = %app_name, %state, "pseudo-state hop limit exceeded");
                        return Err(EngineError::PseudoStateLoop {
                            app: app_name,
                            state,
                            max: self.config.max_pseudo_hops,
                        });
                    }
                    step = next;
                }
            }
        }
    }

    /// Exits `path`, innermost state first.
    pub(crate) fn exit_states(
        &mut self,
        graph: &Arc<StateGraph>,
        app: AppId,
        path: &[StateId],
        event: Option<&Event>,
        started: Instant,
    ) -> Result<(), EngineError> {
        for &state in path {
            let kind = graph.kind(state);
            if !kind.is_pseudo() {
                self.trace(
                    app,
                    graph,
                    Some(state),
                    None,
                    TraceReason::Deactivated,
                    event,
                    started,
                );
                let armed = self
                    .apps
                    .get_mut(app)
                    .and_then(|record| record.timers.pop())
                    .flatten();
                if let Some(handle) = armed {
                    self.platform.timers.cancel(handle);
                }
            }
            if let Some(record) = self.apps.get_mut(app) {
                record.state = Some(state);
            }
            if kind == StateKind::Orthogonal {
                self.exit_regions(app, state)?;
            }
            if let Some(action) = graph.exit_action(state) {
                self.invoke(app, action, event);
            }
        }
        if let (Some(&last), Some(record)) = (path.last(), self.apps.get_mut(app)) {
            record.state = graph.parent(last);
        }
        Ok(())
    }

    /// Enters `path` (destination first, so walked in reverse), then
    /// descends through default children. Returns the next step if a pseudo
    /// state was reached.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn enter_states(
        &mut self,
        graph: &Arc<StateGraph>,
        app: AppId,
        from: Option<StateId>,
        path: &[StateId],
        event: Option<&Event>,
        reason: &mut TraceReason,
        started: Instant,
    ) -> Result<Option<Step>, EngineError> {
        let mut previous = from;
        let mut next = None;

        for index in (0..path.len()).rev() {
            let explicit = index.checked_sub(1).map(|below| path[below]);
            let state = path[index];
            match self.enter_state(graph, app, previous, state, explicit, event, reason, started)? {
                Entered::Descend(child) => next = child,
                Entered::Hop(step) => return Ok(Some(step)),
            }
            previous = Some(state);
        }

        while let Some(state) = next {
            match self.enter_state(graph, app, previous, state, None, event, reason, started)? {
                Entered::Descend(child) => next = child,
                Entered::Hop(step) => return Ok(Some(step)),
            }
            previous = Some(state);
        }
        Ok(None)
    }

    #[allow(clippy::too_many_arguments)]
    fn enter_state(
        &mut self,
        graph: &Arc<StateGraph>,
        app: AppId,
        from: Option<StateId>,
        state: StateId,
        explicit: Option<StateId>,
        event: Option<&Event>,
        reason: &mut TraceReason,
        started: Instant,
    ) -> Result<Entered, EngineError> {
        if let Some(record) = self.apps.get_mut(app) {
            record.state = Some(state);
        }

        match graph.kind(state) {
            StateKind::CondPseudo => {
                self.trace(app, graph, from, Some(state), *reason, event, started);
                *reason = TraceReason::Cond;
                let value = match graph.condition(state) {
                    Some(condition) => condition.evaluate(&mut Scope::new(self, app), event),
                    None => 0,
                };
                let Some(branch) = graph.branch(state, value) else {
                    let app_name = self.app_name(app);
                    tracing::error!(app = %app_name, state = graph.name(state), value, "no branch for condition value");
                    return Err(EngineError::UnresolvedCondition {
                        app: app_name,
                        state: graph.name(state).to_string(),
                        value,
                    });
                };
                Ok(Entered::Hop(Step {
                    source: state,
                    target: branch.target,
                    action: branch.action.clone(),
                }))
            }
            StateKind::JoinPseudo => {
                self.trace(app, graph, from, Some(state), *reason, event, started);
                *reason = TraceReason::Join;
                let Some(join) = graph.join_target(state) else {
                    return Err(EngineError::JoinWithoutTarget {
                        app: self.app_name(app),
                        state: graph.name(state).to_string(),
                    });
                };
                Ok(Entered::Hop(Step {
                    source: state,
                    target: join.target,
                    action: join.action.clone(),
                }))
            }
            kind => {
                let timer = match graph.timeout(state) {
                    Some(period) => {
                        let target = TimerTarget {
                            context: self.handle.clone(),
                            app,
                            kind: TimerKind::State,
                        };
                        let Some(handle) = self.platform.timers.start(target, period) else {
                            if let Some(record) = self.apps.get_mut(app) {
                                record.state = graph.parent(state);
                            }
                            let app_name = self.app_name(app);
                            tracing::error!(app = %app_name, state = graph.name(state), "state timer did not start");
                            return Err(EngineError::TimerStart {
                                app: app_name,
                                state: graph.name(state).to_string(),
                            });
                        };
                        Some(handle)
                    }
                    None => None,
                };
                if let Some(record) = self.apps.get_mut(app) {
                    record.timers.push(timer);
                }

                if let Some(action) = graph.entry_action(state) {
                    self.invoke(app, action, event);
                }
                if kind == StateKind::Orthogonal {
                    self.enter_regions(graph, app, state)?;
                }
                self.trace(app, graph, from, Some(state), *reason, event, started);

                let next = match explicit {
                    Some(child) => Some(child),
                    None => self.default_child(graph, app, state, event),
                };
                Ok(Entered::Descend(next))
            }
        }
    }

    /// Explicit entry for the event if declared, else the initial child
    /// after running its action.
    fn default_child(
        &mut self,
        graph: &StateGraph,
        app: AppId,
        state: StateId,
        event: Option<&Event>,
    ) -> Option<StateId> {
        if let Some(child) = event.and_then(|e| graph.explicit_entry(state, e.id())) {
            return Some(child);
        }
        let initial = graph.initial(state)?;
        if let Some(action) = &initial.action {
            self.invoke(app, action, event);
        }
        match initial.target {
            Target::State(child) => Some(child),
            Target::Internal => None,
        }
    }

    pub(crate) fn invoke(&mut self, app: AppId, action: &Action, event: Option<&Event>) {
        action.run(&mut Scope::new(self, app), event);
    }

    pub(crate) fn app_name(&self, app: AppId) -> String {
        self.apps
            .get(app)
            .map(|record| record.name.clone())
            .unwrap_or_default()
    }
}
