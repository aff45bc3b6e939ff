//! Builder API for state graph construction.
//!
//! This module provides fluent builders for state graphs and transition
//! table entries, plus validation of the finished graph.

pub mod error;
pub mod graph;
pub mod macros;
pub mod transition;
mod validate;

pub use error::{BuildError, GraphError};
pub use graph::{GraphBuilder, DEFAULT_MAX_DEPTH};
pub use transition::TransitionBuilder;

use crate::core::{Action, Event, EventId, StateId, Target, Transition, Trigger};
use crate::engine::Scope;

/// Create an unguarded transition to `to` fired by `event`.
///
/// # Example
///
/// ```
/// use statewright::builder::{simple_transition, GraphBuilder};
/// use statewright::core::EventId;
///
/// let mut builder = GraphBuilder::new();
/// let root = builder.root("Root");
/// let a = builder.leaf("A", root);
/// let b = builder.leaf("B", root);
/// builder.initial(root, a).transition(a, simple_transition(EventId::new(1), b));
/// assert!(builder.build().is_ok());
/// ```
pub fn simple_transition(event: EventId, to: StateId) -> Transition {
    Transition {
        trigger: Trigger::Event(event),
        guard: None,
        action: None,
        target: Target::State(to),
    }
}

/// Create an internal transition: `handler` runs and the state is kept.
pub fn internal_transition<F>(event: EventId, handler: F) -> Transition
where
    F: Fn(&mut Scope<'_>, Option<&Event>) + Send + Sync + 'static,
{
    Transition {
        trigger: Trigger::Event(event),
        guard: None,
        action: Some(Action::new(handler)),
        target: Target::Internal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_transition_builds() {
        let transition = simple_transition(EventId::new(3), StateId(1));
        assert_eq!(transition.trigger(), Trigger::Event(EventId::new(3)));
        assert_eq!(transition.target(), Target::State(StateId(1)));
        assert!(!transition.is_guarded());
    }

    #[test]
    fn internal_transition_has_no_destination() {
        let transition = internal_transition(EventId::new(3), |_, _| {});
        assert_eq!(transition.target(), Target::Internal);
        assert!(transition.action.is_some());
    }
}
