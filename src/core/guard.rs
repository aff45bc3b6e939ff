//! Guard predicates for controlling state transitions.
//!
//! A guard is evaluated when handler lookup finds an entry for the incoming
//! event. If it rejects, the lookup ends and the event is not handled at
//! this level or above.

use super::event::Event;
use crate::engine::Scope;
use std::fmt;
use std::sync::Arc;

/// Predicate deciding whether a matched transition may run.
///
/// Guards see the application through a read-only [`Scope`] and the event
/// being dispatched. They should not have side effects.
///
/// # Example
///
/// ```rust
/// use statewright::core::{Event, EventId, Guard};
///
/// // Only accept events whose first parameter is non-zero.
/// let armed = Guard::new(|_scope, event: &Event| {
///     event.params().map(|(p1, _)| p1 != 0).unwrap_or(false)
/// });
/// # let _ = armed;
/// ```
#[derive(Clone)]
pub struct Guard {
    predicate: Arc<dyn Fn(&Scope<'_>, &Event) -> bool + Send + Sync>,
}

impl Guard {
    /// Create a guard from a predicate function.
    ///
    /// The predicate must be thread-safe; graphs are shared across threads.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&Scope<'_>, &Event) -> bool + Send + Sync + 'static,
    {
        Guard {
            predicate: Arc::new(predicate),
        }
    }

    /// Check if the guard allows the transition for this event.
    pub fn check(&self, scope: &Scope<'_>, event: &Event) -> bool {
        (self.predicate)(scope, event)
    }
}

impl fmt::Debug for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Guard")
    }
}
