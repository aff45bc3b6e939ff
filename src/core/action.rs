//! Behaviour attached to states and transitions.

use super::event::Event;
use crate::engine::Scope;
use std::fmt;
use std::sync::Arc;

/// Entry, exit, transition or initial-child behaviour.
///
/// The event is `None` when the action runs outside of event handling,
/// such as during activation or deactivation.
#[derive(Clone)]
pub struct Action(Arc<dyn Fn(&mut Scope<'_>, Option<&Event>) + Send + Sync>);

impl Action {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut Scope<'_>, Option<&Event>) + Send + Sync + 'static,
    {
        Action(Arc::new(f))
    }

    pub fn run(&self, scope: &mut Scope<'_>, event: Option<&Event>) {
        (self.0)(scope, event)
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Action")
    }
}

/// Evaluated on entry to a conditional pseudo state. The returned value
/// selects the branch with the same value, or the else branch.
#[derive(Clone)]
pub struct Condition(Arc<dyn Fn(&mut Scope<'_>, Option<&Event>) -> u32 + Send + Sync>);

impl Condition {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut Scope<'_>, Option<&Event>) -> u32 + Send + Sync + 'static,
    {
        Condition(Arc::new(f))
    }

    pub fn evaluate(&self, scope: &mut Scope<'_>, event: Option<&Event>) -> u32 {
        (self.0)(scope, event)
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Condition")
    }
}
