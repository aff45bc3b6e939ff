//! Builder for constructing transition table entries.

use crate::builder::error::BuildError;
use crate::core::{Action, Event, EventId, Guard, StateId, Target, Transition, Trigger};
use crate::engine::Scope;
use std::time::Duration;

/// Fluent builder for one transition table entry.
///
/// Start from a trigger constructor, then name the destination with
/// [`to`](Self::to) or make it [`internal`](Self::internal).
///
/// # Example
///
/// ```rust
/// use statewright::builder::{GraphBuilder, TransitionBuilder};
/// use statewright::core::EventId;
///
/// const POWER: EventId = EventId::new(1);
///
/// let mut builder = GraphBuilder::new();
/// let root = builder.root("Player");
/// let off = builder.leaf("Off", root);
/// let on = builder.leaf("On", root);
/// builder.initial(root, off);
///
/// let power_on = TransitionBuilder::on(POWER)
///     .to(on)
///     .action(|_scope, _event| println!("powering up"))
///     .build()
///     .unwrap();
/// builder.transition(off, power_on);
/// assert!(builder.build().is_ok());
/// ```
pub struct TransitionBuilder {
    trigger: Trigger,
    target: Option<Target>,
    guard: Option<Guard>,
    action: Option<Action>,
}

impl TransitionBuilder {
    fn with_trigger(trigger: Trigger) -> Self {
        Self {
            trigger,
            target: None,
            guard: None,
            action: None,
        }
    }

    /// Entry fired by an event id.
    pub fn on(event: EventId) -> Self {
        Self::with_trigger(Trigger::Event(event))
    }

    /// Entry fired when the state's built-in timer expires. Declaring it arms
    /// the timer every time the state is entered.
    pub fn timeout(after: Duration) -> Self {
        Self::with_trigger(Trigger::StateTimeout(after))
    }

    /// Branch of a conditional pseudo state.
    pub fn branch(value: u32) -> Self {
        Self::with_trigger(Trigger::Branch(value))
    }

    /// Else branch of a conditional pseudo state.
    pub fn otherwise() -> Self {
        Self::with_trigger(Trigger::Else)
    }

    /// Outgoing transition of a join pseudo state.
    pub fn join() -> Self {
        Self::with_trigger(Trigger::Join)
    }

    /// Enter `child` instead of the initial child when the owning composite
    /// is entered by `event`.
    pub fn explicit_entry(event: EventId, child: StateId) -> Self {
        Self::with_trigger(Trigger::ExplicitEntry(event)).to(child)
    }

    /// Marker restricting `event` to leave from `source`: when the current
    /// state is not `source` or one of its descendants, lookup stops here.
    /// Otherwise lookup continues with the following entries, which should
    /// include the actual transition for `event`.
    pub fn explicit_exit(event: EventId, source: StateId) -> Self {
        Self::with_trigger(Trigger::ExplicitExit(event, source)).to(source)
    }

    pub fn to(mut self, state: StateId) -> Self {
        self.target = Some(Target::State(state));
        self
    }

    /// Run the handler without exiting or entering any state.
    pub fn internal(mut self) -> Self {
        self.target = Some(Target::Internal);
        self
    }

    pub fn guard(mut self, guard: Guard) -> Self {
        self.guard = Some(guard);
        self
    }

    pub fn when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Scope<'_>, &Event) -> bool + Send + Sync + 'static,
    {
        self.guard = Some(Guard::new(predicate));
        self
    }

    pub fn action<F>(mut self, action: F) -> Self
    where
        F: Fn(&mut Scope<'_>, Option<&Event>) + Send + Sync + 'static,
    {
        self.action = Some(Action::new(action));
        self
    }

    pub fn build(self) -> Result<Transition, BuildError> {
        let target = self.target.ok_or(BuildError::MissingTarget)?;

        if target == Target::Internal {
            let kind = match self.trigger {
                Trigger::Branch(_) | Trigger::Else => Some("Branch"),
                Trigger::Join => Some("Join"),
                Trigger::Initial => Some("Initial"),
                Trigger::ExplicitEntry(_) => Some("Explicit entry"),
                _ => None,
            };
            if let Some(kind) = kind {
                return Err(BuildError::InternalNotAllowed(kind));
            }
        }

        Ok(Transition {
            trigger: self.trigger,
            guard: self.guard,
            action: self.action,
            target,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GO: EventId = EventId::new(1);

    #[test]
    fn builder_validates_required_target() {
        let result = TransitionBuilder::on(GO).build();
        assert!(matches!(result, Err(BuildError::MissingTarget)));
    }

    #[test]
    fn internal_transition_keeps_handler() {
        let transition = TransitionBuilder::on(GO)
            .internal()
            .action(|_, _| {})
            .build()
            .unwrap();
        assert_eq!(transition.target(), Target::Internal);
        assert!(transition.action.is_some());
    }

    #[test]
    fn branches_cannot_be_internal() {
        let result = TransitionBuilder::branch(2).internal().build();
        assert!(matches!(result, Err(BuildError::InternalNotAllowed("Branch"))));

        let result = TransitionBuilder::join().internal().build();
        assert!(matches!(result, Err(BuildError::InternalNotAllowed("Join"))));
    }

    #[test]
    fn explicit_entry_names_its_child() {
        let transition = TransitionBuilder::explicit_entry(GO, StateId(4))
            .build()
            .unwrap();
        assert_eq!(transition.trigger(), Trigger::ExplicitEntry(GO));
        assert_eq!(transition.target(), Target::State(StateId(4)));
    }

    #[test]
    fn guard_is_recorded() {
        let transition = TransitionBuilder::on(GO)
            .to(StateId(1))
            .when(|_, _| false)
            .build()
            .unwrap();
        assert!(transition.is_guarded());
    }

    #[test]
    fn timeout_trigger_carries_duration() {
        let transition = TransitionBuilder::timeout(Duration::from_millis(250))
            .to(StateId(2))
            .build()
            .unwrap();
        assert_eq!(
            transition.trigger(),
            Trigger::StateTimeout(Duration::from_millis(250))
        );
    }
}
