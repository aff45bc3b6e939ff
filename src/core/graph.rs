//! The immutable state graph.
//!
//! A [`StateGraph`] is an arena of [`StateNode`]s built once by a
//! [`GraphBuilder`](crate::builder::GraphBuilder) and then shared read-only
//! (behind an `Arc`) by every application instance and thread that runs it.

use super::action::{Action, Condition};
use super::event::EventId;
use super::guard::Guard;
use super::state::{RegionSpec, StateId, StateKind, StateNode};
use smallvec::SmallVec;
use std::time::Duration;

/// Stack of states along one branch of the tree.
pub type StatePath = SmallVec<[StateId; 16]>;

/// What selects a transition table entry.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Trigger {
    Event(EventId),
    /// Expiry of the state's built-in timer.
    StateTimeout(Duration),
    /// Default child of a composite.
    Initial,
    /// Branch of a conditional pseudo state taken for this value.
    Branch(u32),
    /// Branch of a conditional pseudo state taken when no value matches.
    Else,
    /// Sole outgoing transition of a join pseudo state.
    Join,
    /// Overrides the initial child when the composite is entered by this event.
    ExplicitEntry(EventId),
    /// Matches only when the current state lies inside the given source.
    ExplicitExit(EventId, StateId),
}

/// Where a transition goes.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Target {
    State(StateId),
    /// Run the handler without leaving the current state.
    Internal,
}

/// A transition table entry.
#[derive(Clone, Debug)]
pub struct Transition {
    pub(crate) trigger: Trigger,
    pub(crate) guard: Option<Guard>,
    pub(crate) action: Option<Action>,
    pub(crate) target: Target,
}

impl Transition {
    pub fn trigger(&self) -> Trigger {
        self.trigger
    }

    pub fn target(&self) -> Target {
        self.target
    }

    pub fn is_guarded(&self) -> bool {
        self.guard.is_some()
    }
}

/// Arena of states.
#[derive(Debug)]
pub struct StateGraph {
    pub(crate) nodes: Vec<StateNode>,
}

impl StateGraph {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn state(&self, id: StateId) -> &StateNode {
        &self.nodes[id.index()]
    }

    pub fn name(&self, id: StateId) -> &str {
        &self.state(id).name
    }

    pub fn kind(&self, id: StateId) -> StateKind {
        self.state(id).kind
    }

    pub fn parent(&self, id: StateId) -> Option<StateId> {
        self.state(id).parent
    }

    /// Finds a state by name.
    pub fn find(&self, name: &str) -> Option<StateId> {
        self.nodes
            .iter()
            .position(|node| node.name == name)
            .map(|index| StateId(index as u32))
    }

    pub fn ids(&self) -> impl Iterator<Item = StateId> + '_ {
        (0..self.nodes.len()).map(|index| StateId(index as u32))
    }

    /// States without a parent: application roots and region roots.
    pub fn roots(&self) -> impl Iterator<Item = StateId> + '_ {
        self.ids().filter(|&id| self.parent(id).is_none())
    }

    /// Follows a substate reference to the composite it aliases.
    pub fn resolve(&self, id: StateId) -> StateId {
        self.state(id).alias.unwrap_or(id)
    }

    /// Zero-based tree level of a state. Pseudo states share their parent's level.
    pub fn level(&self, id: StateId) -> usize {
        self.state(id).level
    }

    /// The state followed by its ancestors up to the root.
    pub fn ancestors(&self, id: StateId) -> StatePath {
        let mut path = StatePath::new();
        let mut cursor = Some(id);
        while let Some(state) = cursor {
            path.push(state);
            cursor = self.parent(state);
        }
        path
    }

    /// True if `state` is `ancestor` or lies beneath it.
    pub fn is_within(&self, state: StateId, ancestor: StateId) -> bool {
        let mut cursor = Some(state);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    /// States to exit (innermost first) and to enter (destination first)
    /// for a transition from `from` to `to`.
    ///
    /// The common ancestors of both branches are pruned, but never the last
    /// entry of either stack: a self transition exits and re-enters the state,
    /// and a transition into a direct ancestor exits down to and re-enters it.
    pub fn transition_path(&self, from: StateId, to: StateId) -> (StatePath, StatePath) {
        let mut exits = self.ancestors(from);
        let mut entries = self.ancestors(to);
        exits.reverse();
        entries.reverse();

        let mut shared = 0;
        while exits.len() - shared > 1
            && entries.len() - shared > 1
            && exits[shared] == entries[shared]
        {
            shared += 1;
        }

        let mut exit_path: StatePath = exits[shared..].iter().copied().collect();
        exit_path.reverse();
        let mut entry_path: StatePath = entries[shared..].iter().copied().collect();
        entry_path.reverse();
        (exit_path, entry_path)
    }

    pub(crate) fn table(&self, id: StateId) -> &[Transition] {
        &self.state(id).table
    }

    pub(crate) fn entry_action(&self, id: StateId) -> Option<&Action> {
        self.state(id).entry.as_ref()
    }

    pub(crate) fn exit_action(&self, id: StateId) -> Option<&Action> {
        self.state(id).exit.as_ref()
    }

    pub(crate) fn condition(&self, id: StateId) -> Option<&Condition> {
        self.state(id).condition.as_ref()
    }

    pub fn regions(&self, id: StateId) -> &[RegionSpec] {
        &self.state(id).regions
    }

    /// The default-child entry of a composite.
    pub fn initial(&self, id: StateId) -> Option<&Transition> {
        self.table(id)
            .iter()
            .find(|t| matches!(t.trigger, Trigger::Initial))
    }

    /// The child an explicit-entry entry selects for `event`, if any.
    pub fn explicit_entry(&self, id: StateId, event: EventId) -> Option<StateId> {
        self.table(id).iter().find_map(|t| match (t.trigger, t.target) {
            (Trigger::ExplicitEntry(on), Target::State(child)) if on == event => Some(child),
            _ => None,
        })
    }

    pub fn timeout(&self, id: StateId) -> Option<Duration> {
        self.state(id).timeout
    }

    /// Picks the branch of a conditional pseudo state for a condition value.
    pub(crate) fn branch(&self, id: StateId, value: u32) -> Option<&Transition> {
        let table = self.table(id);
        table
            .iter()
            .find(|t| t.trigger == Trigger::Branch(value))
            .or_else(|| table.iter().find(|t| t.trigger == Trigger::Else))
    }

    pub(crate) fn join_target(&self, id: StateId) -> Option<&Transition> {
        self.table(id).iter().find(|t| t.trigger == Trigger::Join)
    }

    /// Deepest level reachable in the graph, counting from zero.
    pub fn max_level(&self) -> usize {
        self.nodes.iter().map(|node| node.level).max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use crate::builder::GraphBuilder;
    use crate::core::StateId;

    //        Root
    //       /    \
    //      A      B
    //     / \      \
    //   A1   A2     B1
    fn sample() -> (crate::core::StateGraph, [StateId; 6]) {
        let mut builder = GraphBuilder::new();
        let root = builder.root("Root");
        let a = builder.composite("A", root);
        let b = builder.composite("B", root);
        let a1 = builder.leaf("A1", a);
        let a2 = builder.leaf("A2", a);
        let b1 = builder.leaf("B1", b);
        builder.initial(root, a).initial(a, a1).initial(b, b1);
        (builder.build().unwrap(), [root, a, b, a1, a2, b1])
    }

    #[test]
    fn ancestors_run_leaf_to_root() {
        let (graph, [root, a, _, a1, _, _]) = sample();
        assert_eq!(graph.ancestors(a1).as_slice(), &[a1, a, root]);
    }

    #[test]
    fn sibling_transition_exits_and_enters_one_state() {
        let (graph, [_, _, _, a1, a2, _]) = sample();
        let (exit, entry) = graph.transition_path(a1, a2);
        assert_eq!(exit.as_slice(), &[a1]);
        assert_eq!(entry.as_slice(), &[a2]);
    }

    #[test]
    fn cross_branch_transition_stops_below_common_ancestor() {
        let (graph, [_, a, b, a1, _, b1]) = sample();
        let (exit, entry) = graph.transition_path(a1, b1);
        assert_eq!(exit.as_slice(), &[a1, a]);
        assert_eq!(entry.as_slice(), &[b1, b]);
    }

    #[test]
    fn self_transition_reenters() {
        let (graph, [_, _, _, a1, _, _]) = sample();
        let (exit, entry) = graph.transition_path(a1, a1);
        assert_eq!(exit.as_slice(), &[a1]);
        assert_eq!(entry.as_slice(), &[a1]);
    }

    #[test]
    fn transition_to_parent_reenters_parent() {
        let (graph, [_, a, _, a1, _, _]) = sample();
        let (exit, entry) = graph.transition_path(a1, a);
        assert_eq!(exit.as_slice(), &[a1, a]);
        assert_eq!(entry.as_slice(), &[a]);
    }

    #[test]
    fn transition_to_child_keeps_parent() {
        let (graph, [_, a, _, _, a2, _]) = sample();
        let (exit, entry) = graph.transition_path(a, a2);
        assert_eq!(exit.as_slice(), &[a]);
        assert_eq!(entry.as_slice(), &[a2, a]);
    }

    #[test]
    fn levels_count_from_root() {
        let (graph, [root, a, _, a1, _, _]) = sample();
        assert_eq!(graph.level(root), 0);
        assert_eq!(graph.level(a), 1);
        assert_eq!(graph.level(a1), 2);
        assert_eq!(graph.max_level(), 2);
    }

    #[test]
    fn within_is_reflexive_and_follows_parents() {
        let (graph, [root, a, b, a1, _, _]) = sample();
        assert!(graph.is_within(a1, a1));
        assert!(graph.is_within(a1, root));
        assert!(!graph.is_within(a1, b));
        assert!(!graph.is_within(a, a1));
    }

    #[test]
    fn find_by_name() {
        let (graph, [_, _, b, ..]) = sample();
        assert_eq!(graph.find("B"), Some(b));
        assert_eq!(graph.find("Missing"), None);
        assert_eq!(graph.roots().count(), 1);
    }
}
