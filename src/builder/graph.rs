//! Builder for constructing state graphs.

use crate::builder::error::{BuildError, GraphError};
use crate::builder::validate;
use crate::core::{
    Action, Condition, Event, RegionSpec, StateGraph, StateId, StateKind, StateNode, Target,
    Transition, Trigger,
};
use crate::engine::Scope;

/// Default limit on tree depth.
pub const DEFAULT_MAX_DEPTH: usize = 16;

/// Fluent builder for a [`StateGraph`].
///
/// States are declared top-down: every state but a root names its parent,
/// which must already exist. A graph may contain several roots; besides the
/// application roots these are region roots and fragments referenced by
/// substate references.
///
/// # Example
///
/// ```rust
/// use statewright::builder::{GraphBuilder, TransitionBuilder};
/// use statewright::core::EventId;
///
/// let mut builder = GraphBuilder::new();
/// let root = builder.root("Door");
/// let closed = builder.leaf("Closed", root);
/// let open = builder.leaf("Open", root);
/// builder
///     .initial(root, closed)
///     .transition(closed, TransitionBuilder::on(EventId::new(1)).to(open).build().unwrap())
///     .transition(open, TransitionBuilder::on(EventId::new(2)).to(closed).build().unwrap());
///
/// let graph = builder.build().unwrap();
/// assert_eq!(graph.name(graph.resolve(closed)), "Closed");
/// ```
pub struct GraphBuilder {
    nodes: Vec<StateNode>,
    fragments: Vec<StateId>,
    max_depth: usize,
    errors: Vec<GraphError>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::with_max_depth(DEFAULT_MAX_DEPTH)
    }

    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            nodes: Vec::new(),
            fragments: Vec::new(),
            max_depth,
            errors: Vec::new(),
        }
    }

    fn add(&mut self, name: &str, kind: StateKind, parent: Option<StateId>) -> StateId {
        if let Some(parent) = parent {
            self.check_id(parent);
        }
        let id = StateId(self.nodes.len() as u32);
        self.nodes
            .push(StateNode::new(name.to_string(), kind, parent));
        id
    }

    fn check_id(&mut self, id: StateId) -> bool {
        if id.index() < self.nodes.len() {
            true
        } else {
            self.errors.push(GraphError::UnknownState { id: id.index() });
            false
        }
    }

    /// The node behind `id`, following a substate reference to its fragment.
    fn node_mut(&mut self, id: StateId) -> Option<&mut StateNode> {
        if !self.check_id(id) {
            return None;
        }
        let index = self.nodes[id.index()].alias.unwrap_or(id).index();
        self.nodes.get_mut(index)
    }

    /// A composite without a parent: the root of an application or region.
    pub fn root(&mut self, name: &str) -> StateId {
        self.add(name, StateKind::Composite, None)
    }

    pub fn composite(&mut self, name: &str, parent: StateId) -> StateId {
        self.add(name, StateKind::Composite, Some(parent))
    }

    pub fn leaf(&mut self, name: &str, parent: StateId) -> StateId {
        self.add(name, StateKind::Leaf, Some(parent))
    }

    /// A composite that starts its regions on entry and stops them on exit.
    pub fn orthogonal(&mut self, name: &str, parent: StateId) -> StateId {
        self.add(name, StateKind::Orthogonal, Some(parent))
    }

    /// A detached composite body to be placed in the tree by [`substate_ref`](Self::substate_ref).
    pub fn fragment(&mut self, name: &str) -> StateId {
        let id = self.add(name, StateKind::Composite, None);
        self.fragments.push(id);
        id
    }

    /// Places `fragment` in the tree under `parent`. Transitions and children
    /// naming the reference are redirected to the fragment.
    pub fn substate_ref(&mut self, name: &str, parent: StateId, fragment: StateId) -> StateId {
        let id = self.add(name, StateKind::SubstateRef, Some(parent));
        if self.check_id(fragment) {
            self.nodes[id.index()].alias = Some(fragment);
        }
        id
    }

    /// A conditional pseudo state. `condition` picks the branch to follow.
    pub fn cond<F>(&mut self, name: &str, parent: StateId, condition: F) -> StateId
    where
        F: Fn(&mut Scope<'_>, Option<&Event>) -> u32 + Send + Sync + 'static,
    {
        let id = self.add(name, StateKind::CondPseudo, Some(parent));
        self.nodes[id.index()].condition = Some(Condition::new(condition));
        id
    }

    pub fn join(&mut self, name: &str, parent: StateId) -> StateId {
        self.add(name, StateKind::JoinPseudo, Some(parent))
    }

    pub fn on_entry<F>(&mut self, state: StateId, action: F) -> &mut Self
    where
        F: Fn(&mut Scope<'_>, Option<&Event>) + Send + Sync + 'static,
    {
        if let Some(node) = self.node_mut(state) {
            node.entry = Some(Action::new(action));
        }
        self
    }

    pub fn on_exit<F>(&mut self, state: StateId, action: F) -> &mut Self
    where
        F: Fn(&mut Scope<'_>, Option<&Event>) + Send + Sync + 'static,
    {
        if let Some(node) = self.node_mut(state) {
            node.exit = Some(Action::new(action));
        }
        self
    }

    /// Declares the default child of a composite.
    pub fn initial(&mut self, composite: StateId, child: StateId) -> &mut Self {
        self.push_initial(composite, child, None)
    }

    /// Declares the default child together with an action run before entering it.
    pub fn initial_with<F>(&mut self, composite: StateId, child: StateId, action: F) -> &mut Self
    where
        F: Fn(&mut Scope<'_>, Option<&Event>) + Send + Sync + 'static,
    {
        self.push_initial(composite, child, Some(Action::new(action)))
    }

    fn push_initial(
        &mut self,
        composite: StateId,
        child: StateId,
        action: Option<Action>,
    ) -> &mut Self {
        self.check_id(child);
        if let Some(node) = self.node_mut(composite) {
            node.table.push(Transition {
                trigger: Trigger::Initial,
                guard: None,
                action,
                target: Target::State(child),
            });
        }
        self
    }

    /// Appends an entry to the state's transition table. Order matters:
    /// the first matching entry wins.
    pub fn transition(&mut self, state: StateId, transition: Transition) -> &mut Self {
        if let Target::State(target) = transition.target {
            self.check_id(target);
        }
        if let Trigger::ExplicitExit(_, source) = transition.trigger {
            self.check_id(source);
        }
        if let Some(node) = self.node_mut(state) {
            if let Trigger::StateTimeout(after) = transition.trigger {
                if node.timeout.is_some() {
                    let state = node.name.clone();
                    self.errors.push(GraphError::DuplicateTimeout { state });
                    return self;
                }
                node.timeout = Some(after);
            }
            node.table.push(transition);
        }
        self
    }

    /// Declares a region of an orthogonal state.
    pub fn region(&mut self, orthogonal: StateId, region: RegionSpec) -> &mut Self {
        self.check_id(region.root);
        if let Some(node) = self.node_mut(orthogonal) {
            node.regions.push(region);
        }
        self
    }

    /// Validates the graph, reporting every problem found.
    pub fn build(mut self) -> Result<StateGraph, BuildError> {
        if !self.errors.is_empty() {
            return Err(BuildError::InvalidGraph(self.errors));
        }
        if self.nodes.is_empty() {
            return Err(BuildError::InvalidGraph(vec![GraphError::Empty]));
        }

        self.link_references()?;
        assign_levels(&mut self.nodes)?;

        let graph = StateGraph { nodes: self.nodes };
        validate::graph(&graph, &self.fragments, self.max_depth)?;
        Ok(graph)
    }

    /// Hangs every referenced fragment under its reference's parent and
    /// points references to their fragment everywhere.
    fn link_references(&mut self) -> Result<(), BuildError> {
        let mut errors = Vec::new();
        let mut referenced = vec![false; self.nodes.len()];

        for index in 0..self.nodes.len() {
            let node = &self.nodes[index];
            if node.kind != StateKind::SubstateRef {
                continue;
            }
            let valid = node.alias.filter(|fragment| {
                self.fragments.contains(fragment) && !referenced[fragment.index()]
            });
            match valid {
                Some(fragment) => {
                    referenced[fragment.index()] = true;
                    let parent = node.parent;
                    self.nodes[fragment.index()].parent = parent;
                }
                None => errors.push(GraphError::SubstateTarget {
                    state: node.name.clone(),
                }),
            }
        }

        if !errors.is_empty() {
            return Err(BuildError::InvalidGraph(errors));
        }

        let aliases: Vec<Option<StateId>> = self.nodes.iter().map(|n| n.alias).collect();
        let resolve = |id: StateId| aliases[id.index()].unwrap_or(id);

        for node in &mut self.nodes {
            if node.kind != StateKind::SubstateRef {
                node.parent = node.parent.map(resolve);
            }
            for transition in &mut node.table {
                if let Target::State(target) = transition.target {
                    transition.target = Target::State(resolve(target));
                }
                if let Trigger::ExplicitExit(event, source) = transition.trigger {
                    transition.trigger = Trigger::ExplicitExit(event, resolve(source));
                }
            }
            for region in &mut node.regions {
                region.root = resolve(region.root);
            }
        }
        Ok(())
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn assign_levels(nodes: &mut [StateNode]) -> Result<(), BuildError> {
    let mut errors = Vec::new();
    let mut levels = Vec::with_capacity(nodes.len());

    for node in nodes.iter() {
        let mut level: usize = 0;
        let mut hops = 0;
        let mut cursor = node.parent;
        let mut cyclic = false;
        while let Some(parent) = cursor {
            hops += 1;
            if hops > nodes.len() {
                cyclic = true;
                break;
            }
            level += 1;
            cursor = nodes[parent.index()].parent;
        }
        if cyclic {
            errors.push(GraphError::Cycle {
                state: node.name.clone(),
            });
        }
        if node.kind.is_pseudo() {
            level = level.saturating_sub(1);
        }
        levels.push(level);
    }

    if !errors.is_empty() {
        return Err(BuildError::InvalidGraph(errors));
    }
    for (node, level) in nodes.iter_mut().zip(levels) {
        node.level = level;
    }
    Ok(())
}
