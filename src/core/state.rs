//! State descriptors.
//!
//! States are nodes of an immutable arena owned by a [`StateGraph`](super::StateGraph)
//! and referenced by [`StateId`]. A node knows its kind, its parent, its
//! entry/exit behaviour and its ordered transition table.

use super::action::{Action, Condition};
use super::graph::Transition;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Index of a state inside its graph.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub struct StateId(pub(crate) u32);

impl StateId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The role a state plays in the hierarchy.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum StateKind {
    Leaf,
    Composite,
    /// Composite whose entry spawns concurrently running regions.
    Orthogonal,
    /// Alias of a composite fragment defined elsewhere in the graph.
    SubstateRef,
    /// Pseudo state choosing its outgoing branch by a condition value.
    CondPseudo,
    /// Pseudo state with a single outgoing transition.
    JoinPseudo,
}

impl StateKind {
    /// Pseudo states are transient: they occupy no depth and own no timer.
    pub fn is_pseudo(self) -> bool {
        matches!(self, Self::CondPseudo | Self::JoinPseudo)
    }

    pub fn is_composite(self) -> bool {
        matches!(self, Self::Composite | Self::Orthogonal)
    }
}

/// Where a region instance runs.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub enum RunMode {
    /// Driven by the run loop of the thread that entered the orthogonal state.
    #[default]
    ParentThread,
    /// Driven by a dedicated thread with its own run loop.
    SeparateThread,
}

/// A concurrently active sub-machine declared on an orthogonal state.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct RegionSpec {
    pub name: String,
    /// Root of the region's machine. Must be a detached root of the same graph.
    pub root: StateId,
    pub instances: usize,
    pub mode: RunMode,
    /// Requested scheduling priority for separate-thread regions.
    pub priority: Option<i32>,
}

impl RegionSpec {
    pub fn new(name: impl Into<String>, root: StateId) -> Self {
        Self {
            name: name.into(),
            root,
            instances: 1,
            mode: RunMode::ParentThread,
            priority: None,
        }
    }

    pub fn instances(mut self, count: usize) -> Self {
        self.instances = count;
        self
    }

    pub fn separate_thread(mut self) -> Self {
        self.mode = RunMode::SeparateThread;
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Region application name for an instance: `name:idx` when the region
    /// declares several instances, `name` otherwise.
    pub fn instance_name(&self, index: usize) -> String {
        if self.instances > 1 {
            format!("{}:{}", self.name, index)
        } else {
            self.name.clone()
        }
    }
}

/// A node of the state graph.
pub struct StateNode {
    pub(crate) name: String,
    pub(crate) kind: StateKind,
    pub(crate) parent: Option<StateId>,
    pub(crate) entry: Option<Action>,
    pub(crate) exit: Option<Action>,
    pub(crate) condition: Option<Condition>,
    pub(crate) table: Vec<Transition>,
    pub(crate) regions: Vec<RegionSpec>,
    pub(crate) alias: Option<StateId>,
    pub(crate) timeout: Option<Duration>,
    pub(crate) level: usize,
}

impl StateNode {
    pub(crate) fn new(name: String, kind: StateKind, parent: Option<StateId>) -> Self {
        Self {
            name,
            kind,
            parent,
            entry: None,
            exit: None,
            condition: None,
            table: Vec::new(),
            regions: Vec::new(),
            alias: None,
            timeout: None,
            level: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> StateKind {
        self.kind
    }

    pub fn parent(&self) -> Option<StateId> {
        self.parent
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.table
    }

    pub fn regions(&self) -> &[RegionSpec] {
        &self.regions
    }

    /// Built-in timeout armed while this state is active.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Zero-based tree level. Pseudo states report the level of their parent.
    pub fn level(&self) -> usize {
        self.level
    }
}

impl fmt::Debug for StateNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateNode")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("parent", &self.parent)
            .field("transitions", &self.table.len())
            .field("regions", &self.regions)
            .finish()
    }
}
