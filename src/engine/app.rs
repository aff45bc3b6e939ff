//! Application instances.
//!
//! An application is one running instance of a state machine: a root in a
//! shared graph plus the per-instance bookkeeping the engine needs.

use super::EngineError;
use crate::core::{StateGraph, StateId};
use crate::platform::{ContextHandle, TimerHandle};
use slotmap::new_key_type;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::thread::JoinHandle;

new_key_type! {
    /// Handle to an application owned by an [`Engine`](super::Engine).
    pub struct AppId;
}

/// Per-instance state of a running machine.
pub struct Application {
    pub(crate) name: String,
    pub(crate) region_index: Option<usize>,
    pub(crate) graph: Option<Arc<StateGraph>>,
    pub(crate) root: Option<StateId>,
    pub(crate) state: Option<StateId>,
    pub(crate) history: Option<StateId>,
    /// One slot per entered tree level; `Some` where that level armed a timeout.
    pub(crate) timers: Vec<Option<TimerHandle>>,
    pub(crate) data: Option<Box<dyn Any + Send>>,
    pub(crate) parent: Option<AppId>,
    pub(crate) active: bool,
    pub(crate) regions: Vec<RegionSet>,
}

impl Application {
    pub(crate) fn new(
        name: String,
        region_index: Option<usize>,
        graph: Option<Arc<StateGraph>>,
        root: Option<StateId>,
    ) -> Self {
        Self {
            name,
            region_index,
            graph,
            root,
            state: None,
            history: None,
            timers: Vec::new(),
            data: None,
            parent: None,
            active: false,
            regions: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Instance index when created for a replicated region.
    pub fn region_index(&self) -> Option<usize> {
        self.region_index
    }

    pub fn graph(&self) -> Option<&Arc<StateGraph>> {
        self.graph.as_ref()
    }

    pub fn root(&self) -> Option<StateId> {
        self.root
    }

    /// Current (innermost active) state.
    pub fn state(&self) -> Option<StateId> {
        self.state
    }

    pub fn state_name(&self) -> Option<&str> {
        match (&self.graph, self.state) {
            (Some(graph), Some(state)) => Some(graph.name(state)),
            _ => None,
        }
    }

    /// State the last external transition left.
    pub fn history(&self) -> Option<StateId> {
        self.history
    }

    /// Number of entered tree levels.
    pub fn depth(&self) -> usize {
        self.timers.len()
    }

    pub fn parent(&self) -> Option<AppId> {
        self.parent
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub(crate) fn reset(&mut self) {
        self.state = None;
        self.history = None;
        self.timers.clear();
        self.parent = None;
        self.regions.clear();
    }
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("name", &self.name)
            .field("state", &self.state_name())
            .field("depth", &self.depth())
            .field("active", &self.active)
            .field("parent", &self.parent)
            .finish()
    }
}

/// Region bookkeeping of one active orthogonal state.
pub(crate) struct RegionSet {
    pub(crate) state: StateId,
    pub(crate) ortho: AppId,
    pub(crate) remote: Vec<RemoteRegion>,
}

pub(crate) struct RemoteRegion {
    pub(crate) name: String,
    pub(crate) app: AppId,
    pub(crate) context: ContextHandle,
    pub(crate) worker: JoinHandle<Result<(), EngineError>>,
}

/// A region application and the context that runs it.
#[derive(Clone, Debug, PartialEq)]
pub struct RegionInfo {
    pub app: AppId,
    pub context: ContextHandle,
}
