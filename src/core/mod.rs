//! Core state graph types.
//!
//! Everything in this module is immutable once built: events, state
//! descriptors, guards and actions, the state graph itself and trace records.

mod action;
mod event;
mod graph;
mod guard;
mod history;
mod state;

pub use action::{Action, Condition};
pub use event::{Category, Event, EventId, Origin, Payload};
pub use graph::{StateGraph, StatePath, Target, Transition, Trigger};
pub use guard::Guard;
pub use history::{TraceLog, TraceReason, TraceRecord};
pub use state::{RegionSpec, RunMode, StateId, StateKind, StateNode};
