//! Statewright: a hierarchical state machine engine
//!
//! State graphs are declared once with the builder and shared, immutable,
//! between any number of application instances. Each thread runs an
//! [`Engine`] that activates applications, routes events to them and
//! executes the transitions their graphs declare.
//!
//! # Core Concepts
//!
//! - **Graph**: Composite, leaf, orthogonal and pseudo states with
//!   per-state transition tables, built and validated by [`GraphBuilder`]
//! - **Application**: One running instance of a graph, tracking its current
//!   state, history and armed state timers
//! - **Engine**: A thread's context with its active applications, internal
//!   event queue and mailbox
//! - **Platform**: The event source, cross-thread poster and timer provider
//!   an engine runs with
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use statewright::builder::{simple_transition, GraphBuilder};
//! use statewright::platform::{ManualTimers, Platform};
//! use statewright::{event_ids, Engine, EngineConfig, Event};
//!
//! event_ids! {
//!     OPEN = 1;
//!     CLOSE = 2;
//! }
//!
//! let mut builder = GraphBuilder::new();
//! let door = builder.root("Door");
//! let closed = builder.leaf("Closed", door);
//! let open = builder.leaf("Open", door);
//! builder
//!     .initial(door, closed)
//!     .transition(closed, simple_transition(OPEN, open))
//!     .transition(open, simple_transition(CLOSE, closed));
//! let graph = Arc::new(builder.build().unwrap());
//!
//! let mut engine = Engine::new(EngineConfig::default(), Platform::new(Arc::new(ManualTimers::new())));
//! let app = engine.create_app("Door", None, &graph, door);
//! engine.activate(app, None).unwrap();
//!
//! engine.handle().post(Event::int(OPEN, 0, 0)).unwrap();
//! engine.poll().unwrap();
//! assert_eq!(engine.state_path(app), vec!["Door", "Open"]);
//! ```

pub mod builder;
pub mod config;
pub mod core;
pub mod engine;
pub mod platform;

// Re-export commonly used types
pub use builder::{BuildError, GraphBuilder, TransitionBuilder};
pub use config::{ConfigError, EngineConfig};
pub use core::{Event, EventId, StateGraph, StateId};
pub use engine::{AppId, Engine, EngineError, Scope};
