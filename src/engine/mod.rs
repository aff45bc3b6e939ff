//! The per-thread runtime.
//!
//! An [`Engine`] owns the applications of one thread. It activates and
//! deactivates them, routes internal and external events to them, executes
//! the transitions their graphs declare and hosts the regions of their
//! orthogonal states.

mod app;
mod context;
mod dispatch;
mod error;
mod lifecycle;
mod ortho;
mod run;
mod scope;

pub use app::{AppId, Application, RegionInfo};
pub use context::{ArrivalHook, Engine, HandledHook};
pub use error::EngineError;
pub use run::PollOutcome;
pub use scope::Scope;
