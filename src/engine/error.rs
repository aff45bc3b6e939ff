//! Fatal engine errors.
//!
//! Ordinary dispatch outcomes (no handler, guard rejection, inactive
//! application) are reported as `Ok(false)`. The variants here are
//! configuration and resource errors. A failed dispatch leaves the
//! application in an undefined state; a failed activation is rolled back.

use crate::platform::PostError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("application '{app}' cannot start: {reason}")]
    InvalidRoot { app: String, reason: String },

    #[error("application '{app}' is {depth} states deep; the limit is {max}")]
    TreeTooDeep {
        app: String,
        depth: usize,
        max: usize,
    },

    #[error("application '{app}' exceeded {max} pseudo-state hops at '{state}'")]
    PseudoStateLoop {
        app: String,
        state: String,
        max: usize,
    },

    #[error("conditional state '{state}' of '{app}' has no branch for value {value} and no else branch")]
    UnresolvedCondition {
        app: String,
        state: String,
        value: u32,
    },

    #[error("join state '{state}' of '{app}' has no outgoing transition")]
    JoinWithoutTarget { app: String, state: String },

    #[error("could not start the timeout timer of state '{state}' in '{app}'")]
    TimerStart { app: String, state: String },

    #[error("could not spawn the thread of region '{region}': {source}")]
    RegionSpawn {
        region: String,
        #[source]
        source: std::io::Error,
    },

    #[error("region '{region}' failed to start: {reason}")]
    RegionStart { region: String, reason: String },

    #[error("the thread of region '{region}' could not be joined")]
    RegionJoin { region: String },

    #[error("could not post to region '{region}': {source}")]
    Post {
        region: String,
        #[source]
        source: PostError,
    },
}
