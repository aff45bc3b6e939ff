//! Build errors for state graphs and transitions.

use thiserror::Error;

/// Errors that can occur when building graphs and transitions.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Transition target not specified. Call .to(state) or .internal()")]
    MissingTarget,

    #[error("{0} transitions must name a destination state")]
    InternalNotAllowed(&'static str),

    #[error("Invalid state graph: {}", describe(.0))]
    InvalidGraph(Vec<GraphError>),
}

impl BuildError {
    /// Every graph problem reported by validation, empty for other errors.
    pub fn graph_errors(&self) -> &[GraphError] {
        match self {
            BuildError::InvalidGraph(errors) => errors,
            _ => &[],
        }
    }
}

fn describe(errors: &[GraphError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A static-graph invariant violation found by validation.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("graph has no states")]
    Empty,

    #[error("state id {id} does not exist")]
    UnknownState { id: usize },

    #[error("composite '{state}' has children but no initial child")]
    MissingInitial { state: String },

    #[error("composite '{state}' declares more than one initial child")]
    DuplicateInitial { state: String },

    #[error("initial child '{child}' of '{state}' is not one of its children")]
    InitialNotChild { state: String, child: String },

    #[error("state '{state}' declares an initial child but cannot have children")]
    InitialOnNonComposite { state: String },

    #[error("state '{state}' of kind {kind} cannot have children")]
    ChildOfNonComposite { state: String, kind: String },

    #[error("join state '{state}' must have exactly one outgoing transition")]
    JoinTarget { state: String },

    #[error("conditional state '{state}' has no branches")]
    CondWithoutBranches { state: String },

    #[error("pseudo state '{state}' only accepts branch and join transitions")]
    PseudoTransition { state: String },

    #[error("branch or join transition declared on ordinary state '{state}'")]
    MisplacedBranch { state: String },

    #[error("pseudo state '{state}' cannot have entry, exit or timeout behaviour")]
    PseudoBehaviour { state: String },

    #[error("explicit entry of '{state}' targets '{child}', which is not a direct child")]
    ExplicitEntryNotChild { state: String, child: String },

    #[error("explicit exit declared on '{state}' names '{source_state}', which is not beneath it")]
    ExplicitExitOutside { state: String, source_state: String },

    #[error("state '{state}' declares more than one timeout")]
    DuplicateTimeout { state: String },

    #[error("orthogonal state '{state}' declares no regions")]
    MissingRegions { state: String },

    #[error("region '{region}' of '{state}' must have a detached root state")]
    RegionRoot { state: String, region: String },

    #[error("region '{region}' of '{state}' declares zero instances")]
    RegionInstances { state: String, region: String },

    #[error("regions declared on non-orthogonal state '{state}'")]
    RegionsOnNonOrthogonal { state: String },

    #[error("substate reference '{state}' must alias an unreferenced fragment")]
    SubstateTarget { state: String },

    #[error("state '{state}' is nested {depth} levels deep, the limit is {max}")]
    TooDeep {
        state: String,
        depth: usize,
        max: usize,
    },

    #[error("state '{state}' is its own ancestor")]
    Cycle { state: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_graph_lists_every_problem() {
        let error = BuildError::InvalidGraph(vec![
            GraphError::MissingInitial {
                state: "Root".to_string(),
            },
            GraphError::JoinTarget {
                state: "J".to_string(),
            },
        ]);
        let message = error.to_string();
        assert!(message.contains("'Root' has children but no initial child"));
        assert!(message.contains("join state 'J'"));
        assert_eq!(error.graph_errors().len(), 2);
    }

    #[test]
    fn other_errors_have_no_graph_errors() {
        assert!(BuildError::MissingTarget.graph_errors().is_empty());
    }
}
