//! Static validation of a linked state graph.
//!
//! Every check contributes a `Validation` so that a single build reports all
//! problems at once instead of stopping at the first.

use crate::builder::error::{BuildError, GraphError};
use crate::core::{StateGraph, StateId, StateKind, Target, Trigger};
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

type Check = Validation<(), NonEmptyVec<GraphError>>;

fn ensure(ok: bool, error: impl FnOnce() -> GraphError) -> Check {
    if ok {
        Validation::success(())
    } else {
        Validation::fail(error())
    }
}

pub(crate) fn graph(
    graph: &StateGraph,
    fragments: &[StateId],
    max_depth: usize,
) -> Result<(), BuildError> {
    let mut checks: Vec<Check> = Vec::new();

    for id in graph.ids() {
        let kind = graph.kind(id);
        if kind == StateKind::SubstateRef {
            continue;
        }
        checks.extend(structure(graph, id));
        checks.extend(table(graph, id));
        checks.extend(regions(graph, id, fragments));

        let depth = graph.level(id) + 1;
        checks.push(ensure(depth <= max_depth, || GraphError::TooDeep {
            state: graph.name(id).to_string(),
            depth,
            max: max_depth,
        }));
    }

    match Validation::all_vec(checks) {
        Validation::Success(_) => Ok(()),
        Validation::Failure(errors) => Err(BuildError::InvalidGraph(
            errors.iter().cloned().collect(),
        )),
    }
}

fn children(graph: &StateGraph, id: StateId) -> Vec<StateId> {
    graph
        .ids()
        .filter(|&child| graph.parent(child) == Some(id))
        .filter(|&child| graph.kind(child) != StateKind::SubstateRef)
        .collect()
}

/// Children, initial child and pseudo-state behaviour.
fn structure(graph: &StateGraph, id: StateId) -> Vec<Check> {
    let name = || graph.name(id).to_string();
    let kind = graph.kind(id);
    let children = children(graph, id);
    let initials: Vec<_> = graph
        .table(id)
        .iter()
        .filter(|t| t.trigger == Trigger::Initial)
        .collect();

    let mut checks = Vec::new();

    if !kind.is_composite() {
        checks.push(ensure(children.is_empty(), || GraphError::ChildOfNonComposite {
            state: name(),
            kind: format!("{:?}", kind),
        }));
        checks.push(ensure(initials.is_empty(), || {
            GraphError::InitialOnNonComposite { state: name() }
        }));
    } else if !children.is_empty() {
        checks.push(ensure(!initials.is_empty(), || GraphError::MissingInitial {
            state: name(),
        }));
        checks.push(ensure(initials.len() <= 1, || GraphError::DuplicateInitial {
            state: name(),
        }));
    }

    for initial in &initials {
        if let Target::State(child) = initial.target {
            checks.push(ensure(graph.parent(child) == Some(id), || {
                GraphError::InitialNotChild {
                    state: name(),
                    child: graph.name(child).to_string(),
                }
            }));
        }
    }

    if kind.is_pseudo() {
        let node = graph.state(id);
        checks.push(ensure(
            node.entry.is_none() && node.exit.is_none() && node.timeout.is_none(),
            || GraphError::PseudoBehaviour { state: name() },
        ));
    }

    checks
}

/// Transition table entries allowed for the state's kind.
fn table(graph: &StateGraph, id: StateId) -> Vec<Check> {
    let name = || graph.name(id).to_string();
    let kind = graph.kind(id);
    let entries = graph.table(id);
    let mut checks = Vec::new();

    let is_branch = |trigger: Trigger| matches!(trigger, Trigger::Branch(_) | Trigger::Else);

    match kind {
        StateKind::JoinPseudo => {
            let joins = entries.iter().filter(|t| t.trigger == Trigger::Join).count();
            checks.push(ensure(joins == 1, || GraphError::JoinTarget { state: name() }));
            checks.push(ensure(
                entries.iter().all(|t| t.trigger == Trigger::Join),
                || GraphError::PseudoTransition { state: name() },
            ));
        }
        StateKind::CondPseudo => {
            checks.push(ensure(entries.iter().any(|t| is_branch(t.trigger)), || {
                GraphError::CondWithoutBranches { state: name() }
            }));
            checks.push(ensure(entries.iter().all(|t| is_branch(t.trigger)), || {
                GraphError::PseudoTransition { state: name() }
            }));
        }
        _ => {
            checks.push(ensure(
                !entries
                    .iter()
                    .any(|t| is_branch(t.trigger) || t.trigger == Trigger::Join),
                || GraphError::MisplacedBranch { state: name() },
            ));
        }
    }

    for entry in entries {
        match (entry.trigger, entry.target) {
            (Trigger::ExplicitEntry(_), Target::State(child)) => {
                checks.push(ensure(graph.parent(child) == Some(id), || {
                    GraphError::ExplicitEntryNotChild {
                        state: name(),
                        child: graph.name(child).to_string(),
                    }
                }));
            }
            (Trigger::ExplicitExit(_, source), _) => {
                checks.push(ensure(source != id && graph.is_within(source, id), || {
                    GraphError::ExplicitExitOutside {
                        state: name(),
                        source_state: graph.name(source).to_string(),
                    }
                }));
            }
            _ => {}
        }
    }

    checks
}

fn regions(graph: &StateGraph, id: StateId, fragments: &[StateId]) -> Vec<Check> {
    let name = || graph.name(id).to_string();
    let declared = graph.regions(id);
    let mut checks = Vec::new();

    if graph.kind(id) != StateKind::Orthogonal {
        checks.push(ensure(declared.is_empty(), || {
            GraphError::RegionsOnNonOrthogonal { state: name() }
        }));
        return checks;
    }

    checks.push(ensure(!declared.is_empty(), || GraphError::MissingRegions {
        state: name(),
    }));

    for region in declared {
        let root = region.root;
        let detached = graph.parent(root).is_none()
            && graph.kind(root).is_composite()
            && !fragments.contains(&root);
        checks.push(ensure(detached, || GraphError::RegionRoot {
            state: name(),
            region: region.name.clone(),
        }));
        checks.push(ensure(region.instances > 0, || GraphError::RegionInstances {
            state: name(),
            region: region.name.clone(),
        }));
    }

    checks
}
