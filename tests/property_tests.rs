//! Property-based tests for graphs and dispatch.
//!
//! These tests use proptest to verify properties hold across
//! many randomly generated state trees and event sequences.

use proptest::prelude::*;
use proptest::sample::Index;
use statewright::builder::{simple_transition, GraphBuilder, TransitionBuilder};
use statewright::core::{Event, EventId, StateGraph, StateId, StateKind};
use statewright::engine::Application;
use statewright::platform::{ManualTimers, Platform};
use statewright::{Engine, EngineConfig, EngineError};
use std::sync::Arc;
use std::time::Duration;

/// `parents[k]` is the parent of node `k + 1`; node 0 is the root.
#[derive(Clone, Debug)]
struct Shape {
    parents: Vec<usize>,
}

impl Shape {
    fn len(&self) -> usize {
        self.parents.len() + 1
    }

    fn has_children(&self, node: usize) -> bool {
        self.parents.contains(&node)
    }

    fn first_child(&self, node: usize) -> Option<usize> {
        self.parents.iter().position(|&p| p == node).map(|k| k + 1)
    }
}

prop_compose! {
    fn arbitrary_shape()(picks in prop::collection::vec(any::<Index>(), 1..10)) -> Shape {
        let parents = picks
            .iter()
            .enumerate()
            .map(|(k, pick)| pick.index(k + 1))
            .collect();
        Shape { parents }
    }
}

struct Built {
    graph: Arc<StateGraph>,
    root: StateId,
    leaves: Vec<StateId>,
}

/// Builds the tree described by `shape`. Every leaf gets a transition on
/// events 1 to 3 to a leaf picked from `wiring`; states flagged in
/// `timeouts` declare a state timeout.
fn build(shape: &Shape, timeouts: &[bool], wiring: &[usize]) -> Built {
    let mut builder = GraphBuilder::new();
    let mut ids = vec![builder.root("N0")];
    for (k, &parent) in shape.parents.iter().enumerate() {
        let name = format!("N{}", k + 1);
        let id = if shape.has_children(k + 1) {
            builder.composite(&name, ids[parent])
        } else {
            builder.leaf(&name, ids[parent])
        };
        ids.push(id);
    }
    for node in 0..shape.len() {
        if let Some(child) = shape.first_child(node) {
            builder.initial(ids[node], ids[child]);
        }
        if timeouts[node % timeouts.len()] {
            let after = Duration::from_millis(100 * (node as u64 + 1));
            builder.transition(
                ids[node],
                TransitionBuilder::timeout(after).internal().build().unwrap(),
            );
        }
    }

    let leaves: Vec<StateId> = (0..shape.len())
        .filter(|&node| !shape.has_children(node))
        .map(|node| ids[node])
        .collect();
    for (i, &leaf) in leaves.iter().enumerate() {
        for event in 0..3u32 {
            let pick = wiring[(i * 3 + event as usize) % wiring.len()];
            let target = leaves[pick % leaves.len()];
            builder.transition(leaf, simple_transition(EventId::new(event + 1), target));
        }
    }

    Built {
        graph: Arc::new(builder.build().unwrap()),
        root: ids[0],
        leaves,
    }
}

fn engine(timers: &Arc<ManualTimers>) -> Engine {
    Engine::new(EngineConfig::default(), Platform::new(timers.clone()))
}

proptest! {
    #[test]
    fn transition_paths_meet_below_the_common_ancestor(
        shape in arbitrary_shape(),
        from in any::<Index>(),
        to in any::<Index>(),
    ) {
        let built = build(&shape, &[false], &[0]);
        let graph = &built.graph;
        let ids: Vec<StateId> = graph.ids().collect();
        let from = ids[from.index(ids.len())];
        let to = ids[to.index(ids.len())];

        let (exits, entries) = graph.transition_path(from, to);
        prop_assert_eq!(exits.first().copied(), Some(from));
        prop_assert_eq!(entries.first().copied(), Some(to));

        let (last_exit, last_entry) = (exits[exits.len() - 1], entries[entries.len() - 1]);
        prop_assert!(
            last_exit == last_entry || graph.parent(last_exit) == graph.parent(last_entry)
        );
        for state in &exits {
            if entries.contains(state) {
                prop_assert_eq!(*state, last_exit);
                prop_assert_eq!(*state, last_entry);
            }
        }
        if from == to {
            prop_assert_eq!(exits.as_slice(), &[from][..]);
            prop_assert_eq!(entries.as_slice(), &[to][..]);
        }
    }

    #[test]
    fn depth_matches_level_after_every_dispatch(
        shape in arbitrary_shape(),
        timeouts in prop::collection::vec(any::<bool>(), 1..6),
        wiring in prop::collection::vec(any::<usize>(), 1..12),
        events in prop::collection::vec(1..=3u32, 1..20),
    ) {
        let built = build(&shape, &timeouts, &wiring);
        let graph = &built.graph;
        let timers = Arc::new(ManualTimers::new());
        let mut engine = engine(&timers);
        let app = engine.create_app("App", None, graph, built.root);
        engine.activate(app, None).unwrap();

        for id in events {
            engine.dispatch(&Event::int(EventId::new(id), 0, 0), app).unwrap();

            let record = engine.app(app).unwrap();
            let state = record.state().unwrap();
            prop_assert_eq!(graph.kind(state), StateKind::Leaf);
            prop_assert!(built.leaves.contains(&state));
            prop_assert_eq!(record.depth(), graph.level(state) + 1);

            let timed = graph
                .ancestors(state)
                .iter()
                .filter(|&&s| graph.timeout(s).is_some())
                .count();
            prop_assert_eq!(timers.armed().len(), timed);
        }
    }

    #[test]
    fn dispatch_is_deterministic(
        shape in arbitrary_shape(),
        wiring in prop::collection::vec(any::<usize>(), 1..12),
        events in prop::collection::vec(1..=3u32, 1..20),
    ) {
        let built = build(&shape, &[false], &wiring);
        let timers = Arc::new(ManualTimers::new());
        let mut left = engine(&timers);
        let mut right = engine(&timers);
        let a = left.create_app("App", None, &built.graph, built.root);
        let b = right.create_app("App", None, &built.graph, built.root);
        left.activate(a, None).unwrap();
        right.activate(b, None).unwrap();

        for id in events {
            let event = Event::int(EventId::new(id), 0, 0);
            let handled_left = left.dispatch(&event, a).unwrap();
            let handled_right = right.dispatch(&event, b).unwrap();
            prop_assert_eq!(handled_left, handled_right);
            prop_assert_eq!(left.state_path(a), right.state_path(b));
            prop_assert_eq!(
                left.app(a).and_then(Application::history),
                right.app(b).and_then(Application::history)
            );
        }
    }

    #[test]
    fn join_chains_respect_the_hop_bound(joins in 1usize..9, max_hops in 1usize..7) {
        let mut builder = GraphBuilder::new();
        let root = builder.root("Root");
        let start = builder.leaf("Start", root);
        let end = builder.leaf("End", root);
        let chain: Vec<StateId> = (0..joins)
            .map(|i| builder.join(&format!("J{}", i), root))
            .collect();
        builder
            .initial(root, start)
            .transition(start, simple_transition(EventId::new(1), chain[0]));
        for pair in chain.windows(2) {
            builder.transition(pair[0], TransitionBuilder::join().to(pair[1]).build().unwrap());
        }
        builder.transition(
            chain[joins - 1],
            TransitionBuilder::join().to(end).build().unwrap(),
        );
        let graph = Arc::new(builder.build().unwrap());

        let config = EngineConfig { max_pseudo_hops: max_hops, ..EngineConfig::default() };
        let mut engine = Engine::new(config, Platform::new(Arc::new(ManualTimers::new())));
        let app = engine.create_app("Root", None, &graph, root);
        engine.activate(app, None).unwrap();

        let result = engine.dispatch(&Event::int(EventId::new(1), 0, 0), app);
        if joins <= max_hops {
            prop_assert!(result.unwrap());
            prop_assert_eq!(engine.state_path(app), vec!["Root", "End"]);
        } else {
            let is_loop = matches!(result, Err(EngineError::PseudoStateLoop { .. }));
            prop_assert!(is_loop);
        }
    }

    #[test]
    fn application_is_on_the_active_stack_only_while_active(count in 1usize..6) {
        let built = build(&Shape { parents: vec![0] }, &[false], &[0]);
        let timers = Arc::new(ManualTimers::new());
        let mut engine = engine(&timers);
        let apps: Vec<_> = (0..count)
            .map(|i| engine.create_app(&format!("App{}", i), None, &built.graph, built.root))
            .collect();

        for &app in &apps {
            prop_assert!(!engine.active_apps().any(|a| a == app));
            engine.activate(app, None).unwrap();
            prop_assert!(engine.active_apps().any(|a| a == app));
        }
        for &app in apps.iter().rev() {
            engine.deactivate(app).unwrap();
            prop_assert!(!engine.active_apps().any(|a| a == app));
        }
    }
}
