//! Orthogonal states: region applications on the parent thread and on
//! threads of their own.

use parking_lot::Mutex;
use statewright::builder::{simple_transition, GraphBuilder, TransitionBuilder};
use statewright::core::{Event, RegionSpec, StateGraph, StateId};
use statewright::engine::{AppId, Application, Scope};
use statewright::platform::{ManualTimers, Platform};
use statewright::{event_ids, Engine, EngineConfig, EngineError};
use std::sync::Arc;

event_ids! {
    LEAVE = 1;
    PING = 2;
}

type Log = Arc<Mutex<Vec<String>>>;

fn note(log: &Log, text: &'static str) -> impl Fn(&mut Scope<'_>, Option<&Event>) + Send + Sync {
    let log = Arc::clone(log);
    move |_, _| log.lock().push(text.to_string())
}

fn engine() -> Engine {
    Engine::new(
        EngineConfig::default(),
        Platform::new(Arc::new(ManualTimers::new())),
    )
}

/// Root > { O (orthogonal), Done }. Leaving O is triggered by `LEAVE`.
/// `regions` receives the builder and returns the region descriptors.
fn host_graph<F>(regions: F) -> (Arc<StateGraph>, StateId)
where
    F: FnOnce(&mut GraphBuilder) -> Vec<RegionSpec>,
{
    let mut builder = GraphBuilder::new();
    let root = builder.root("Host");
    let o = builder.orthogonal("O", root);
    let done = builder.leaf("Done", root);
    builder
        .initial(root, o)
        .transition(o, simple_transition(LEAVE, done));
    for region in regions(&mut builder) {
        builder.region(o, region);
    }
    (Arc::new(builder.build().unwrap()), root)
}

fn region_root(builder: &mut GraphBuilder, name: &str) -> StateId {
    let root = builder.root(name);
    let idle = builder.leaf(&format!("{}Idle", name), root);
    builder.initial(root, idle);
    root
}

fn names(engine: &Engine, apps: impl IntoIterator<Item = AppId>) -> Vec<String> {
    apps.into_iter()
        .filter_map(|app| engine.app(app).map(|a| a.name().to_string()))
        .collect()
}

#[test]
fn parent_thread_regions_are_children_of_a_synthetic_host() {
    let (graph, root) = host_graph(|builder| {
        let r1 = region_root(builder, "R1");
        let r2 = region_root(builder, "R2");
        vec![RegionSpec::new("R1", r1), RegionSpec::new("R2", r2)]
    });
    let mut engine = engine();
    let app = engine.create_app("Host", None, &graph, root);
    engine.activate(app, None).unwrap();

    let regions = engine.regions(app);
    assert_eq!(regions.len(), 2);
    assert_eq!(
        names(&engine, regions.iter().map(|r| r.app)),
        vec!["R1", "R2"]
    );
    for region in &regions {
        assert_eq!(&region.context, engine.handle());
        let ortho = engine.app(region.app).and_then(Application::parent).unwrap();
        let host = engine.app(ortho).unwrap();
        assert!(host.graph().is_none());
        assert_eq!(host.parent(), Some(app));
    }
    assert_eq!(engine.active_apps().count(), 4);
}

#[test]
fn leaving_the_orthogonal_state_removes_every_region() {
    let (graph, root) = host_graph(|builder| {
        let r1 = region_root(builder, "R1");
        let r2 = region_root(builder, "R2");
        vec![RegionSpec::new("R1", r1), RegionSpec::new("R2", r2)]
    });
    let mut engine = engine();
    let app = engine.create_app("Host", None, &graph, root);
    engine.activate(app, None).unwrap();

    assert!(engine.dispatch(&Event::int(LEAVE, 0, 0), app).unwrap());
    assert_eq!(engine.state_path(app), vec!["Host", "Done"]);
    assert!(engine.regions(app).is_empty());
    assert_eq!(names(&engine, engine.active_apps()), vec!["Host"]);
    assert!(engine.find_app("R1").is_none());
}

#[test]
fn replicated_regions_are_indexed() {
    let (graph, root) = host_graph(|builder| {
        let worker = region_root(builder, "Worker");
        vec![RegionSpec::new("Worker", worker).instances(3)]
    });
    let mut engine = engine();
    let app = engine.create_app("Host", None, &graph, root);
    engine.activate(app, None).unwrap();

    let regions = engine.regions(app);
    assert_eq!(
        names(&engine, regions.iter().map(|r| r.app)),
        vec!["Worker:0", "Worker:1", "Worker:2"]
    );
    let indices: Vec<_> = regions
        .iter()
        .filter_map(|r| engine.app(r.app).and_then(Application::region_index))
        .collect();
    assert_eq!(indices, vec![0, 1, 2]);
}

#[test]
fn broadcast_reaches_region_applications() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let (graph, root) = host_graph(|builder| {
        let r1 = builder.root("R1");
        let idle = builder.leaf("Idle", r1);
        let busy = builder.leaf("Busy", r1);
        builder
            .initial(r1, idle)
            .on_entry(busy, note(&log, "busy"))
            .transition(idle, simple_transition(PING, busy));
        vec![RegionSpec::new("R1", r1)]
    });
    let mut engine = engine();
    let app = engine.create_app("Host", None, &graph, root);
    engine.activate(app, None).unwrap();

    engine.deliver(&Event::int(PING, 0, 0)).unwrap();
    assert_eq!(*log.lock(), vec!["busy"]);
}

#[test]
fn host_application_can_be_deactivated_inside_an_orthogonal_state() {
    let (graph, root) = host_graph(|builder| {
        let r1 = region_root(builder, "R1");
        vec![RegionSpec::new("R1", r1)]
    });
    let mut engine = engine();
    let app = engine.create_app("Host", None, &graph, root);
    engine.activate(app, None).unwrap();

    assert!(engine.deactivate(app).unwrap());
    assert_eq!(engine.active_apps().count(), 0);
}

#[test]
fn separate_thread_region_runs_its_own_loop() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let (graph, root) = host_graph(|builder| {
        let net = builder.root("Net");
        let listening = builder.leaf("Listening", net);
        let answered = builder.leaf("Answered", net);
        let thread_log = Arc::clone(&log);
        builder
            .initial(net, listening)
            .on_entry(listening, move |_, _| {
                let name = std::thread::current().name().unwrap_or("").to_string();
                thread_log.lock().push(format!("listening on {}", name));
            })
            .on_entry(answered, note(&log, "answered"))
            .on_exit(net, note(&log, "net stopped"))
            .transition(
                listening,
                TransitionBuilder::on(PING).to(answered).build().unwrap(),
            );
        vec![RegionSpec::new("Net", net).separate_thread()]
    });
    let mut engine = engine();
    let app = engine.create_app("Host", None, &graph, root);
    engine.activate(app, None).unwrap();

    assert_eq!(*log.lock(), vec!["listening on Net"]);
    let regions = engine.regions(app);
    assert_eq!(regions.len(), 1);
    assert_ne!(&regions[0].context, engine.handle());

    engine
        .post_to(&regions[0].context, Event::int(PING, 0, 0))
        .unwrap();
    assert!(engine.dispatch(&Event::int(LEAVE, 0, 0), app).unwrap());

    assert_eq!(
        *log.lock(),
        vec!["listening on Net", "answered", "net stopped"]
    );
    assert!(engine.regions(app).is_empty());
    assert_eq!(engine.active_apps().count(), 1);
}

#[test]
fn failed_region_start_stops_the_regions_already_running() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let (graph, root) = host_graph(|builder| {
        let good = builder.root("Good");
        let serving = builder.leaf("Serving", good);
        builder
            .initial(good, serving)
            .on_entry(good, note(&log, "good started"))
            .on_exit(good, note(&log, "good stopped"));

        let bad = builder.root("Bad");
        let pick = builder.cond("Pick", bad, |_, _| 9);
        let never = builder.leaf("Never", bad);
        builder
            .initial(bad, pick)
            .transition(pick, TransitionBuilder::branch(1).to(never).build().unwrap());

        vec![
            RegionSpec::new("Good", good).separate_thread(),
            RegionSpec::new("Bad", bad),
        ]
    });
    let mut engine = engine();
    let app = engine.create_app("Host", None, &graph, root);

    let result = engine.activate(app, None);
    assert!(matches!(
        result,
        Err(EngineError::UnresolvedCondition { value: 9, .. })
    ));
    assert!(!engine.is_active(app));
    assert_eq!(engine.active_apps().count(), 0);
    assert!(engine.regions(app).is_empty());
    assert!(engine.find_app("Bad").is_none());
    assert!(engine.find_app("Host/O").is_none());
    assert_eq!(*log.lock(), vec!["good started", "good stopped"]);
}
