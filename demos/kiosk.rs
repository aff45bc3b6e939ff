//! Kiosk
//!
//! Two applications sharing one thread, one of which starts orthogonal
//! regions while it runs.
//!
//! Key concepts:
//! - Orthogonal regions on the parent thread and on a thread of their own
//! - Broadcast events offered to every active application
//! - UI events routed to the focused application only
//! - Focus notifications delivered as SET_FOCUS / KILL_FOCUS
//!
//! Run with: cargo run --example kiosk

use statewright::builder::{internal_transition, simple_transition, GraphBuilder};
use statewright::core::{Category, Event, EventId, RegionSpec};
use statewright::engine::Scope;
use statewright::platform::Platform;
use statewright::{event_ids, Engine, EngineConfig};
use std::sync::Arc;

event_ids! {
    START = 1;
    SHOW = 2;
    PING = 3;
    KEY = 4;
    STOP = 5;
}

fn say(text: &'static str) -> impl Fn(&mut Scope<'_>, Option<&Event>) + Send + Sync {
    move |scope, _| println!("  [{}] {}", scope.name(), text)
}

fn key(code: u32) -> Event {
    Event::int(KEY, code, 0).with_category(Category::Ui)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Kiosk ===\n");

    let mut builder = GraphBuilder::new();

    let kiosk = builder.root("Kiosk");
    let booting = builder.leaf("Booting", kiosk);
    let running = builder.orthogonal("Running", kiosk);
    let off = builder.leaf("Off", kiosk);
    builder
        .initial(kiosk, booting)
        .transition(booting, simple_transition(START, running))
        .transition(running, simple_transition(STOP, off))
        .transition(kiosk, internal_transition(EventId::SET_FOCUS, say("has focus")))
        .transition(kiosk, internal_transition(EventId::KILL_FOCUS, say("lost focus")))
        .transition(
            kiosk,
            internal_transition(KEY, |scope, event| {
                let code = event.and_then(Event::params).map_or(0, |(code, _)| code);
                println!("  [{}] key {}", scope.name(), code);
            }),
        )
        .on_entry(running, say("running"))
        .on_entry(off, say("off"));

    let screen = builder.root("Screen");
    let dark = builder.leaf("Dark", screen);
    let lit = builder.leaf("Lit", screen);
    builder
        .initial(screen, dark)
        .transition(dark, simple_transition(SHOW, lit))
        .on_entry(lit, say("showing the menu"))
        .on_exit(screen, say("screen off"));

    let uplink = builder.root("Uplink");
    let offline = builder.leaf("Offline", uplink);
    let online = builder.leaf("Online", uplink);
    builder
        .initial(uplink, offline)
        .transition(offline, simple_transition(PING, online))
        .on_entry(online, |scope, _| {
            let thread = std::thread::current().name().unwrap_or("?").to_string();
            println!("  [{}] online, answering on thread '{}'", scope.name(), thread);
        })
        .on_exit(uplink, say("uplink closed"));

    builder
        .region(running, RegionSpec::new("Screen", screen))
        .region(running, RegionSpec::new("Uplink", uplink).separate_thread());

    let console = builder.root("Console");
    let idle = builder.leaf("Idle", console);
    builder
        .initial(console, idle)
        .transition(console, internal_transition(EventId::SET_FOCUS, say("has focus")))
        .transition(console, internal_transition(EventId::KILL_FOCUS, say("lost focus")))
        .transition(
            idle,
            internal_transition(KEY, |scope, event| {
                let code = event.and_then(Event::params).map_or(0, |(code, _)| code);
                println!("  [{}] key {}", scope.name(), code);
            }),
        );

    let graph = Arc::new(builder.build()?);

    let config = EngineConfig {
        focus_on_activate: true,
        ..EngineConfig::default()
    };
    let mut engine = Engine::new(config, Platform::standard()?);
    let kiosk_app = engine.create_app("Kiosk", None, &graph, kiosk);
    let console_app = engine.create_app("Console", None, &graph, console);

    println!("Activating:");
    engine.activate(kiosk_app, None)?;
    engine.activate(console_app, None)?;

    println!("\nStarting the kiosk:");
    engine.handle().post(Event::int(START, 0, 0))?;
    engine.poll()?;
    for region in engine.regions(kiosk_app) {
        let name = engine.app(region.app).map_or("?", |app| app.name());
        let place = if &region.context == engine.handle() {
            "this thread"
        } else {
            "its own thread"
        };
        println!("  region {} runs on {}", name, place);
    }

    println!("\nBroadcast and region traffic:");
    engine.handle().post(Event::int(SHOW, 0, 0))?;
    engine.poll()?;
    if let Some(uplink) = engine.regions(kiosk_app).into_iter().find(|r| &r.context != engine.handle()) {
        engine.post_to(&uplink.context, Event::int(PING, 0, 0))?;
    }

    println!("\nKeys follow the focus:");
    engine.handle().post(key(7))?;
    engine.poll()?;
    engine.set_focus(kiosk_app)?;
    engine.handle().post(key(8))?;
    engine.poll()?;

    println!("\nStopping:");
    engine.handle().post(Event::int(STOP, 0, 0))?;
    engine.poll()?;
    for (app, path) in engine.snapshot() {
        println!("  {} is in {}", app, path.join(" > "));
    }
    engine.deactivate(console_app)?;
    engine.deactivate(kiosk_app)?;

    println!("\n=== Example Complete ===");
    Ok(())
}
