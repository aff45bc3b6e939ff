//! Traffic Light
//!
//! A cyclic machine driven entirely by state timeouts.
//!
//! Key concepts:
//! - Built-in state timers armed on entry and cancelled on exit
//! - Per-application data updated from entry actions
//! - The blocking run loop, stopped by an exit request
//!
//! Run with: cargo run --example traffic_light

use statewright::builder::{GraphBuilder, TransitionBuilder};
use statewright::core::{Event, EventId};
use statewright::platform::Platform;
use statewright::{Engine, EngineConfig};
use std::sync::Arc;
use std::time::{Duration, Instant};

const CYCLES: u32 = 3;

struct Light {
    started: Instant,
    cycles: u32,
}

fn after(millis: u64) -> TransitionBuilder {
    TransitionBuilder::timeout(Duration::from_millis(millis))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Traffic Light ===\n");

    let mut builder = GraphBuilder::new();
    let light = builder.root("Light");
    let red = builder.leaf("Red", light);
    let green = builder.leaf("Green", light);
    let yellow = builder.leaf("Yellow", light);
    builder
        .initial(light, red)
        .transition(red, after(300).to(green).build()?)
        .transition(green, after(300).to(yellow).build()?)
        .transition(yellow, after(100).to(red).build()?);
    for state in [red, green, yellow] {
        builder.on_entry(state, |scope, _| {
            let elapsed = scope
                .data::<Light>()
                .map_or(0, |light| light.started.elapsed().as_millis());
            println!("  {:>6} ms  {}", elapsed, scope.state_name().unwrap_or("?"));
        });
    }
    builder.on_exit(yellow, |scope, _| {
        let cycles = scope.data_mut::<Light>().map_or(CYCLES, |light| {
            light.cycles += 1;
            light.cycles
        });
        if cycles >= CYCLES {
            let context = scope.context().clone();
            let _ = scope.post_to(&context, Event::int(EventId::EXIT_LOOP, 0, 0));
        }
    });
    let graph = Arc::new(builder.build()?);

    let mut engine = Engine::new(EngineConfig::default(), Platform::standard()?);
    let app = engine.create_app("Light", None, &graph, light);
    engine.set_app_data(
        app,
        Light {
            started: Instant::now(),
            cycles: 0,
        },
    );

    println!("Cycling {} times:", CYCLES);
    engine.activate(app, None)?;
    engine.run()?;
    engine.deactivate(app)?;

    println!("\n=== Example Complete ===");
    Ok(())
}
