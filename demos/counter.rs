//! Example: a counter application assembled from modules
//!
//! Demonstrates the full activation flow: a `counter` module with a
//! table-driven reducer, a `ticker` module that depends on it and feeds it
//! ADD events from a background task, and an observer printing the state
//! tree as it changes.

use std::time::Duration;

use modkit::{ActivationEngine, EngineConfig, Event, Machine, Module, Outcome};
use serde_json::{json, Value};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging using standard utility (respects RUST_LOG)
    modkit::utils::init_logging(None);

    let engine = ActivationEngine::start(EngineConfig::default());
    let handle = engine.handle();

    let counter = Module::builder("counter")
        .machine(
            Machine::builder("counter")
                .on_activation(|_, _| Outcome::replace(json!({ "total": 0 })))
                .on_event("ADD", |payload, _| {
                    let add = payload.get("value").and_then(Value::as_i64).unwrap_or(0);
                    Outcome::transform(move |slice| {
                        let total = slice.pointer("/total").and_then(Value::as_i64).unwrap_or(0);
                        json!({ "total": total + add })
                    })
                })
                .build(),
        )
        .build();

    let ticker = Module::builder("ticker")
        .depends_on(&counter)
        .machine(
            Machine::builder("ticker")
                .on_activation(|_, _| Outcome::replace(json!({ "running": true })))
                .build(),
        )
        .background_fn(|ctx| async move {
            for _ in 0..5 {
                ctx.emit(Event::app("ADD", json!({ "value": 1 })))?;
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
            Ok(())
        })
        .build();

    // One request brings up the whole dependency chain.
    handle.request_activate(&ticker)?;
    handle.await_active(ticker.key()).await;
    println!("modules active: {:?}", handle.active_modules());

    let mut state = handle.state();
    loop {
        state.changed().await?;
        let snapshot = state.borrow_and_update().clone();
        println!("state: {}", snapshot);
        if snapshot.pointer("/counter/total") == Some(&json!(5)) {
            break;
        }
    }

    engine.shutdown();
    Ok(())
}
