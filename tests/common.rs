use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use modkit::{EngineHandle, Event, Machine, Module, Outcome, TaskScheduler};
use serde_json::{json, Value};
use tokio::sync::broadcast;

/// Counter module: initializes its slice to `{ "total": 0 }` on activation,
/// adds `payload.value` on ADD, resets on RESET, ignores NOOP explicitly.
pub fn counter_module(key: &str) -> Arc<Module> {
    Module::builder(key).machine(counter_machine(key)).build()
}

pub fn counter_machine(key: &str) -> Machine {
    Machine::builder(key)
        .on_activation(|_, _| Outcome::replace(json!({ "total": 0 })))
        .on_event("ADD", |payload, _| {
            let add = payload.get("value").and_then(Value::as_i64).unwrap_or(0);
            Outcome::transform(move |slice| {
                let total = slice.pointer("/total").and_then(Value::as_i64).unwrap_or(0);
                json!({ "total": total + add })
            })
        })
        .on_event("RESET", |_, _| Outcome::replace(json!({ "total": 0 })))
        .on_event("NOOP", |_, _| Outcome::noop())
        .build()
}

/// Module whose background task bumps `starts` once, so tests can count how
/// many times activation actually started it.
pub fn task_module(key: &str, starts: Arc<AtomicUsize>) -> Arc<Module> {
    Module::builder(key)
        .machine(counter_machine(key))
        .background_fn(move |_ctx| {
            let starts = starts.clone();
            async move {
                starts.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .build()
}

/// Scheduler that records the names of spawned tasks and still runs them.
pub struct RecordingScheduler {
    names: Mutex<Vec<String>>,
}

impl RecordingScheduler {
    pub fn new() -> Self {
        Self {
            names: Mutex::new(Vec::new()),
        }
    }

    pub fn spawned(&self) -> Vec<String> {
        self.names.lock().unwrap().clone()
    }
}

impl TaskScheduler for RecordingScheduler {
    fn spawn_task(&self, name: &str, fut: BoxFuture<'static, anyhow::Result<()>>) {
        self.names.lock().unwrap().push(name.to_string());
        tokio::spawn(fut);
    }
}

/// Drain `taps` until an event satisfies `stop`, returning everything seen
/// up to and including it. Panics after five seconds so a missing event
/// fails the test instead of hanging it.
pub async fn drain_until(
    taps: &mut broadcast::Receiver<Event>,
    stop: impl Fn(&Event) -> bool,
) -> Vec<Event> {
    let mut seen = Vec::new();
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), taps.recv())
            .await
            .expect("timed out draining event taps")
            .expect("event taps closed");
        let done = stop(&event);
        seen.push(event);
        if done {
            return seen;
        }
    }
}

/// Wait until the value at `pointer` in the state tree equals `expected`.
/// Panics after five seconds to keep a broken test from hanging.
pub async fn wait_for_state(handle: &EngineHandle, pointer: &str, expected: Value) {
    let mut state = handle.state();
    tokio::time::timeout(
        Duration::from_secs(5),
        state.wait_for(|s| s.pointer(pointer) == Some(&expected)),
    )
    .await
    .unwrap_or_else(|_| {
        panic!(
            "timed out waiting for {} == {}, state: {}",
            pointer,
            expected,
            handle.current_state()
        )
    })
    .unwrap();
}
