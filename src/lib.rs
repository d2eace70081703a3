//! Modkit - Runtime module activation for event-driven state stores
//!
//! This crate turns a monolithic reducer-over-a-state-tree design into one
//! that grows at runtime: application features ship as self-contained
//! modules (a state slice, a reducer, optional dependencies, an optional
//! background task), and the engine activates each module on demand, exactly
//! once, with its dependencies guaranteed active first.
//!
//! ## Architecture
//!
//! 1. [`module`] - immutable module descriptors, built once and shared
//! 2. [`machine`] - table-driven reducers assembled from per-event handlers
//! 3. [`compose`] - scoping and folding of module reducers into one chain
//! 4. [`activation`] - the claim registry and the orchestrator
//! 5. [`store`] - the event store the activation core plugs into
//! 6. [`engine`] - wiring facade and application-facing handle
//!
//! ## Design Principles
//!
//! 1. **Exactly-once activation**: the registry claim is the single dedup
//!    point, duplicate and concurrent requests collapse into one sequence
//! 2. **Slices stay private**: a non-root module's reducer only ever sees
//!    the subtree under its own key
//! 3. **Reducers stay pure**: all IO lives in background tasks, reduction is
//!    synchronous and serialized
//!
//! ## Example
//!
//! ```no_run
//! use modkit::{ActivationEngine, EngineConfig, Event, Machine, Module, Outcome};
//! use serde_json::{json, Value};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let engine = ActivationEngine::start(EngineConfig::default());
//!     let handle = engine.handle();
//!
//!     let counter = Module::builder("counter")
//!         .machine(
//!             Machine::builder("counter")
//!                 .on_activation(|_, _| Outcome::replace(json!({ "total": 0 })))
//!                 .on_event("ADD", |payload, _| {
//!                     let add = payload.get("value").and_then(Value::as_i64).unwrap_or(0);
//!                     Outcome::transform(move |slice| {
//!                         let total = slice.pointer("/total").and_then(Value::as_i64).unwrap_or(0);
//!                         json!({ "total": total + add })
//!                     })
//!                 })
//!                 .build(),
//!         )
//!         .build();
//!
//!     handle.request_activate(&counter)?;
//!     handle.await_active(counter.key()).await;
//!     handle.emit(Event::app("ADD", json!({ "value": 4 })))?;
//!     Ok(())
//! }
//! ```

pub mod activation;
pub mod compose;
pub mod config;
pub mod engine;
pub mod event;
pub mod machine;
pub mod module;
pub mod store;
pub mod traits;
pub mod utils;

pub use activation::{ActivationRegistry, ActivationStatus};
pub use compose::compose;
pub use config::EngineConfig;
pub use engine::{ActivationEngine, EngineHandle};
pub use event::{AppEvent, Event, EventType};
pub use machine::{Machine, MachineBuilder, Outcome};
pub use module::{Module, ModuleBuilder, ModuleKey};
pub use store::{Store, StoreHandle, TaskContext};
pub use traits::{
    ActivationError, BackgroundTask, Reducer, ReducerHost, TaskFn, TaskScheduler, TokioScheduler,
};
