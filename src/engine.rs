//! Activation engine
//!
//! Wires a store and an orchestrator together on the current tokio runtime
//! and hands out a cloneable [`EngineHandle`] as the single entry point for
//! applications: request activations, emit events, observe state.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::activation::{ActivationOrchestrator, ActivationRegistry};
use crate::config::EngineConfig;
use crate::event::Event;
use crate::module::{Module, ModuleKey};
use crate::store::{Store, StoreHandle};
use crate::traits::{ActivationError, TaskScheduler, TokioScheduler};

/// A running store plus orchestrator pair.
pub struct ActivationEngine {
    handle: EngineHandle,
    store_task: JoinHandle<()>,
    orchestrator_task: JoinHandle<()>,
}

impl ActivationEngine {
    /// Start an engine on the current runtime with the default scheduler.
    pub fn start(config: EngineConfig) -> Self {
        Self::start_with_scheduler(config, Arc::new(TokioScheduler::new()))
    }

    /// Start an engine that hands background tasks to `scheduler`.
    pub fn start_with_scheduler(config: EngineConfig, scheduler: Arc<dyn TaskScheduler>) -> Self {
        let mut store = Store::new(&config);
        let store_handle = store.handle();
        let host = store.host();
        let feed = store
            .take_activation_feed()
            .expect("activation feed already taken");
        let registry = Arc::new(ActivationRegistry::new());
        let orchestrator = ActivationOrchestrator::new(
            registry.clone(),
            host,
            scheduler,
            store_handle.clone(),
            feed,
        );
        let store_task = tokio::spawn(store.run());
        let orchestrator_task = tokio::spawn(orchestrator.run());
        debug!("Activation engine started");
        Self {
            handle: EngineHandle {
                store: store_handle,
                registry,
            },
            store_task,
            orchestrator_task,
        }
    }

    /// Cloneable application-facing handle.
    pub fn handle(&self) -> EngineHandle {
        self.handle.clone()
    }

    /// Stop the dispatch and orchestration loops immediately. Events still
    /// queued are dropped; already-started background tasks keep running.
    pub fn shutdown(self) {
        self.store_task.abort();
        self.orchestrator_task.abort();
        debug!("Activation engine stopped");
    }
}

/// Application-facing handle to a running engine.
#[derive(Clone)]
pub struct EngineHandle {
    store: StoreHandle,
    registry: Arc<ActivationRegistry>,
}

impl EngineHandle {
    /// Request activation of `module` and everything it depends on.
    /// Idempotent: requesting an already claimed or active module is a no-op.
    pub fn request_activate(&self, module: &Arc<Module>) -> Result<(), ActivationError> {
        self.store.emit(Event::request_activate(module.clone()))
    }

    /// True once the module keyed `key` is fully active.
    pub fn is_active(&self, key: &ModuleKey) -> bool {
        self.registry.is_active(key)
    }

    /// Wait until the module keyed `key` is fully active. Resolves
    /// immediately if it already is; waits indefinitely if nothing ever
    /// activates it.
    pub async fn await_active(&self, key: &ModuleKey) {
        self.registry.wait_active(key).await
    }

    /// Keys of all fully active modules.
    pub fn active_modules(&self) -> Vec<ModuleKey> {
        self.registry.active_keys()
    }

    /// Emit an event into the store.
    pub fn emit(&self, event: Event) -> Result<(), ActivationError> {
        self.store.emit(event)
    }

    /// Observe every dispatched event. Slow subscribers lose events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.store.subscribe()
    }

    /// Watch the state tree.
    pub fn state(&self) -> watch::Receiver<Value> {
        self.store.state()
    }

    /// Snapshot of the current state tree.
    pub fn current_state(&self) -> Value {
        self.store.current_state()
    }
}
