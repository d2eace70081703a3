//! Event store
//!
//! A minimal event-driven state store for the activation core to plug into:
//! one dispatch task owns the state tree and applies the installed reducer
//! to each event in arrival order. Reduction is synchronous, so every state
//! transition for event N is finished before event N+1 is looked at, and a
//! reducer swap takes effect only between events.
//!
//! Activation requests are control-plane traffic: they are forwarded to the
//! orchestrator on a lossless channel and never shown to reducers. Every
//! event, control plane included, is mirrored to lossy observer taps, and
//! each new state is published on a watch channel.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, error, trace};

use crate::compose::identity;
use crate::config::EngineConfig;
use crate::event::Event;
use crate::module::ModuleKey;
use crate::traits::{ActivationError, Reducer, ReducerHost};

/// Holder of the store's active reducer, swappable between events.
pub struct ReducerSlot {
    current: Mutex<Arc<dyn Reducer>>,
}

impl ReducerSlot {
    fn new() -> Self {
        Self {
            current: Mutex::new(identity()),
        }
    }

    fn get(&self) -> Arc<dyn Reducer> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ReducerHost for ReducerSlot {
    fn install_reducer(&self, reducer: Arc<dyn Reducer>) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = reducer;
    }
}

/// Handle for emitting events into the store and observing it from outside.
#[derive(Clone)]
pub struct StoreHandle {
    inbox_tx: mpsc::UnboundedSender<Event>,
    taps: broadcast::Sender<Event>,
    state_rx: watch::Receiver<Value>,
}

impl StoreHandle {
    /// Enqueue `event` for dispatch. Never blocks.
    pub fn emit(&self, event: Event) -> Result<(), ActivationError> {
        self.inbox_tx
            .send(event)
            .map_err(|err| ActivationError::EmitFailed(err.0.name().to_string()))
    }

    /// Observe every dispatched event. Slow subscribers lose events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.taps.subscribe()
    }

    /// Watch the state tree. The receiver always holds the latest state.
    pub fn state(&self) -> watch::Receiver<Value> {
        self.state_rx.clone()
    }

    /// Snapshot of the current state tree.
    pub fn current_state(&self) -> Value {
        self.state_rx.borrow().clone()
    }
}

/// Capabilities handed to a module's background task.
#[derive(Clone)]
pub struct TaskContext {
    module: ModuleKey,
    handle: StoreHandle,
}

impl TaskContext {
    pub(crate) fn new(module: ModuleKey, handle: StoreHandle) -> Self {
        Self { module, handle }
    }

    /// Key of the module that owns this task.
    pub fn module(&self) -> &ModuleKey {
        &self.module
    }

    pub fn emit(&self, event: Event) -> Result<(), ActivationError> {
        self.handle.emit(event)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.handle.subscribe()
    }

    pub fn state(&self) -> watch::Receiver<Value> {
        self.handle.state()
    }

    pub fn current_state(&self) -> Value {
        self.handle.current_state()
    }
}

/// Event store with a swappable reducer.
pub struct Store {
    state: Value,
    reducer: Arc<ReducerSlot>,
    inbox: mpsc::UnboundedReceiver<Event>,
    inbox_tx: mpsc::UnboundedSender<Event>,
    feed_tx: mpsc::UnboundedSender<Event>,
    feed_rx: Option<mpsc::UnboundedReceiver<Event>>,
    taps: broadcast::Sender<Event>,
    state_tx: watch::Sender<Value>,
}

impl Store {
    pub fn new(config: &EngineConfig) -> Self {
        let (inbox_tx, inbox) = mpsc::unbounded_channel();
        let (feed_tx, feed_rx) = mpsc::unbounded_channel();
        // broadcast requires capacity >= 1
        let (taps, _) = broadcast::channel(config.tap_capacity.max(1));
        let (state_tx, _) = watch::channel(config.initial_state.clone());
        Self {
            state: config.initial_state.clone(),
            reducer: Arc::new(ReducerSlot::new()),
            inbox,
            inbox_tx,
            feed_tx,
            feed_rx: Some(feed_rx),
            taps,
            state_tx,
        }
    }

    /// Emitter/observer handle, cloneable and usable from any task.
    pub fn handle(&self) -> StoreHandle {
        StoreHandle {
            inbox_tx: self.inbox_tx.clone(),
            taps: self.taps.clone(),
            state_rx: self.state_tx.subscribe(),
        }
    }

    /// The reducer installation seam for the orchestrator.
    pub fn host(&self) -> Arc<dyn ReducerHost> {
        self.reducer.clone()
    }

    /// The lossless stream of activation requests. Can only be taken once.
    pub fn take_activation_feed(&mut self) -> Option<mpsc::UnboundedReceiver<Event>> {
        self.feed_rx.take()
    }

    /// Run the dispatch loop until every emitter handle is dropped.
    ///
    /// For each event: apply the installed reducer (activation requests are
    /// skipped, they carry no state meaning), publish the new state, then
    /// forward the event to the orchestrator feed and the observer taps. A
    /// panicking reducer is logged and the event's transition discarded;
    /// the store keeps running on the previous state.
    pub async fn run(self) {
        let Self {
            mut state,
            reducer: slot,
            mut inbox,
            inbox_tx,
            feed_tx,
            feed_rx,
            taps,
            state_tx,
        } = self;
        // The store's own sender copy would keep the inbox open forever;
        // only the external handles decide when the loop ends.
        drop(inbox_tx);
        drop(feed_rx);
        debug!("Store dispatch loop started");
        while let Some(event) = inbox.recv().await {
            trace!("Dispatching \"{}\"", event.name());
            if !matches!(event, Event::RequestActivate { .. }) {
                let reducer = slot.get();
                let previous = state.clone();
                match catch_unwind(AssertUnwindSafe(|| reducer.reduce(previous, &event))) {
                    Ok(next) => {
                        state = next;
                        state_tx.send_replace(state.clone());
                    }
                    Err(_) => {
                        error!(
                            "Reducer panicked on \"{}\", state left unchanged",
                            event.name()
                        );
                    }
                }
            }
            if matches!(event, Event::RequestActivate { .. })
                && feed_tx.send(event.clone()).is_err()
            {
                debug!("Activation feed receiver dropped, request ignored");
            }
            // Lossy by design of the broadcast channel; a send error only
            // means nobody is listening right now.
            let _ = taps.send(event);
        }
        debug!("Store inbox closed, dispatch loop stopping");
    }
}
