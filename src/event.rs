//! Event model
//!
//! Three event flavors flow through the store. `RequestActivate` is a
//! control-plane event consumed by the orchestrator and never shown to
//! reducers. `ActivationComplete` is emitted by the orchestrator exactly once
//! per module, after that module's reducer is installed, so the module's own
//! machine can observe it. `App` events are ordinary application events with
//! a string kind and a JSON payload chosen by the producer.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::module::{Module, ModuleKey};

/// Kind of event a machine handler can subscribe to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventType {
    /// The owning module finished activating.
    ActivationComplete,
    /// Application event with the given kind string.
    App(String),
}

impl EventType {
    /// Application event type for `kind`.
    pub fn app(kind: impl Into<String>) -> Self {
        EventType::App(kind.into())
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventType::ActivationComplete => write!(f, "activation-complete"),
            EventType::App(kind) => write!(f, "{}", kind),
        }
    }
}

/// Application event: a kind string plus a producer-chosen JSON payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppEvent {
    pub kind: String,
    pub payload: Value,
}

impl AppEvent {
    /// Application event carrying `payload`.
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }

    /// Application event with no payload (`null`).
    pub fn bare(kind: impl Into<String>) -> Self {
        Self::new(kind, Value::Null)
    }
}

/// An event dispatched through the store.
#[derive(Debug, Clone)]
pub enum Event {
    /// Request that `module` be activated. Consumed by the orchestrator,
    /// never passed to reducers. Idempotent: duplicates are ignored.
    RequestActivate { module: Arc<Module> },

    /// `module` is fully active: its reducer is installed and its slice
    /// exists in the state tree. Emitted by the orchestrator.
    ActivationComplete { module: Arc<Module> },

    /// Ordinary application event.
    App(AppEvent),
}

impl Event {
    /// Activation request for `module`.
    pub fn request_activate(module: Arc<Module>) -> Self {
        Event::RequestActivate { module }
    }

    /// Completion notification for `module`.
    pub fn activation_complete(module: Arc<Module>) -> Self {
        Event::ActivationComplete { module }
    }

    /// Application event `kind` carrying `payload`.
    pub fn app(kind: impl Into<String>, payload: Value) -> Self {
        Event::App(AppEvent::new(kind, payload))
    }

    /// True for the completion notification of the module keyed `key`.
    pub fn is_activation_of(&self, key: &ModuleKey) -> bool {
        matches!(self, Event::ActivationComplete { module } if module.key() == key)
    }

    /// The module this event is about, for the two activation events.
    pub fn module_key(&self) -> Option<&ModuleKey> {
        match self {
            Event::RequestActivate { module } | Event::ActivationComplete { module } => {
                Some(module.key())
            }
            Event::App(_) => None,
        }
    }

    /// Short name for logging.
    pub fn name(&self) -> &str {
        match self {
            Event::RequestActivate { .. } => "request-activate",
            Event::ActivationComplete { .. } => "activation-complete",
            Event::App(e) => &e.kind,
        }
    }
}

impl From<AppEvent> for Event {
    fn from(event: AppEvent) -> Self {
        Event::App(event)
    }
}
