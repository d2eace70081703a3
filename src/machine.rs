//! Table-driven state machines
//!
//! A [`Machine`] is a reducer assembled from per-event-kind handlers instead
//! of a hand-written match over every event. Lookup is by event kind, so an
//! event no handler subscribes to costs one table probe and returns the
//! state untouched. Handlers are given the (scoped) state and the event, and
//! answer with an [`Outcome`] saying what to do with the state; the tag
//! removes any guesswork about whether a returned value was meant to be
//! called or stored.

use std::collections::HashMap;
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};

use serde_json::Value;
use tracing::error;

use crate::compose::update_at_key;
use crate::event::{Event, EventType};
use crate::module::ModuleKey;
use crate::traits::Reducer;

/// What a handler wants done with the state it was shown.
pub enum Outcome {
    /// Feed the current state through the function.
    Transform(Box<dyn FnOnce(Value) -> Value>),
    /// Store this value verbatim, replacing the current state.
    Replace(Value),
    /// Leave the state untouched.
    NoOp,
}

impl Outcome {
    /// Transform the current state with `f`.
    pub fn transform(f: impl FnOnce(Value) -> Value + 'static) -> Self {
        Outcome::Transform(Box::new(f))
    }

    /// Replace the current state with `value`.
    pub fn replace(value: impl Into<Value>) -> Self {
        Outcome::Replace(value.into())
    }

    /// Keep the current state.
    pub fn noop() -> Self {
        Outcome::NoOp
    }

    fn apply_to(self, state: Value) -> Value {
        match self {
            Outcome::Transform(f) => f(state),
            Outcome::Replace(value) => value,
            Outcome::NoOp => state,
        }
    }
}

impl std::fmt::Debug for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Transform(_) => f.write_str("Transform(..)"),
            Outcome::Replace(value) => f.debug_tuple("Replace").field(value).finish(),
            Outcome::NoOp => f.write_str("NoOp"),
        }
    }
}

type Handler = Box<dyn Fn(&Value, &Event) -> Outcome + Send + Sync>;

/// Reducer dispatching on event kind through a handler table.
pub struct Machine {
    owner: ModuleKey,
    scope: Option<ModuleKey>,
    on_activation: Option<Handler>,
    on_app: HashMap<String, Handler>,
}

impl Machine {
    /// Start building a machine owned by the module keyed `owner`.
    pub fn builder(owner: impl Into<ModuleKey>) -> MachineBuilder {
        MachineBuilder {
            owner: owner.into(),
            scope: None,
            on_activation: None,
            on_app: HashMap::new(),
        }
    }

    /// Start building a machine owned by, and confined to the slice of, the
    /// module keyed `key`.
    pub fn scoped(key: impl Into<ModuleKey>) -> MachineBuilder {
        let key = key.into();
        Machine::builder(key.clone()).at(key)
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.on_app.len() + usize::from(self.on_activation.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Compute the next state for `event`.
    ///
    /// Unhandled events return `state` unchanged. The activation handler
    /// fires only for this machine's own module. A panicking handler is
    /// logged together with the offending event, then rethrown.
    pub fn apply(&self, state: Value, event: &Event) -> Value {
        let key_payload;
        let (handler, input): (&Handler, &Value) = match event {
            // Activation requests are control-plane only.
            Event::RequestActivate { .. } => return state,
            Event::ActivationComplete { module } => {
                if module.key() != &self.owner {
                    return state;
                }
                match &self.on_activation {
                    Some(handler) => {
                        key_payload = Value::String(self.owner.to_string());
                        (handler, &key_payload)
                    }
                    None => return state,
                }
            }
            Event::App(app) => match self.on_app.get(&app.kind) {
                Some(handler) => (handler, &app.payload),
                None => return state,
            },
        };

        let result = catch_unwind(AssertUnwindSafe(|| {
            let outcome = handler(input, event);
            match &self.scope {
                None => outcome.apply_to(state),
                Some(key) => update_at_key(state, key.as_str(), |slice| outcome.apply_to(slice)),
            }
        }));
        match result {
            Ok(next) => next,
            Err(panic) => {
                error!(
                    "Machine \"{}\": handler for \"{}\" panicked, event: {:?}",
                    self.owner,
                    event.name(),
                    event
                );
                resume_unwind(panic)
            }
        }
    }
}

impl Reducer for Machine {
    fn reduce(&self, state: Value, event: &Event) -> Value {
        self.apply(state, event)
    }
}

/// Builder for [`Machine`].
///
/// Malformed entries (an empty event kind, or a second handler for a kind
/// that already has one) are logged and discarded rather than failing the
/// build; the first registration of a kind wins.
pub struct MachineBuilder {
    owner: ModuleKey,
    scope: Option<ModuleKey>,
    on_activation: Option<Handler>,
    on_app: HashMap<String, Handler>,
}

impl MachineBuilder {
    /// Register `handler` for `event_type`.
    pub fn on<F>(self, event_type: EventType, handler: F) -> Self
    where
        F: Fn(&Value, &Event) -> Outcome + Send + Sync + 'static,
    {
        match event_type {
            EventType::ActivationComplete => self.set_activation(Box::new(handler)),
            EventType::App(kind) => self.insert(kind, Box::new(handler)),
        }
    }

    /// Register `handler` for application events of `kind`.
    pub fn on_event<F>(self, kind: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Value, &Event) -> Outcome + Send + Sync + 'static,
    {
        self.insert(kind.into(), Box::new(handler))
    }

    /// Register `handler` for this module's own activation. The payload
    /// handed to the handler is the module key.
    pub fn on_activation<F>(self, handler: F) -> Self
    where
        F: Fn(&Value, &Event) -> Outcome + Send + Sync + 'static,
    {
        self.set_activation(Box::new(handler))
    }

    /// Confine the machine to the slice stored under `key`. Without this the
    /// machine operates on whatever state it is handed, which is the usual
    /// arrangement when it serves as a module's reducer.
    pub fn at(mut self, key: impl Into<ModuleKey>) -> Self {
        self.scope = Some(key.into());
        self
    }

    pub fn build(self) -> Machine {
        Machine {
            owner: self.owner,
            scope: self.scope,
            on_activation: self.on_activation,
            on_app: self.on_app,
        }
    }

    fn set_activation(mut self, handler: Handler) -> Self {
        if self.on_activation.is_some() {
            error!(
                "Machine \"{}\": duplicate activation handler, keeping the first",
                self.owner
            );
            return self;
        }
        self.on_activation = Some(handler);
        self
    }

    fn insert(mut self, kind: String, handler: Handler) -> Self {
        if kind.is_empty() {
            error!(
                "Machine \"{}\": discarding handler registered for an empty event kind",
                self.owner
            );
            return self;
        }
        if self.on_app.contains_key(&kind) {
            error!(
                "Machine \"{}\": duplicate handler for \"{}\", keeping the first",
                self.owner, kind
            );
            return self;
        }
        self.on_app.insert(kind, handler);
        self
    }
}
