//! Reducer composition
//!
//! Builds the store's single transition function out of the module set. Each
//! non-root module's reducer is confined to the slice stored under its key;
//! root module reducers receive the whole tree. The composed chain applies
//! every member in activation order, feeding each one the output of the
//! previous, so later modules observe the writes of earlier ones within the
//! same event.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::event::Event;
use crate::module::{Module, ModuleKey};
use crate::traits::Reducer;

/// Identity transition. Installed in the store before any module activates.
pub fn identity() -> Arc<dyn Reducer> {
    Arc::new(|state: Value, _: &Event| state)
}

/// Compose the reducers of `modules`, in the given order, into one reducer
/// over the whole state tree.
pub fn compose(modules: &[Arc<Module>]) -> Arc<dyn Reducer> {
    let entries = modules
        .iter()
        .map(|m| ChainEntry {
            scope: if m.is_root() {
                None
            } else {
                Some(m.key().clone())
            },
            reducer: m.reducer().clone(),
        })
        .collect();
    Arc::new(Chain { entries })
}

struct ChainEntry {
    scope: Option<ModuleKey>,
    reducer: Arc<dyn Reducer>,
}

struct Chain {
    entries: Vec<ChainEntry>,
}

impl Reducer for Chain {
    fn reduce(&self, state: Value, event: &Event) -> Value {
        self.entries.iter().fold(state, |state, entry| {
            match &entry.scope {
                None => entry.reducer.reduce(state, event),
                Some(key) => update_at_key(state, key.as_str(), |slice| {
                    entry.reducer.reduce(slice, event)
                }),
            }
        })
    }
}

/// Apply `f` to the value stored under `key`, handing it `Null` when the key
/// is absent. The write-back is skipped when the key was absent and `f`
/// returned `Null`, so a module that has nothing to say never materializes
/// an empty slice. A non-object tree is replaced by a fresh object so the
/// slice has somewhere to live.
pub(crate) fn update_at_key(state: Value, key: &str, f: impl FnOnce(Value) -> Value) -> Value {
    let mut map = match state {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    let slice = map.remove(key);
    let absent = slice.is_none();
    let next = f(slice.unwrap_or(Value::Null));
    if !(absent && next.is_null()) {
        map.insert(key.to_string(), next);
    }
    Value::Object(map)
}
