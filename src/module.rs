//! Module descriptors
//!
//! A [`Module`] bundles everything the orchestrator needs to bring one unit
//! of application state to life: a unique key, a reducer for its state
//! slice, optional dependencies on other modules, an optional background
//! task, and a root flag controlling how much of the state tree its reducer
//! sees. Descriptors are immutable once built and shared via `Arc`; module
//! identity is the key.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::machine::Machine;
use crate::traits::{BackgroundTask, Reducer, TaskFn};

/// Unique identifier of a module. Doubles as the module's slice key in the
/// state tree when the module is not a root module.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModuleKey(String);

impl ModuleKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ModuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ModuleKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for ModuleKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// Immutable module descriptor.
pub struct Module {
    key: ModuleKey,
    reducer: Arc<dyn Reducer>,
    background_task: Option<Arc<dyn BackgroundTask>>,
    dependencies: Vec<Arc<Module>>,
    root: bool,
}

impl Module {
    /// Start building a module keyed `key`.
    pub fn builder(key: impl Into<ModuleKey>) -> ModuleBuilder {
        ModuleBuilder {
            key: key.into(),
            reducer: None,
            background_task: None,
            dependencies: Vec::new(),
            root: false,
        }
    }

    pub fn key(&self) -> &ModuleKey {
        &self.key
    }

    pub fn reducer(&self) -> &Arc<dyn Reducer> {
        &self.reducer
    }

    pub fn background_task(&self) -> Option<&Arc<dyn BackgroundTask>> {
        self.background_task.as_ref()
    }

    pub fn dependencies(&self) -> &[Arc<Module>] {
        &self.dependencies
    }

    /// Root modules see (and may rewrite) the whole state tree; non-root
    /// modules are confined to the slice under their key.
    pub fn is_root(&self) -> bool {
        self.root
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("key", &self.key)
            .field("root", &self.root)
            .field(
                "dependencies",
                &self.dependencies.iter().map(|d| d.key()).collect::<Vec<_>>(),
            )
            .field("background_task", &self.background_task.is_some())
            .finish()
    }
}

impl PartialEq for Module {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Module {}

/// Builder for [`Module`] descriptors.
pub struct ModuleBuilder {
    key: ModuleKey,
    reducer: Option<Arc<dyn Reducer>>,
    background_task: Option<Arc<dyn BackgroundTask>>,
    dependencies: Vec<Arc<Module>>,
    root: bool,
}

impl ModuleBuilder {
    /// Use `reducer` as the module's transition function.
    pub fn reducer(mut self, reducer: Arc<dyn Reducer>) -> Self {
        self.reducer = Some(reducer);
        self
    }

    /// Use a plain closure as the module's transition function.
    pub fn reducer_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(serde_json::Value, &crate::event::Event) -> serde_json::Value
            + Send
            + Sync
            + 'static,
    {
        self.reducer = Some(Arc::new(f));
        self
    }

    /// Use `machine` as the module's transition function.
    pub fn machine(mut self, machine: Machine) -> Self {
        self.reducer = Some(Arc::new(machine));
        self
    }

    /// Attach a background task started once when the module activates.
    pub fn background_task(mut self, task: Arc<dyn BackgroundTask>) -> Self {
        self.background_task = Some(task);
        self
    }

    /// Attach an async closure as the module's background task.
    pub fn background_fn<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(crate::store::TaskContext) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.background_task = Some(Arc::new(TaskFn::new(f)));
        self
    }

    /// Declare a dependency: `dep` is activated before this module and must
    /// be fully active before this module's activation completes.
    pub fn depends_on(mut self, dep: &Arc<Module>) -> Self {
        self.dependencies.push(dep.clone());
        self
    }

    /// Mark this module as a root module (reducer sees the whole tree).
    pub fn root(mut self, root: bool) -> Self {
        self.root = root;
        self
    }

    /// Finish the descriptor. A module built without a reducer keeps its
    /// slice untouched (identity transition).
    pub fn build(self) -> Arc<Module> {
        let reducer = self
            .reducer
            .unwrap_or_else(|| Arc::new(|state: serde_json::Value, _: &crate::event::Event| state));
        Arc::new(Module {
            key: self.key,
            reducer,
            background_task: self.background_task,
            dependencies: self.dependencies,
            root: self.root,
        })
    }
}
