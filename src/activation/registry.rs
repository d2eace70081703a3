//! Activation registry
//!
//! The registry is the single source of truth for which modules have been
//! claimed for activation and which are fully active. The claim is the
//! dedup point: whichever activation sequence claims a key first owns that
//! module's activation, every later request for the same key is dropped.
//! Entries are never removed. Each key also carries a one-way completion
//! signal that waiters can subscribe to before or after the key is claimed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

use crate::compose::compose;
use crate::module::{Module, ModuleKey};
use crate::traits::ReducerHost;

/// Lifecycle stage of a claimed module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationStatus {
    /// Claimed by an activation sequence, not yet active.
    Claimed,
    /// Reducer installed and completion signaled.
    Active,
}

struct RegistryInner {
    status: HashMap<ModuleKey, ActivationStatus>,
    signals: HashMap<ModuleKey, watch::Sender<bool>>,
    /// Claimed modules in claim order. This is the composition order.
    order: Vec<Arc<Module>>,
}

impl RegistryInner {
    fn signal(&mut self, key: &ModuleKey) -> &watch::Sender<bool> {
        self.signals
            .entry(key.clone())
            .or_insert_with(|| watch::channel(false).0)
    }
}

/// Shared record of claimed and active modules.
pub struct ActivationRegistry {
    inner: Mutex<RegistryInner>,
}

impl ActivationRegistry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RegistryInner {
                status: HashMap::new(),
                signals: HashMap::new(),
                order: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim `module` for activation. Returns `false` when the key is
    /// already claimed or active, in which case the caller must not proceed.
    pub fn claim(&self, module: &Arc<Module>) -> bool {
        let mut inner = self.lock();
        if inner.status.contains_key(module.key()) {
            return false;
        }
        inner
            .status
            .insert(module.key().clone(), ActivationStatus::Claimed);
        inner.order.push(module.clone());
        true
    }

    /// Current stage of `key`, if it has been claimed.
    pub fn status(&self, key: &ModuleKey) -> Option<ActivationStatus> {
        self.lock().status.get(key).copied()
    }

    /// True once `key` is fully active.
    pub fn is_active(&self, key: &ModuleKey) -> bool {
        self.status(key) == Some(ActivationStatus::Active)
    }

    /// Flip `key` to active and fire its completion signal. Called exactly
    /// once per module, by the sequence that claimed it.
    pub fn mark_active(&self, key: &ModuleKey) {
        let mut inner = self.lock();
        inner.status.insert(key.clone(), ActivationStatus::Active);
        inner.signal(key).send_replace(true);
    }

    /// Wait until `key` becomes active. Returns immediately if it already
    /// is. Safe to call before the key is even claimed. The wait cannot
    /// fail: the signal sender lives in the registry and entries are never
    /// removed, so the channel stays open as long as the registry does.
    pub async fn wait_active(&self, key: &ModuleKey) {
        let mut rx = self.lock().signal(key).subscribe();
        let _ = rx.wait_for(|active| *active).await;
    }

    /// Compose the reducers of every claimed module, in claim order, and
    /// install the result into `host`. Returns the chain length.
    ///
    /// Snapshot, composition and install all happen under the registry
    /// lock: once a module is claimed, no later install can produce a
    /// chain without it, however the activation sequences interleave.
    pub fn recompose_into(&self, host: &dyn ReducerHost) -> usize {
        let inner = self.lock();
        host.install_reducer(compose(&inner.order));
        inner.order.len()
    }

    /// Every claimed module, in claim order.
    pub fn snapshot(&self) -> Vec<Arc<Module>> {
        self.lock().order.clone()
    }

    /// Keys of fully active modules.
    pub fn active_keys(&self) -> Vec<ModuleKey> {
        let inner = self.lock();
        inner
            .order
            .iter()
            .map(|m| m.key())
            .filter(|k| inner.status.get(*k) == Some(&ActivationStatus::Active))
            .cloned()
            .collect()
    }

    /// Number of claimed modules.
    pub fn len(&self) -> usize {
        self.lock().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ActivationRegistry {
    fn default() -> Self {
        Self::new()
    }
}
