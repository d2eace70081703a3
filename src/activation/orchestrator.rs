//! Activation orchestrator
//!
//! Consumes activation requests from the store's feed and drives each
//! claimed module through its activation sequence: claim the key, bring up
//! dependencies, recompose and install the reducer chain, announce
//! completion, start the module's background task. Sequences for different
//! modules run concurrently; the claim gate in the registry makes each
//! module's activation happen exactly once no matter how many requests
//! arrive or race.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::activation::registry::ActivationRegistry;
use crate::event::Event;
use crate::module::Module;
use crate::store::{StoreHandle, TaskContext};
use crate::traits::{ActivationError, ReducerHost, TaskScheduler};

/// Drives module activation from the store's request feed.
pub struct ActivationOrchestrator {
    registry: Arc<ActivationRegistry>,
    host: Arc<dyn ReducerHost>,
    scheduler: Arc<dyn TaskScheduler>,
    handle: StoreHandle,
    feed: mpsc::UnboundedReceiver<Event>,
}

impl ActivationOrchestrator {
    pub fn new(
        registry: Arc<ActivationRegistry>,
        host: Arc<dyn ReducerHost>,
        scheduler: Arc<dyn TaskScheduler>,
        handle: StoreHandle,
        feed: mpsc::UnboundedReceiver<Event>,
    ) -> Self {
        Self {
            registry,
            host,
            scheduler,
            handle,
            feed,
        }
    }

    /// Process activation requests until the feed closes.
    pub async fn run(mut self) {
        debug!("Activation orchestrator started");
        while let Some(event) = self.feed.recv().await {
            if let Event::RequestActivate { module } = event {
                self.handle_request(module);
            }
        }
        debug!("Activation feed closed, orchestrator stopping");
    }

    /// Claim the module and spawn its activation sequence. Requests for
    /// already-claimed keys are dropped here; the claim is the only dedup.
    fn handle_request(&self, module: Arc<Module>) {
        if cfg!(debug_assertions) && module.key().is_empty() {
            error!("Rejecting activation request: {}", ActivationError::MissingKey);
            return;
        }
        if !self.registry.claim(&module) {
            debug!(
                "Module \"{}\" already claimed, ignoring request",
                module.key()
            );
            return;
        }
        let sequence_id = Uuid::new_v4();
        info!(
            "Activating module \"{}\" (sequence {})",
            module.key(),
            sequence_id
        );
        let sequence = ActivationSequence {
            module,
            registry: self.registry.clone(),
            host: self.host.clone(),
            scheduler: self.scheduler.clone(),
            handle: self.handle.clone(),
            sequence_id,
        };
        tokio::spawn(async move {
            let key = sequence.module.key().clone();
            if let Err(e) = sequence.run().await {
                error!("Activation of module \"{}\" failed: {}", key, e);
            }
        });
    }
}

/// One module's activation, from successful claim to background task start.
struct ActivationSequence {
    module: Arc<Module>,
    registry: Arc<ActivationRegistry>,
    host: Arc<dyn ReducerHost>,
    scheduler: Arc<dyn TaskScheduler>,
    handle: StoreHandle,
    sequence_id: Uuid,
}

impl ActivationSequence {
    async fn run(self) -> Result<(), ActivationError> {
        self.activate_dependencies().await?;
        self.install_recomposed_reducer();
        self.complete()?;
        self.start_background_task();
        Ok(())
    }

    /// Request activation of every dependency that is not yet active, then
    /// wait for all dependencies to be fully active. Requests for claimed
    /// but unfinished dependencies are redundant and get dropped at the
    /// claim gate. The waits are unordered: only the conjunction matters,
    /// and waiting on an already-active dependency resolves immediately.
    async fn activate_dependencies(&self) -> Result<(), ActivationError> {
        let deps = self.module.dependencies();
        if deps.is_empty() {
            return Ok(());
        }
        for dep in deps {
            if !self.registry.is_active(dep.key()) {
                self.handle.emit(Event::request_activate(dep.clone()))?;
            }
        }
        debug!(
            "Module \"{}\" waiting for {} dependencies",
            self.module.key(),
            deps.len()
        );
        join_all(deps.iter().map(|dep| self.registry.wait_active(dep.key()))).await;
        Ok(())
    }

    /// Rebuild the reducer chain over every claimed module, in claim order,
    /// and install it. The registry composes and installs under its lock,
    /// so concurrent sequences cannot overwrite each other's installs with
    /// a chain that is missing a claimed module. The chain includes modules
    /// that are still mid activation; their slices simply stay empty until
    /// they start writing.
    fn install_recomposed_reducer(&self) {
        let installed = self.registry.recompose_into(self.host.as_ref());
        debug!(
            "Module \"{}\": installed reducer chain of {} modules",
            self.module.key(),
            installed
        );
    }

    /// Announce completion, then fire the registry signal. The announcement
    /// is emitted after the reducer installation, so the module's own
    /// machine is already in the chain when the event is reduced. It is
    /// emitted before the signal, so dependents wake with the announcement
    /// already in the event queue and completion events reach the store in
    /// dependency order.
    fn complete(&self) -> Result<(), ActivationError> {
        self.handle
            .emit(Event::activation_complete(self.module.clone()))?;
        self.registry.mark_active(self.module.key());
        info!(
            "Module \"{}\" active (sequence {})",
            self.module.key(),
            self.sequence_id
        );
        Ok(())
    }

    /// Start the module's background task, if any. Started exactly once and
    /// then left alone: no supervision, no restarts, no cancellation.
    fn start_background_task(&self) {
        if let Some(task) = self.module.background_task() {
            debug!(
                "Starting background task for module \"{}\"",
                self.module.key()
            );
            let ctx = TaskContext::new(self.module.key().clone(), self.handle.clone());
            self.scheduler
                .spawn_task(self.module.key().as_str(), task.clone().run(ctx));
        }
    }
}
