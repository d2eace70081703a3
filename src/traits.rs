//! Core traits and shared error types
//!
//! Defines the seams between the activation core and its host: the reducer
//! contract, the background-task contract, and the two injection points the
//! orchestrator requires from the surrounding system (reducer installation
//! and task scheduling).

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

use crate::event::Event;
use crate::store::TaskContext;

/// Pure state-transition function.
///
/// A reducer computes the next state from the current state and an event.
/// It must be total: an event it does not understand returns the state
/// unchanged. Reducers never perform IO.
pub trait Reducer: Send + Sync {
    /// Compute the next state for `event`.
    fn reduce(&self, state: Value, event: &Event) -> Value;
}

/// Any plain closure with the right shape is a reducer.
impl<F> Reducer for F
where
    F: Fn(Value, &Event) -> Value + Send + Sync,
{
    fn reduce(&self, state: Value, event: &Event) -> Value {
        self(state, event)
    }
}

/// Long-running background process owned by a module.
///
/// Started once when the owning module activates, never restarted and never
/// stopped by the activation core. A task that returns `Err` is logged by the
/// scheduler and not retried.
#[async_trait]
pub trait BackgroundTask: Send + Sync {
    /// Run the task to completion (or forever).
    async fn run(self: std::sync::Arc<Self>, ctx: TaskContext) -> anyhow::Result<()>;
}

/// Adapter turning an async closure into a [`BackgroundTask`].
pub struct TaskFn {
    f: Box<dyn Fn(TaskContext) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>,
}

impl TaskFn {
    /// Wrap an async closure as a background task.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(TaskContext) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            f: Box::new(move |ctx| Box::pin(f(ctx))),
        }
    }
}

#[async_trait]
impl BackgroundTask for TaskFn {
    async fn run(self: std::sync::Arc<Self>, ctx: TaskContext) -> anyhow::Result<()> {
        (self.f)(ctx).await
    }
}

/// Host injection point: atomically replace the store's active reducer.
///
/// Implemented by the store side. The orchestrator calls this after every
/// recomposition; the replacement must take effect for the next dispatched
/// event as a whole (never mid-reduction).
pub trait ReducerHost: Send + Sync {
    /// Install `reducer` as the store's active transition function.
    fn install_reducer(&self, reducer: std::sync::Arc<dyn Reducer>);
}

/// Host injection point: start a background task under the host scheduler.
pub trait TaskScheduler: Send + Sync {
    /// Start `fut` as a detached task named `name` (used for logging only).
    fn spawn_task(&self, name: &str, fut: BoxFuture<'static, anyhow::Result<()>>);
}

/// Default scheduler: spawns onto the current tokio runtime and logs the
/// task's outcome when it finishes.
pub struct TokioScheduler;

impl TokioScheduler {
    /// Create the default scheduler.
    pub fn new() -> Self {
        Self
    }
}

impl Default for TokioScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskScheduler for TokioScheduler {
    fn spawn_task(&self, name: &str, fut: BoxFuture<'static, anyhow::Result<()>>) {
        let name = name.to_string();
        tokio::spawn(async move {
            match fut.await {
                Ok(()) => debug!("Background task \"{}\" finished", name),
                Err(e) => error!("Background task \"{}\" failed: {:#}", name, e),
            }
        });
    }
}

/// Activation core errors
#[derive(Debug, Error)]
pub enum ActivationError {
    #[error("module key must not be empty")]
    MissingKey,

    #[error("failed to emit \"{0}\": event bus closed")]
    EmitFailed(String),
}
