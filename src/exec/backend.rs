// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime talks to an `ExecutorBackend` instead of spawning work
//! itself. This makes it easy to swap in a fake executor in tests.
//!
//! - `ProcessExecutorBackend` runs each task's executable as a local
//!   process.
//! - `SimulatedExecutorBackend` reports every task as succeeded without
//!   running anything (`--simulate`).

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;
use tracing::info;

use crate::dag::DispatchRequest;
use crate::engine::RuntimeEvent;
use crate::errors::{Error, Result};
use crate::types::TaskOutcome;

use super::task_runner::run_task;

/// Trait abstracting how dispatched tasks are executed.
///
/// Implementations must eventually send exactly one
/// `RuntimeEvent::TaskCompleted` per dispatched task.
pub trait ExecutorBackend: Send {
    /// Dispatch the given tasks for execution.
    ///
    /// The implementation is free to:
    /// - spawn OS processes (production)
    /// - simulate completion and emit `RuntimeEvent`s (tests, `--simulate`)
    fn dispatch(
        &mut self,
        tasks: Vec<DispatchRequest>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Runs each dispatched task as a local process on its own Tokio task.
pub struct ProcessExecutorBackend {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
}

impl ProcessExecutorBackend {
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        Self { runtime_tx }
    }
}

impl ExecutorBackend for ProcessExecutorBackend {
    fn dispatch(
        &mut self,
        tasks: Vec<DispatchRequest>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        // Clone the sender so the future doesn't borrow `self` across `await`.
        let tx = self.runtime_tx.clone();

        Box::pin(async move {
            for task in tasks {
                let tx = tx.clone();
                tokio::spawn(async move {
                    run_task(task, tx).await;
                });
            }
            Ok(())
        })
    }
}

/// Reports every dispatched task as succeeded, in dispatch order.
pub struct SimulatedExecutorBackend {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
}

impl SimulatedExecutorBackend {
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        Self { runtime_tx }
    }
}

impl ExecutorBackend for SimulatedExecutorBackend {
    fn dispatch(
        &mut self,
        tasks: Vec<DispatchRequest>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();

        Box::pin(async move {
            for task in tasks {
                info!(
                    task = %task.task,
                    site = ?task.site,
                    inputs = task.inputs.len(),
                    outputs = task.outputs.len(),
                    "simulating task"
                );
                tx.send(RuntimeEvent::TaskCompleted {
                    task: task.task,
                    outcome: TaskOutcome::Success,
                })
                .await
                .map_err(Error::from)?;
            }
            Ok(())
        })
    }
}
