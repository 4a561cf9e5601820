// src/engine/runtime.rs

use std::fmt;

use anyhow::anyhow;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::dag::{SharedScheduler, TaskState};
use crate::errors::Result;
use crate::exec::ExecutorBackend;
use crate::types::TaskOutcome;

use super::{RunSummary, RuntimeEvent, RuntimeOptions};

/// Drives the scheduler view in response to `RuntimeEvent`s,
/// and delegates actual task execution to an `ExecutorBackend`.
pub struct Runtime<E: ExecutorBackend> {
    scheduler: SharedScheduler,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
    options: RuntimeOptions,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("scheduler", &self.scheduler)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(
        scheduler: SharedScheduler,
        event_rx: mpsc::Receiver<RuntimeEvent>,
        executor: E,
        options: RuntimeOptions,
    ) -> Self {
        Self {
            scheduler,
            event_rx,
            executor,
            options,
        }
    }

    /// Main event loop.
    ///
    /// - Dispatches ready tasks, up to `max_parallel` running at once.
    /// - Consumes `RuntimeEvent`s from `event_rx` and reports outcomes to the
    ///   scheduler.
    /// - Returns once every task is terminal, the channel closes, or a
    ///   shutdown is requested.
    pub async fn run(mut self) -> Result<RunSummary> {
        info!(workflow = %self.scheduler.graph().name(), "hpcflow runtime started");
        let mut interrupted = false;

        loop {
            self.dispatch_ready().await?;

            if self.scheduler.is_complete() {
                info!("all tasks terminal; stopping runtime");
                break;
            }

            if self.scheduler.counts().running == 0 {
                return Err(anyhow!("scheduler stalled: no task running and none ready").into());
            }

            let event = match self.event_rx.recv().await {
                Some(e) => e,
                None => {
                    info!("runtime event channel closed; exiting");
                    break;
                }
            };

            debug!(?event, "runtime received event");

            match event {
                RuntimeEvent::TaskCompleted { task, outcome } => {
                    self.handle_completion(&task, outcome);
                }
                RuntimeEvent::ShutdownRequested => {
                    info!("shutdown requested; failing running tasks");
                    interrupted = true;
                    self.fail_running();
                    break;
                }
            }
        }

        let summary = RunSummary {
            counts: self.scheduler.counts(),
            interrupted,
        };
        info!(%summary, "runtime exiting");
        Ok(summary)
    }

    fn handle_completion(&mut self, task: &str, outcome: TaskOutcome) {
        let result = if outcome.is_success() {
            self.scheduler.mark_done(task)
        } else {
            warn!(task = %task, %outcome, "task reported failure");
            self.scheduler.mark_failed(task)
        };

        match result {
            Ok(step) => {
                let ready: Vec<_> = step.newly_ready().collect();
                let blocked: Vec<_> = step.newly_blocked().collect();
                debug!(task = %task, ?ready, ?blocked, "completion applied");
            }
            Err(e) => {
                warn!(task = %task, error = %e, "ignoring completion event");
            }
        }
    }

    /// Cancellation is a failure: every running task is failed and its
    /// dependents blocked.
    fn fail_running(&mut self) {
        for task in self.scheduler.tasks_in_state(TaskState::Running) {
            if let Err(e) = self.scheduler.mark_failed(&task) {
                warn!(task = %task, error = %e, "failed to cancel running task");
            }
        }
    }

    async fn dispatch_ready(&mut self) -> Result<()> {
        let running = self.scheduler.counts().running;
        let capacity = self.options.max_parallel.saturating_sub(running);
        if capacity == 0 {
            return Ok(());
        }

        let mut requests = Vec::new();
        for task in self.scheduler.poll_ready().into_iter().take(capacity) {
            self.scheduler.mark_running(&task)?;
            requests.push(self.scheduler.dispatch_request(&task)?);
        }

        if requests.is_empty() {
            return Ok(());
        }

        let names: Vec<_> = requests.iter().map(|r| r.task.as_str()).collect();
        debug!(?names, "dispatching ready tasks");

        self.executor.dispatch(requests).await
    }
}
