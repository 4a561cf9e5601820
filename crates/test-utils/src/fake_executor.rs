use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use hpcflow::dag::DispatchRequest;
use hpcflow::engine::RuntimeEvent;
use hpcflow::errors::Result;
use hpcflow::exec::ExecutorBackend;
use hpcflow::types::TaskOutcome;

/// A fake executor that:
/// - records every dispatch request it receives
/// - immediately reports `TaskCompleted` for each, failing the tasks named in
///   `failing` with exit code 1 and succeeding the rest.
pub struct FakeExecutor {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    executed: Arc<Mutex<Vec<DispatchRequest>>>,
    failing: HashSet<String>,
}

impl FakeExecutor {
    pub fn new(
        runtime_tx: mpsc::Sender<RuntimeEvent>,
        executed: Arc<Mutex<Vec<DispatchRequest>>>,
    ) -> Self {
        Self {
            runtime_tx,
            executed,
            failing: HashSet::new(),
        }
    }

    pub fn failing(mut self, task: &str) -> Self {
        self.failing.insert(task.to_string());
        self
    }
}

impl ExecutorBackend for FakeExecutor {
    fn dispatch(
        &mut self,
        tasks: Vec<DispatchRequest>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let executed = Arc::clone(&self.executed);
        let failing = self.failing.clone();

        Box::pin(async move {
            for t in tasks {
                let outcome = if failing.contains(&t.task) {
                    TaskOutcome::Failed(1)
                } else {
                    TaskOutcome::Success
                };
                let name = t.task.clone();
                executed.lock().unwrap().push(t);

                tx.send(RuntimeEvent::TaskCompleted {
                    task: name,
                    outcome,
                })
                .await
                .map_err(anyhow::Error::from)?;
            }
            Ok(())
        })
    }
}

/// Names of the recorded tasks, in dispatch order.
pub fn executed_names(executed: &Arc<Mutex<Vec<DispatchRequest>>>) -> Vec<String> {
    executed
        .lock()
        .unwrap()
        .iter()
        .map(|r| r.task.clone())
        .collect()
}
