// tests/integration/runtime_fake_executor.rs

use std::error::Error;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::time::{Duration, timeout};

use hpcflow::config::WorkflowFile;
use hpcflow::dag::{SharedScheduler, TaskState};
use hpcflow::engine::{RunSummary, Runtime, RuntimeEvent, RuntimeOptions};
use hpcflow_test_utils::builders::{TaskConfigBuilder, WorkflowFileBuilder};
use hpcflow_test_utils::fake_executor::{FakeExecutor, executed_names};
use hpcflow_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

/// prepare -> {pretrain, baseline} -> evaluate
fn training_workflow() -> WorkflowFile {
    WorkflowFileBuilder::new("training")
        .sites(&["local", "accelerator", "cluster"])
        .with_artifact("raw.csv", "/data/raw.csv", Some("local"))
        .with_task(
            "prepare",
            TaskConfigBuilder::new()
                .input("raw.csv")
                .output("features.bin")
                .build(),
        )
        .with_task(
            "pretrain",
            TaskConfigBuilder::new()
                .input("features.bin")
                .staged_output("model.ckpt")
                .site("accelerator")
                .build(),
        )
        .with_task(
            "baseline",
            TaskConfigBuilder::new()
                .input("features.bin")
                .output("baseline.json")
                .site("cluster")
                .build(),
        )
        .with_task(
            "evaluate",
            TaskConfigBuilder::new()
                .input("model.ckpt")
                .input("baseline.json")
                .build(),
        )
        .build()
}

async fn run_with(
    executor_failing: &[&str],
    max_parallel: usize,
) -> Result<(RunSummary, Vec<String>, SharedScheduler), Box<dyn Error>> {
    let graph = training_workflow().build_graph()?;
    let scheduler = SharedScheduler::from_graph(graph);

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let mut executor = FakeExecutor::new(rt_tx, executed.clone());
    for task in executor_failing {
        executor = executor.failing(task);
    }

    let runtime = Runtime::new(
        scheduler.clone(),
        rt_rx,
        executor,
        RuntimeOptions { max_parallel },
    );

    let summary = match timeout(Duration::from_secs(3), runtime.run()).await {
        Ok(result) => result?,
        Err(_) => panic!("runtime did not finish within 3 seconds"),
    };

    Ok((summary, executed_names(&executed), scheduler))
}

#[tokio::test]
async fn runtime_with_fake_executor_runs_every_task() -> TestResult {
    init_tracing();

    let (summary, ran, _) = run_with(&[], 4).await?;

    assert!(summary.succeeded());
    assert_eq!(summary.counts.done, 4);
    assert_eq!(ran.len(), 4);
    assert_eq!(ran.first().map(String::as_str), Some("prepare"));
    assert_eq!(ran.last().map(String::as_str), Some("evaluate"));
    Ok(())
}

#[tokio::test]
async fn runtime_respects_max_parallel_of_one() -> TestResult {
    init_tracing();

    let (summary, ran, _) = run_with(&[], 1).await?;

    assert!(summary.succeeded());
    // Topological order is followed one task at a time.
    assert_eq!(ran[0], "prepare");
    assert_eq!(ran[3], "evaluate");
    Ok(())
}

#[tokio::test]
async fn failed_task_blocks_downstream_and_run_reports_failure() -> TestResult {
    init_tracing();

    let (summary, ran, scheduler) = run_with(&["pretrain"], 4).await?;

    assert!(!summary.succeeded());
    assert!(!summary.interrupted);
    assert_eq!(summary.counts.failed, 1);
    assert_eq!(summary.counts.blocked, 1);
    assert!(!ran.contains(&"evaluate".to_string()));
    assert_eq!(scheduler.state_of("baseline"), Some(TaskState::Done));
    assert_eq!(scheduler.state_of("evaluate"), Some(TaskState::Blocked));

    let rendered = summary.to_string();
    assert!(rendered.contains("1 failed"));
    assert!(rendered.contains("1 blocked"));
    Ok(())
}

#[tokio::test]
async fn dispatch_requests_carry_resolved_inputs() -> TestResult {
    init_tracing();

    let graph = training_workflow().build_graph()?;
    let scheduler = SharedScheduler::from_graph(graph);
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(rt_tx, executed.clone());

    with_timeout(Runtime::new(scheduler, rt_rx, executor, RuntimeOptions::default()).run())
        .await?;

    let requests = executed.lock().unwrap().clone();
    let prepare = requests.iter().find(|r| r.task == "prepare").unwrap();
    assert_eq!(prepare.inputs[0].location.as_deref(), Some("/data/raw.csv"));
    assert_eq!(prepare.payload.executable.as_deref(), Some("true"));

    let pretrain = requests.iter().find(|r| r.task == "pretrain").unwrap();
    assert_eq!(pretrain.site.as_deref(), Some("accelerator"));
    assert_eq!(pretrain.inputs[0].producer.as_deref(), Some("prepare"));
    assert!(pretrain.outputs[0].stage_out);
    Ok(())
}

#[tokio::test]
async fn shutdown_request_fails_running_tasks() -> TestResult {
    init_tracing();

    // An executor that never reports back, so tasks stay Running.
    struct Silent;
    impl hpcflow::exec::ExecutorBackend for Silent {
        fn dispatch(
            &mut self,
            _tasks: Vec<hpcflow::dag::DispatchRequest>,
        ) -> std::pin::Pin<
            Box<dyn std::future::Future<Output = hpcflow::errors::Result<()>> + Send + '_>,
        > {
            Box::pin(async { Ok(()) })
        }
    }

    let graph = training_workflow().build_graph()?;
    let scheduler = SharedScheduler::from_graph(graph);
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(8);
    rt_tx.send(RuntimeEvent::ShutdownRequested).await?;

    let summary = timeout(
        Duration::from_secs(3),
        Runtime::new(scheduler.clone(), rt_rx, Silent, RuntimeOptions::default()).run(),
    )
    .await??;

    assert!(summary.interrupted);
    assert!(!summary.succeeded());
    assert_eq!(scheduler.state_of("prepare"), Some(TaskState::Failed));
    assert_eq!(scheduler.counts().blocked, 3);
    assert!(summary.to_string().contains("(interrupted)"));
    Ok(())
}
