// tests/integration/process_executor.rs

use std::error::Error;

use tokio::sync::mpsc;
use tokio::time::{Duration, timeout};

use hpcflow::config::{TransformationConfig, WorkflowFile};
use hpcflow::dag::{DispatchRequest, SharedScheduler, TaskPayload, TaskState};
use hpcflow::engine::{Runtime, RuntimeEvent, RuntimeOptions};
use hpcflow::exec::ProcessExecutorBackend;
use hpcflow::exec::task_runner::run_task;
use hpcflow::types::TaskOutcome;
use hpcflow_test_utils::builders::{TaskConfigBuilder, WorkflowFileBuilder};
use hpcflow_test_utils::{init_tracing, within};

type TestResult = Result<(), Box<dyn Error>>;

async fn run_file(file: &WorkflowFile) -> Result<SharedScheduler, Box<dyn Error>> {
    let scheduler = SharedScheduler::from_graph(file.build_graph()?);
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);
    let runtime = Runtime::new(
        scheduler.clone(),
        rt_rx,
        ProcessExecutorBackend::new(rt_tx),
        RuntimeOptions::default(),
    );
    within(Duration::from_secs(10), runtime.run()).await?;
    Ok(scheduler)
}

fn shell(script: &str) -> TaskConfigBuilder {
    TaskConfigBuilder::new()
        .transformation("sh")
        .arg("-c")
        .arg(script)
}

#[tokio::test]
async fn process_backend_runs_tasks_and_reports_exit_codes() -> TestResult {
    init_tracing();

    let file = WorkflowFileBuilder::new("shell")
        .sites(&["local"])
        .with_transformation("sh", "/bin/sh")
        .with_task(
            "check_env",
            shell(r#"test "$HPCFLOW_TASK" = check_env && test "$HPCFLOW_SITE" = local"#)
                .site("local")
                .output("marker")
                .build(),
        )
        .with_task("fail", shell("exit 3").input("marker").build())
        .with_task("never", shell("exit 0").after("fail").build())
        .build();

    let scheduler = SharedScheduler::from_graph(file.build_graph()?);
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);
    let runtime = Runtime::new(
        scheduler.clone(),
        rt_rx,
        ProcessExecutorBackend::new(rt_tx),
        RuntimeOptions::default(),
    );

    let summary = timeout(Duration::from_secs(10), runtime.run()).await??;

    assert_eq!(scheduler.state_of("check_env"), Some(TaskState::Done));
    assert_eq!(scheduler.state_of("fail"), Some(TaskState::Failed));
    assert_eq!(scheduler.state_of("never"), Some(TaskState::Blocked));
    assert!(!summary.succeeded());
    Ok(())
}

#[tokio::test]
async fn missing_executable_is_reported_as_failure() -> TestResult {
    init_tracing();

    let (tx, mut rx) = mpsc::channel(1);
    let request = DispatchRequest {
        task: "ghost".to_string(),
        payload: TaskPayload {
            executable: Some("/nonexistent/hpcflow-test-binary".to_string()),
            ..TaskPayload::default()
        },
        site: None,
        inputs: vec![],
        outputs: vec![],
    };

    run_task(request, tx).await;

    match rx.recv().await {
        Some(RuntimeEvent::TaskCompleted { task, outcome }) => {
            assert_eq!(task, "ghost");
            assert_eq!(outcome, TaskOutcome::Failed(-1));
        }
        other => panic!("expected TaskCompleted, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn child_sees_resolved_inputs_and_outputs() -> TestResult {
    init_tracing();

    let script = [
        r#"test "$1" = /data/raw.csv"#,
        r#"test "$HPCFLOW_INPUT_RAW_CSV" = /data/raw.csv"#,
        r#"test "$HPCFLOW_INPUTS" = /data/raw.csv"#,
        r#"test "$HPCFLOW_OUTPUTS" = summary.txt:scratch.txt"#,
        r#"test "$HPCFLOW_STAGE_OUT" = summary.txt"#,
        r#"test "$HPCFLOW_OUTPUT_SITE" = archive"#,
    ]
    .join(" && ");

    let file = WorkflowFileBuilder::new("handoff")
        .sites(&["local", "archive"])
        .output_site("archive")
        .with_transformation("sh", "/bin/sh")
        .with_artifact("raw.csv", "/data/raw.csv", Some("local"))
        .with_task(
            "summarize",
            shell(&script)
                .arg("sh")
                .arg("{raw.csv}")
                .input("raw.csv")
                .staged_output("summary.txt")
                .output("scratch.txt")
                .build(),
        )
        .build();

    let scheduler = run_file(&file).await?;
    assert_eq!(scheduler.state_of("summarize"), Some(TaskState::Done));
    Ok(())
}

#[tokio::test]
async fn runtime_limit_fails_the_task() -> TestResult {
    init_tracing();

    let file = WorkflowFileBuilder::new("slow")
        .with_transformation_config(
            "sh",
            TransformationConfig {
                runtime: Some(1),
                ..TransformationConfig::new("/bin/sh")
            },
        )
        .with_task("slow", shell("exec sleep 5").output("late").build())
        .with_task("next", shell("exit 0").input("late").build())
        .build();

    let started = std::time::Instant::now();
    let scheduler = run_file(&file).await?;

    assert!(started.elapsed() < Duration::from_secs(4));
    assert_eq!(scheduler.state_of("slow"), Some(TaskState::Failed));
    assert_eq!(scheduler.state_of("next"), Some(TaskState::Blocked));
    Ok(())
}

#[tokio::test]
async fn launcher_and_profile_reach_the_process() -> TestResult {
    init_tracing();

    let file = WorkflowFileBuilder::new("launched")
        .with_transformation_config(
            "sh",
            TransformationConfig {
                container: Some("cerebras".to_string()),
                cores: Some(2),
                launcher: Some("/usr/bin/env".to_string()),
                launcher_args: vec!["HPCFLOW_LAUNCHED=yes".to_string()],
                ..TransformationConfig::new("/bin/sh")
            },
        )
        .with_task(
            "pretrain",
            shell(
                r#"test "$HPCFLOW_LAUNCHED" = yes && test "$HPCFLOW_CORES" = 2 && test "$HPCFLOW_CONTAINER" = cerebras"#,
            )
            .build(),
        )
        .build();

    let scheduler = run_file(&file).await?;
    assert_eq!(scheduler.state_of("pretrain"), Some(TaskState::Done));
    Ok(())
}
