// src/exec/task_runner.rs

//! Individual task process runner.

use std::process::Stdio;

use anyhow::{Context, Result, anyhow};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::dag::{DispatchRequest, ResolvedInput};
use crate::engine::RuntimeEvent;
use crate::types::TaskOutcome;

/// Environment variable carrying the task name into the process.
pub const TASK_ENV: &str = "HPCFLOW_TASK";
/// Environment variable carrying the resolved site (empty if unconstrained).
pub const SITE_ENV: &str = "HPCFLOW_SITE";
/// Prefix of the per-input variables, see [`input_env_key`].
pub const INPUT_ENV_PREFIX: &str = "HPCFLOW_INPUT_";
/// `:`-separated paths of all inputs, in declaration order.
pub const INPUTS_ENV: &str = "HPCFLOW_INPUTS";
/// `:`-separated output artifact names.
pub const OUTPUTS_ENV: &str = "HPCFLOW_OUTPUTS";
/// `:`-separated names of the outputs to stage out.
pub const STAGE_OUT_ENV: &str = "HPCFLOW_STAGE_OUT";
/// Site staged-out outputs are delivered to.
pub const OUTPUT_SITE_ENV: &str = "HPCFLOW_OUTPUT_SITE";
pub const CORES_ENV: &str = "HPCFLOW_CORES";
pub const CONTAINER_ENV: &str = "HPCFLOW_CONTAINER";

/// Variable name for one input: `raw-data.csv` becomes
/// `HPCFLOW_INPUT_RAW_DATA_CSV`.
pub fn input_env_key(artifact: &str) -> String {
    let suffix: String = artifact
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("{INPUT_ENV_PREFIX}{suffix}")
}

/// Path a process should read an input from: its registered location, or
/// the logical name for artifacts produced by an earlier task.
pub fn input_path(input: &ResolvedInput) -> &str {
    input.location.as_deref().unwrap_or(&input.artifact)
}

/// Replace `{artifact}` placeholders in task arguments with input paths.
pub fn substitute_args(args: &[String], inputs: &[ResolvedInput]) -> Vec<String> {
    args.iter()
        .map(|arg| {
            inputs.iter().fold(arg.clone(), |arg, input| {
                arg.replace(&format!("{{{}}}", input.artifact), input_path(input))
            })
        })
        .collect()
}

/// Run a single task process and emit exactly one `TaskCompleted` event.
///
/// Spawn errors (missing executable etc.) are reported as
/// `TaskOutcome::Failed(-1)`.
pub async fn run_task(task: DispatchRequest, runtime_tx: mpsc::Sender<RuntimeEvent>) {
    let task_name = task.task.clone();

    let outcome = match run_task_inner(&task).await {
        Ok(outcome) => outcome,
        Err(err) => {
            error!(task = %task_name, error = %err, "task execution error");
            TaskOutcome::Failed(-1)
        }
    };

    if runtime_tx
        .send(RuntimeEvent::TaskCompleted {
            task: task_name.clone(),
            outcome,
        })
        .await
        .is_err()
    {
        debug!(task = %task_name, "runtime gone; dropping completion event");
    }
}

async fn run_task_inner(task: &DispatchRequest) -> Result<TaskOutcome> {
    let executable = task
        .payload
        .executable
        .as_deref()
        .ok_or_else(|| anyhow!("task '{}' has no executable", task.task))?;

    info!(
        task = %task.task,
        site = ?task.site,
        executable = %executable,
        args = ?task.payload.args,
        launcher = ?task.payload.profile.launcher,
        "starting task process"
    );

    let mut cmd = build_command(task, executable);
    cmd.stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning process for task '{}'", task.task))?;

    // Always consume both streams so buffers don't fill.
    if let Some(stdout) = child.stdout.take() {
        let task_name = task.task.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                info!(task = %task_name, "stdout: {}", line);
            }
        });
    }
    if let Some(stderr) = child.stderr.take() {
        let task_name = task.task.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(task = %task_name, "stderr: {}", line);
            }
        });
    }

    let waited = match task.payload.profile.runtime {
        Some(limit) => timeout(limit, child.wait()).await,
        None => Ok(child.wait().await),
    };
    let Ok(status) = waited else {
        warn!(
            task = %task.task,
            runtime = ?task.payload.profile.runtime,
            "task exceeded its runtime; killing"
        );
        if let Err(err) = child.kill().await {
            warn!(task = %task.task, error = %err, "failed to kill task process");
        }
        return Ok(TaskOutcome::Failed(-1));
    };
    let status =
        status.with_context(|| format!("waiting for process of task '{}'", task.task))?;

    let code = status.code().unwrap_or(-1);
    info!(
        task = %task.task,
        exit_code = code,
        success = status.success(),
        "task process exited"
    );

    Ok(if status.success() {
        TaskOutcome::Success
    } else {
        TaskOutcome::Failed(code)
    })
}

/// Command line and environment for a task process.
///
/// With a launcher the process is `launcher launcher_args... executable
/// args...`.
fn build_command(task: &DispatchRequest, executable: &str) -> Command {
    let payload = &task.payload;
    let args = substitute_args(&payload.args, &task.inputs);

    let mut cmd = match payload.profile.launcher {
        Some(ref launcher) => {
            let mut cmd = Command::new(launcher);
            cmd.args(&payload.profile.launcher_args).arg(executable);
            cmd
        }
        None => Command::new(executable),
    };
    cmd.args(&args)
        .env(TASK_ENV, &task.task)
        .env(SITE_ENV, task.site.as_deref().unwrap_or(""));

    for input in &task.inputs {
        cmd.env(input_env_key(&input.artifact), input_path(input));
    }
    let inputs: Vec<&str> = task.inputs.iter().map(input_path).collect();
    let outputs: Vec<&str> = task.outputs.iter().map(|o| o.artifact.as_str()).collect();
    let staged: Vec<&str> = task
        .outputs
        .iter()
        .filter(|o| o.stage_out)
        .map(|o| o.artifact.as_str())
        .collect();
    cmd.env(INPUTS_ENV, inputs.join(":"))
        .env(OUTPUTS_ENV, outputs.join(":"))
        .env(STAGE_OUT_ENV, staged.join(":"));

    if let Some(site) = task.outputs.iter().find_map(|o| o.destination.as_deref()) {
        cmd.env(OUTPUT_SITE_ENV, site);
    }
    if let Some(cores) = payload.profile.cores {
        cmd.env(CORES_ENV, cores.to_string());
    }
    if let Some(ref container) = payload.container {
        cmd.env(CONTAINER_ENV, container);
    }
    cmd
}
