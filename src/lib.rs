// src/lib.rs

pub mod catalog;
pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod types;

use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::loader::{default_config_path, load_and_validate};
use crate::dag::{ResourceProfile, SharedScheduler, WorkflowGraph};
use crate::engine::{RunSummary, Runtime, RuntimeEvent, RuntimeOptions};
use crate::exec::{ExecutorBackend, ProcessExecutorBackend, SimulatedExecutorBackend};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - workflow file loading and graph construction
/// - dry-run plan output
/// - shared scheduler / runtime / executor
/// - Ctrl-C handling
///
/// Returns `None` for a dry run.
pub async fn run(args: CliArgs) -> Result<Option<RunSummary>> {
    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    let file = load_and_validate(&config_path)?;
    let graph = Arc::new(file.build_graph()?);

    info!(
        workflow = %graph.name(),
        tasks = graph.len(),
        artifacts = graph.artifacts().len(),
        "workflow graph frozen"
    );

    if args.dry_run {
        print!("{}", Plan(graph.as_ref()));
        debug!("dry-run complete (no execution)");
        return Ok(None);
    }

    let max_parallel = file.workflow.max_parallel;
    let scheduler = SharedScheduler::from_graph(Arc::clone(&graph));
    scheduler.on_change(|change| {
        debug!(task = %change.task, from = ?change.from, to = ?change.to, "task state changed");
    });

    // Executors may report a whole batch before the runtime drains the
    // channel, so it must hold at least `max_parallel` events.
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(max_parallel.saturating_mul(2).max(64));

    // Ctrl-C → graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    let options = RuntimeOptions { max_parallel };
    let summary = if args.simulate {
        drive(scheduler, rt_rx, SimulatedExecutorBackend::new(rt_tx), options).await?
    } else {
        drive(scheduler, rt_rx, ProcessExecutorBackend::new(rt_tx), options).await?
    };

    Ok(Some(summary))
}

async fn drive<E: ExecutorBackend>(
    scheduler: SharedScheduler,
    rt_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
    options: RuntimeOptions,
) -> Result<RunSummary> {
    let runtime = Runtime::new(scheduler, rt_rx, executor, options);
    Ok(runtime.run().await?)
}

/// Human-readable execution plan of a frozen graph, in topological order.
pub struct Plan<'a>(pub &'a WorkflowGraph);

impl fmt::Display for Plan<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let graph = self.0;
        writeln!(f, "hpcflow dry-run: {}", graph.name())?;
        let sites: Vec<_> = graph.sites().sites().collect();
        writeln!(f, "  sites = {}", sites.join(", "))?;
        if let Some(site) = graph.output_site() {
            writeln!(f, "  output_site = {site}")?;
        }
        writeln!(f)?;

        writeln!(f, "tasks ({}):", graph.len())?;
        for name in graph.topological_order() {
            let Ok(request) = graph.dispatch_request(name) else {
                continue;
            };
            writeln!(f, "  - {name}")?;
            if let Some(ref site) = request.site {
                writeln!(f, "      site: {site}")?;
            }
            let payload = &request.payload;
            if let Some(ref tr) = payload.transformation {
                writeln!(f, "      transformation: {tr}")?;
            }
            if let Some(ref exe) = payload.executable {
                match payload.executable_site {
                    Some(ref site) => writeln!(f, "      executable: {exe} @ {site}")?,
                    None => writeln!(f, "      executable: {exe}")?,
                }
            }
            if let Some(ref container) = payload.container {
                writeln!(f, "      container: {container}")?;
            }
            if !payload.profile.is_empty() {
                writeln!(f, "      profile: {}", ProfileLine(&payload.profile))?;
            }
            if let Some(ref label) = payload.node_label {
                writeln!(f, "      label: {label}")?;
            }
            for input in &request.inputs {
                match (&input.producer, &input.location) {
                    (Some(producer), _) => {
                        writeln!(f, "      in:  {} (from {producer})", input.artifact)?
                    }
                    (None, Some(location)) => {
                        writeln!(f, "      in:  {} @ {location}", input.artifact)?
                    }
                    (None, None) => writeln!(f, "      in:  {}", input.artifact)?,
                }
            }
            for output in &request.outputs {
                match (output.stage_out, &output.destination) {
                    (true, Some(site)) => {
                        writeln!(f, "      out: {} [stage-out -> {site}]", output.artifact)?
                    }
                    (true, None) => writeln!(f, "      out: {} [stage-out]", output.artifact)?,
                    (false, _) => writeln!(f, "      out: {}", output.artifact)?,
                }
            }
            let deps = graph.dependencies_of(name);
            if !deps.is_empty() {
                writeln!(f, "      after: {}", deps.join(", "))?;
            }
        }
        Ok(())
    }
}

struct ProfileLine<'a>(&'a ResourceProfile);

impl fmt::Display for ProfileLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let profile = self.0;
        let mut parts = Vec::new();
        if let Some(cores) = profile.cores {
            parts.push(format!("cores={cores}"));
        }
        if let Some(runtime) = profile.runtime {
            parts.push(format!("runtime={}s", runtime.as_secs()));
        }
        if let Some(ref launcher) = profile.launcher {
            let mut launch = launcher.clone();
            for arg in &profile.launcher_args {
                launch.push(' ');
                launch.push_str(arg);
            }
            parts.push(format!("launcher=\"{launch}\""));
        }
        write!(f, "{}", parts.join(" "))
    }
}
