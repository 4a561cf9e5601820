// src/dag/mod.rs

//! Task graph construction and scheduling.
//!
//! - [`builder`] accumulates tasks and artifacts and validates them in
//!   `freeze()`.
//! - [`graph`] holds the frozen, immutable graph.
//! - [`scheduler`] is the per-task state machine that decides which tasks
//!   are ready to run.
//! - [`shared`] wraps the scheduler for concurrent workers.
//! - [`task_info`] provides task declarations, states and dispatch types.
//! - [`scheduler_step`] defines the result type for scheduler transitions.
//! - [`state_manager`] applies readiness and blocking cascades.

pub mod builder;
pub mod graph;
pub mod scheduler;
pub mod scheduler_step;
pub mod shared;
pub mod state_manager;
pub mod task_info;

pub use builder::{GraphBuilder, GraphConfig};
pub use graph::WorkflowGraph;
pub use scheduler::{SchedulerView, StateCounts};
pub use scheduler_step::SchedulerStep;
pub use shared::SharedScheduler;
pub use task_info::{
    DispatchRequest, OutputSpec, ResolvedInput, ResolvedOutput, ResourceProfile, StateChange,
    TaskPayload, TaskSpec, TaskState,
};
