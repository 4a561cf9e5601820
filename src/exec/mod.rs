// src/exec/mod.rs

//! Task execution layer.
//!
//! Receives `DispatchRequest`s from the runtime and reports outcomes back as
//! `RuntimeEvent`s.
//!
//! - [`backend`] provides the `ExecutorBackend` trait, the production
//!   `ProcessExecutorBackend` and the `SimulatedExecutorBackend`.
//! - [`task_runner`] runs a single task as a local process.

pub mod backend;
pub mod task_runner;

pub use backend::{ExecutorBackend, ProcessExecutorBackend, SimulatedExecutorBackend};
