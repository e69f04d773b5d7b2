// src/dag/mod.rs

//! Task model and dependency bookkeeping.
//!
//! - [`task`] defines the [`Task`] trait and per-task reports.
//! - [`ready`] is the queue of tasks whose prerequisites are all satisfied.
//! - [`registry`] holds blocked tasks and unblocks them as kinds complete.
//! - [`graph`] validates the kind graph before a run starts.

pub mod graph;
pub mod ready;
pub mod registry;
pub mod task;

pub use graph::TaskGraph;
pub use ready::{ReadyPusher, ReadyQueue, ready_queue};
pub use registry::{Registry, SharedRegistry};
pub use task::{Task, TaskFuture, TaskKind, TaskReport, TaskStatus};
