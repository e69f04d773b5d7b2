// src/dag/task.rs

//! The unit of work the runner schedules.
//!
//! A task is identified by its *kind*, a stable tag shared by every instance
//! of the same sort of work. Dependencies are declared against kinds: a task
//! requiring `"fetch"` becomes ready once any `"fetch"` task has finished.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

/// Canonical task kind type used throughout the crate.
pub type TaskKind = String;

/// Future returned by [`Task::run`].
pub type TaskFuture<'a> = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>>;

/// A schedulable unit of work.
///
/// Implementations are stored as `Box<dyn Task>` and moved between the
/// registry, the ready queue and the execution unit that runs them, so they
/// must be `Send + 'static`.
pub trait Task: Send + 'static {
    /// Kind tag that dependency edges refer to.
    fn kind(&self) -> &str;

    /// Kinds that must have finished before this task may start.
    ///
    /// Read once when the task is registered; never consulted again.
    fn requires(&self) -> &[TaskKind] {
        &[]
    }

    /// Run the task to completion.
    fn run(&mut self) -> TaskFuture<'_>;
}

impl fmt::Debug for dyn Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("kind", &self.kind())
            .field("requires", &self.requires())
            .finish()
    }
}

/// Final state of a single task after a scheduling run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    Succeeded,
    /// `run()` returned an error or panicked.
    Failed(String),
    /// Never started because a prerequisite kind failed and the runner was
    /// configured to skip dependents.
    Skipped { failed_prerequisite: TaskKind },
}

/// Outcome of one task, as collected by the runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskReport {
    pub kind: TaskKind,
    pub status: TaskStatus,
}

impl TaskReport {
    pub fn succeeded(kind: impl Into<TaskKind>) -> Self {
        Self {
            kind: kind.into(),
            status: TaskStatus::Succeeded,
        }
    }

    pub fn failed(kind: impl Into<TaskKind>, reason: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            status: TaskStatus::Failed(reason.into()),
        }
    }

    pub fn skipped(kind: impl Into<TaskKind>, failed_prerequisite: impl Into<TaskKind>) -> Self {
        Self {
            kind: kind.into(),
            status: TaskStatus::Skipped {
                failed_prerequisite: failed_prerequisite.into(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, TaskStatus::Succeeded)
    }
}
