// src/dag/registry.rs

//! The dependency registry: every task that is not yet ready, together with
//! the prerequisite kinds it is still waiting for.
//!
//! The registry is the only structure mutated by several completion callbacks
//! at once. It is shared as [`SharedRegistry`] and every mutation happens
//! under that single lock, so two tasks finishing together can never both
//! miss (or both push) a common dependent.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use crate::dag::ready::ReadyPusher;
use crate::dag::task::{Task, TaskKind, TaskReport};

/// Registry shared between the runner and its execution units.
pub type SharedRegistry = Arc<Mutex<Registry>>;

/// Lock a shared registry.
///
/// Registry methods never run task bodies, so poisoning is ignored.
pub fn lock(registry: &SharedRegistry) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A blocked task and the prerequisite kinds it has not seen finish yet.
struct PendingTask {
    task: Box<dyn Task>,
    prerequisites: HashSet<TaskKind>,
}

/// Not-yet-ready tasks for one scheduling run.
pub struct Registry {
    pending: Vec<PendingTask>,
    ready: ReadyPusher,
    skipped: Vec<TaskReport>,
    /// Registered tasks per kind that have neither finished nor been skipped.
    unfinished: HashMap<TaskKind, usize>,
}

impl Registry {
    /// Create an empty registry that pushes newly-ready tasks to `ready`.
    pub fn new(ready: ReadyPusher) -> Self {
        Self {
            pending: Vec::new(),
            ready,
            skipped: Vec::new(),
            unfinished: HashMap::new(),
        }
    }

    /// Wrap this registry for sharing with execution units.
    pub fn into_shared(self) -> SharedRegistry {
        Arc::new(Mutex::new(self))
    }

    /// Add a task, copying its declared `requires` into a private set.
    pub fn register(&mut self, task: Box<dyn Task>) {
        let prerequisites: HashSet<TaskKind> = task.requires().iter().cloned().collect();
        debug!(
            kind = %task.kind(),
            ?prerequisites,
            "registered task"
        );
        *self
            .unfinished
            .entry(task.kind().to_string())
            .or_default() += 1;
        self.pending.push(PendingTask {
            task,
            prerequisites,
        });
    }

    /// Record that one task of `kind` has stopped running, and return how
    /// many tasks of that kind are still blocked, queued or running.
    pub fn finish(&mut self, kind: &str) -> usize {
        match self.unfinished.get_mut(kind) {
            Some(count) => {
                *count = count.saturating_sub(1);
                *count
            }
            None => 0,
        }
    }

    /// Tasks of `kind` that are still blocked, queued or running.
    pub fn unfinished(&self, kind: &str) -> usize {
        self.unfinished.get(kind).copied().unwrap_or(0)
    }

    /// Remove and return every task whose prerequisite set is empty.
    ///
    /// Called once at startup; a second call only returns tasks that became
    /// independent in between, never the same task twice.
    pub fn get_independent(&mut self) -> Vec<Box<dyn Task>> {
        let (independent, blocked): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|p| p.prerequisites.is_empty());
        self.pending = blocked;

        independent.into_iter().map(|p| p.task).collect()
    }

    /// Record that a task of `completed` kind has finished.
    ///
    /// The kind is removed from every remaining prerequisite set; tasks whose
    /// set becomes empty leave the registry and are pushed onto the ready
    /// queue. Unknown kinds and an empty registry are no-ops.
    ///
    /// Returns the number of tasks made ready by this call.
    pub fn unblock(&mut self, completed: &str) -> usize {
        let mut still_blocked = Vec::with_capacity(self.pending.len());
        let mut newly_ready = 0;

        for mut pending in std::mem::take(&mut self.pending) {
            if !pending.prerequisites.remove(completed) {
                still_blocked.push(pending);
                continue;
            }

            if pending.prerequisites.is_empty() {
                info!(
                    kind = %pending.task.kind(),
                    unblocked_by = %completed,
                    "prerequisites satisfied; task ready"
                );
                self.ready.push(pending.task);
                newly_ready += 1;
            } else {
                debug!(
                    kind = %pending.task.kind(),
                    unblocked_by = %completed,
                    remaining = ?pending.prerequisites,
                    "prerequisite cleared; still blocked"
                );
                still_blocked.push(pending);
            }
        }

        self.pending = still_blocked;
        newly_ready
    }

    /// Drop every task that (transitively) waits on the `failed` kind.
    ///
    /// Dropped tasks are recorded as skipped. A skipped task's kind is treated
    /// as failed in turn once no other task of that kind is left unfinished;
    /// until then a sibling may still succeed and unblock its dependents.
    /// Returns the kinds skipped by this call.
    pub fn skip_dependents(&mut self, failed: &str) -> Vec<TaskKind> {
        let mut stack: Vec<TaskKind> = vec![failed.to_string()];
        let mut newly_skipped = Vec::new();

        while let Some(kind) = stack.pop() {
            let (dependents, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
                .into_iter()
                .partition(|p| p.prerequisites.contains(&kind));
            self.pending = rest;

            for dependent in dependents {
                let skipped_kind = dependent.task.kind().to_string();
                info!(
                    kind = %skipped_kind,
                    failed_prerequisite = %kind,
                    "skipping task because a prerequisite failed"
                );
                self.skipped
                    .push(TaskReport::skipped(skipped_kind.clone(), kind.clone()));
                newly_skipped.push(skipped_kind.clone());
                if self.finish(&skipped_kind) == 0 {
                    stack.push(skipped_kind);
                }
            }
        }

        newly_skipped
    }

    /// Remaining prerequisites of the first pending task of `kind`.
    pub fn prerequisites_of(&self, kind: &str) -> Option<&HashSet<TaskKind>> {
        self.pending
            .iter()
            .find(|p| p.task.kind() == kind)
            .map(|p| &p.prerequisites)
    }

    /// Whether a task of `kind` is still blocked in the registry.
    pub fn contains(&self, kind: &str) -> bool {
        self.pending.iter().any(|p| p.task.kind() == kind)
    }

    /// Kinds of every task still blocked, in registration order.
    pub fn pending_kinds(&self) -> Vec<TaskKind> {
        self.pending
            .iter()
            .map(|p| p.task.kind().to_string())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Take the reports of every task skipped so far.
    pub fn take_skipped(&mut self) -> Vec<TaskReport> {
        std::mem::take(&mut self.skipped)
    }
}
