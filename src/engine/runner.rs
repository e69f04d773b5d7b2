// src/engine/runner.rs

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::dag::registry::{self, Registry, SharedRegistry};
use crate::dag::{ReadyPusher, ReadyQueue, Task, TaskGraph, TaskKind, TaskReport, ready_queue};
use crate::errors::Result;
use crate::types::FailurePolicy;

use super::report::RunReport;

/// Knobs for a scheduling run.
#[derive(Debug, Clone, Copy)]
pub struct RunnerOptions {
    /// What happens to dependents of a failed task.
    pub failure_policy: FailurePolicy,
    /// Maximum number of tasks running at once; `None` means one execution
    /// unit per ready task with no cap. The ready queue stays unbounded.
    pub max_running: Option<usize>,
    /// Bounded wait on the ready queue between termination checks.
    pub poll_interval: Duration,
    /// Reject unknown prerequisites and cycles in [`RunnerBuilder::build`].
    ///
    /// When `false`, such graphs block forever, as the runner has no other
    /// way to tell a slow task from one that can never become ready.
    pub check_graph: bool,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::default(),
            max_running: None,
            poll_interval: Duration::from_millis(100),
            check_graph: true,
        }
    }
}

/// Explicit registration of the tasks taking part in a run.
#[derive(Default)]
pub struct RunnerBuilder {
    tasks: Vec<Box<dyn Task>>,
    options: RunnerOptions,
}

impl RunnerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn task(mut self, task: impl Task) -> Self {
        self.tasks.push(Box::new(task));
        self
    }

    pub fn boxed_task(mut self, task: Box<dyn Task>) -> Self {
        self.tasks.push(task);
        self
    }

    pub fn tasks(mut self, tasks: impl IntoIterator<Item = Box<dyn Task>>) -> Self {
        self.tasks.extend(tasks);
        self
    }

    pub fn options(mut self, options: RunnerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.options.failure_policy = policy;
        self
    }

    pub fn max_running(mut self, max_running: usize) -> Self {
        self.options.max_running = Some(max_running);
        self
    }

    pub fn poll_interval(mut self, poll_interval: Duration) -> Self {
        self.options.poll_interval = poll_interval;
        self
    }

    pub fn check_graph(mut self, check_graph: bool) -> Self {
        self.options.check_graph = check_graph;
        self
    }

    /// Validate the task graph (unless disabled) and populate a fresh
    /// registry with every task.
    pub fn build(self) -> Result<Runner> {
        if self.options.check_graph {
            let mut graph = TaskGraph::new();
            for task in self.tasks.iter() {
                graph.add(task.kind(), task.requires());
            }
            graph.validate()?;
        }

        let (pusher, queue) = ready_queue();
        let mut registry = Registry::new(pusher.clone());
        for task in self.tasks {
            registry.register(task);
        }

        let semaphore = self
            .options
            .max_running
            .map(|n| Arc::new(Semaphore::new(n.max(1))));

        Ok(Runner {
            registry: registry.into_shared(),
            pusher,
            queue,
            options: self.options,
            semaphore,
        })
    }
}

/// Dependency-driven concurrent task scheduler.
///
/// Seeds the ready queue with every task that has no prerequisites, then
/// spawns one execution unit per ready task. When a unit finishes, its kind
/// is cleared from the registry, which pushes any task left with no
/// prerequisites onto the ready queue.
pub struct Runner {
    registry: SharedRegistry,
    pusher: ReadyPusher,
    queue: ReadyQueue,
    options: RunnerOptions,
    semaphore: Option<Arc<Semaphore>>,
}

impl fmt::Debug for Runner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runner")
            .field("pending", &registry::lock(&self.registry).len())
            .field("ready", &self.queue.len())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// A spawned task and the kind it runs under.
struct ExecutionUnit {
    kind: TaskKind,
    handle: JoinHandle<TaskReport>,
}

impl Runner {
    pub fn builder() -> RunnerBuilder {
        RunnerBuilder::new()
    }

    pub fn options(&self) -> &RunnerOptions {
        &self.options
    }

    /// Shared handle to the registry, for diagnostics.
    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    /// Run every registered task, honouring prerequisites, and return once
    /// all of them have actually finished.
    pub async fn run(mut self) -> RunReport {
        let total = registry::lock(&self.registry).len();
        info!(
            tasks = total,
            failure_policy = ?self.options.failure_policy,
            max_running = ?self.options.max_running,
            "runner starting"
        );

        // Seeding.
        let independent = registry::lock(&self.registry).get_independent();
        debug!(
            kinds = ?independent.iter().map(|t| t.kind()).collect::<Vec<_>>(),
            "seeding ready queue with independent tasks"
        );
        for task in independent {
            self.pusher.push(task);
        }

        // Dispatching.
        let mut units: Vec<ExecutionUnit> = Vec::new();
        let mut stall_reported = false;

        while !self.is_exhausted() {
            let Some(task) = self.queue.pop(self.options.poll_interval).await else {
                if !stall_reported && self.is_stalled(&units) {
                    let pending = registry::lock(&self.registry).pending_kinds();
                    warn!(
                        ?pending,
                        "nothing running and nothing ready, but tasks remain blocked; \
                         they wait on a kind that will never finish"
                    );
                    stall_reported = true;
                }
                continue;
            };

            let permit = match &self.semaphore {
                Some(semaphore) => Arc::clone(semaphore).acquire_owned().await.ok(),
                None => None,
            };

            units.push(self.spawn(task, permit));
        }

        // Draining.
        debug!(units = units.len(), "all tasks dispatched; waiting for completion");
        let mut reports = Vec::with_capacity(total);
        for unit in units {
            match unit.handle.await {
                Ok(report) => reports.push(report),
                Err(err) => {
                    error!(kind = %unit.kind, error = %err, "task execution unit panicked");
                    reports.push(TaskReport::failed(unit.kind, format!("task panicked: {err}")));
                }
            }
        }
        reports.extend(registry::lock(&self.registry).take_skipped());

        let report = RunReport::new(reports);
        info!(
            succeeded = report.succeeded().count(),
            failed = report.failed().count(),
            skipped = report.skipped().count(),
            "runner finished"
        );
        report
    }

    /// No task is blocked and none is waiting to be dispatched.
    ///
    /// The queue is inspected while the registry lock is held: a completing
    /// task moves a dependent out of the registry and onto the queue inside
    /// one critical section, so the dependent is always visible in one of
    /// the two.
    fn is_exhausted(&self) -> bool {
        let registry = registry::lock(&self.registry);
        registry.is_empty() && self.queue.is_empty()
    }

    fn is_stalled(&self, units: &[ExecutionUnit]) -> bool {
        let registry = registry::lock(&self.registry);
        !registry.is_empty()
            && self.queue.is_empty()
            && units.iter().all(|u| u.handle.is_finished())
    }

    fn spawn(&self, mut task: Box<dyn Task>, permit: Option<OwnedSemaphorePermit>) -> ExecutionUnit {
        let kind = task.kind().to_string();
        let guard = CompletionGuard {
            registry: Arc::clone(&self.registry),
            kind: kind.clone(),
            policy: self.options.failure_policy,
            failed: true,
        };

        let unit_kind = kind.clone();
        let handle = tokio::spawn(async move {
            // Move the whole guard in; it must drop when the task ends.
            let mut guard = guard;
            let _permit = permit;
            info!(kind = %unit_kind, "task started");

            match task.run().await {
                Ok(()) => {
                    guard.failed = false;
                    info!(kind = %unit_kind, "task finished");
                    TaskReport::succeeded(unit_kind)
                }
                Err(err) => {
                    let reason = format!("{err:#}");
                    error!(kind = %unit_kind, error = %reason, "task failed");
                    TaskReport::failed(unit_kind, reason)
                }
            }
        });

        ExecutionUnit { kind, handle }
    }
}

/// Clears a task's kind from the registry when its execution unit ends,
/// whether the task returned normally, errored or panicked.
struct CompletionGuard {
    registry: SharedRegistry,
    kind: TaskKind,
    policy: FailurePolicy,
    failed: bool,
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        let mut registry = registry::lock(&self.registry);
        let unfinished = registry.finish(&self.kind);

        if !(self.failed && self.policy == FailurePolicy::Skip) {
            let ready = registry.unblock(&self.kind);
            debug!(kind = %self.kind, newly_ready = ready, "unblocked dependents");
        } else if unfinished == 0 {
            registry.skip_dependents(&self.kind);
        } else {
            // Another task of this kind may still succeed and unblock them.
            debug!(
                kind = %self.kind,
                unfinished,
                "task failed; dependents wait on the rest of its kind"
            );
        }
    }
}
