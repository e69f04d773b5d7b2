// src/dag/ready.rs

//! The ready queue: tasks whose prerequisites are all satisfied.
//!
//! Backed by an unbounded tokio mpsc channel, so any number of completion
//! callbacks may push while the runner is the single consumer.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::warn;

use crate::dag::task::Task;

/// Create a connected pusher/queue pair.
pub fn ready_queue() -> (ReadyPusher, ReadyQueue) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ReadyPusher { tx }, ReadyQueue { rx })
}

/// Producer side of the ready queue. Cheap to clone.
#[derive(Clone)]
pub struct ReadyPusher {
    tx: mpsc::UnboundedSender<Box<dyn Task>>,
}

impl ReadyPusher {
    /// Push a task that just became runnable.
    ///
    /// Never blocks. If the consuming side is gone the task is dropped with a
    /// warning, since nothing could ever run it.
    pub fn push(&self, task: Box<dyn Task>) {
        if let Err(mpsc::error::SendError(task)) = self.tx.send(task) {
            warn!(kind = %task.kind(), "ready queue closed; dropping ready task");
        }
    }
}

/// Consumer side of the ready queue, owned by the runner.
pub struct ReadyQueue {
    rx: mpsc::UnboundedReceiver<Box<dyn Task>>,
}

impl ReadyQueue {
    /// Wait up to `wait` for the next ready task.
    ///
    /// Returns `None` on timeout; the queue is often transiently empty while
    /// tasks are running but not yet done.
    pub async fn pop(&mut self, wait: Duration) -> Option<Box<dyn Task>> {
        match tokio::time::timeout(wait, self.rx.recv()).await {
            Ok(task) => task,
            Err(_elapsed) => None,
        }
    }

    /// Take every task currently queued without waiting.
    pub fn drain(&mut self) -> Vec<Box<dyn Task>> {
        let mut tasks = Vec::new();
        while let Ok(task) = self.rx.try_recv() {
            tasks.push(task);
        }
        tasks
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }
}
