// src/engine/report.rs

use crate::dag::task::{TaskReport, TaskStatus};

/// Outcome of a whole scheduling run.
///
/// A run completes once every task has been attempted; callers inspect the
/// per-task reports (and each task's error sink) instead of a single
/// pass/fail signal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    reports: Vec<TaskReport>,
}

impl RunReport {
    pub fn new(reports: Vec<TaskReport>) -> Self {
        Self { reports }
    }

    pub fn reports(&self) -> &[TaskReport] {
        &self.reports
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    /// Status of the first task of `kind`, if it took part in the run.
    pub fn status_of(&self, kind: &str) -> Option<&TaskStatus> {
        self.reports
            .iter()
            .find(|r| r.kind == kind)
            .map(|r| &r.status)
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &TaskReport> {
        self.reports.iter().filter(|r| r.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &TaskReport> {
        self.reports
            .iter()
            .filter(|r| matches!(r.status, TaskStatus::Failed(_)))
    }

    pub fn skipped(&self) -> impl Iterator<Item = &TaskReport> {
        self.reports
            .iter()
            .filter(|r| matches!(r.status, TaskStatus::Skipped { .. }))
    }

    /// True when every task ran and succeeded.
    pub fn is_success(&self) -> bool {
        self.reports.iter().all(TaskReport::is_success)
    }
}
