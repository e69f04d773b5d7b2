// src/engine/mod.rs

//! Orchestration engine for scrapedag.
//!
//! The [`runner`] seeds the ready queue, spawns one execution unit per ready
//! task and unblocks dependents as units finish; [`report`] collects what
//! happened to every task.

pub mod report;
pub mod runner;

pub use crate::types::FailurePolicy;
pub use report::RunReport;
pub use runner::{Runner, RunnerBuilder, RunnerOptions};
