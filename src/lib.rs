// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod logging;
pub mod pipeline;
pub mod read;
pub mod scaffold;
pub mod scrape;
pub mod types;
pub mod write;

use std::path::Path;

use anyhow::{Result, bail};
use tracing::{debug, info};

use crate::cli::{CliArgs, Command};
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::dag::{TaskGraph, TaskStatus};
use crate::engine::RunReport;
use crate::types::FailurePolicy;

/// High-level entry point used by `main.rs`.
pub async fn run(args: CliArgs) -> Result<()> {
    match args.command {
        Command::Run {
            config,
            dry_run,
            on_failure,
        } => run_config(&config, dry_run, on_failure).await,
        Command::New { dir } => {
            scaffold::create_project(&dir)?;
            println!("Project structure created for {}.", dir.display());
            Ok(())
        }
    }
}

/// Load the config at `config_path`, run every task and print a summary.
///
/// Fails when any task failed or was skipped; the per-item failures of
/// successful tasks live in their error files and do not count.
async fn run_config(
    config_path: &Path,
    dry_run: bool,
    on_failure: Option<FailurePolicy>,
) -> Result<()> {
    let cfg = load_and_validate(config_path)?;

    let mut options = cfg.runner.options();
    if let Some(policy) = on_failure {
        options.failure_policy = policy;
    }

    if dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let runner = pipeline::build_runner(&cfg, options)?;
    info!(config = %config_path.display(), "starting run");
    let report = runner.run().await;

    print_summary(&report);

    if !report.is_success() {
        bail!(
            "{} task(s) failed and {} were skipped",
            report.failed().count(),
            report.skipped().count()
        );
    }
    Ok(())
}

/// Simple dry-run output: print tasks, deps and commands.
fn print_dry_run(cfg: &ConfigFile) {
    let mut graph = TaskGraph::new();
    for (name, task) in cfg.task.iter() {
        graph.add(name, &task.after);
    }

    println!("scrapedag dry-run");
    println!("  runner.on_failure = {:?}", cfg.runner.on_failure);
    if let Some(max) = cfg.runner.max_running {
        println!("  runner.max_running = {max}");
    }
    println!("  default.workers = {}", cfg.default.workers);
    println!("  roots = {:?}", graph.roots());
    println!();

    println!("tasks ({}):", cfg.task.len());
    for (name, task) in cfg.task.iter() {
        println!("  - {name}");
        println!("      cmd: {}", task.cmd);
        println!(
            "      input: {} ({:?})",
            cfg.resolve(&task.input).display(),
            task.format
        );
        println!("      output: {}", cfg.resolve(&task.output).display());
        match &task.errors {
            Some(path) => println!("      errors: {}", cfg.resolve(path).display()),
            None => println!("      errors: <log>"),
        }
        println!("      workers: {}", cfg.workers_for(task));
        if task.multiline {
            println!("      multiline: true");
        }
        if !task.after.is_empty() {
            println!("      after: {:?}", task.after);
        }
    }

    debug!("dry-run complete (no execution)");
}

fn print_summary(report: &RunReport) {
    println!("scrapedag summary ({} tasks):", report.len());
    for task in report.reports() {
        match &task.status {
            TaskStatus::Succeeded => println!("  ok       {}", task.kind),
            TaskStatus::Failed(reason) => println!("  failed   {}: {reason}", task.kind),
            TaskStatus::Skipped {
                failed_prerequisite,
            } => println!(
                "  skipped  {} (prerequisite '{failed_prerequisite}' failed)",
                task.kind
            ),
        }
    }
}
