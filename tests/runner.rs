// tests/runner.rs

use std::error::Error;
use std::time::Duration;

use scrapedag::dag::TaskStatus;
use scrapedag::engine::{FailurePolicy, Runner};
use scrapedag::errors::ScrapedagError;
use scrapedag_test_utils::fakes::{ConcurrencyProbe, ExecutionLog, RecordingTask};
use scrapedag_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

const POLL: Duration = Duration::from_millis(5);

/// A, then B and C, then D. B and C finish in varying order.
fn diamond(log: &ExecutionLog) -> Vec<RecordingTask> {
    vec![
        RecordingTask::new("D", log).after("B").after("C"),
        RecordingTask::new("C", log)
            .after("A")
            .with_delay(Duration::from_millis(10)),
        RecordingTask::new("B", log).after("A"),
        RecordingTask::new("A", log).with_delay(Duration::from_millis(5)),
    ]
}

fn runner_with(tasks: Vec<RecordingTask>) -> scrapedag::engine::RunnerBuilder {
    tasks
        .into_iter()
        .fold(Runner::builder().poll_interval(POLL), |b, t| b.task(t))
}

#[tokio::test]
async fn diamond_runs_in_dependency_order() -> TestResult {
    init_tracing();
    let log = ExecutionLog::new();

    let report = with_timeout(runner_with(diamond(&log)).build()?.run()).await;

    assert!(report.is_success(), "{report:?}");
    assert_eq!(report.len(), 4);

    let entries = log.entries();
    assert_eq!(entries.len(), 4);
    assert_eq!(entries.first().map(String::as_str), Some("A"));
    assert_eq!(entries.last().map(String::as_str), Some("D"));
    assert!(log.position("A") < log.position("B"));
    assert!(log.position("A") < log.position("C"));
    assert!(log.position("B") < log.position("D"));
    assert!(log.position("C") < log.position("D"));
    Ok(())
}

#[tokio::test]
async fn zero_tasks_completes_immediately() -> TestResult {
    init_tracing();

    let report = with_timeout(Runner::builder().build()?.run()).await;

    assert!(report.is_empty());
    assert!(report.is_success());
    Ok(())
}

#[tokio::test]
async fn independent_tasks_run_concurrently() -> TestResult {
    init_tracing();
    let log = ExecutionLog::new();
    let probe = ConcurrencyProbe::new();

    let tasks = (0..4)
        .map(|i| {
            RecordingTask::new(&format!("t{i}"), &log)
                .with_delay(Duration::from_millis(50))
                .with_probe(&probe)
        })
        .collect();

    let report = with_timeout(runner_with(tasks).build()?.run()).await;

    assert!(report.is_success());
    assert_eq!(probe.max(), 4);
    Ok(())
}

#[tokio::test]
async fn max_running_caps_concurrent_tasks() -> TestResult {
    init_tracing();
    let log = ExecutionLog::new();
    let probe = ConcurrencyProbe::new();

    let tasks = (0..6)
        .map(|i| {
            RecordingTask::new(&format!("t{i}"), &log)
                .with_delay(Duration::from_millis(20))
                .with_probe(&probe)
        })
        .collect();

    let report = with_timeout(runner_with(tasks).max_running(2).build()?.run()).await;

    assert!(report.is_success());
    assert_eq!(log.entries().len(), 6);
    assert!(probe.max() <= 2, "max concurrency was {}", probe.max());
    Ok(())
}

#[tokio::test]
async fn failed_task_still_unblocks_dependents_by_default() -> TestResult {
    init_tracing();
    let log = ExecutionLog::new();

    let tasks = vec![
        RecordingTask::new("A", &log).failing(),
        RecordingTask::new("B", &log).after("A"),
    ];
    let report = with_timeout(runner_with(tasks).build()?.run()).await;

    assert!(matches!(report.status_of("A"), Some(TaskStatus::Failed(_))));
    assert_eq!(report.status_of("B"), Some(&TaskStatus::Succeeded));
    assert_eq!(log.entries(), vec!["A", "B"]);
    assert!(!report.is_success());
    Ok(())
}

#[tokio::test]
async fn skip_policy_skips_dependents_transitively() -> TestResult {
    init_tracing();
    let log = ExecutionLog::new();

    let tasks = vec![
        RecordingTask::new("A", &log).failing(),
        RecordingTask::new("B", &log).after("A"),
        RecordingTask::new("C", &log).after("B"),
        RecordingTask::new("other", &log),
    ];
    let report = with_timeout(
        runner_with(tasks)
            .failure_policy(FailurePolicy::Skip)
            .build()?
            .run(),
    )
    .await;

    assert_eq!(report.len(), 4);
    assert_eq!(
        report.status_of("B"),
        Some(&TaskStatus::Skipped {
            failed_prerequisite: "A".to_string()
        })
    );
    assert_eq!(
        report.status_of("C"),
        Some(&TaskStatus::Skipped {
            failed_prerequisite: "B".to_string()
        })
    );
    assert_eq!(report.status_of("other"), Some(&TaskStatus::Succeeded));
    assert_eq!(report.skipped().count(), 2);

    let mut ran = log.entries();
    ran.sort();
    assert_eq!(ran, vec!["A", "other"]);
    Ok(())
}

#[tokio::test]
async fn panicking_task_is_reported_and_unblocks_dependents() -> TestResult {
    init_tracing();
    let log = ExecutionLog::new();

    let tasks = vec![
        RecordingTask::new("A", &log).panicking(),
        RecordingTask::new("B", &log).after("A"),
    ];
    let report = with_timeout(runner_with(tasks).build()?.run()).await;

    match report.status_of("A") {
        Some(TaskStatus::Failed(reason)) => assert!(reason.contains("panicked"), "{reason}"),
        other => panic!("expected A to fail, got {other:?}"),
    }
    assert_eq!(report.status_of("B"), Some(&TaskStatus::Succeeded));
    assert_eq!(log.entries(), vec!["B"]);
    Ok(())
}

#[tokio::test]
async fn tasks_sharing_a_kind_all_count_towards_dependents() -> TestResult {
    init_tracing();
    let log = ExecutionLog::new();

    let tasks = vec![
        RecordingTask::new("fetch", &log),
        RecordingTask::new("fetch", &log),
        RecordingTask::new("parse", &log).after("fetch"),
    ];
    let report = with_timeout(runner_with(tasks).build()?.run()).await;

    assert_eq!(report.len(), 3);
    assert!(report.is_success());
    assert_eq!(log.entries().iter().filter(|e| *e == "parse").count(), 1);
    // Ready once any "fetch" has finished.
    assert!(log.position("parse") >= 1);
    Ok(())
}

#[test]
fn build_rejects_cycles() {
    let log = ExecutionLog::new();
    let tasks = vec![
        RecordingTask::new("A", &log).after("B"),
        RecordingTask::new("B", &log).after("A"),
    ];

    let err = runner_with(tasks).build().unwrap_err();
    assert!(matches!(err, ScrapedagError::DagCycle(_)), "{err:?}");
}

#[test]
fn build_rejects_unknown_prerequisites() {
    let log = ExecutionLog::new();
    let tasks = vec![RecordingTask::new("A", &log).after("ghost")];

    let err = runner_with(tasks).build().unwrap_err();
    match err {
        ScrapedagError::UnknownDependency { task, dependency } => {
            assert_eq!(task, "A");
            assert_eq!(dependency, "ghost");
        }
        other => panic!("expected UnknownDependency, got {other:?}"),
    }
}

#[tokio::test]
async fn unchecked_graph_with_unknown_prerequisite_never_finishes() -> TestResult {
    init_tracing();
    let log = ExecutionLog::new();
    let tasks = vec![
        RecordingTask::new("A", &log),
        RecordingTask::new("B", &log).after("ghost"),
    ];
    let runner = runner_with(tasks).check_graph(false).build()?;

    let outcome = tokio::time::timeout(Duration::from_millis(200), runner.run()).await;

    assert!(outcome.is_err(), "runner should still be waiting on B");
    assert_eq!(log.entries(), vec!["A"]);
    Ok(())
}

#[tokio::test]
async fn dependent_waits_for_a_slow_prerequisite_to_finish() -> TestResult {
    init_tracing();
    let log = ExecutionLog::new();

    let tasks = vec![
        RecordingTask::new("A", &log).with_delay(Duration::from_millis(200)),
        RecordingTask::new("B", &log).after("A"),
    ];
    let report = with_timeout(runner_with(tasks).build()?.run()).await;

    assert!(report.is_success(), "{report:?}");
    assert_eq!(log.entries(), vec!["A", "B"]);
    Ok(())
}

#[tokio::test]
async fn skip_policy_runs_dependents_of_a_successful_task() -> TestResult {
    init_tracing();
    let log = ExecutionLog::new();

    let tasks = vec![
        RecordingTask::new("A", &log).with_delay(Duration::from_millis(50)),
        RecordingTask::new("B", &log).after("A"),
    ];
    let report = with_timeout(
        runner_with(tasks)
            .failure_policy(FailurePolicy::Skip)
            .build()?
            .run(),
    )
    .await;

    assert_eq!(report.status_of("A"), Some(&TaskStatus::Succeeded));
    assert_eq!(report.status_of("B"), Some(&TaskStatus::Succeeded));
    assert_eq!(log.entries(), vec!["A", "B"]);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn wide_fan_in_runs_the_sink_exactly_once_and_last() -> TestResult {
    init_tracing();
    let log = ExecutionLog::new();
    const WIDTH: usize = 40;

    let mut sink = RecordingTask::new("sink", &log);
    let mut tasks = vec![RecordingTask::new("root", &log)];
    for i in 0..WIDTH {
        let mid = format!("m{i}");
        sink = sink.after(&mid);
        tasks.push(
            RecordingTask::new(&mid, &log)
                .after("root")
                .with_delay(Duration::from_millis((i % 3) as u64)),
        );
    }
    tasks.push(sink);

    let report = with_timeout(runner_with(tasks).build()?.run()).await;

    assert!(report.is_success(), "{report:?}");
    let entries = log.entries();
    assert_eq!(entries.len(), WIDTH + 2);
    assert_eq!(entries.first().map(String::as_str), Some("root"));
    assert_eq!(entries.last().map(String::as_str), Some("sink"));
    assert_eq!(entries.iter().filter(|e| *e == "sink").count(), 1);
    Ok(())
}

#[tokio::test]
async fn skip_policy_runs_dependents_if_any_task_of_the_kind_succeeds() -> TestResult {
    init_tracing();
    let log = ExecutionLog::new();

    // The failing fetch finishes first; the slower one succeeds.
    let tasks = vec![
        RecordingTask::new("fetch", &log).failing(),
        RecordingTask::new("fetch", &log).with_delay(Duration::from_millis(50)),
        RecordingTask::new("parse", &log).after("fetch"),
    ];
    let report = with_timeout(
        runner_with(tasks)
            .failure_policy(FailurePolicy::Skip)
            .build()?
            .run(),
    )
    .await;

    assert_eq!(report.failed().count(), 1);
    assert_eq!(report.status_of("parse"), Some(&TaskStatus::Succeeded));
    assert_eq!(log.entries(), vec!["fetch", "fetch", "parse"]);
    Ok(())
}

#[tokio::test]
async fn skip_policy_skips_dependents_once_every_task_of_the_kind_failed() -> TestResult {
    init_tracing();
    let log = ExecutionLog::new();

    let tasks = vec![
        RecordingTask::new("fetch", &log).failing(),
        RecordingTask::new("fetch", &log)
            .failing()
            .with_delay(Duration::from_millis(20)),
        RecordingTask::new("parse", &log).after("fetch"),
    ];
    let report = with_timeout(
        runner_with(tasks)
            .failure_policy(FailurePolicy::Skip)
            .build()?
            .run(),
    )
    .await;

    assert_eq!(report.failed().count(), 2);
    assert_eq!(
        report.status_of("parse"),
        Some(&TaskStatus::Skipped {
            failed_prerequisite: "fetch".to_string()
        })
    );
    assert_eq!(log.entries(), vec!["fetch", "fetch"]);
    Ok(())
}
