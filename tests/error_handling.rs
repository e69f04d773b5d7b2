// tests/error_handling.rs

use std::io::Write;
use std::path::Path;

use scrapedag::config::{load_and_validate, load_from_path};
use scrapedag::errors::ScrapedagError;
use scrapedag::types::{FailurePolicy, InputFormat};
use tempfile::NamedTempFile;

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

fn expect_config_error(contents: &str, needle: &str) {
    let file = config_file(contents);
    match load_and_validate(file.path()) {
        Err(ScrapedagError::ConfigError(msg)) => {
            assert!(msg.contains(needle), "expected {needle:?} in {msg:?}");
        }
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_dag_cycle_returns_structured_error() {
    let file = config_file(
        r#"
[task.A]
cmd = "echo A"
input = "in.txt"
output = "a.txt"
after = ["B"]

[task.B]
cmd = "echo B"
input = "in.txt"
output = "b.txt"
after = ["A"]
"#,
    );

    match load_and_validate(file.path()) {
        Err(ScrapedagError::DagCycle(msg)) => {
            assert!(msg.contains("A") || msg.contains("B"));
        }
        Err(e) => panic!("Expected DagCycle error, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_unknown_dependency_returns_config_error() {
    expect_config_error(
        r#"
[task.A]
cmd = "echo A"
input = "in.txt"
output = "a.txt"
after = ["NonExistent"]
"#,
        "unknown dependency 'NonExistent'",
    );
}

#[test]
fn test_self_dependency_returns_config_error() {
    expect_config_error(
        r#"
[task.A]
cmd = "echo A"
input = "in.txt"
output = "a.txt"
after = ["A"]
"#,
        "cannot depend on itself",
    );
}

#[test]
fn test_empty_config_is_rejected() {
    expect_config_error("[runner]\non_failure = \"skip\"\n", "at least one");
}

#[test]
fn test_zero_sizes_are_rejected() {
    let task = "\n[task.A]\ncmd = \"echo\"\ninput = \"i\"\noutput = \"o\"\n";
    expect_config_error(&format!("[runner]\nmax_running = 0\n{task}"), "max_running");
    expect_config_error(&format!("[default]\nworkers = 0\n{task}"), "workers");
    expect_config_error(&format!("[writer]\npoll_interval_ms = 0\n{task}"), "[writer]");
    expect_config_error(&format!("{task}workers = 0\n"), "task 'A'");
}

#[test]
fn test_multi_byte_delimiter_is_rejected() {
    expect_config_error(
        r#"
[task.A]
cmd = "echo A"
input = "in.csv"
format = "csv"
delimiter = ";;"
output = "a.txt"
"#,
        "delimiter",
    );
}

#[test]
fn test_unknown_failure_policy_is_a_toml_error() {
    let file = config_file(
        r#"
[runner]
on_failure = "retry"

[task.A]
cmd = "echo A"
input = "in.txt"
output = "a.txt"
"#,
    );

    assert!(matches!(
        load_and_validate(file.path()),
        Err(ScrapedagError::TomlError(_))
    ));
}

#[test]
fn test_missing_file_is_io_error() {
    let result = load_from_path(Path::new("/definitely/not/Scrapedag.toml"));
    assert!(matches!(result, Err(ScrapedagError::IoError(_))));
}

#[test]
fn test_defaults_and_path_resolution() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("Scrapedag.toml");
    std::fs::write(
        &config_path,
        r#"
[task.fetch]
cmd = "echo $1"
input = "input/urls.txt"
output = "/tmp/absolute.txt"
format = "csv"
quote = "|"
"#,
    )
    .unwrap();

    let cfg = load_and_validate(&config_path).unwrap();
    let task = &cfg.task["fetch"];

    assert_eq!(cfg.runner.on_failure, FailurePolicy::Unblock);
    assert_eq!(cfg.runner.max_running, None);
    assert!(cfg.runner.check_graph);
    assert_eq!(cfg.workers_for(task), 1);
    assert_eq!(task.format, InputFormat::Csv);
    assert_eq!(task.delimiter_byte(), b',');
    assert_eq!(task.quote_byte(), b'|');
    assert_eq!(cfg.resolve(&task.input), dir.path().join("input/urls.txt"));
    assert_eq!(cfg.resolve(&task.output), Path::new("/tmp/absolute.txt"));
}
