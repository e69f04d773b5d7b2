use std::str::FromStr;
use serde::Deserialize;

/// What the runner does with the dependents of a task whose run failed.
///
/// - `Unblock`: the failed task still counts as finished; its dependents run
///   anyway (default behaviour). Detecting bad upstream data is left to the
///   error sinks.
/// - `Skip`: dependents waiting on the failed kind are removed from the
///   registry and reported as skipped, transitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    Unblock,
    Skip,
}

impl Default for FailurePolicy {
    fn default() -> Self {
        FailurePolicy::Unblock
    }
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "unblock" => Ok(FailurePolicy::Unblock),
            "skip" => Ok(FailurePolicy::Skip),
            other => Err(format!(
                "invalid on_failure: {other} (expected \"unblock\" or \"skip\")"
            )),
        }
    }
}

/// How a task's input file is split into items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    /// One item per line, trailing newline removed.
    Lines,
    /// One item per CSV row.
    Csv,
}

impl Default for InputFormat {
    fn default() -> Self {
        InputFormat::Lines
    }
}
