// src/config/model.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::engine::RunnerOptions;
use crate::types::{FailurePolicy, InputFormat};

/// Top-level configuration as read from a TOML file, before validation.
///
/// ```toml
/// [runner]
/// on_failure = "unblock"
/// max_running = 4
///
/// [writer]
/// poll_interval_ms = 100
///
/// [default]
/// workers = 4
///
/// [task.fetch]
/// cmd = "curl -fsSL \"$1\""
/// input = "input/urls.txt"
/// output = "output/pages.txt"
/// errors = "output/pages.errors"
///
/// [task.links]
/// cmd = "grep -o 'href=\"[^\"]*\"' \"$1\""
/// input = "output/pages.txt"
/// output = "output/links.txt"
/// multiline = true
/// after = ["fetch"]
/// ```
///
/// All sections except `[task.<name>]` are optional and have defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub runner: RunnerSection,

    #[serde(default)]
    pub writer: WriterSection,

    #[serde(default)]
    pub default: DefaultSection,

    /// All tasks from `[task.<name>]`. The name is the task's kind.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,
}

/// Validated configuration.
///
/// Only obtainable through `TryFrom<RawConfigFile>` (or the loader), so
/// holders can rely on the task graph being well formed.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub runner: RunnerSection,
    pub writer: WriterSection,
    pub default: DefaultSection,
    pub task: BTreeMap<String, TaskConfig>,
    /// Directory that relative `input`/`output`/`errors` paths resolve
    /// against.
    pub base_dir: PathBuf,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            runner: raw.runner,
            writer: raw.writer,
            default: raw.default,
            task: raw.task,
            base_dir: PathBuf::from("."),
        }
    }

    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    /// Resolve a task path against [`ConfigFile::base_dir`].
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Worker count for `task`, falling back to `[default].workers`.
    pub fn workers_for(&self, task: &TaskConfig) -> usize {
        task.workers.unwrap_or(self.default.workers)
    }
}

/// `[runner]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RunnerSection {
    /// `"unblock"` (default) or `"skip"`.
    #[serde(default)]
    pub on_failure: FailurePolicy,

    /// Cap on concurrently running tasks; unset means no cap.
    #[serde(default)]
    pub max_running: Option<usize>,

    /// Reject cycles and unknown prerequisites before running.
    #[serde(default = "default_check_graph")]
    pub check_graph: bool,

    /// Bounded wait on the ready queue, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for RunnerSection {
    fn default() -> Self {
        Self {
            on_failure: FailurePolicy::default(),
            max_running: None,
            check_graph: default_check_graph(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl RunnerSection {
    pub fn options(&self) -> RunnerOptions {
        RunnerOptions {
            failure_policy: self.on_failure,
            max_running: self.max_running,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            check_graph: self.check_graph,
        }
    }
}

/// `[writer]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct WriterSection {
    /// How often an idle commit loop re-checks for shutdown, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for WriterSection {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl WriterSection {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// `[default]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct DefaultSection {
    /// Worker pool size for tasks that do not set their own.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for DefaultSection {
    fn default() -> Self {
        Self {
            workers: default_workers(),
        }
    }
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    /// Shell command run once per input item; the item's fields are passed
    /// as positional parameters.
    pub cmd: String,

    /// Input file.
    pub input: PathBuf,

    /// How `input` is split into items.
    #[serde(default)]
    pub format: InputFormat,

    /// CSV field delimiter (single byte). Defaults to `,`.
    #[serde(default)]
    pub delimiter: Option<String>,

    /// CSV quote character (single byte). Defaults to `"`.
    #[serde(default)]
    pub quote: Option<String>,

    /// Result file, one record per line. Truncated when the task starts.
    pub output: PathBuf,

    /// Failure file. If `None`, failures are logged at WARN.
    #[serde(default)]
    pub errors: Option<PathBuf>,

    /// Treat every stdout line as its own record.
    #[serde(default)]
    pub multiline: bool,

    /// Kinds that must finish before this task starts.
    #[serde(default)]
    pub after: Vec<String>,

    /// Worker pool size; falls back to `[default].workers`.
    #[serde(default)]
    pub workers: Option<usize>,
}

impl TaskConfig {
    /// CSV delimiter as a byte. Validation guarantees a single byte.
    pub fn delimiter_byte(&self) -> u8 {
        single_byte(self.delimiter.as_deref()).unwrap_or(b',')
    }

    /// CSV quote character as a byte. Validation guarantees a single byte.
    pub fn quote_byte(&self) -> u8 {
        single_byte(self.quote.as_deref()).unwrap_or(b'"')
    }
}

pub(crate) fn single_byte(s: Option<&str>) -> Option<u8> {
    match s.map(str::as_bytes) {
        Some([b]) => Some(*b),
        _ => None,
    }
}

fn default_check_graph() -> bool {
    true
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_workers() -> usize {
    1
}
