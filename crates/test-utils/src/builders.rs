#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use scrapedag::config::{
    ConfigFile, DefaultSection, RawConfigFile, RunnerSection, TaskConfig, WriterSection,
};
use scrapedag::types::{FailurePolicy, InputFormat};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
    base_dir: PathBuf,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                runner: RunnerSection::default(),
                writer: WriterSection::default(),
                default: DefaultSection::default(),
                task: BTreeMap::new(),
            },
            base_dir: PathBuf::from("."),
        }
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn on_failure(mut self, policy: FailurePolicy) -> Self {
        self.config.runner.on_failure = policy;
        self
    }

    pub fn max_running(mut self, max: usize) -> Self {
        self.config.runner.max_running = Some(max);
        self
    }

    pub fn default_workers(mut self, workers: usize) -> Self {
        self.config.default.workers = workers;
        self
    }

    /// Short poll intervals keep runner and writer tests fast.
    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.runner.poll_interval_ms = ms;
        self.config.writer.poll_interval_ms = ms;
        self
    }

    pub fn base_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.base_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn build_raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config)
            .expect("Failed to build valid config from builder")
            .with_base_dir(self.base_dir)
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new(cmd: &str, input: &str, output: &str) -> Self {
        Self {
            task: TaskConfig {
                cmd: cmd.to_string(),
                input: PathBuf::from(input),
                format: InputFormat::Lines,
                delimiter: None,
                quote: None,
                output: PathBuf::from(output),
                errors: None,
                multiline: false,
                after: vec![],
                workers: None,
            },
        }
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.task.after.push(dep.to_string());
        self
    }

    pub fn errors(mut self, path: &str) -> Self {
        self.task.errors = Some(PathBuf::from(path));
        self
    }

    pub fn csv(mut self) -> Self {
        self.task.format = InputFormat::Csv;
        self
    }

    pub fn delimiter(mut self, delimiter: &str) -> Self {
        self.task.delimiter = Some(delimiter.to_string());
        self
    }

    pub fn quote(mut self, quote: &str) -> Self {
        self.task.quote = Some(quote.to_string());
        self
    }

    pub fn multiline(mut self, val: bool) -> Self {
        self.task.multiline = val;
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.task.workers = Some(workers);
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}
