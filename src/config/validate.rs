// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile, single_byte};
use crate::dag::TaskGraph;
use crate::errors::{Result, ScrapedagError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::ScrapedagError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

/// Run every semantic check on a raw config.
pub fn validate_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_global_config(cfg)?;
    validate_tasks(cfg)?;
    validate_task_dependencies(cfg)?;
    validate_dag(cfg)?;
    Ok(())
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(ScrapedagError::ConfigError(
            "config must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    // on_failure is strongly typed and validated during deserialization.

    if cfg.runner.max_running == Some(0) {
        return Err(ScrapedagError::ConfigError(
            "[runner].max_running must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.runner.poll_interval_ms == 0 {
        return Err(ScrapedagError::ConfigError(
            "[runner].poll_interval_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.writer.poll_interval_ms == 0 {
        return Err(ScrapedagError::ConfigError(
            "[writer].poll_interval_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.default.workers == 0 {
        return Err(ScrapedagError::ConfigError(
            "[default].workers must be >= 1 (got 0)".to_string(),
        ));
    }

    Ok(())
}

fn validate_tasks(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        if task.cmd.trim().is_empty() {
            return Err(ScrapedagError::ConfigError(format!(
                "task '{}' has an empty `cmd`",
                name
            )));
        }
        if task.workers == Some(0) {
            return Err(ScrapedagError::ConfigError(format!(
                "task '{}' must have `workers` >= 1 (got 0)",
                name
            )));
        }
        for (field, value) in [("delimiter", &task.delimiter), ("quote", &task.quote)] {
            if let Some(value) = value {
                if single_byte(Some(value.as_str())).is_none() {
                    return Err(ScrapedagError::ConfigError(format!(
                        "task '{}' has `{}` = {:?}; expected a single byte character",
                        name, field, value
                    )));
                }
            }
        }
    }
    Ok(())
}

fn validate_task_dependencies(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        for dep in task.after.iter() {
            if !cfg.task.contains_key(dep) {
                return Err(ScrapedagError::ConfigError(format!(
                    "task '{}' has unknown dependency '{}' in `after`",
                    name, dep
                )));
            }
            if dep == name {
                return Err(ScrapedagError::ConfigError(format!(
                    "task '{}' cannot depend on itself in `after`",
                    name
                )));
            }
        }
    }
    Ok(())
}

fn validate_dag(cfg: &RawConfigFile) -> Result<()> {
    let mut graph = TaskGraph::new();
    for (name, task) in cfg.task.iter() {
        graph.add(name, &task.after);
    }
    graph.validate()
}
