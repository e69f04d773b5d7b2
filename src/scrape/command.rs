// src/scrape/command.rs

//! Scraper that shells out once per item.

use std::process::Stdio;

use anyhow::{Context, Result, bail};
use tokio::process::Command;
use tracing::debug;

use super::Scraper;

/// Runs a shell command for every item, passing the item's fields as
/// positional parameters (`$1`, `$2`, ... under `sh`).
///
/// - Exit status 0: stdout becomes the result. By default the whole
///   (right-trimmed) stdout is a single record; with `multiline` every
///   non-empty stdout line is its own record.
/// - Non-zero exit or failure to spawn: the failure is
///   `"<fields joined by ','>\t<reason>"`.
#[derive(Debug, Clone)]
pub struct CommandScraper {
    cmd: String,
    multiline: bool,
}

impl CommandScraper {
    pub fn new(cmd: impl Into<String>) -> Self {
        Self {
            cmd: cmd.into(),
            multiline: false,
        }
    }

    pub fn multiline(mut self, multiline: bool) -> Self {
        self.multiline = multiline;
        self
    }

    pub fn cmd(&self) -> &str {
        &self.cmd
    }

    async fn run(&self, fields: &[String]) -> Result<Vec<String>> {
        // Build a shell command appropriate for the platform.
        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&self.cmd);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&self.cmd).arg("scrapedag");
            c
        };

        cmd.args(fields)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = cmd
            .output()
            .await
            .with_context(|| format!("spawning process for `{}`", self.cmd))?;

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("exit code {code}: {}", stderr.trim());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let records = if self.multiline {
            stdout
                .lines()
                .filter(|line| !line.trim().is_empty())
                .map(str::to_string)
                .collect()
        } else {
            vec![stdout.trim_end().to_string()]
        };
        Ok(records)
    }
}

impl Scraper for CommandScraper {
    type Item = Vec<String>;
    type Output = Vec<String>;
    type Failure = String;

    async fn scrape(&self, fields: Vec<String>) -> std::result::Result<Vec<String>, String> {
        match self.run(&fields).await {
            Ok(records) => Ok(records),
            Err(err) => {
                debug!(cmd = %self.cmd, item = ?fields, error = %err, "item failed");
                Err(format!("{}\t{err:#}", fields.join(",")))
            }
        }
    }
}
