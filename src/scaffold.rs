// src/scaffold.rs

//! `scrapedag new <DIR>`: lay out a fresh project.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::default_config_path;
use crate::errors::{Result, ScrapedagError};

const CONFIG_TEMPLATE: &str = r#"# scrapedag project configuration.
#
# Every [task.<name>] reads `input`, runs `cmd` once per item with the
# item's fields as $1, $2, ... and writes stdout to `output`. Items whose
# command fails are written to `errors`.

[runner]
on_failure = "unblock"

[default]
workers = 4

[task.links]
cmd = '''curl -fsSL "$1" | grep -oE 'https?://[^"<> ]+' | sort -u'''
input = "input/urls.txt"
output = "output/links.txt"
errors = "output/links.errors"
multiline = true

[task.status]
cmd = '''printf '%s\t%s' "$1" "$(curl -s -o /dev/null -w '%{http_code}' "$1")"'''
input = "output/links.txt"
output = "output/status.txt"
errors = "output/status.errors"
after = ["links"]
"#;

const URLS_TEMPLATE: &str = "https://example.com/\n";

/// Files written by [`create_project`], relative to the project root.
pub const PROJECT_FILES: [&str; 2] = ["Scrapedag.toml", "input/urls.txt"];

/// Create `dir` with a starter config, an input file and an empty output
/// directory. Refuses to touch a path that already exists.
pub fn create_project(dir: &Path) -> Result<PathBuf> {
    if dir.exists() {
        return Err(ScrapedagError::ConfigError(format!(
            "refusing to create project: '{}' already exists",
            dir.display()
        )));
    }

    fs::create_dir_all(dir.join("input"))?;
    fs::create_dir_all(dir.join("output"))?;

    let config_path = dir.join(default_config_path());
    fs::write(&config_path, CONFIG_TEMPLATE)?;
    fs::write(dir.join("input").join("urls.txt"), URLS_TEMPLATE)?;

    info!(dir = %dir.display(), "project created");
    Ok(config_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_and_validate;

    #[test]
    fn creates_a_loadable_project() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("proj");

        let config_path = create_project(&dir).unwrap();

        for file in PROJECT_FILES {
            assert!(dir.join(file).is_file(), "missing {file}");
        }
        assert!(dir.join("output").is_dir());

        let cfg = load_and_validate(&config_path).unwrap();
        assert_eq!(cfg.task.len(), 2);
        assert_eq!(cfg.task["status"].after, vec!["links".to_string()]);
        assert_eq!(cfg.base_dir, dir);
    }

    #[test]
    fn refuses_existing_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let err = create_project(tmp.path()).unwrap_err();
        assert!(matches!(err, ScrapedagError::ConfigError(_)));
    }
}
