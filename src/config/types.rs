//! Configuration types.

use crate::calendar::Calendar;
use crate::db::DEFAULT_NAMESPACE;
use crate::db::recur::RecurringTask;
use crate::error::PoetResult;
use crate::types::Task;
use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name of the store when no path is configured.
pub const DEFAULT_DB_FILE: &str = ".taskpoet.db";

/// Root configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// SQLite store location (default: `~/.taskpoet.db`).
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Namespace whose bucket commands operate on.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Values applied to tasks created without them.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Tasks re-created on a schedule.
    #[serde(default)]
    pub recurring: Vec<RecurringTask>,

    /// Plugins synced by `plugins sync` when none is named.
    #[serde(default)]
    pub plugins: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            namespace: default_namespace(),
            defaults: DefaultsConfig::default(),
            recurring: Vec::new(),
            plugins: Vec::new(),
        }
    }
}

fn default_db_path() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(DEFAULT_DB_FILE))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_FILE))
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

/// Defaults for new tasks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Date expression for `due`, e.g. `eow` or `3d`.
    #[serde(default)]
    pub due: Option<String>,
}

impl Config {
    /// Load a single configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        // Empty or comment-only files parse as null
        let config: Option<Config> = serde_yaml::from_str(&content)?;
        let config = config.unwrap_or_default();
        config.validate()?;
        Ok(config)
    }

    /// Check the values deserialization cannot.
    pub fn validate(&self) -> Result<()> {
        if self.namespace.trim().is_empty() {
            return Err(anyhow!("namespace cannot be empty"));
        }
        if self.namespace.contains('/') {
            return Err(anyhow!("namespace cannot contain '/': {}", self.namespace));
        }
        for recur in &self.recurring {
            crate::calendar::parse_duration(&recur.frequency).map_err(|e| {
                anyhow!("recurring task '{}': {e}", recur.description)
            })?;
        }
        Ok(())
    }

    /// The defaults task passed to `add`, resolved against `calendar`.
    /// `None` when nothing is configured.
    pub fn default_task<Tz: chrono::TimeZone>(
        &self,
        calendar: &Calendar<Tz>,
    ) -> PoetResult<Option<Task>> {
        let Some(expr) = self.defaults.due.as_deref() else {
            return Ok(None);
        };
        let due = calendar.date(expr)?;
        Ok(Some(Task::default().with_due(due)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    #[test]
    fn defaults_point_at_home() {
        let config = Config::default();
        assert_eq!(config.namespace, "default");
        assert!(config.db_path.ends_with(DEFAULT_DB_FILE));
        assert!(config.defaults.due.is_none());
    }

    #[test]
    fn load_reads_all_sections() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("taskpoet.yaml");
        std::fs::write(
            &path,
            r#"
db_path: /tmp/poet.db
namespace: work
defaults:
  due: eow
recurring:
  - description: water plants
    frequency: 1w
plugins: [example]
"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.db_path, PathBuf::from("/tmp/poet.db"));
        assert_eq!(config.namespace, "work");
        assert_eq!(config.defaults.due.as_deref(), Some("eow"));
        assert_eq!(config.recurring, vec![RecurringTask::new("water plants", "1w")]);
        assert_eq!(config.plugins, vec!["example"]);
    }

    #[test]
    fn empty_file_is_default() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("taskpoet.yaml");
        std::fs::write(&path, "# nothing here\n").unwrap();
        assert_eq!(Config::load(&path).unwrap(), Config::default());
    }

    #[test]
    fn rejects_bad_values() {
        let config = Config {
            namespace: " ".into(),
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            recurring: vec![RecurringTask::new("x", "whenever")],
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn default_task_resolves_due() {
        let cal = Calendar::with_present(Utc.with_ymd_and_hms(2024, 6, 4, 15, 4, 5).unwrap());
        assert!(Config::default().default_task(&cal).unwrap().is_none());

        let config = Config {
            defaults: DefaultsConfig {
                due: Some("24h".into()),
            },
            ..Config::default()
        };
        let task = config.default_task(&cal).unwrap().unwrap();
        assert_eq!(task.due, Some(Utc.with_ymd_and_hms(2024, 6, 5, 15, 4, 5).unwrap()));
    }
}
