//! Configuration loader with tier-based merging.
//!
//! Loads configuration from multiple tiers and merges them field-by-field.

use super::merge::deep_merge_all;
use super::types::Config;
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Config file name in the project directory.
pub const PROJECT_CONFIG_FILE: &str = "taskpoet.yaml";
/// Config file name in the home directory.
pub const USER_CONFIG_FILE: &str = ".taskpoet.yaml";

/// Configuration tier priority (lowest to highest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigTier {
    /// Built-in defaults (lowest priority)
    Defaults = 0,
    /// User-level config (~/.taskpoet.yaml)
    User = 1,
    /// Project-level config ($CWD/taskpoet.yaml)
    Project = 2,
    /// Environment variables (highest priority)
    Environment = 3,
}

impl std::fmt::Display for ConfigTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigTier::Defaults => write!(f, "defaults"),
            ConfigTier::User => write!(f, "user"),
            ConfigTier::Project => write!(f, "project"),
            ConfigTier::Environment => write!(f, "environment"),
        }
    }
}

/// Paths for each file tier.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    /// User-level config file
    pub user_file: Option<PathBuf>,
    /// Project-level config file
    pub project_file: Option<PathBuf>,
}

impl Default for ConfigPaths {
    fn default() -> Self {
        Self::discover()
    }
}

impl ConfigPaths {
    /// `~/.taskpoet.yaml` and `./taskpoet.yaml`.
    pub fn discover() -> Self {
        Self {
            user_file: dirs::home_dir().map(|h| h.join(USER_CONFIG_FILE)),
            project_file: Some(PathBuf::from(PROJECT_CONFIG_FILE)),
        }
    }

    /// Create paths with explicit files.
    pub fn with_files(user_file: Option<PathBuf>, project_file: Option<PathBuf>) -> Self {
        Self {
            user_file,
            project_file,
        }
    }
}

/// Configuration loader that handles tier-based merging.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Paths for each tier
    pub paths: ConfigPaths,
    /// Loaded configuration
    config: Config,
    /// Files that contributed, lowest tier first
    sources: Vec<(ConfigTier, PathBuf)>,
}

impl ConfigLoader {
    /// Load from the discovered tiers and the process environment.
    ///
    /// `explicit` (the `--config` option) wins over `TASKPOET_CONFIG_PATH`;
    /// either one replaces the user and project tiers.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        Self::load_with_env(ConfigPaths::discover(), explicit, |key| {
            std::env::var(key).ok()
        })
    }

    /// Load with an injected environment lookup.
    pub fn load_with_env<F>(paths: ConfigPaths, explicit: Option<&Path>, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let explicit = explicit
            .map(Path::to_path_buf)
            .or_else(|| env("TASKPOET_CONFIG_PATH").map(PathBuf::from));

        // Tier 1: Defaults
        let mut configs: Vec<Value> = vec![serde_json::to_value(Config::default())?];
        let mut sources = Vec::new();

        if let Some(path) = explicit {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("reading config {}", path.display()))?;
            let value: Option<Value> = serde_yaml::from_str(&content)
                .with_context(|| format!("parsing config {}", path.display()))?;
            configs.extend(value);
            sources.push((ConfigTier::Project, path));
        } else {
            // Tier 2: User, Tier 3: Project
            let tiers = [
                (ConfigTier::User, paths.user_file.as_ref()),
                (ConfigTier::Project, paths.project_file.as_ref()),
            ];
            for (tier, file) in tiers {
                let Some(file) = file else { continue };
                if let Some(value) = read_tier(tier, file) {
                    configs.push(value);
                    sources.push((tier, file.clone()));
                }
            }
        }

        let merged = deep_merge_all(configs);
        let mut config: Config = serde_json::from_value(merged).context("invalid configuration")?;

        // Tier 4: Environment variable overrides
        Self::apply_env_overrides(&mut config, env);
        config.validate()?;

        debug!(
            db_path = %config.db_path.display(),
            namespace = %config.namespace,
            files = sources.len(),
            "Loaded configuration"
        );

        Ok(Self {
            paths,
            config,
            sources,
        })
    }

    /// Apply environment variable overrides to config.
    fn apply_env_overrides<F>(config: &mut Config, env: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(db_path) = env("TASKPOET_DB_PATH") {
            config.db_path = PathBuf::from(db_path);
        }

        if let Some(namespace) = env("TASKPOET_NAMESPACE") {
            config.namespace = namespace;
        }

        if let Some(due) = env("TASKPOET_DEFAULT_DUE") {
            config.defaults.due = Some(due);
        }
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }

    /// Files that contributed, lowest tier first.
    pub fn sources(&self) -> &[(ConfigTier, PathBuf)] {
        &self.sources
    }
}

/// A missing file is skipped silently; an unreadable one with a warning.
fn read_tier(tier: ConfigTier, file: &Path) -> Option<Value> {
    if !file.exists() {
        return None;
    }
    let content = match std::fs::read_to_string(file) {
        Ok(content) => content,
        Err(e) => {
            warn!(%tier, path = %file.display(), error = %e, "Skipping unreadable config");
            return None;
        }
    };
    match serde_yaml::from_str::<Option<Value>>(&content) {
        Ok(value) => value,
        Err(e) => {
            warn!(%tier, path = %file.display(), error = %e, "Skipping invalid config");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn paths_in(temp: &TempDir) -> ConfigPaths {
        ConfigPaths::with_files(
            Some(temp.path().join(USER_CONFIG_FILE)),
            Some(temp.path().join(PROJECT_CONFIG_FILE)),
        )
    }

    #[test]
    fn test_config_paths_discover() {
        let paths = ConfigPaths::discover();
        assert_eq!(paths.project_file, Some(PathBuf::from(PROJECT_CONFIG_FILE)));
        // user_file depends on the environment having a home directory
    }

    #[test]
    fn test_load_defaults_only() {
        let temp = TempDir::new().unwrap();
        let loader = ConfigLoader::load_with_env(paths_in(&temp), None, no_env).unwrap();

        assert_eq!(loader.config(), &Config::default());
        assert!(loader.sources().is_empty());
        assert_eq!(loader.paths.project_file, Some(temp.path().join(PROJECT_CONFIG_FILE)));
    }

    #[test]
    fn test_project_config_overrides_user() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join(USER_CONFIG_FILE),
            "namespace: personal\ndefaults:\n  due: eow\n",
        )
        .unwrap();
        std::fs::write(temp.path().join(PROJECT_CONFIG_FILE), "namespace: work\n").unwrap();

        let loader = ConfigLoader::load_with_env(paths_in(&temp), None, no_env).unwrap();
        let config = loader.config();

        assert_eq!(config.namespace, "work");
        // Untouched by the project tier
        assert_eq!(config.defaults.due.as_deref(), Some("eow"));
        let tiers: Vec<ConfigTier> = loader.sources().iter().map(|(t, _)| *t).collect();
        assert_eq!(tiers, vec![ConfigTier::User, ConfigTier::Project]);
    }

    #[test]
    fn test_env_overrides_files() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join(PROJECT_CONFIG_FILE),
            "namespace: work\ndb_path: /tmp/project.db\n",
        )
        .unwrap();
        let env: HashMap<&str, &str> = HashMap::from([
            ("TASKPOET_DB_PATH", "/tmp/env.db"),
            ("TASKPOET_DEFAULT_DUE", "eod"),
        ]);

        let loader = ConfigLoader::load_with_env(paths_in(&temp), None, |k| {
            env.get(k).map(|v| v.to_string())
        })
        .unwrap();
        let config = loader.config();

        assert_eq!(config.db_path, PathBuf::from("/tmp/env.db"));
        assert_eq!(config.namespace, "work");
        assert_eq!(config.defaults.due.as_deref(), Some("eod"));
    }

    #[test]
    fn test_explicit_file_replaces_tiers() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(PROJECT_CONFIG_FILE), "namespace: work\n").unwrap();
        let explicit = temp.path().join("other.yaml");
        std::fs::write(&explicit, "plugins: [example]\n").unwrap();

        let loader =
            ConfigLoader::load_with_env(paths_in(&temp), Some(&explicit), no_env).unwrap();

        assert_eq!(loader.config().namespace, "default");
        assert_eq!(loader.config().plugins, vec!["example"]);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let env = |k: &str| {
            (k == "TASKPOET_CONFIG_PATH").then(|| "/nonexistent/taskpoet.yaml".to_string())
        };
        assert!(ConfigLoader::load_with_env(paths_in(&temp), None, env).is_err());
    }

    #[test]
    fn test_invalid_tier_is_skipped() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(USER_CONFIG_FILE), "namespace: [unclosed\n").unwrap();

        let loader = ConfigLoader::load_with_env(paths_in(&temp), None, no_env).unwrap();
        assert_eq!(loader.config().namespace, "default");
    }

    #[test]
    fn test_empty_namespace_is_rejected() {
        let temp = TempDir::new().unwrap();
        let env = |k: &str| (k == "TASKPOET_NAMESPACE").then(String::new);
        assert!(ConfigLoader::load_with_env(paths_in(&temp), None, env).is_err());
    }
}
