//! Task plugins: external sources whose tasks are reconciled into the store.

mod example;

pub use example::ExamplePlugin;

use crate::db::Database;
use crate::error::{PoetError, PoetResult};
use crate::types::Task;
use std::collections::BTreeMap;
use std::fmt;
use tracing::info;

/// A source of tasks.
pub trait TaskPlugin: Send + Sync {
    /// Example configuration snippet.
    fn example_config(&self) -> String;

    fn description(&self) -> String;

    /// Fetch the plugin's current tasks.
    fn sync(&self) -> anyhow::Result<Vec<Task>>;
}

/// Builds a fresh plugin instance.
pub type PluginFactory = Box<dyn Fn() -> Box<dyn TaskPlugin> + Send + Sync>;

/// Named plugin factories.
#[derive(Default)]
pub struct PluginRegistry {
    factories: BTreeMap<String, PluginFactory>,
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugins", &self.names())
            .finish()
    }
}

impl PluginRegistry {
    /// Registry holding the plugins shipped with taskpoet.
    pub fn with_builtin() -> Self {
        let mut registry = Self::default();
        registry.register("example", || Box::new(ExamplePlugin));
        registry
    }

    /// Add or replace a plugin.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn TaskPlugin> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
    }

    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    pub fn create(&self, name: &str) -> PoetResult<Box<dyn TaskPlugin>> {
        self.factories
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| PoetError::not_found(format!("plugin {name}")))
    }
}

impl Database {
    /// Pull tasks from the named plugin and add or edit them.
    pub fn sync_plugin(&self, name: &str) -> PoetResult<Vec<Task>> {
        let plugin = self.plugins().create(name)?;
        let tasks = plugin.sync().map_err(|e| PoetError::PluginSync {
            name: name.to_string(),
            message: format!("{e:#}"),
        })?;
        let stored = self.add_or_edit_set(tasks)?;
        info!(plugin = name, tasks = stored.len(), "Synced plugin");
        Ok(stored)
    }
}
