use super::TaskPlugin;
use crate::types::Task;
use tracing::debug;

/// Starting point for writing a plugin. Always returns the same two tasks.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExamplePlugin;

const PLUGIN_ID: &str = "example";

impl TaskPlugin for ExamplePlugin {
    fn example_config(&self) -> String {
        "# No configuration yet".to_string()
    }

    fn description(&self) -> String {
        "This is meant to be a little structure to help you create your own Task Plugin"
            .to_string()
    }

    fn sync(&self) -> anyhow::Result<Vec<Task>> {
        let tasks = vec![
            Task::new("First Synced Task")
                .with_id("EXAMPLE-1")
                .with_plugin_id(PLUGIN_ID),
            Task::new("Second Synced Task")
                .with_id("EXAMPLE-2")
                .with_plugin_id(PLUGIN_ID),
        ];
        debug!(count = tasks.len(), "Example plugin synced");
        Ok(tasks)
    }
}
