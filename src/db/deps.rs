//! Parent/child links between tasks.
//!
//! Links are stored as id lists on both ends and resolved by lookup when read.
//! Both ends are always written in the same transaction.

use super::tasks::read_task;
use super::Database;
use crate::curator::WeightDescription;
use crate::error::{PoetError, PoetResult};
use crate::types::Task;
use serde::Serialize;
use tracing::{debug, warn};

/// A task with its links resolved and its urgency broken down.
#[derive(Debug, Clone, Serialize)]
pub struct TaskDescription {
    pub task: Task,
    pub parents: Vec<Task>,
    pub children: Vec<Task>,
    pub urgency: f64,
    pub weights: Vec<WeightDescription>,
}

impl Database {
    /// Make `parent` a parent of `child`. Returns the updated `(child, parent)`.
    pub fn add_parent(&self, child: &Task, parent: &Task) -> PoetResult<(Task, Task)> {
        let child_path = child.key_path();
        let parent_path = parent.key_path();

        self.with_tx(|conn| {
            let mut stored_child = read_task(conn, &self.bucket, &child_path)?
                .ok_or_else(|| PoetError::not_found(&child_path))?;
            let mut stored_parent = read_task(conn, &self.bucket, &parent_path)?
                .ok_or_else(|| PoetError::not_found(&parent_path))?;

            stored_child.parents.push(stored_parent.id.clone());
            stored_parent.children.push(stored_child.id.clone());

            // Child first: a repeated link fails its parents check.
            let child = self.edit_tx(conn, stored_child)?;
            let parent = self.edit_tx(conn, stored_parent)?;
            debug!(child = %child_path, parent = %parent_path, "Linked tasks");
            Ok((child, parent))
        })
    }

    /// Make `child` a child of `parent`. Returns the updated `(child, parent)`.
    pub fn add_child(&self, parent: &Task, child: &Task) -> PoetResult<(Task, Task)> {
        self.add_parent(child, parent)
    }

    /// Resolve the parents of a task within its plugin scope.
    pub fn parents_of(&self, task: &Task) -> PoetResult<Vec<Task>> {
        self.resolve_links(task, &task.parents, "parent")
    }

    /// Resolve the children of a task within its plugin scope.
    pub fn children_of(&self, task: &Task) -> PoetResult<Vec<Task>> {
        self.resolve_links(task, &task.children, "child")
    }

    fn resolve_links(&self, task: &Task, ids: &[String], kind: &str) -> PoetResult<Vec<Task>> {
        let mut found = Vec::with_capacity(ids.len());
        for id in ids {
            match self.get_with_id(id, Some(task.effective_plugin_id()), None) {
                Ok(linked) => found.push(linked),
                Err(PoetError::NotFound { .. }) => {
                    warn!(task = %task.id, kind, missing = %id, "Skipping dangling link");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(found)
    }

    /// Everything needed to show a single task in detail.
    pub fn describe(&self, task: &Task) -> PoetResult<TaskDescription> {
        let (urgency, weights) = self.curator.weigh_and_describe(task);
        Ok(TaskDescription {
            task: task.clone(),
            parents: self.parents_of(task)?,
            children: self.children_of(task)?,
            urgency,
            weights,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;

    fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn add_parent_links_both_sides() {
        let db = setup_db();
        let child = db.add(Task::new("child").with_id("c"), None).unwrap();
        let parent = db.add(Task::new("parent").with_id("p"), None).unwrap();

        let (child, parent) = db.add_parent(&child, &parent).unwrap();
        assert_eq!(child.parents, vec!["p"]);
        assert_eq!(parent.children, vec!["c"]);

        let stored = db.get_with_id("p", None, None).unwrap();
        assert_eq!(stored.children, vec!["c"]);
    }

    #[test]
    fn duplicate_link_is_rejected_and_nothing_changes() {
        let db = setup_db();
        let child = db.add(Task::new("child").with_id("c"), None).unwrap();
        let parent = db.add(Task::new("parent").with_id("p"), None).unwrap();
        db.add_child(&parent, &child).unwrap();

        let err = db.add_parent(&child, &parent).unwrap_err();
        assert!(matches!(
            err,
            PoetError::Validation(ValidationError::DuplicateParents(_))
        ));
        let stored = db.get_with_id("p", None, None).unwrap();
        assert_eq!(stored.children, vec!["c"]);
    }

    #[test]
    fn self_link_is_rejected() {
        let db = setup_db();
        let t = db.add(Task::new("me").with_id("me"), None).unwrap();
        assert!(db.add_parent(&t, &t).is_err());
    }

    #[test]
    fn dangling_links_are_skipped() {
        let db = setup_db();
        let t = db
            .add(
                Task::new("orphan").with_parents(vec!["gone".into()]),
                None,
            )
            .unwrap();
        assert!(db.parents_of(&t).unwrap().is_empty());
    }

    #[test]
    fn describe_resolves_links_and_weights() {
        let db = setup_db();
        let child = db.add(Task::new("child").with_id("c"), None).unwrap();
        let parent = db
            .add(Task::new("parent").with_id("p").with_tags(["next"]), None)
            .unwrap();
        let (_, parent) = db.add_parent(&child, &parent).unwrap();

        let d = db.describe(&parent).unwrap();
        assert_eq!(d.children.len(), 1);
        assert_eq!(d.children[0].description, "child");
        assert!(d.parents.is_empty());
        assert_eq!(d.urgency, 16.0);
        let names: Vec<_> = d.weights.iter().map(|w| w.name.as_str()).collect();
        assert_eq!(names, vec!["children", "next"]);
    }
}
