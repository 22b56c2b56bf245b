//! Task CRUD and state transitions.
//!
//! Tasks live at `/<state>/<plugin_id>/<id>`. Moving between states means
//! writing the new key and deleting the old one in the same transaction.

use super::{Database, kv, now};
use crate::error::{PoetError, PoetResult, ValidationError};
use crate::types::{DEFAULT_PLUGIN_ID, Task, TaskState, key_path};
use rusqlite::Connection;
use std::collections::HashSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Internal helper to read a task using an existing connection (avoids deadlock).
pub(super) fn read_task(
    conn: &Connection,
    bucket: &str,
    path: &str,
) -> PoetResult<Option<Task>> {
    match kv::get(conn, bucket, path)? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

fn write_task(conn: &Connection, bucket: &str, task: &Task) -> PoetResult<()> {
    let serial = serde_json::to_vec(task)?;
    kv::put(conn, bucket, &task.key_path(), &serial)
}

/// Key of an existing task with this `(plugin_id, id)` in any state.
fn find_existing(
    conn: &Connection,
    bucket: &str,
    plugin_id: &str,
    id: &str,
) -> PoetResult<Option<String>> {
    for state in TaskState::ALL {
        let path = key_path(state, plugin_id, id);
        if kv::contains(conn, bucket, &path)? {
            return Ok(Some(path));
        }
    }
    Ok(None)
}

fn plugin_or_default(plugin_id: Option<&str>) -> &str {
    match plugin_id {
        Some(p) if !p.is_empty() => p,
        _ => DEFAULT_PLUGIN_ID,
    }
}

/// Fold a sparse edit into the stored original.
fn merge_edit(mut task: Task, original: &Task) -> Task {
    task.added = original.added;
    if task.description.is_empty() {
        task.description = original.description.clone();
    }
    if task.plugin_id.is_empty() {
        task.plugin_id = original.plugin_id.clone();
    }
    if task.due.is_none() {
        task.due = original.due;
    }
    if task.completed.is_none() {
        task.completed = original.completed;
    }
    if task.hide_until.is_none() {
        task.hide_until = original.hide_until;
    }
    if task.cancel_after.is_none() {
        task.cancel_after = original.cancel_after;
    }
    if task.reviewed.is_none() {
        task.reviewed = original.reviewed;
    }
    if task.effort_impact.is_unset() {
        task.effort_impact = original.effort_impact;
    }
    task
}

impl Database {
    /// The three lifecycle states by name.
    pub fn states() -> Vec<&'static str> {
        TaskState::ALL.iter().map(|s| s.as_str()).collect()
    }

    /// The states as key prefixes, `/active` and so on.
    pub fn state_paths() -> Vec<String> {
        TaskState::ALL.iter().map(|s| s.prefix()).collect()
    }

    pub(crate) fn add_tx(
        &self,
        conn: &Connection,
        mut task: Task,
        defaults: Option<&Task>,
    ) -> PoetResult<Task> {
        if task.id.is_empty() {
            task.id = Uuid::new_v4().to_string();
        }
        if task.plugin_id.is_empty() {
            task.plugin_id = DEFAULT_PLUGIN_ID.to_string();
        }
        if task.added.is_none() {
            task.added = Some(now());
        }
        if let Some(defaults) = defaults {
            if task.due.is_none() {
                task.due = defaults.due;
            }
        }
        task.normalize_tags();
        task.urgency = self.curator.weigh(&task);
        task.validate()?;

        if let Some(key) = find_existing(conn, &self.bucket, &task.plugin_id, &task.id)? {
            return Err(PoetError::AlreadyExists { key });
        }

        write_task(conn, &self.bucket, &task)?;
        debug!(key = %task.key_path(), "Added task");
        Ok(task)
    }

    pub(crate) fn edit_tx(&self, conn: &Connection, task: Task) -> PoetResult<Task> {
        let path = task.key_path();
        let original = read_task(conn, &self.bucket, &path)?.ok_or_else(|| {
            PoetError::not_found(format!("cannot edit a task that does not exist: {path}"))
        })?;

        // Completion moves the key; only complete() may change it.
        if task.completed.is_some() && task.completed != original.completed {
            return Err(ValidationError::CompletedChanged(task.id.clone()).into());
        }

        let mut merged = merge_edit(task, &original);
        merged.normalize_tags();
        merged.urgency = self.curator.weigh(&merged);
        merged.validate()?;

        write_task(conn, &self.bucket, &merged)?;
        debug!(key = %path, "Edited task");
        Ok(merged)
    }

    /// Add a new task. `defaults` supplies field values the task leaves empty.
    pub fn add(&self, task: Task, defaults: Option<&Task>) -> PoetResult<Task> {
        self.with_tx(|conn| self.add_tx(conn, task, defaults))
    }

    /// Add every task, or none of them.
    ///
    /// One duplicate fails the whole set. Callers that want to skip
    /// duplicates and keep going should call [`Database::add`] per task.
    pub fn add_set(&self, tasks: Vec<Task>, defaults: Option<&Task>) -> PoetResult<Vec<Task>> {
        self.with_tx(|conn| {
            tasks
                .into_iter()
                .map(|t| self.add_tx(conn, t, defaults))
                .collect()
        })
    }

    /// Add a task that is already done.
    pub fn log(&self, mut task: Task, defaults: Option<&Task>) -> PoetResult<Task> {
        if task.completed.is_none() {
            task.completed = Some(now());
        }
        self.add(task, defaults)
    }

    /// Merge a sparse update into an existing task.
    pub fn edit(&self, task: Task) -> PoetResult<Task> {
        self.with_tx(|conn| self.edit_tx(conn, task))
    }

    /// Edit every task, or none of them.
    pub fn edit_set(&self, tasks: Vec<Task>) -> PoetResult<Vec<Task>> {
        self.with_tx(|conn| {
            tasks
                .into_iter()
                .map(|t| self.edit_tx(conn, t))
                .collect()
        })
    }

    /// Add the tasks that are new and edit the ones already stored at their key.
    ///
    /// A task stored under a different state (completed or deleted since it
    /// was last seen) is left alone, and repeats of one `(plugin_id, id)` in
    /// the input keep only the first.
    pub fn add_or_edit_set(&self, tasks: Vec<Task>) -> PoetResult<Vec<Task>> {
        self.with_tx(|conn| {
            let mut seen = HashSet::new();
            let mut to_add = Vec::new();
            let mut to_edit = Vec::new();
            for task in tasks {
                if task.id.is_empty() {
                    to_add.push(task);
                    continue;
                }
                let plugin_id = plugin_or_default(Some(&task.plugin_id)).to_string();
                if !seen.insert((plugin_id.clone(), task.id.clone())) {
                    warn!(plugin = %plugin_id, id = %task.id, "Duplicate task in set, keeping the first");
                    continue;
                }
                let path = task.key_path();
                match find_existing(conn, &self.bucket, &plugin_id, &task.id)? {
                    None => to_add.push(task),
                    Some(existing) if existing == path => to_edit.push(task),
                    Some(existing) => {
                        debug!(key = %existing, "Task moved out of the set's state, skipping");
                    }
                }
            }
            debug!(add = to_add.len(), edit = to_edit.len(), "Reconciling task set");

            let mut stored = Vec::with_capacity(to_add.len() + to_edit.len());
            for task in to_add {
                stored.push(self.add_tx(conn, task, None)?);
            }
            for task in to_edit {
                stored.push(self.edit_tx(conn, task)?);
            }
            Ok(stored)
        })
    }

    /// Move an active task to completed.
    pub fn complete(&self, task: &Task) -> PoetResult<Task> {
        self.transition(task, TaskState::Completed)
    }

    /// Soft delete: move an active or completed task to deleted.
    pub fn delete(&self, task: &Task) -> PoetResult<Task> {
        self.transition(task, TaskState::Deleted)
    }

    fn transition(&self, task: &Task, to: TaskState) -> PoetResult<Task> {
        let from = task.state();
        let allowed = match to {
            TaskState::Completed => from == TaskState::Active,
            TaskState::Deleted => from != TaskState::Deleted,
            TaskState::Active => false,
        };
        if !allowed {
            return Err(PoetError::InvalidTransition {
                id: task.id.clone(),
                from: from.as_str(),
                to: to.as_str(),
            });
        }

        self.with_tx(|conn| {
            let old_path = task.key_path();
            let mut stored = read_task(conn, &self.bucket, &old_path)?
                .ok_or_else(|| PoetError::not_found(&old_path))?;
            match to {
                TaskState::Completed => stored.completed = Some(now()),
                TaskState::Deleted => stored.deleted = Some(now()),
                TaskState::Active => {}
            }
            write_task(conn, &self.bucket, &stored)?;
            kv::delete(conn, &self.bucket, &old_path)?;
            info!(from = %old_path, to = %stored.key_path(), "Moved task");
            Ok(stored)
        })
    }

    /// Hard delete the task at its current key.
    pub fn purge(&self, task: &Task) -> PoetResult<()> {
        let path = task.key_path();
        self.with_tx(|conn| {
            if !kv::delete(conn, &self.bucket, &path)? {
                return Err(PoetError::not_found(format!(
                    "cannot purge a task that does not exist: {path}"
                )));
            }
            info!(key = %path, "Purged task");
            Ok(())
        })
    }

    /// Append a comment to the stored task.
    pub fn add_comment(&self, task: &Task, text: &str) -> PoetResult<Task> {
        let path = task.key_path();
        self.with_tx(|conn| {
            let mut stored = read_task(conn, &self.bucket, &path)?
                .ok_or_else(|| PoetError::not_found(&path))?;
            stored.add_comment(text)?;
            write_task(conn, &self.bucket, &stored)?;
            Ok(stored)
        })
    }

    /// Every task whose key starts with `prefix`, in key order.
    pub fn list(&self, prefix: &str) -> PoetResult<Vec<Task>> {
        self.with_conn(|conn| {
            kv::scan_prefix(conn, &self.bucket, prefix)?
                .into_iter()
                .map(|(_, value)| Ok(serde_json::from_slice(&value)?))
                .collect()
        })
    }

    pub fn get_with_exact_path(&self, path: &str) -> PoetResult<Task> {
        self.with_conn(|conn| read_task(conn, &self.bucket, path))?
            .ok_or_else(|| PoetError::not_found(format!("could not find task: {path}")))
    }

    /// Look a task up by id, in one state or in each state in turn.
    pub fn get_with_id(
        &self,
        id: &str,
        plugin_id: Option<&str>,
        state: Option<TaskState>,
    ) -> PoetResult<Task> {
        let plugin_id = plugin_or_default(plugin_id);
        let states = match state {
            Some(s) => vec![s],
            None => TaskState::ALL.to_vec(),
        };
        let paths: Vec<String> = states.iter().map(|s| key_path(*s, plugin_id, id)).collect();

        self.with_conn(|conn| {
            for path in &paths {
                if let Some(task) = read_task(conn, &self.bucket, path)? {
                    return Ok(task);
                }
            }
            Err(PoetError::not_found(format!(
                "could not find that task at any of {}",
                paths.join(", ")
            )))
        })
    }

    /// Look a task up by the start of its id. Must match exactly one key.
    pub fn get_with_partial_id(
        &self,
        partial_id: &str,
        plugin_id: Option<&str>,
        state: Option<TaskState>,
    ) -> PoetResult<Task> {
        let plugin_id = plugin_or_default(plugin_id);
        let states = match state {
            Some(s) => vec![s],
            None => TaskState::ALL.to_vec(),
        };

        let mut matches = Vec::new();
        for state in states {
            let prefix = format!("{}/{}/{}", state.prefix(), plugin_id, partial_id);
            matches.extend(self.get_ids_by_prefix(&prefix)?);
        }

        match matches.len() {
            0 => Err(PoetError::not_found(format!("no matches for {partial_id}"))),
            1 => self.get_with_exact_path(&matches[0]),
            _ => Err(PoetError::Ambiguous {
                partial_id: partial_id.to_string(),
                candidates: matches,
            }),
        }
    }

    /// Raw keys starting with `prefix`.
    pub fn get_ids_by_prefix(&self, prefix: &str) -> PoetResult<Vec<String>> {
        self.with_conn(|conn| kv::keys_with_prefix(conn, &self.bucket, prefix))
    }

    /// Shell completion candidates: `"<short id>\t<description>"` for tasks
    /// under `prefix` whose id starts with, or description contains, `to_complete`.
    pub fn complete_ids_with_prefix(
        &self,
        prefix: &str,
        to_complete: &str,
    ) -> PoetResult<Vec<String>> {
        let tasks = self.list(prefix)?;
        Ok(tasks
            .iter()
            .filter(|t| t.id.starts_with(to_complete) || t.description.contains(to_complete))
            .map(|t| format!("{}\t{}", t.short_id(), t.description))
            .collect())
    }

    /// Recompute the cached urgency of tasks about to be shown.
    pub fn refresh_urgency(&self, tasks: &mut [Task]) {
        for task in tasks {
            task.urgency = self.curator.weigh(task);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EffortImpact;
    use chrono::{Duration, TimeZone, Utc};

    fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn states_and_paths() {
        assert_eq!(Database::states(), vec!["active", "completed", "deleted"]);
        assert_eq!(
            Database::state_paths(),
            vec!["/active", "/completed", "/deleted"]
        );
    }

    #[test]
    fn add_assigns_missing_fields() {
        let db = setup_db();
        let mut task = Task::default();
        task.description = "bare".into();
        let stored = db.add(task, None).unwrap();
        assert!(!stored.id.is_empty());
        assert_eq!(stored.plugin_id, DEFAULT_PLUGIN_ID);
        assert!(stored.added.is_some());
    }

    #[test]
    fn add_applies_due_default_only_when_unset() {
        let db = setup_db();
        let default_due = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        let own_due = Utc.with_ymd_and_hms(2029, 6, 1, 0, 0, 0).unwrap();
        let defaults = Task::default().with_due(default_due);

        let a = db.add(Task::new("a"), Some(&defaults)).unwrap();
        assert_eq!(a.due, Some(default_due));
        let b = db.add(Task::new("b").with_due(own_due), Some(&defaults)).unwrap();
        assert_eq!(b.due, Some(own_due));
    }

    #[test]
    fn duplicate_id_in_any_state_is_rejected() {
        let db = setup_db();
        let t = db.add(Task::new("once").with_id("dup"), None).unwrap();
        db.complete(&t).unwrap();
        let err = db.add(Task::new("twice").with_id("dup"), None).unwrap_err();
        assert!(err.is_already_exists());
    }

    #[test]
    fn edit_merges_blank_fields() {
        let db = setup_db();
        let due = Utc::now() + Duration::days(3);
        let stored = db
            .add(
                Task::new("original")
                    .with_id("e1")
                    .with_due(due)
                    .with_effort_impact(EffortImpact::High),
                None,
            )
            .unwrap();

        let patch = Task {
            id: "e1".into(),
            tags: vec!["x".into()],
            ..Default::default()
        };
        let edited = db.edit(patch).unwrap();
        assert_eq!(edited.description, "original");
        assert_eq!(edited.due, Some(due));
        assert_eq!(edited.added, stored.added);
        assert_eq!(edited.effort_impact, EffortImpact::High);
        assert_eq!(edited.plugin_id, DEFAULT_PLUGIN_ID);
        assert_eq!(edited.tags, vec!["x"]);
    }

    #[test]
    fn edit_missing_task_is_not_found() {
        let db = setup_db();
        let err = db.edit(Task::new("ghost")).unwrap_err();
        assert!(matches!(err, PoetError::NotFound { .. }));
    }

    #[test]
    fn edit_cannot_change_completed() {
        let db = setup_db();
        let t = db.log(Task::new("done").with_id("c1"), None).unwrap();
        let mut changed = t.clone();
        changed.completed = t.completed.map(|c| c - Duration::days(1));
        // Same completed path, different timestamp.
        let err = db.edit(changed).unwrap_err();
        assert!(matches!(
            err,
            PoetError::Validation(ValidationError::CompletedChanged(_))
        ));
    }

    #[test]
    fn transitions_enforce_lifecycle() {
        let db = setup_db();
        let t = db.add(Task::new("move me"), None).unwrap();
        let done = db.complete(&t).unwrap();
        assert!(matches!(
            db.complete(&done).unwrap_err(),
            PoetError::InvalidTransition { .. }
        ));
        let gone = db.delete(&done).unwrap();
        assert_eq!(gone.state(), TaskState::Deleted);
        assert!(matches!(
            db.delete(&gone).unwrap_err(),
            PoetError::InvalidTransition { .. }
        ));
        assert_eq!(db.list("/").unwrap().len(), 1);
    }

    #[test]
    fn complete_requires_stored_task() {
        let db = setup_db();
        let err = db.complete(&Task::new("never added")).unwrap_err();
        assert!(matches!(err, PoetError::NotFound { .. }));
    }

    #[test]
    fn purge_removes_the_key() {
        let db = setup_db();
        let t = db.add(Task::new("temporary"), None).unwrap();
        db.purge(&t).unwrap();
        assert!(db.list("/").unwrap().is_empty());
        assert!(matches!(
            db.purge(&t).unwrap_err(),
            PoetError::NotFound { .. }
        ));
    }

    #[test]
    fn comments_append_to_stored_copy() {
        let db = setup_db();
        let t = db.add(Task::new("commented"), None).unwrap();
        db.add_comment(&t, "first").unwrap();
        let t = db.add_comment(&t, "second").unwrap();
        assert_eq!(t.comments.len(), 2);
        assert!(db.add_comment(&t, "").is_err());
    }

    #[test]
    fn completion_candidates() {
        let db = setup_db();
        db.add(Task::new("water plants").with_id("abcdef1"), None).unwrap();
        db.add(Task::new("feed cat").with_id("zzzzzz2"), None).unwrap();

        let by_id = db.complete_ids_with_prefix("/active", "abc").unwrap();
        assert_eq!(by_id, vec!["abcde\twater plants"]);
        let by_desc = db.complete_ids_with_prefix("/active", "cat").unwrap();
        assert_eq!(by_desc, vec!["zzzzz\tfeed cat"]);
        assert!(db.complete_ids_with_prefix("/completed", "").unwrap().is_empty());
    }

    #[test]
    fn refresh_urgency_uses_curator() {
        let db = setup_db();
        let mut tasks = vec![Task::new("x").with_tags(["next"])];
        db.refresh_urgency(&mut tasks);
        assert_eq!(tasks[0].urgency, 15.0);
    }
}
