//! Recurring tasks: descriptions re-created once their last completion is
//! older than the configured frequency.

use super::{Database, now};
use crate::calendar::parse_duration;
use crate::error::PoetResult;
use crate::types::{Task, TaskState};
use serde::{Deserialize, Serialize};
use tracing::info;

/// A description that should be done every `frequency` (a duration
/// expression such as `"1w"` or `"24h"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringTask {
    pub description: String,
    pub frequency: String,
}

impl RecurringTask {
    pub fn new(description: impl Into<String>, frequency: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            frequency: frequency.into(),
        }
    }
}

impl Database {
    /// Create an active task for each recurring entry that has neither an
    /// active task nor a completion within its frequency. Returns the
    /// tasks created.
    pub fn check_recurring(&self, recurring: &[RecurringTask]) -> PoetResult<Vec<Task>> {
        let now = now();
        let active = self.list(&TaskState::Active.prefix())?;
        let completed = self.list(&TaskState::Completed.prefix())?;

        let mut created = Vec::new();
        for recur in recurring {
            let window_start = now - parse_duration(&recur.frequency)?;

            let pending = active.iter().any(|t| t.description == recur.description);
            let recent = completed.iter().any(|t| {
                t.description == recur.description
                    && t.completed.is_some_and(|c| c > window_start)
            });
            if pending || recent {
                continue;
            }

            let task = self.add(Task::new(&recur.description), None)?;
            info!(description = %recur.description, id = %task.id, "Created recurring task");
            created.push(task);
        }
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    #[test]
    fn creates_when_never_done() {
        let db = Database::open_in_memory().unwrap();
        let recurring = vec![RecurringTask::new("water plants", "1s")];
        let created = db.check_recurring(&recurring).unwrap();
        assert_eq!(created.len(), 1);

        let active = db.list("/active").unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].description, "water plants");

        // The open task suppresses another copy.
        assert!(db.check_recurring(&recurring).unwrap().is_empty());
    }

    #[test]
    fn recent_completion_suppresses() {
        let db = Database::open_in_memory().unwrap();
        db.log(Task::new("water plants"), None).unwrap();
        let recurring = vec![RecurringTask::new("water plants", "1m")];
        assert!(db.check_recurring(&recurring).unwrap().is_empty());
        assert!(db.list("/active").unwrap().is_empty());
    }

    #[test]
    fn stale_completion_recreates() {
        let db = Database::open_in_memory().unwrap();
        let long_ago = now() - TimeDelta::days(10);
        db.log(Task::new("water plants").with_completed(long_ago), None)
            .unwrap();
        let recurring = vec![RecurringTask::new("water plants", "1w")];
        assert_eq!(db.check_recurring(&recurring).unwrap().len(), 1);
    }

    #[test]
    fn bad_frequency_is_an_error() {
        let db = Database::open_in_memory().unwrap();
        let recurring = vec![RecurringTask::new("x", "fortnightly-ish")];
        assert!(db.check_recurring(&recurring).is_err());
    }
}
