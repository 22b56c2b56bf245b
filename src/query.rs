//! Sorting and filtering of task lists for display.
//!
//! Nothing here touches storage: callers list a prefix, then filter, sort
//! and truncate the result.

use crate::types::Task;
use chrono::{DateTime, Utc};
use regex_lite::Regex;
use std::cmp::Ordering;
use std::str::FromStr;

/// Display order for a task list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortBy {
    /// Oldest first.
    #[default]
    Added,
    /// Earliest due first, undated last.
    Due,
    /// Most recently completed first, uncompleted last.
    Completed,
    /// Most urgent first.
    Urgency,
}

impl FromStr for SortBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "added" => Ok(SortBy::Added),
            "due" => Ok(SortBy::Due),
            "completed" => Ok(SortBy::Completed),
            "urgency" => Ok(SortBy::Urgency),
            other => Err(format!("unknown sort order: {other}")),
        }
    }
}

/// `None` sorts after every `Some`.
fn nones_last<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Stable sort in place.
pub fn sort_tasks(tasks: &mut [Task], by: SortBy) {
    match by {
        SortBy::Added => tasks.sort_by(|a, b| a.added.cmp(&b.added)),
        SortBy::Due => tasks.sort_by(|a, b| nones_last(a.due, b.due)),
        SortBy::Completed => tasks.sort_by(|a, b| {
            nones_last(
                a.completed.map(std::cmp::Reverse),
                b.completed.map(std::cmp::Reverse),
            )
        }),
        SortBy::Urgency => tasks.sort_by(|a, b| b.urgency.total_cmp(&a.urgency)),
    }
}

/// Which tasks to keep, and how many.
#[derive(Debug, Clone, Default)]
pub struct FilterParams {
    /// Drop tasks still inside their `hide_until`.
    pub hide_hidden: bool,
    /// Keep only descriptions matching this pattern.
    pub regex: Option<Regex>,
    /// Maximum tasks to return; 0 means no limit.
    pub limit: usize,
}

impl FilterParams {
    pub fn with_regex(mut self, pattern: &str) -> Result<Self, regex_lite::Error> {
        self.regex = Some(Regex::new(pattern)?);
        Ok(self)
    }

    fn keep(&self, task: &Task, now: DateTime<Utc>) -> bool {
        if self.hide_hidden && task.is_hidden(now) {
            return false;
        }
        self.regex
            .as_ref()
            .is_none_or(|re| re.is_match(&task.description))
    }
}

/// A filtered, sorted and truncated list.
#[derive(Debug, Clone, Default)]
pub struct TaskPage {
    pub tasks: Vec<Task>,
    /// Matches before the limit was applied.
    pub total: usize,
}

impl TaskPage {
    /// Matches cut off by the limit.
    pub fn omitted(&self) -> usize {
        self.total - self.tasks.len()
    }
}

/// Drop tasks that fail the hidden or regex filters.
pub fn apply_filters(tasks: Vec<Task>, params: &FilterParams, now: DateTime<Utc>) -> Vec<Task> {
    tasks.into_iter().filter(|t| params.keep(t, now)).collect()
}

/// Filter, sort, then truncate to the limit.
pub fn prepare(
    tasks: Vec<Task>,
    params: &FilterParams,
    by: SortBy,
    now: DateTime<Utc>,
) -> TaskPage {
    let mut tasks = apply_filters(tasks, params, now);
    let total = tasks.len();
    sort_tasks(&mut tasks, by);
    if params.limit > 0 {
        tasks.truncate(params.limit);
    }
    TaskPage { tasks, total }
}
