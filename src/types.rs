//! Core types for taskpoet.

use crate::error::{PoetResult, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Plugin id used for tasks created locally rather than synced from a plugin.
pub const DEFAULT_PLUGIN_ID: &str = "builtin";

/// Effort/impact assessment. The numeric codes are fixed and persisted.
///
/// 0 - Unset
/// 1 - Low Effort, High Impact (sweet spot)
/// 2 - High Effort, High Impact (homework)
/// 3 - Low Effort, Low Impact (busywork)
/// 4 - High Effort, Low Impact (charity)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum EffortImpact {
    #[default]
    Unset,
    High,
    Medium,
    Low,
    Avoid,
}

impl EffortImpact {
    pub fn code(self) -> u8 {
        match self {
            EffortImpact::Unset => 0,
            EffortImpact::High => 1,
            EffortImpact::Medium => 2,
            EffortImpact::Low => 3,
            EffortImpact::Avoid => 4,
        }
    }

    pub fn is_unset(self) -> bool {
        self == EffortImpact::Unset
    }

    pub fn emoji(self) -> &'static str {
        match self {
            EffortImpact::Unset => "🟣",
            EffortImpact::High => "🟢",
            EffortImpact::Medium => "🟡",
            EffortImpact::Low => "🔴",
            EffortImpact::Avoid => "💀",
        }
    }
}

impl TryFrom<u8> for EffortImpact {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(EffortImpact::Unset),
            1 => Ok(EffortImpact::High),
            2 => Ok(EffortImpact::Medium),
            3 => Ok(EffortImpact::Low),
            4 => Ok(EffortImpact::Avoid),
            other => Err(format!("effort/impact must be between 0 and 4, got {other}")),
        }
    }
}

impl From<EffortImpact> for u8 {
    fn from(ei: EffortImpact) -> Self {
        ei.code()
    }
}

impl fmt::Display for EffortImpact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            EffortImpact::Unset => "Unset",
            EffortImpact::High => "Low Effort, High Impact",
            EffortImpact::Medium => "High Effort, High Impact",
            EffortImpact::Low => "Low Effort, Low Impact",
            EffortImpact::Avoid => "High Effort, Low Impact",
        };
        f.write_str(text)
    }
}

/// Lifecycle state of a task.
///
/// Never stored as a field: derived from which timestamps are populated and
/// encoded in the storage key. Ordered so that `Deleted > Completed > Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Active,
    Completed,
    Deleted,
}

impl TaskState {
    pub const ALL: [TaskState; 3] = [TaskState::Active, TaskState::Completed, TaskState::Deleted];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskState::Active => "active",
            TaskState::Completed => "completed",
            TaskState::Deleted => "deleted",
        }
    }

    /// Key prefix for every task in this state, e.g. `/active`.
    pub fn prefix(self) -> String {
        format!("/{}", self.as_str())
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim_start_matches('/') {
            "active" => Ok(TaskState::Active),
            "completed" => Ok(TaskState::Completed),
            "deleted" => Ok(TaskState::Deleted),
            other => Err(format!("unknown task state: {other}")),
        }
    }
}

/// A dated note attached to a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub added: DateTime<Utc>,
    pub text: String,
}

impl Comment {
    pub fn new(text: impl Into<String>) -> Result<Self, ValidationError> {
        let text = text.into();
        if text.is_empty() {
            return Err(ValidationError::EmptyComment);
        }
        Ok(Self {
            added: Utc::now(),
            text,
        })
    }
}

/// A tracked action item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Task {
    pub id: String,
    pub plugin_id: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due: Option<DateTime<Utc>>,
    /// Similar to `wait` in TaskWarrior.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hide_until: Option<DateTime<Utc>>,
    /// Similar to `until` in TaskWarrior.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancel_after: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub added: Option<DateTime<Utc>>,
    pub effort_impact: EffortImpact,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<Comment>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub project: String,
    pub urgency: f64,
}

impl Task {
    /// Create a new active task with a random id, stamped with the current time.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            plugin_id: DEFAULT_PLUGIN_ID.to_string(),
            description: description.into(),
            added: Some(Utc::now()),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_plugin_id(mut self, plugin_id: impl Into<String>) -> Self {
        self.plugin_id = plugin_id.into();
        self
    }

    pub fn with_due(mut self, due: DateTime<Utc>) -> Self {
        self.due = Some(due);
        self
    }

    pub fn with_hide_until(mut self, hide_until: DateTime<Utc>) -> Self {
        self.hide_until = Some(hide_until);
        self
    }

    pub fn with_completed(mut self, completed: DateTime<Utc>) -> Self {
        self.completed = Some(completed);
        self
    }

    pub fn with_added(mut self, added: DateTime<Utc>) -> Self {
        self.added = Some(added);
        self
    }

    pub fn with_effort_impact(mut self, effort_impact: EffortImpact) -> Self {
        self.effort_impact = effort_impact;
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self.normalize_tags();
        self
    }

    pub fn with_parents(mut self, parents: Vec<String>) -> Self {
        self.parents = parents;
        self
    }

    pub fn with_children(mut self, children: Vec<String>) -> Self {
        self.children = children;
        self
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = project.into();
        self
    }

    /// Derived lifecycle state. `deleted` wins over `completed`.
    pub fn state(&self) -> TaskState {
        if self.deleted.is_some() {
            TaskState::Deleted
        } else if self.completed.is_some() {
            TaskState::Completed
        } else {
            TaskState::Active
        }
    }

    /// Plugin id with the built-in sentinel substituted for blanks.
    pub fn effective_plugin_id(&self) -> &str {
        if self.plugin_id.is_empty() {
            DEFAULT_PLUGIN_ID
        } else {
            &self.plugin_id
        }
    }

    /// Storage key for this task in its current state.
    pub fn key_path(&self) -> String {
        key_path(self.state(), self.effective_plugin_id(), &self.id)
    }

    /// First five characters of the id.
    pub fn short_id(&self) -> &str {
        match self.id.char_indices().nth(5) {
            Some((idx, _)) => &self.id[..idx],
            None => &self.id,
        }
    }

    /// Description followed by one line per comment.
    pub fn description_details(&self) -> String {
        let mut out = self.description.clone();
        for c in &self.comments {
            out.push_str(&format!("\n {} - {}", c.added.format("%Y-%m-%d"), c.text));
        }
        out.trim().to_string()
    }

    pub fn add_comment(&mut self, text: impl Into<String>) -> PoetResult<()> {
        self.comments.push(Comment::new(text)?);
        Ok(())
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Still waiting out its `hide_until` at `now`.
    pub fn is_hidden(&self, now: DateTime<Utc>) -> bool {
        self.hide_until.is_some_and(|h| h > now)
    }

    /// Sort and de-duplicate tags.
    pub fn normalize_tags(&mut self) {
        self.tags.sort();
        self.tags.dedup();
    }

    /// Check the write-time invariants.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.description.is_empty() {
            return Err(ValidationError::EmptyDescription);
        }
        if self.id.contains('/') {
            return Err(ValidationError::SlashInId(self.id.clone()));
        }
        if let (Some(hide_until), Some(due)) = (self.hide_until, self.due) {
            if hide_until > due {
                return Err(ValidationError::HideUntilAfterDue);
            }
        }
        if self.parents.contains(&self.id) {
            return Err(ValidationError::SelfParent(self.id.clone()));
        }
        if self.children.contains(&self.id) {
            return Err(ValidationError::SelfChild(self.id.clone()));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = self.parents.iter().find(|p| !seen.insert(p.as_str())) {
            return Err(ValidationError::DuplicateParents(dup.clone()));
        }
        Ok(())
    }
}

/// Build the storage key `/<state>/<plugin_id>/<id>`.
pub fn key_path(state: TaskState, plugin_id: &str, id: &str) -> String {
    let plugin_id = if plugin_id.is_empty() {
        DEFAULT_PLUGIN_ID
    } else {
        plugin_id
    };
    format!("/{}/{}/{}", state.as_str(), plugin_id, id)
}
