//! TaskWarrior import.
//!
//! Reads the output of `task export`: either one JSON array or one JSON
//! object per line, optionally gzip compressed. Items are added one at a
//! time so a duplicate or invalid item only costs that item.

use super::Database;
use crate::error::{PoetError, PoetResult};
use crate::types::{Comment, Task};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{info, warn};
use uuid::Uuid;

/// Timestamp layout used by TaskWarrior, e.g. `20230928T211203Z`.
pub const TW_TIME_FORMAT: &str = "%Y%m%dT%H%M%SZ";

mod tw_time {
    use super::TW_TIME_FORMAT;
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(dt) => serializer.serialize_str(&dt.format(TW_TIME_FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|s| {
            NaiveDateTime::parse_from_str(&s, TW_TIME_FORMAT)
                .map(|naive| naive.and_utc())
                .map_err(serde::de::Error::custom)
        })
        .transpose()
    }
}

/// One annotation on a TaskWarrior task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskWarriorAnnotation {
    #[serde(default, with = "tw_time", skip_serializing_if = "Option::is_none")]
    pub entry: Option<DateTime<Utc>>,
    #[serde(default)]
    pub description: String,
}

/// A task as exported by TaskWarrior. Unknown fields are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskWarriorTask {
    pub id: i64,
    pub description: String,
    pub uuid: String,
    pub status: String,
    #[serde(with = "tw_time", skip_serializing_if = "Option::is_none")]
    pub entry: Option<DateTime<Utc>>,
    #[serde(with = "tw_time", skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
    #[serde(with = "tw_time", skip_serializing_if = "Option::is_none")]
    pub due: Option<DateTime<Utc>>,
    #[serde(with = "tw_time", skip_serializing_if = "Option::is_none")]
    pub wait: Option<DateTime<Utc>>,
    #[serde(with = "tw_time", skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
    #[serde(with = "tw_time", skip_serializing_if = "Option::is_none")]
    pub reviewed: Option<DateTime<Utc>>,
    #[serde(with = "tw_time", skip_serializing_if = "Option::is_none")]
    pub until: Option<DateTime<Utc>>,
    pub mask: String,
    pub urgency: f64,
    pub tags: Vec<String>,
    pub annotations: Vec<TaskWarriorAnnotation>,
}

impl TaskWarriorTask {
    /// Convert to a native task. A wait later than due is pulled back to a
    /// minute before due.
    pub fn to_task(&self) -> Task {
        let now = super::now();
        let hide_until = match (self.wait, self.due) {
            (Some(wait), Some(due)) if wait > due => Some(due - TimeDelta::minutes(1)),
            (wait, _) => wait,
        };

        let mut task = Task {
            id: if self.uuid.is_empty() {
                Uuid::new_v4().to_string()
            } else {
                self.uuid.clone()
            },
            description: self.description.clone(),
            tags: self.tags.clone(),
            added: Some(self.entry.unwrap_or(now)),
            due: self.due,
            hide_until,
            completed: self.end,
            reviewed: self.reviewed,
            cancel_after: self.until,
            deleted: if self.status == "deleted" { self.end } else { None },
            comments: self
                .annotations
                .iter()
                .map(|a| Comment {
                    added: a.entry.unwrap_or(now),
                    text: a.description.clone(),
                })
                .collect(),
            ..Task::default()
        };
        task.normalize_tags();
        task
    }
}

/// Parse a TaskWarrior export: a JSON array, or one JSON object per line.
pub fn parse_taskwarrior<R: Read>(mut reader: R) -> PoetResult<Vec<TaskWarriorTask>> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;

    if text.trim_start().starts_with('[') {
        return Ok(serde_json::from_str(&text)?);
    }
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| Ok(serde_json::from_str(line)?))
        .collect()
}

/// Load a TaskWarrior export from a file (supports both plain JSON and gzip).
pub fn load_taskwarrior_file(path: &Path) -> PoetResult<Vec<TaskWarriorTask>> {
    let mut reader = BufReader::new(File::open(path)?);

    // Check for gzip magic bytes
    let mut magic = [0u8; 2];
    let read = reader.read(&mut magic)?;

    let reader = BufReader::new(File::open(path)?);
    if read == 2 && magic == [0x1f, 0x8b] {
        parse_taskwarrior(flate2::read::GzDecoder::new(reader))
    } else {
        parse_taskwarrior(reader)
    }
}

/// Progress of a running import, reported once per item.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressStatus {
    pub current: usize,
    pub total: usize,
    pub info: String,
    pub warning: Option<String>,
    pub done: bool,
}

/// Result of an import operation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportSummary {
    /// Items now present, including ones that already existed.
    pub imported: usize,
    pub skipped: usize,
    pub warnings: Vec<String>,
}

impl Database {
    /// Import TaskWarrior items, calling `progress` after each one.
    pub fn import_taskwarrior<F>(
        &self,
        items: &[TaskWarriorTask],
        mut progress: F,
    ) -> PoetResult<ImportSummary>
    where
        F: FnMut(&ProgressStatus),
    {
        let total = items.len();
        let mut summary = ImportSummary::default();

        for (idx, item) in items.iter().enumerate() {
            let mut status = ProgressStatus {
                current: idx + 1,
                total,
                info: format!("Importing: {}", item.description),
                ..ProgressStatus::default()
            };

            if !item.mask.is_empty() {
                status.warning = Some(format!(
                    "Skipping recurring item, masks are not supported: {}",
                    item.description
                ));
                summary.skipped += 1;
            } else {
                match self.add(item.to_task(), None) {
                    Ok(_) | Err(PoetError::AlreadyExists { .. }) => summary.imported += 1,
                    Err(e @ (PoetError::Validation(_) | PoetError::InvalidExpression { .. })) => {
                        status.warning = Some(format!(
                            "Error importing task: {} ({e})",
                            item.description
                        ));
                        summary.skipped += 1;
                    }
                    Err(e) => return Err(e),
                }
            }

            if let Some(w) = &status.warning {
                warn!("{}", w);
                summary.warnings.push(w.clone());
            }
            status.done = idx + 1 == total;
            progress(&status);
        }

        info!(imported = summary.imported, skipped = summary.skipped, "TaskWarrior import finished");
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TaskState;
    use chrono::TimeZone;
    use std::io::Write;

    const EXPORT: &str = r#"[{"id":0,"description":"Did something","end":"20230928T211203Z","entry":"20230928T211203Z","modified":"20230928T211203Z","status":"completed","uuid":"e0e59a1f-70dd-46a3-a6d8-a8f153d1c9bd","urgency":0},{"id":3,"description":"Do something later","entry":"20230928T211627Z","modified":"20230928T211627Z","status":"pending","uuid":"5fbfe931-7393-40d9-b282-9ea6f4aaaf51","wait":"20231005T211627Z","urgency":-3}]"#;

    #[test]
    fn parses_array_export() {
        let items = parse_taskwarrior(EXPORT.as_bytes()).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].description, "Did something");
        assert_eq!(
            items[0].entry,
            Some(Utc.with_ymd_and_hms(2023, 9, 28, 21, 12, 3).unwrap())
        );
        assert!(items[1].end.is_none());
    }

    #[test]
    fn parses_line_export() {
        let lines = "{\"description\":\"one\"}\n\n{\"description\":\"two\",\"tags\":[\"b\",\"a\"]}\n";
        let items = parse_taskwarrior(lines.as_bytes()).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].tags, vec!["b", "a"]);
    }

    #[test]
    fn rejects_bad_timestamps() {
        let bad = r#"[{"description":"x","due":"2023-09-28"}]"#;
        assert!(parse_taskwarrior(bad.as_bytes()).is_err());
    }

    #[test]
    fn maps_fields_and_clamps_wait() {
        let due = Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap();
        let item = TaskWarriorTask {
            description: "clamped".into(),
            uuid: "tw-1".into(),
            status: "deleted".into(),
            due: Some(due),
            wait: Some(due + TimeDelta::days(2)),
            end: Some(due),
            until: Some(due + TimeDelta::days(30)),
            tags: vec!["z".into(), "a".into()],
            annotations: vec![TaskWarriorAnnotation {
                entry: Some(due),
                description: "noted".into(),
            }],
            ..TaskWarriorTask::default()
        };
        let task = item.to_task();
        assert_eq!(task.id, "tw-1");
        assert_eq!(task.hide_until, Some(due - TimeDelta::minutes(1)));
        assert_eq!(task.completed, Some(due));
        assert_eq!(task.deleted, Some(due));
        assert_eq!(task.state(), TaskState::Deleted);
        assert_eq!(task.cancel_after, Some(due + TimeDelta::days(30)));
        assert_eq!(task.tags, vec!["a", "z"]);
        assert_eq!(task.comments[0].text, "noted");
        assert!(task.validate().is_ok());
    }

    #[test]
    fn import_counts_duplicates_and_skips_masks() {
        let db = Database::open_in_memory().unwrap();
        let mut items = parse_taskwarrior(EXPORT.as_bytes()).unwrap();
        items.push(TaskWarriorTask {
            description: "recurring".into(),
            mask: "--".into(),
            ..TaskWarriorTask::default()
        });
        items.push(TaskWarriorTask::default());

        let mut seen = Vec::new();
        let summary = db
            .import_taskwarrior(&items, |s| seen.push(s.clone()))
            .unwrap();
        assert_eq!(summary.imported, 2);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.warnings.len(), 2);
        assert_eq!(seen.len(), 4);
        assert!(seen.last().unwrap().done);

        // Second run: everything already exists.
        let again = db.import_taskwarrior(&items[..2], |_| {}).unwrap();
        assert_eq!(again.imported, 2);
        assert_eq!(db.list("/").unwrap().len(), 2);
        assert_eq!(db.list("/completed").unwrap().len(), 1);
    }

    #[test]
    fn loads_gzip_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.json.gz");
        let file = File::create(&path).unwrap();
        let mut enc = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        enc.write_all(EXPORT.as_bytes()).unwrap();
        enc.finish().unwrap();

        let items = load_taskwarrior_file(&path).unwrap();
        assert_eq!(items.len(), 2);

        let plain = dir.path().join("export.json");
        std::fs::write(&plain, EXPORT).unwrap();
        assert_eq!(load_taskwarrior_file(&plain).unwrap().len(), 2);
    }
}
