//! Output formatting utilities for markdown and JSON.

use crate::calendar::Synonym;
use crate::db::deps::TaskDescription;
use crate::query::TaskPage;
use crate::types::Task;
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use serde_json::Value;

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Markdown,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "markdown" | "md" => Some(OutputFormat::Markdown),
            _ => None,
        }
    }
}

/// Rough human reading of an offset from now: "in 3 days", "2 hours ago".
pub fn humanize(delta: TimeDelta) -> String {
    let secs = delta.num_seconds();
    let abs = secs.unsigned_abs();
    let (n, unit) = match abs {
        0..60 => return "now".to_string(),
        60..3_600 => (abs / 60, "minute"),
        3_600..86_400 => (abs / 3_600, "hour"),
        86_400..2_592_000 => (abs / 86_400, "day"),
        2_592_000..31_536_000 => (abs / 2_592_000, "month"),
        _ => (abs / 31_536_000, "year"),
    };
    let plural = if n == 1 { "" } else { "s" };
    if secs > 0 {
        format!("in {n} {unit}{plural}")
    } else {
        format!("{n} {unit}{plural} ago")
    }
}

fn date_cell(value: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    match value {
        Some(dt) => format!("{} ({})", dt.format("%Y-%m-%d %H:%M"), humanize(dt - now)),
        None => "-".to_string(),
    }
}

/// Format a single task as markdown.
pub fn format_task_markdown(task: &Task, now: DateTime<Utc>) -> String {
    let mut md = String::new();

    md.push_str(&format!("## Task: {}\n", task.description));
    md.push_str(&format!("- **id**: `{}`\n", task.id));
    md.push_str(&format!("- **plugin**: {}\n", task.effective_plugin_id()));
    md.push_str(&format!("- **state**: {}\n", task.state()));
    md.push_str(&format!("- **added**: {}\n", date_cell(task.added, now)));

    if task.due.is_some() {
        md.push_str(&format!("- **due**: {}\n", date_cell(task.due, now)));
    }
    if task.hide_until.is_some() {
        md.push_str(&format!("- **wait**: {}\n", date_cell(task.hide_until, now)));
    }
    if task.completed.is_some() {
        md.push_str(&format!("- **completed**: {}\n", date_cell(task.completed, now)));
    }
    if !task.effort_impact.is_unset() {
        md.push_str(&format!(
            "- **effort/impact**: {} {}\n",
            task.effort_impact.emoji(),
            task.effort_impact
        ));
    }
    if !task.tags.is_empty() {
        md.push_str(&format!("- **tags**: {}\n", task.tags.join(", ")));
    }
    if !task.project.is_empty() {
        md.push_str(&format!("- **project**: {}\n", task.project));
    }
    md.push_str(&format!("- **urgency**: {:.2}\n", task.urgency));

    if !task.comments.is_empty() {
        md.push_str("\n### Comments\n");
        for c in &task.comments {
            md.push_str(&format!("- {} {}\n", c.added.format("%Y-%m-%d"), c.text));
        }
    }

    md
}

/// Format a task in short form for lists.
fn format_task_short(task: &Task) -> String {
    let due = task
        .due
        .map(|d| format!(" (due {})", d.format("%Y-%m-%d")))
        .unwrap_or_default();

    let tags = if task.tags.is_empty() {
        String::new()
    } else {
        format!(" [{}]", task.tags.join(","))
    };

    format!(
        "- {} `{}` {}{}{}\n",
        task.effort_impact.emoji(),
        task.short_id(),
        task.description,
        due,
        tags,
    )
}

/// Format a task list as markdown, noting anything cut off by the limit.
pub fn format_tasks_markdown(title: &str, page: &TaskPage) -> String {
    let mut md = String::new();

    md.push_str(&format!("# {} ({})\n\n", title, page.tasks.len()));
    for task in &page.tasks {
        md.push_str(&format_task_short(task));
    }

    let omitted = page.omitted();
    if omitted > 0 {
        md.push_str(&format!(
            "\n_* {omitted} more records to display, increase the limit to see them_\n"
        ));
    }

    md
}

/// Format a full task description, including its urgency breakdown.
pub fn format_description_markdown(desc: &TaskDescription, now: DateTime<Utc>) -> String {
    let mut md = format_task_markdown(&desc.task, now);

    if !desc.parents.is_empty() {
        md.push_str("\n### Parents\n");
        for p in &desc.parents {
            md.push_str(&format_task_short(p));
        }
    }
    if !desc.children.is_empty() {
        md.push_str("\n### Children\n");
        for c in &desc.children {
            md.push_str(&format_task_short(c));
        }
    }

    md.push_str(&format!("\n### Urgency: {:.2}\n", desc.urgency));
    for w in &desc.weights {
        md.push_str(&format!(
            "- **{}**: {:.3} x {} ({})\n",
            w.name, w.coefficient, w.multiplier, w.unit
        ));
    }

    md
}

/// Format the date synonym table as markdown.
pub fn format_synonyms_markdown(resolved: &[(Synonym, DateTime<Utc>)]) -> String {
    let mut md = String::from("| Synonym | Aliases | Resolves to | Description |\n");
    md.push_str("|---|---|---|---|\n");
    for (syn, at) in resolved {
        md.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            syn,
            syn.aliases().join(", "),
            at.to_rfc3339(),
            syn.description()
        ));
    }
    md
}

/// Render either format. JSON is pretty-printed from `value`.
pub fn render<T, F>(format: OutputFormat, value: &T, markdown: F) -> String
where
    T: Serialize,
    F: FnOnce() -> String,
{
    match format {
        OutputFormat::Markdown => markdown(),
        OutputFormat::Json => serde_json::to_string_pretty(value).unwrap_or_else(|e| {
            markdown_to_json(format!("serialization failed: {e}")).to_string()
        }),
    }
}

/// Convert markdown to JSON value for uniform response handling.
pub fn markdown_to_json(md: String) -> Value {
    serde_json::json!({
        "format": "markdown",
        "content": md
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EffortImpact;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn output_format_parses() {
        assert_eq!(OutputFormat::from_str("JSON"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::from_str("md"), Some(OutputFormat::Markdown));
        assert_eq!(OutputFormat::from_str("table"), None);
    }

    #[test]
    fn humanize_offsets() {
        assert_eq!(humanize(TimeDelta::seconds(5)), "now");
        assert_eq!(humanize(TimeDelta::days(3)), "in 3 days");
        assert_eq!(humanize(TimeDelta::hours(-1)), "1 hour ago");
        assert_eq!(humanize(TimeDelta::days(400)), "in 1 year");
    }

    #[test]
    fn task_markdown_lists_set_fields() {
        let task = Task::new("pay rent")
            .with_id("abcdef")
            .with_added(now())
            .with_due(now() + TimeDelta::days(2))
            .with_effort_impact(EffortImpact::High)
            .with_tags(["home"]);
        let md = format_task_markdown(&task, now());
        assert!(md.contains("## Task: pay rent"));
        assert!(md.contains("- **due**: 2024-06-03 12:00 (in 2 days)"));
        assert!(md.contains("Low Effort, High Impact"));
        assert!(md.contains("- **tags**: home"));
        assert!(!md.contains("**wait**"));
    }

    #[test]
    fn list_markdown_notes_truncation() {
        let page = TaskPage {
            tasks: vec![Task::new("one").with_id("11111111")],
            total: 3,
        };
        let md = format_tasks_markdown("Active", &page);
        assert!(md.starts_with("# Active (1)"));
        assert!(md.contains("`11111` one"));
        assert!(md.contains("2 more records"));
    }

    #[test]
    fn json_render_is_pretty() {
        let task = Task::new("x").with_id("j1");
        let out = render(OutputFormat::Json, &task, || unreachable!());
        let v: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v["id"], "j1");
    }
}
