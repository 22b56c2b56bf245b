//! CLI command definitions for taskpoet
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

pub mod import;

use crate::query::SortBy;
use crate::types::EffortImpact;
use clap::{Args, Parser, Subcommand};
use import::ImportArgs;
use std::path::PathBuf;

/// Default number of tasks shown by list commands.
pub const DEFAULT_LIMIT: usize = 40;

/// Task tracking with due dates and effort/impact curation
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to database file (overrides config)
    #[arg(short, long, global = true)]
    pub database: Option<PathBuf>,

    /// Namespace to operate in (overrides config)
    #[arg(long, global = true)]
    pub namespace: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    /// Output format: markdown (default) or json
    #[arg(long, default_value = "markdown", global = true)]
    pub format: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a new active task
    Add(TaskArgs),

    /// Record a task that is already done
    Log(TaskArgs),

    /// Mark an active task completed
    Complete(TaskRef),

    /// Soft delete a task
    Delete(TaskRef),

    /// Permanently remove a task
    Purge(TaskRef),

    /// Change fields of an existing task
    Edit(EditArgs),

    /// Add a comment to a task
    Comment(CommentArgs),

    /// Show a task with its links and urgency breakdown
    Describe(TaskRef),

    /// List active tasks
    Active(ListArgs),

    /// List completed tasks
    Completed(ListArgs),

    /// Show the task stored at an exact key, e.g. /active/builtin/<id>
    Get {
        #[arg(value_name = "PATH")]
        path: String,
    },

    /// Make one task the parent of another
    Parent(ParentArgs),

    /// Import a TaskWarrior export
    Import(ImportArgs),

    /// Inspect and sync task plugins
    #[command(subcommand)]
    Plugins(PluginsCommand),

    /// Resolve a date expression, or list the synonyms when none is given
    Date {
        #[arg(value_name = "EXPR")]
        expr: Option<String>,
    },
}

/// Plugin subcommands
#[derive(Subcommand, Debug)]
pub enum PluginsCommand {
    /// List registered plugins
    List,

    /// Sync the named plugins, or every configured one
    Sync {
        #[arg(value_name = "NAME")]
        names: Vec<String>,
    },
}

fn parse_effort_impact(s: &str) -> Result<EffortImpact, String> {
    let code: u8 = s
        .parse()
        .map_err(|_| format!("expected a number between 0 and 4, got {s}"))?;
    EffortImpact::try_from(code)
}

/// Fields for a new task
#[derive(Args, Debug, Clone, Default)]
pub struct TaskArgs {
    /// Task description
    #[arg(required = true, num_args = 1.., value_name = "DESCRIPTION")]
    pub description: Vec<String>,

    /// Due date: a synonym (eow, friday, 3rd) or a duration from now (3d, 2h30m)
    #[arg(long)]
    pub due: Option<String>,

    /// Hide the task until this date
    #[arg(long)]
    pub wait: Option<String>,

    /// Effort/impact: 1 sweet spot, 2 homework, 3 busywork, 4 charity
    #[arg(short, long, value_parser = parse_effort_impact)]
    pub effort_impact: Option<EffortImpact>,

    /// Tag, repeatable
    #[arg(short, long = "tag")]
    pub tags: Vec<String>,

    /// Project name
    #[arg(short, long)]
    pub project: Option<String>,

    /// Explicit id instead of a generated one
    #[arg(long)]
    pub id: Option<String>,

    /// Partial id of an active task to become this task's parent
    #[arg(long)]
    pub parent: Option<String>,
}

impl TaskArgs {
    pub fn description(&self) -> String {
        self.description.join(" ")
    }
}

/// A task addressed by the start of its id
#[derive(Args, Debug, Clone)]
pub struct TaskRef {
    /// Full or partial task id
    #[arg(value_name = "ID")]
    pub id: String,

    /// Plugin the task belongs to
    #[arg(long)]
    pub plugin: Option<String>,
}

/// Arguments for the edit subcommand
#[derive(Args, Debug, Clone)]
pub struct EditArgs {
    #[command(flatten)]
    pub target: TaskRef,

    /// New description
    #[arg(long)]
    pub description: Option<String>,

    /// New due date
    #[arg(long)]
    pub due: Option<String>,

    /// New hide-until date
    #[arg(long)]
    pub wait: Option<String>,

    /// New effort/impact code
    #[arg(short, long, value_parser = parse_effort_impact)]
    pub effort_impact: Option<EffortImpact>,

    /// Replace the tags, repeatable
    #[arg(short, long = "tag")]
    pub tags: Vec<String>,

    /// New project
    #[arg(short, long)]
    pub project: Option<String>,
}

/// Arguments for the comment subcommand
#[derive(Args, Debug, Clone)]
pub struct CommentArgs {
    #[command(flatten)]
    pub target: TaskRef,

    /// Comment text
    #[arg(required = true, num_args = 1.., value_name = "TEXT")]
    pub text: Vec<String>,
}

/// Arguments for the parent subcommand
#[derive(Args, Debug, Clone)]
pub struct ParentArgs {
    /// Partial id of the child task
    #[arg(value_name = "CHILD")]
    pub child: String,

    /// Partial id of the parent task
    #[arg(value_name = "PARENT")]
    pub parent: String,
}

/// Arguments shared by the list subcommands
#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Limit to N results, 0 for no limit
    #[arg(long, default_value_t = DEFAULT_LIMIT)]
    pub limit: usize,

    /// Sort order: added, due, completed or urgency
    #[arg(short, long)]
    pub sort: Option<SortBy>,

    /// Only show descriptions matching this regular expression
    #[arg(long)]
    pub filter: Option<String>,

    /// Include tasks that are still hidden
    #[arg(short, long)]
    pub all: bool,
}
