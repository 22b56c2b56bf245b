//! taskpoet command line.

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use clap::Parser;
use serde::Serialize;
use taskpoet::calendar::{Calendar, Synonym};
use taskpoet::cli::import::ImportArgs;
use taskpoet::cli::{
    Cli, Command, CommentArgs, EditArgs, ListArgs, ParentArgs, PluginsCommand, TaskArgs, TaskRef,
};
use taskpoet::config::{Config, ConfigLoader};
use taskpoet::db::import::load_taskwarrior_file;
use taskpoet::db::{Database, now};
use taskpoet::error::{ErrorBody, PoetError};
use taskpoet::format::{
    OutputFormat, format_description_markdown, format_synonyms_markdown, format_task_markdown,
    format_tasks_markdown, render,
};
use taskpoet::logging::{LogTarget, init_logging};
use taskpoet::query::{FilterParams, SortBy, prepare};
use taskpoet::types::{Task, TaskState};
use tracing::{debug, info};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let target: LogTarget = cli.log.parse()?;
    init_logging(&target, cli.verbose)?;

    let mut config = ConfigLoader::load(cli.config.as_deref())?.into_config();
    if let Some(db_path) = cli.database {
        config.db_path = db_path;
    }
    if let Some(namespace) = cli.namespace {
        config.namespace = namespace;
        config.validate()?;
    }
    let format = OutputFormat::from_str(&cli.format)
        .ok_or_else(|| anyhow!("unknown output format: {}", cli.format))?;

    let db = Database::open(&config.db_path, &config.namespace)
        .with_context(|| format!("opening {}", config.db_path.display()))?;
    debug!(bucket = db.bucket(), "Using bucket");

    let app = App {
        db,
        config,
        calendar: Calendar::new(),
        format,
    };
    match app.run(cli.command) {
        Err(e) if format == OutputFormat::Json => match e.downcast_ref::<PoetError>() {
            Some(err) => {
                println!("{}", serde_json::to_string_pretty(&ErrorBody::from(err))?);
                std::process::exit(1);
            }
            None => Err(e),
        },
        other => other,
    }
}

struct App {
    db: Database,
    config: Config,
    calendar: Calendar,
    format: OutputFormat,
}

impl App {
    fn run(&self, command: Command) -> Result<()> {
        match command {
            Command::Add(args) => self.add(args, false),
            Command::Log(args) => self.add(args, true),
            Command::Complete(target) => {
                let task = self.find(&target)?;
                let task = self.db.complete(&task)?;
                self.print_task(&task);
                Ok(())
            }
            Command::Delete(target) => {
                let task = self.find(&target)?;
                let task = self.db.delete(&task)?;
                self.print_task(&task);
                Ok(())
            }
            Command::Purge(target) => {
                let task = self.find(&target)?;
                self.db.purge(&task)?;
                println!("Purged {}", task.key_path());
                Ok(())
            }
            Command::Edit(args) => self.edit(args),
            Command::Comment(CommentArgs { target, text }) => {
                let task = self.find(&target)?;
                let task = self.db.add_comment(&task, &text.join(" "))?;
                self.print_task(&task);
                Ok(())
            }
            Command::Describe(target) => {
                let task = self.find(&target)?;
                let desc = self.db.describe(&task)?;
                self.emit(&desc, || format_description_markdown(&desc, now()));
                Ok(())
            }
            Command::Active(args) => self.list(TaskState::Active, SortBy::Added, args),
            Command::Completed(args) => self.list(TaskState::Completed, SortBy::Completed, args),
            Command::Get { path } => {
                let task = self.db.get_with_exact_path(&path)?;
                self.print_task(&task);
                Ok(())
            }
            Command::Parent(args) => self.parent(args),
            Command::Import(args) => self.import(args),
            Command::Plugins(cmd) => self.plugins(cmd),
            Command::Date { expr } => self.date(expr),
        }
    }

    fn emit<T: Serialize>(&self, value: &T, markdown: impl FnOnce() -> String) {
        println!("{}", render(self.format, value, markdown));
    }

    fn print_task(&self, task: &Task) {
        self.emit(task, || format_task_markdown(task, now()));
    }

    fn find(&self, target: &TaskRef) -> Result<Task> {
        Ok(self
            .db
            .get_with_partial_id(&target.id, target.plugin.as_deref(), None)?)
    }

    fn build_task(&self, args: &TaskArgs) -> Result<Task> {
        let mut task = Task::new(args.description()).with_tags(&args.tags);
        if let Some(id) = &args.id {
            task = task.with_id(id);
        }
        if let Some(due) = &args.due {
            task = task.with_due(self.calendar.date(due)?);
        }
        if let Some(wait) = &args.wait {
            task = task.with_hide_until(self.calendar.date(wait)?);
        }
        if let Some(ei) = args.effort_impact {
            task = task.with_effort_impact(ei);
        }
        if let Some(project) = &args.project {
            task = task.with_project(project);
        }
        Ok(task)
    }

    fn add(&self, args: TaskArgs, done: bool) -> Result<()> {
        let task = self.build_task(&args)?;
        let defaults = self.config.default_task(&self.calendar)?;
        let mut task = if done {
            self.db.log(task, defaults.as_ref())?
        } else {
            self.db.add(task, defaults.as_ref())?
        };

        if let Some(parent) = &args.parent {
            let parent = self
                .db
                .get_with_partial_id(parent, None, Some(TaskState::Active))?;
            task = self.db.add_parent(&task, &parent)?.0;
        }

        info!(id = %task.id, "Added task");
        self.print_task(&task);
        Ok(())
    }

    fn edit(&self, args: EditArgs) -> Result<()> {
        let mut task = self.find(&args.target)?;
        if let Some(description) = args.description {
            task.description = description;
        }
        if let Some(due) = &args.due {
            task.due = Some(self.calendar.date(due)?);
        }
        if let Some(wait) = &args.wait {
            task.hide_until = Some(self.calendar.date(wait)?);
        }
        if let Some(ei) = args.effort_impact {
            task.effort_impact = ei;
        }
        if !args.tags.is_empty() {
            task = task.with_tags(args.tags);
        }
        if let Some(project) = args.project {
            task.project = project;
        }
        let task = self.db.edit(task)?;
        self.print_task(&task);
        Ok(())
    }

    fn list(&self, state: TaskState, default_sort: SortBy, args: ListArgs) -> Result<()> {
        if state == TaskState::Active && !self.config.recurring.is_empty() {
            self.db.check_recurring(&self.config.recurring)?;
        }

        let mut params = FilterParams {
            hide_hidden: !args.all,
            limit: args.limit,
            ..FilterParams::default()
        };
        if let Some(pattern) = &args.filter {
            params = params
                .with_regex(pattern)
                .with_context(|| format!("invalid filter: {pattern}"))?;
        }

        let mut tasks = self.db.list(&state.prefix())?;
        self.db.refresh_urgency(&mut tasks);
        let page = prepare(tasks, &params, args.sort.unwrap_or(default_sort), now());

        let title = match state {
            TaskState::Active => "Active Tasks",
            TaskState::Completed => "Completed Tasks",
            TaskState::Deleted => "Deleted Tasks",
        };
        self.emit(&page.tasks, || format_tasks_markdown(title, &page));
        Ok(())
    }

    fn parent(&self, args: ParentArgs) -> Result<()> {
        let child = self.db.get_with_partial_id(&args.child, None, None)?;
        let parent = self.db.get_with_partial_id(&args.parent, None, None)?;
        let (child, _) = self.db.add_parent(&child, &parent)?;
        self.print_task(&child);
        Ok(())
    }

    fn import(&self, args: ImportArgs) -> Result<()> {
        let items = load_taskwarrior_file(&args.file)
            .with_context(|| format!("reading {}", args.file.display()))?;
        debug!(items = items.len(), gzipped = args.is_gzipped(), "Loaded TaskWarrior export");

        if args.dry_run {
            let recurring = items.iter().filter(|i| !i.mask.is_empty()).count();
            println!("Dry run results:");
            println!("  Items: {}", items.len());
            println!("  Would skip (recurring): {recurring}");
            return Ok(());
        }

        let summary = self.db.import_taskwarrior(&items, |status| {
            debug!(current = status.current, total = status.total, "{}", status.info);
        })?;
        self.emit(&summary, || {
            let mut md = format!(
                "Imported {} tasks, skipped {}\n",
                summary.imported, summary.skipped
            );
            for w in &summary.warnings {
                md.push_str(&format!("- {w}\n"));
            }
            md
        });
        Ok(())
    }

    fn plugins(&self, cmd: PluginsCommand) -> Result<()> {
        let registry = self.db.plugins();
        match cmd {
            PluginsCommand::List => {
                let mut listing = Vec::new();
                for name in registry.names() {
                    let plugin = registry.create(name)?;
                    listing.push((name.to_string(), plugin.description()));
                }
                self.emit(&listing, || {
                    listing
                        .iter()
                        .map(|(name, desc)| format!("- **{name}**: {desc}\n"))
                        .collect()
                });
            }
            PluginsCommand::Sync { names } => {
                let names = if names.is_empty() {
                    self.config.plugins.clone()
                } else {
                    names
                };
                if names.is_empty() {
                    return Err(anyhow!("no plugins named and none configured"));
                }
                let mut synced = Vec::new();
                for name in &names {
                    synced.extend(self.db.sync_plugin(name)?);
                }
                self.emit(&synced, || format!("Synced {} tasks\n", synced.len()));
            }
        }
        Ok(())
    }

    fn date(&self, expr: Option<String>) -> Result<()> {
        match expr {
            Some(expr) => {
                let at = self.calendar.date(&expr)?;
                let local = at.with_timezone(&chrono::Local);
                self.emit(&at, || format!("{}\n", local.to_rfc2822()));
            }
            None => {
                let resolved = Synonym::all()
                    .into_iter()
                    .map(|syn| Ok((syn, self.calendar.resolve(syn)?)))
                    .collect::<Result<Vec<_>>>()?;
                let table: Vec<(String, chrono::DateTime<Utc>)> = resolved
                    .iter()
                    .map(|(syn, at)| (syn.name(), *at))
                    .collect();
                self.emit(&table, || format_synonyms_markdown(&resolved));
            }
        }
        Ok(())
    }
}
