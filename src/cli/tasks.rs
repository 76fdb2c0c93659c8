use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use fill_engine::{FieldKind, FieldTask, FillPolicy, ProfileClass, TaskList};
use serde::Serialize;

use crate::cli::context::CliContext;

#[derive(Args, Clone, Debug)]
pub struct TasksArgs {
    /// Task list YAML to inspect instead of the configured one
    #[arg(long, value_name = "FILE")]
    pub file: Option<PathBuf>,
}

/// A task as the engine will run it: profile overrides applied.
#[derive(Serialize)]
struct TaskView<'a> {
    #[serde(flatten)]
    task: &'a FieldTask,
    effective_profile: ProfileClass,
    timeout_ms: u64,
    stable_delay_ms: u64,
}

fn view<'a>(task: &'a FieldTask, policy: &FillPolicy) -> TaskView<'a> {
    let profile = policy.profile_for(task);
    TaskView {
        task,
        effective_profile: policy.class_for(task),
        timeout_ms: profile.timeout_ms,
        stable_delay_ms: profile.stable_delay_ms,
    }
}

pub async fn cmd_tasks(args: TasksArgs, ctx: &CliContext) -> Result<()> {
    let tasks = match &args.file {
        Some(path) => {
            TaskList::load(path).with_context(|| format!("loading {}", path.display()))?
        }
        None => ctx.tasks()?,
    };
    let policy = &ctx.config().fill;
    let views: Vec<TaskView<'_>> = tasks.iter().map(|task| view(task, policy)).collect();

    if let Some(rendered) = ctx.output().render(&views)? {
        println!("{rendered}");
        return Ok(());
    }

    println!(
        "{:<3} {:<40} {:<32} {:<10} {}",
        "#", "FIELD", "KIND", "PROFILE", "MANDATORY"
    );
    for (idx, view) in views.iter().enumerate() {
        let kind = match &view.task.kind {
            FieldKind::Reference { column } => format!("reference [{column}]"),
            other => other.label().to_string(),
        };
        let profile = if policy.is_overridden(&view.task.key) {
            format!("{}*", view.effective_profile.name())
        } else {
            view.effective_profile.name().to_string()
        };
        println!(
            "{:<3} {:<40} {:<32} {:<10} {}",
            idx + 1,
            view.task.key,
            kind,
            profile,
            if view.task.mandatory { "yes" } else { "no" }
        );
    }
    println!("{} tasks (* = profile overridden by configuration)", tasks.len());
    Ok(())
}
