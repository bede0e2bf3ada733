//! taskflow task command implementations.

use std::future::Future;

use serde::Serialize;

use crate::config::{Config, StoreBackend};
use crate::error::{Error, Result};
use crate::filter::{apply_status, counts, StatusCounts};
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::repository::{QuerySpec, TaskRepository};
use crate::task::{parse_due_date, NewTask, Priority, StatusFilter, Task};

pub struct AddOptions {
    pub text: String,
    pub category: Option<String>,
    pub due: Option<String>,
    pub priority: Option<String>,
}

pub struct ListOptions {
    pub filter: String,
    pub search: Option<String>,
}

#[derive(Serialize)]
struct AddOutput {
    id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    task: Option<Task>,
}

#[derive(Serialize)]
struct ListOutput {
    filter: StatusFilter,
    #[serde(skip_serializing_if = "Option::is_none")]
    search: Option<String>,
    total: usize,
    counts: StatusCounts,
    tasks: Vec<Task>,
}

#[derive(Serialize)]
struct ToggleOutput {
    id: String,
    completed: bool,
}

#[derive(Serialize)]
struct RemoveOutput {
    id: String,
}

fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    Ok(runtime.block_on(future))
}

/// Repository for one-shot commands; the in-process store would start
/// empty on every run.
fn open_repo(config: &Config) -> Result<TaskRepository> {
    if config.store.backend == StoreBackend::Memory {
        return Err(Error::InvalidConfig(
            "store.backend = \"memory\" is only usable from the ui; use \"file\" for scripting commands"
                .to_string(),
        ));
    }
    TaskRepository::open(&config.store, false)
}

pub fn run_add(config: &Config, options: AddOptions, output: OutputOptions) -> Result<()> {
    let priority = match options.priority.as_deref() {
        Some(raw) => raw.parse::<Priority>()?,
        None => config.tasks.default_priority()?,
    };
    let due_date = options.due.as_deref().map(parse_due_date).transpose()?;
    let new_task = NewTask {
        text: options.text,
        category: options.category,
        due_date,
        priority: Some(priority),
    };

    let repo = open_repo(config)?;
    let (id, task) = block_on(async {
        let id = repo.add(new_task).await?;
        repo.refresh(&QuerySpec::all()).await?;
        Ok::<_, Error>((id.clone(), repo.cached(&id)))
    })??;

    let mut human = HumanOutput::new(format!("Added task {id}"));
    if let Some(task) = task.as_ref() {
        human.push_detail(task_line(task));
    }

    emit_success(output, "add", &AddOutput { id, task }, Some(&human))
}

pub fn run_list(config: &Config, options: ListOptions, output: OutputOptions) -> Result<()> {
    let filter: StatusFilter = options.filter.parse()?;
    let spec = QuerySpec::search(options.search.clone().unwrap_or_default());

    let repo = open_repo(config)?;
    let fetched = block_on(repo.refresh(&spec))??;
    let tasks = apply_status(&fetched, filter);

    let data = ListOutput {
        filter,
        search: options.search.filter(|term| !term.is_empty()),
        total: tasks.len(),
        counts: counts(&fetched),
        tasks,
    };

    let mut human = HumanOutput::new("Tasks");
    human.push_summary("Filter", filter.label());
    if let Some(term) = data.search.as_ref() {
        human.push_summary("Search", format!("{term:?}"));
    }
    human.push_summary("Shown", data.total.to_string());
    for task in &data.tasks {
        human.push_detail(task_line(task));
    }
    if data.tasks.is_empty() && data.search.is_none() && data.counts.all == 0 {
        human.push_next_step("taskflow add \"<task>\"");
    }

    emit_success(output, "list", &data, Some(&human))
}

pub fn run_toggle(config: &Config, id: &str, output: OutputOptions) -> Result<()> {
    let repo = open_repo(config)?;
    let completed = block_on(async {
        load_snapshot(&repo).await?;
        repo.toggle_complete(id).await
    })??;

    let state = if completed { "completed" } else { "active" };
    let human = HumanOutput::new(format!("Task {id} is now {state}"));
    emit_success(
        output,
        "toggle",
        &ToggleOutput {
            id: id.to_string(),
            completed,
        },
        Some(&human),
    )
}

pub fn run_rm(config: &Config, id: &str, output: OutputOptions) -> Result<()> {
    let repo = open_repo(config)?;
    block_on(async {
        load_snapshot(&repo).await?;
        repo.remove(id).await
    })??;

    let human = HumanOutput::new(format!("Deleted task {id}"));
    emit_success(output, "rm", &RemoveOutput { id: id.to_string() }, Some(&human))
}

pub fn run_stats(config: &Config, output: OutputOptions) -> Result<()> {
    let repo = open_repo(config)?;
    let tasks = block_on(repo.refresh(&QuerySpec::all()))??;
    let stats = counts(&tasks);

    let mut human = HumanOutput::new("Task stats");
    human.push_summary("All", stats.all.to_string());
    human.push_summary("Active", stats.active.to_string());
    human.push_summary("Completed", stats.completed.to_string());

    emit_success(output, "stats", &stats, Some(&human))
}

/// Toggle and delete resolve ids against the last snapshot; one-shot
/// commands have no subscription, so fetch it first.
async fn load_snapshot(repo: &TaskRepository) -> Result<()> {
    repo.refresh(&QuerySpec::all()).await?;
    Ok(())
}

fn task_line(task: &Task) -> String {
    let mark = if task.completed { "x" } else { " " };
    let mut line = format!("[{mark}][{}] {} {}", task.priority, task.id, task.text);
    if let Some(category) = task.category.as_ref() {
        line.push_str(&format!(" (category: {category})"));
    }
    if let Some(due) = task.due_date {
        line.push_str(&format!(" (due: {due})"));
    }
    line
}
