//! Command-line interface for taskflow
//!
//! This module defines the CLI structure using clap derive macros. With no
//! subcommand the terminal UI opens; the other subcommands expose the task
//! repository to scripts.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::error::Result;
use crate::output::OutputOptions;

mod init;
mod task;

/// taskflow - live task lists in the terminal
///
/// Create, search, complete and delete to-do items stored in a shared
/// document collection.
#[derive(Parser, Debug)]
#[command(name = "taskflow")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file (defaults to ./.taskflow.toml when present)
    #[arg(long, global = true, env = "TASKFLOW_CONFIG")]
    pub config: Option<PathBuf>,

    /// Data directory for the file store (overrides store.dir)
    #[arg(long, global = true, env = "TASKFLOW_STORE_DIR")]
    pub store_dir: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Open the terminal UI (default)
    Ui {
        /// Start view: welcome, taskList, completed (or /, /todos, /completed)
        #[arg(long)]
        view: Option<String>,
    },

    /// Add a task
    Add {
        /// Task text
        text: String,

        /// Free-text category label
        #[arg(long)]
        category: Option<String>,

        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,

        /// Priority: low, medium, high
        #[arg(long)]
        priority: Option<String>,
    },

    /// List tasks, newest first (alphabetical while searching)
    List {
        /// Status filter: all, active, completed
        #[arg(long, default_value = "all")]
        filter: String,

        /// Case-sensitive text prefix
        #[arg(long)]
        search: Option<String>,
    },

    /// Flip a task between active and completed
    Toggle {
        /// Task id
        id: String,
    },

    /// Delete a task
    Rm {
        /// Task id
        id: String,
    },

    /// Show task counts
    Stats,

    /// Write a default .taskflow.toml (or the --config path)
    Init,
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let cwd = std::env::current_dir()?;
        let output = OutputOptions {
            json: self.json,
            quiet: self.quiet,
        };
        let explicit = self.config.as_deref();
        let store_dir = self.store_dir;
        let config = || load_config(explicit, store_dir.clone(), &cwd);

        match self.command.unwrap_or(Commands::Ui { view: None }) {
            Commands::Ui { view } => crate::ui::run(crate::ui::UiOptions {
                config: config()?,
                view,
            }),
            Commands::Add {
                text,
                category,
                due,
                priority,
            } => task::run_add(
                &config()?,
                task::AddOptions {
                    text,
                    category,
                    due,
                    priority,
                },
                output,
            ),
            Commands::List { filter, search } => {
                task::run_list(&config()?, task::ListOptions { filter, search }, output)
            }
            Commands::Toggle { id } => task::run_toggle(&config()?, &id, output),
            Commands::Rm { id } => task::run_rm(&config()?, &id, output),
            Commands::Stats => task::run_stats(&config()?, output),
            // An existing config may be invalid; init never loads it.
            Commands::Init => init::run(explicit, store_dir.clone(), &cwd, output),
        }
    }
}

/// Resolve configuration and apply command-line overrides.
pub fn load_config(explicit: Option<&Path>, store_dir: Option<PathBuf>, cwd: &Path) -> Result<Config> {
    let mut config = Config::resolve(explicit, cwd)?;
    if let Some(dir) = store_dir {
        config.store.dir = Some(dir);
    }
    Ok(config)
}
