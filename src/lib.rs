//! taskflow - live task lists
//!
//! A to-do manager built on a small document store. Screens subscribe to
//! live queries and redraw whenever the underlying collection changes.
//!
//! # Core Concepts
//!
//! - **Document store**: collections of JSON-like documents with
//!   server-assigned ids and creation timestamps
//! - **Subscriptions**: live query results, re-delivered on every change
//! - **Views**: headless screen controllers that mount and unmount with
//!   navigation
//! - **Shell**: route switching with an exit-then-enter transition
//!
//! # Module Organization
//!
//! - `cli`: Command-line interface using clap
//! - `config`: Configuration loading from `.taskflow.toml`
//! - `error`: Error types and result aliases
//! - `store`: Document store trait, in-memory and file-backed stores
//! - `repository`: Task operations and live task subscriptions
//! - `filter`: Status filtering and prefix search bounds
//! - `views`: Welcome, task list and completed screen controllers
//! - `shell`: Routes and navigation transitions
//! - `ui`: Terminal front end using ratatui
//! - `storage`: Data directory layout and locked collection files
//! - `lock`: File locking and atomic writes

pub mod cli;
pub mod config;
pub mod error;
pub mod filter;
pub mod lock;
pub mod output;
pub mod repository;
pub mod shell;
pub mod storage;
pub mod store;
pub mod task;
pub mod ui;
pub mod views;

pub use error::{Error, Result};
