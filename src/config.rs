//! Configuration loading and management
//!
//! Handles parsing of `.taskflow.toml` configuration files.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::lock::DEFAULT_LOCK_TIMEOUT_MS;
use crate::shell::Route;
use crate::task::{Priority, TASKS_COLLECTION};

/// File looked up in the working directory when no config path is given
pub const CONFIG_FILE_NAME: &str = ".taskflow.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Document store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Terminal UI configuration
    #[serde(default)]
    pub ui: UiConfig,

    /// Task defaults
    #[serde(default)]
    pub tasks: TasksConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    File,
    Memory,
}

/// Document store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// Data directory; platform data dir when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,

    /// Collection holding the task documents
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Watch the data dir for changes made by other processes
    #[serde(default = "default_true")]
    pub watch: bool,

    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

fn default_collection() -> String {
    TASKS_COLLECTION.to_string()
}

fn default_true() -> bool {
    true
}

fn default_lock_timeout_ms() -> u64 {
    DEFAULT_LOCK_TIMEOUT_MS
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            dir: None,
            collection: default_collection(),
            watch: default_true(),
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

/// Terminal UI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Route shown on launch, by name or path
    #[serde(default = "default_start_view")]
    pub start_view: String,

    /// Input poll interval
    #[serde(default = "default_poll_ms")]
    pub poll_ms: u64,

    /// Length of each transition phase; 0 disables animation
    #[serde(default = "default_transition_ms")]
    pub transition_ms: u64,
}

fn default_start_view() -> String {
    "welcome".to_string()
}

fn default_poll_ms() -> u64 {
    120
}

fn default_transition_ms() -> u64 {
    250
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            start_view: default_start_view(),
            poll_ms: default_poll_ms(),
            transition_ms: default_transition_ms(),
        }
    }
}

impl UiConfig {
    pub fn start_route(&self) -> Result<Route> {
        self.start_view.parse()
    }
}

/// Task defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TasksConfig {
    /// Priority preselected in the new-task form and used by `add`
    #[serde(default = "default_priority")]
    pub default_priority: String,
}

fn default_priority() -> String {
    Priority::default().to_string()
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            default_priority: default_priority(),
        }
    }
}

impl TasksConfig {
    pub fn default_priority(&self) -> Result<Priority> {
        self.default_priority.parse()
    }
}

impl Config {
    /// Load configuration from a `.taskflow.toml` file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `.taskflow.toml` from `dir`, or return defaults
    pub fn load_from_dir(dir: &Path) -> Self {
        let config_path = dir.join(CONFIG_FILE_NAME);
        if !config_path.exists() {
            return Self::default();
        }
        match Self::load(&config_path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(path = %config_path.display(), error = %err, "ignoring invalid config");
                Self::default()
            }
        }
    }

    /// An explicit path must load; otherwise fall back to `dir`.
    pub fn resolve(explicit: Option<&Path>, dir: &Path) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => Ok(Self::load_from_dir(dir)),
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.store.validate()?;
        self.ui.validate()?;
        self.tasks
            .default_priority()
            .map_err(|err| Error::InvalidConfig(format!("tasks.default_priority: {err}")))?;
        Ok(())
    }
}

impl StoreConfig {
    fn validate(&self) -> Result<()> {
        let name = self.collection.trim();
        if name.is_empty() {
            return Err(Error::InvalidConfig(
                "store.collection cannot be empty".to_string(),
            ));
        }
        if !name
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
        {
            return Err(Error::InvalidConfig(format!(
                "store.collection '{name}' may only contain letters, digits, '_' and '-'"
            )));
        }
        Ok(())
    }
}

impl UiConfig {
    fn validate(&self) -> Result<()> {
        self.start_route()
            .map_err(|err| Error::InvalidConfig(format!("ui.start_view: {err}")))?;
        if self.poll_ms == 0 {
            return Err(Error::InvalidConfig("ui.poll_ms must be > 0".to_string()));
        }
        Ok(())
    }
}
