#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use assert_cmd::Command;
use serde_json::Value;
use taskflow::repository::{QuerySpec, TaskRepository, TaskSubscription};
use taskflow::store::MemoryStore;
use taskflow::task::Task;
use tempfile::TempDir;

/// Upper bound on waiting for a live snapshot
pub const WAIT: Duration = Duration::from_secs(5);

/// A temporary file-store data directory
pub struct TestStore {
    dir: TempDir,
}

impl TestStore {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("failed to create tempdir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn data_dir(&self) -> std::path::PathBuf {
        self.dir.path().join("data")
    }

    /// `taskflow` bound to this store, with ambient config cleared
    pub fn cmd(&self) -> Command {
        let mut cmd = taskflow_cmd();
        cmd.current_dir(self.path())
            .env("TASKFLOW_STORE_DIR", self.data_dir());
        cmd
    }

    /// Run `taskflow <args> --json` and return the `data` payload.
    pub fn json(&self, args: &[&str]) -> Value {
        let output = self
            .cmd()
            .args(args)
            .arg("--json")
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        let value: Value = serde_json::from_slice(&output).expect("json output");
        value["data"].clone()
    }

    pub fn add(&self, text: &str) -> String {
        self.json(&["add", text])["id"]
            .as_str()
            .expect("task id")
            .to_string()
    }
}

pub fn taskflow_cmd() -> Command {
    let mut cmd = Command::cargo_bin("taskflow").expect("binary");
    cmd.env_remove("TASKFLOW_CONFIG")
        .env_remove("TASKFLOW_STORE_DIR")
        .env_remove("RUST_LOG");
    cmd
}

pub fn memory_repo() -> (Arc<MemoryStore>, TaskRepository) {
    let store = Arc::new(MemoryStore::new());
    let repo = TaskRepository::new(store.clone());
    (store, repo)
}

/// Next snapshot, failing the test on timeout, error or close.
pub async fn next_tasks(subscription: &mut TaskSubscription) -> Vec<Task> {
    tokio::time::timeout(WAIT, subscription.next())
        .await
        .expect("snapshot timed out")
        .expect("subscription closed")
        .expect("snapshot error")
}

/// Skip snapshots until one satisfies `done`.
pub async fn tasks_until<F>(subscription: &mut TaskSubscription, done: F) -> Vec<Task>
where
    F: Fn(&[Task]) -> bool,
{
    loop {
        let tasks = next_tasks(subscription).await;
        if done(&tasks) {
            return tasks;
        }
    }
}

pub fn texts(tasks: &[Task]) -> Vec<&str> {
    tasks.iter().map(|task| task.text.as_str()).collect()
}

pub async fn snapshot(repo: &TaskRepository, spec: &QuerySpec) -> Vec<Task> {
    repo.refresh(spec).await.expect("refresh")
}
