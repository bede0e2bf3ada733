use crate::filter::apply_status;
use crate::repository::{QuerySpec, TaskRepository, TaskSubscription};
use crate::shell::Route;
use crate::task::{StatusFilter, Task};

use super::{drain, wait, Inbox, Update, View, ViewEvent};

/// Completed tasks, newest first
///
/// Subscribes to the whole collection and keeps the completed ones, rather
/// than issuing a dedicated store query.
#[derive(Debug)]
pub struct CompletedView {
    repo: TaskRepository,
    tasks: Vec<Task>,
    loaded: bool,
    error: Option<String>,
    subscription: Option<TaskSubscription>,
    inbox: Inbox,
    mounted: bool,
}

impl CompletedView {
    pub fn new(repo: TaskRepository) -> Self {
        Self {
            repo,
            tasks: Vec::new(),
            loaded: false,
            error: None,
            subscription: None,
            inbox: Inbox::new(),
            mounted: false,
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn loaded(&self) -> bool {
        self.loaded
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn remove(&mut self, id: &str) {
        let repo = self.repo.clone();
        let id = id.to_string();
        self.inbox
            .spawn(async move { ViewEvent::Removed(repo.remove(&id).await) });
    }

    pub async fn next_update(&mut self) -> bool {
        if !self.mounted {
            return false;
        }
        match wait(self.subscription.as_mut(), &mut self.inbox).await {
            Some(update) => {
                self.apply(update);
                true
            }
            None => false,
        }
    }

    fn apply(&mut self, update: Update) {
        match update {
            Update::Snapshot(Ok(tasks)) => {
                self.tasks = apply_status(&tasks, StatusFilter::Completed);
                self.loaded = true;
            }
            Update::Snapshot(Err(err)) => {
                self.error = Some(format!("Failed to load tasks: {err}"));
            }
            Update::Event(ViewEvent::Removed(Err(err))) => {
                self.error = Some(format!("Failed to delete task: {err}"));
            }
            Update::Event(_) => {}
        }
    }
}

impl View for CompletedView {
    fn route(&self) -> Route {
        Route::Completed
    }

    fn mount(&mut self) {
        if self.mounted {
            return;
        }
        self.tasks.clear();
        self.error = None;
        self.mounted = true;
        self.loaded = false;
        self.subscription = Some(self.repo.subscribe(&QuerySpec::all()));
    }

    fn unmount(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.close();
        }
        self.inbox = Inbox::new();
        self.mounted = false;
    }

    fn is_mounted(&self) -> bool {
        self.mounted
    }

    fn poll(&mut self) -> bool {
        let updates = drain(self.subscription.as_mut(), &mut self.inbox);
        let changed = !updates.is_empty();
        for update in updates {
            self.apply(update);
        }
        changed
    }

    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}
