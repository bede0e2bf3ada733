use crate::filter::apply_status;
use crate::repository::{QuerySpec, TaskRepository, TaskSubscription};
use crate::shell::Route;
use crate::task::{parse_due_date, NewTask, Priority, StatusFilter, Task};

use super::{drain, wait, Inbox, Update, View, ViewEvent};

/// New-task form fields as typed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskForm {
    pub text: String,
    pub category: String,
    pub due_date: String,
    pub priority: Priority,
}

impl TaskForm {
    pub fn new(priority: Priority) -> Self {
        Self {
            text: String::new(),
            category: String::new(),
            due_date: String::new(),
            priority,
        }
    }

    pub fn reset(&mut self, priority: Priority) {
        *self = Self::new(priority);
    }

    /// Validate into a `NewTask`; the message is shown inline on failure.
    pub fn to_new_task(&self) -> Result<NewTask, String> {
        if self.text.trim().is_empty() {
            return Err("Task cannot be empty".to_string());
        }
        let due_date = if self.due_date.trim().is_empty() {
            None
        } else {
            Some(parse_due_date(&self.due_date).map_err(|err| err.to_string())?)
        };
        Ok(NewTask {
            text: self.text.clone(),
            category: Some(self.category.clone()),
            due_date,
            priority: Some(self.priority),
        })
    }
}

/// The active task list: form, search, status filter and live results
#[derive(Debug)]
pub struct TodoListView {
    repo: TaskRepository,
    default_priority: Priority,
    pub form: TaskForm,
    search: String,
    filter: StatusFilter,
    tasks: Vec<Task>,
    visible: Vec<Task>,
    loading: bool,
    loaded: bool,
    error: Option<String>,
    subscription: Option<TaskSubscription>,
    inbox: Inbox,
    mounted: bool,
}

impl TodoListView {
    pub fn new(repo: TaskRepository, default_priority: Priority) -> Self {
        Self {
            repo,
            default_priority,
            form: TaskForm::new(default_priority),
            search: String::new(),
            filter: StatusFilter::All,
            tasks: Vec::new(),
            visible: Vec::new(),
            loading: false,
            loaded: false,
            error: None,
            subscription: None,
            inbox: Inbox::new(),
            mounted: false,
        }
    }

    /// Store result for the current search, before status filtering
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Tasks to display
    pub fn visible(&self) -> &[Task] {
        &self.visible
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn filter(&self) -> StatusFilter {
        self.filter
    }

    /// An add is in flight
    pub fn loading(&self) -> bool {
        self.loading
    }

    /// The first snapshot of the current subscription arrived
    pub fn loaded(&self) -> bool {
        self.loaded
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// Change the search term, reopening the subscription when mounted.
    pub fn set_search(&mut self, term: impl Into<String>) {
        let term = term.into();
        if term == self.search {
            return;
        }
        self.search = term;
        if self.mounted {
            self.resubscribe();
        }
    }

    /// Change the status filter; re-filters locally without a store query.
    pub fn set_filter(&mut self, filter: StatusFilter) {
        self.filter = filter;
        self.refilter();
    }

    pub fn cycle_filter(&mut self) {
        self.set_filter(self.filter.next());
    }

    /// Submit the form. Returns false when rejected locally or while an
    /// add is still in flight.
    pub fn submit(&mut self) -> bool {
        if self.loading {
            return false;
        }
        let task = match self.form.to_new_task() {
            Ok(task) => task,
            Err(message) => {
                self.error = Some(message);
                return false;
            }
        };
        self.loading = true;
        let repo = self.repo.clone();
        self.inbox
            .spawn(async move { ViewEvent::Added(repo.add(task).await) });
        true
    }

    pub fn toggle(&mut self, id: &str) {
        let repo = self.repo.clone();
        let id = id.to_string();
        self.inbox
            .spawn(async move { ViewEvent::Toggled(repo.toggle_complete(&id).await) });
    }

    pub fn remove(&mut self, id: &str) {
        let repo = self.repo.clone();
        let id = id.to_string();
        self.inbox
            .spawn(async move { ViewEvent::Removed(repo.remove(&id).await) });
    }

    /// Wait for and apply the next snapshot or call result. Returns false
    /// when nothing more can arrive.
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

    fn resubscribe(&mut self) {
        if let Some(mut old) = self.subscription.take() {
            old.close();
        }
        self.loaded = false;
        self.subscription = Some(self.repo.subscribe(&QuerySpec::search(self.search.clone())));
    }

    fn refilter(&mut self) {
        self.visible = apply_status(&self.tasks, self.filter);
    }

    fn apply(&mut self, update: Update) {
        match update {
            Update::Snapshot(Ok(tasks)) => {
                self.tasks = tasks;
                self.loaded = true;
                self.refilter();
            }
            Update::Snapshot(Err(err)) => {
                self.error = Some(format!("Failed to load tasks: {err}"));
            }
            Update::Event(ViewEvent::Added(result)) => {
                self.loading = false;
                match result {
                    Ok(_) => {
                        self.form.reset(self.default_priority);
                        self.error = None;
                    }
                    Err(err) => self.error = Some(format!("Failed to add task: {err}")),
                }
            }
            Update::Event(ViewEvent::Toggled(Err(err))) => {
                self.error = Some(format!("Failed to update task status: {err}"));
            }
            Update::Event(ViewEvent::Removed(Err(err))) => {
                self.error = Some(format!("Failed to delete task: {err}"));
            }
            Update::Event(_) => {}
        }
    }
}

impl View for TodoListView {
    fn route(&self) -> Route {
        Route::TaskList
    }

    fn mount(&mut self) {
        if self.mounted {
            return;
        }
        self.form.reset(self.default_priority);
        self.search.clear();
        self.filter = StatusFilter::All;
        self.tasks.clear();
        self.visible.clear();
        self.error = None;
        self.mounted = true;
        self.resubscribe();
    }

    fn unmount(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.close();
        }
        self.inbox = Inbox::new();
        self.loading = false;
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
