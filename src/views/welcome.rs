use chrono::{Local, NaiveDate};

use crate::repository::TaskRepository;
use crate::shell::Route;

use super::{wait, Inbox, Update, View, ViewEvent};

/// Long date like `Friday, October 16, 2026`
pub fn format_long_date(date: NaiveDate) -> String {
    date.format("%A, %B %-d, %Y").to_string()
}

/// Landing screen: date, completed-task badge and a navigation menu
#[derive(Debug)]
pub struct WelcomeView {
    repo: TaskRepository,
    completed_count: usize,
    today: Option<NaiveDate>,
    menu_open: bool,
    inbox: Inbox,
    mounted: bool,
}

impl WelcomeView {
    pub fn new(repo: TaskRepository) -> Self {
        Self {
            repo,
            completed_count: 0,
            today: None,
            menu_open: false,
            inbox: Inbox::new(),
            mounted: false,
        }
    }

    /// Completed tasks counted at mount; not kept live
    pub fn completed_count(&self) -> usize {
        self.completed_count
    }

    /// Date captured at mount
    pub fn today(&self) -> Option<NaiveDate> {
        self.today
    }

    pub fn formatted_date(&self) -> String {
        self.today.map(format_long_date).unwrap_or_default()
    }

    pub fn menu_open(&self) -> bool {
        self.menu_open
    }

    pub fn toggle_menu(&mut self) {
        self.menu_open = !self.menu_open;
    }

    pub async fn next_update(&mut self) -> bool {
        if !self.mounted {
            return false;
        }
        match wait(None, &mut self.inbox).await {
            Some(update) => {
                self.apply(update);
                true
            }
            None => false,
        }
    }

    fn apply(&mut self, update: Update) {
        match update {
            Update::Event(ViewEvent::CompletedCount(Ok(count))) => {
                self.completed_count = count;
            }
            Update::Event(ViewEvent::CompletedCount(Err(err))) => {
                tracing::warn!(error = %err, "failed to count completed tasks");
            }
            _ => {}
        }
    }
}

impl View for WelcomeView {
    fn route(&self) -> Route {
        Route::Welcome
    }

    fn mount(&mut self) {
        if self.mounted {
            return;
        }
        self.mounted = true;
        self.completed_count = 0;
        self.menu_open = false;
        self.today = Some(Local::now().date_naive());
        let repo = self.repo.clone();
        self.inbox
            .spawn(async move { ViewEvent::CompletedCount(repo.count_completed().await) });
    }

    fn unmount(&mut self) {
        self.inbox = Inbox::new();
        self.mounted = false;
    }

    fn is_mounted(&self) -> bool {
        self.mounted
    }

    fn poll(&mut self) -> bool {
        let mut changed = false;
        while let Some(event) = self.inbox.try_recv() {
            self.apply(Update::Event(event));
            changed = true;
        }
        changed
    }

    /// Count failures are logged, never shown
    fn error(&self) -> Option<&str> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_date_matches_landing_format() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 16).expect("date");
        assert_eq!(format_long_date(date), "Friday, October 16, 2026");
        let date = NaiveDate::from_ymd_opt(2027, 1, 3).expect("date");
        assert_eq!(format_long_date(date), "Sunday, January 3, 2027");
    }
}
