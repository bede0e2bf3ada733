//! Status filtering and search bounds
//!
//! Pure helpers shared by the repository, the views and the command line.

use serde::Serialize;

use crate::task::{StatusFilter, Task};

/// Upper sentinel appended to a search term to form its prefix range
pub const PREFIX_SENTINEL: char = '\u{f8ff}';

/// Order-preserving subsequence of `tasks` that passes `filter`.
pub fn apply_status(tasks: &[Task], filter: StatusFilter) -> Vec<Task> {
    tasks
        .iter()
        .filter(|task| filter.matches(task))
        .cloned()
        .collect()
}

/// Inclusive `[term, term + U+F8FF]` range selecting texts that start with `term`.
///
/// Byte-wise comparison makes the match case-sensitive.
pub fn prefix_bounds(term: &str) -> (String, String) {
    let mut upper = String::with_capacity(term.len() + PREFIX_SENTINEL.len_utf8());
    upper.push_str(term);
    upper.push(PREFIX_SENTINEL);
    (term.to_string(), upper)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub all: usize,
    pub active: usize,
    pub completed: usize,
}

impl StatusCounts {
    pub fn get(&self, filter: StatusFilter) -> usize {
        match filter {
            StatusFilter::All => self.all,
            StatusFilter::Active => self.active,
            StatusFilter::Completed => self.completed,
        }
    }
}

pub fn counts(tasks: &[Task]) -> StatusCounts {
    let completed = tasks.iter().filter(|task| task.completed).count();
    StatusCounts {
        all: tasks.len(),
        active: tasks.len() - completed,
        completed,
    }
}
