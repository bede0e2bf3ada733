//! Task records and the document shape they are stored in.
//!
//! A task lives in the store as a document with the fields `text`,
//! `completed`, `category`, `dueDate` and `priority`. The id and the
//! creation timestamp are stamped by the store and carried as document
//! metadata, never written by the client.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};
use crate::store::{Document, Fields};

/// Collection holding task documents unless configured otherwise
pub const TASKS_COLLECTION: &str = "todos";

/// Calendar format used for `dueDate`
pub const DUE_DATE_FORMAT: &str = "%Y-%m-%d";

pub const FIELD_TEXT: &str = "text";
pub const FIELD_COMPLETED: &str = "completed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    /// Next priority in the low -> medium -> high cycle, wrapping around
    pub fn cycle(self, delta: isize) -> Priority {
        let len = Self::ALL.len() as isize;
        let current = Self::ALL.iter().position(|p| *p == self).unwrap_or(1) as isize;
        Self::ALL[(current + delta).rem_euclid(len) as usize]
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(Error::Validation(format!(
                "invalid priority '{other}' (expected low|medium|high)"
            ))),
        }
    }
}

/// Client-side status partition of a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Completed,
}

impl StatusFilter {
    pub const ALL: [StatusFilter; 3] = [
        StatusFilter::All,
        StatusFilter::Active,
        StatusFilter::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusFilter::All => "all",
            StatusFilter::Active => "active",
            StatusFilter::Completed => "completed",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StatusFilter::All => "All",
            StatusFilter::Active => "Active",
            StatusFilter::Completed => "Completed",
        }
    }

    pub fn matches(&self, task: &Task) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Active => !task.completed,
            StatusFilter::Completed => task.completed,
        }
    }

    pub fn next(self) -> StatusFilter {
        match self {
            StatusFilter::All => StatusFilter::Active,
            StatusFilter::Active => StatusFilter::Completed,
            StatusFilter::Completed => StatusFilter::All,
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusFilter {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(StatusFilter::All),
            "active" => Ok(StatusFilter::Active),
            "completed" => Ok(StatusFilter::Completed),
            other => Err(Error::InvalidArgument(format!(
                "invalid status filter '{other}' (expected all|active|completed)"
            ))),
        }
    }
}

/// A to-do item as seen by the application
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    pub id: String,
    pub text: String,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Read a task out of a store document.
    pub fn from_document(doc: &Document) -> Result<Self> {
        let fields: TaskFields =
            serde_json::from_value(serde_json::Value::Object(doc.fields.clone()))?;
        let due_date = fields
            .due_date
            .and_then(|raw| match parse_due_date(&raw) {
                Ok(date) => Some(date),
                Err(err) => {
                    tracing::warn!(id = %doc.id, error = %err, "ignoring unreadable due date");
                    None
                }
            });
        Ok(Task {
            id: doc.id.clone(),
            text: fields.text,
            completed: fields.completed,
            category: fields.category,
            due_date,
            priority: fields.priority,
            created_at: doc.created_at,
        })
    }
}

/// Fields supplied by the client when creating a task
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTask {
    pub text: String,
    pub category: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub priority: Option<Priority>,
}

impl NewTask {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Validate and normalize into the document fields of a fresh task.
    pub fn into_fields(self) -> Result<Fields> {
        let text = self.text.trim();
        if text.is_empty() {
            return Err(Error::Validation("Task cannot be empty".to_string()));
        }
        let fields = TaskFields {
            text: text.to_string(),
            completed: false,
            category: self.category.as_deref().and_then(non_empty),
            due_date: self
                .due_date
                .map(|date| date.format(DUE_DATE_FORMAT).to_string()),
            priority: self.priority.unwrap_or_default(),
        };
        match serde_json::to_value(fields)? {
            serde_json::Value::Object(map) => Ok(map),
            _ => Err(Error::OperationFailed(
                "task fields did not serialize to an object".to_string(),
            )),
        }
    }
}

/// Parse a `YYYY-MM-DD` due date.
pub fn parse_due_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DUE_DATE_FORMAT).map_err(|_| {
        Error::Validation(format!(
            "invalid due date '{}' (expected YYYY-MM-DD)",
            value.trim()
        ))
    })
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskFields {
    text: String,
    #[serde(default)]
    completed: bool,
    #[serde(
        default,
        deserialize_with = "blank_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    category: Option<String>,
    #[serde(
        default,
        deserialize_with = "blank_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    due_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_priority")]
    priority: Priority,
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn blank_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.as_deref().and_then(non_empty))
}

fn lenient_priority<'de, D>(deserializer: D) -> std::result::Result<Priority, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value
        .as_deref()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or_default())
}
