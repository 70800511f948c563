use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validation::{self, ValidationError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    /// Sort ordinal: high=0, medium=1, low=2
    pub fn tier(self) -> u8 {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(format!("unknown priority `{other}`")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: Priority,
    pub completed: bool,
    /// Accumulated tracked time in minutes
    pub time_spent: i64,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Build a fresh task from a validated create payload
    pub fn new(user_id: Uuid, input: CreateTask, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            title: input.title,
            description: input.description,
            location: input.location,
            due_date: input.due_date,
            priority: input.priority,
            completed: input.completed,
            time_spent: 0,
            created_at,
        }
    }

    pub fn add_time_spent(&mut self, minutes: i64) {
        self.time_spent = self.time_spent.saturating_add(minutes.max(0));
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "validation::due_date")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub completed: bool,
}

impl CreateTask {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::validate_title(&self.title)
    }
}

/// Partial update. For nullable fields `Some(None)` clears the value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTask {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "validation::double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "validation::double_option")]
    pub location: Option<Option<String>>,
    #[serde(default, deserialize_with = "validation::patch_due_date")]
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub priority: Option<Priority>,
    pub completed: Option<bool>,
    pub time_spent: Option<i64>,
}

impl UpdateTask {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(title) = &self.title {
            validation::validate_title(title)?;
        }
        if matches!(self.time_spent, Some(minutes) if minutes < 0) {
            return Err(ValidationError::Negative {
                field: "time_spent",
            });
        }
        Ok(())
    }

    pub fn apply(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(location) = &self.location {
            task.location = location.clone();
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
        if let Some(time_spent) = self.time_spent {
            task.time_spent = time_spent;
        }
    }
}
