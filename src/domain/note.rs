use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validation::{self, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Note {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Note {
    pub fn new(user_id: Uuid, input: CreateNote, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            title: input.title,
            content: input.content,
            created_at,
        }
    }

    /// Case-insensitive substring match on title or content
    pub fn matches(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        self.title.to_lowercase().contains(&term) || self.content.to_lowercase().contains(&term)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateNote {
    pub title: String,
    pub content: String,
}

impl CreateNote {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::validate_title(&self.title)?;
        validation::validate_required("content", &self.content)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateNote {
    pub title: Option<String>,
    pub content: Option<String>,
}

impl UpdateNote {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(title) = &self.title {
            validation::validate_title(title)?;
        }
        if let Some(content) = &self.content {
            validation::validate_required("content", content)?;
        }
        Ok(())
    }

    pub fn apply(&self, note: &mut Note) {
        if let Some(title) = &self.title {
            note.title = title.clone();
        }
        if let Some(content) = &self.content {
            note.content = content.clone();
        }
    }
}

/// Notes matching `term`, newest first. An empty term keeps everything.
pub fn search_notes<'a>(notes: &'a [Note], term: &str) -> Vec<&'a Note> {
    let term = term.trim();
    let mut found: Vec<&Note> = notes
        .iter()
        .filter(|note| term.is_empty() || note.matches(term))
        .collect();
    found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    found
}
