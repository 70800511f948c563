//! Persistence ports and their adapters.
//!
//! Every call is scoped by the owning user's id; a record owned by someone else
//! is indistinguishable from a missing one.

pub mod local;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{Note, Task, UpdateNote, UpdateProfile, UpdateTask, User, UserRecord};

pub use local::LocalStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("{0}")]
    Conflict(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Corrupt(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// All tasks of a user in creation order
    async fn list_tasks(&self, user_id: Uuid) -> StoreResult<Vec<Task>>;

    async fn get_task(&self, user_id: Uuid, id: Uuid) -> StoreResult<Option<Task>>;

    async fn insert_task(&self, task: &Task) -> StoreResult<Task>;

    async fn update_task(
        &self,
        user_id: Uuid,
        id: Uuid,
        patch: &UpdateTask,
    ) -> StoreResult<Option<Task>>;

    async fn toggle_task(&self, user_id: Uuid, id: Uuid) -> StoreResult<Option<Task>>;

    async fn add_time_spent(
        &self,
        user_id: Uuid,
        id: Uuid,
        minutes: i64,
    ) -> StoreResult<Option<Task>>;

    /// `false` when nothing was deleted
    async fn delete_task(&self, user_id: Uuid, id: Uuid) -> StoreResult<bool>;
}

#[async_trait]
pub trait NoteRepository: Send + Sync {
    async fn list_notes(&self, user_id: Uuid) -> StoreResult<Vec<Note>>;

    async fn get_note(&self, user_id: Uuid, id: Uuid) -> StoreResult<Option<Note>>;

    async fn insert_note(&self, note: &Note) -> StoreResult<Note>;

    async fn update_note(
        &self,
        user_id: Uuid,
        id: Uuid,
        patch: &UpdateNote,
    ) -> StoreResult<Option<Note>>;

    async fn delete_note(&self, user_id: Uuid, id: Uuid) -> StoreResult<bool>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with [`StoreError::Conflict`] when the e-mail is taken
    async fn insert_user(&self, user: &UserRecord) -> StoreResult<()>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>>;

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn update_user(&self, id: Uuid, patch: &UpdateProfile) -> StoreResult<Option<User>>;
}
