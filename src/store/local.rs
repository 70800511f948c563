//! Key-value store kept in process memory.
//!
//! Records are stored the way a browser keeps them in local storage: one JSON
//! array per user and kind (`tasks-{user_id}`, `notes-{user_id}`) plus a single
//! `users` array. Every write replaces the whole array, last write wins.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{NoteRepository, StoreError, StoreResult, TaskRepository, UserRepository};
use crate::domain::user::normalize_email;
use crate::domain::{Note, Task, UpdateNote, UpdateProfile, UpdateTask, User, UserRecord};

const USERS_KEY: &str = "users";

fn tasks_key(user_id: Uuid) -> String {
    format!("tasks-{user_id}")
}

fn notes_key(user_id: Uuid) -> String {
    format!("notes-{user_id}")
}

#[derive(Debug, Default)]
pub struct LocalStore {
    entries: RwLock<HashMap<String, String>>,
}

fn decode<T: DeserializeOwned>(raw: Option<&String>) -> StoreResult<Vec<T>> {
    match raw {
        Some(raw) => Ok(serde_json::from_str(raw)?),
        None => Ok(Vec::new()),
    }
}

impl LocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn load<T: DeserializeOwned>(&self, key: &str) -> StoreResult<Vec<T>> {
        let entries = self.entries.read().await;
        decode(entries.get(key))
    }

    /// Read-modify-write of one key under the write lock
    async fn modify<T, R, F>(&self, key: &str, f: F) -> StoreResult<R>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut Vec<T>) -> StoreResult<R>,
    {
        let mut entries = self.entries.write().await;
        let mut records: Vec<T> = decode(entries.get(key))?;
        let result = f(&mut records)?;
        entries.insert(key.to_string(), serde_json::to_string(&records)?);
        Ok(result)
    }
}

#[async_trait]
impl TaskRepository for LocalStore {
    async fn list_tasks(&self, user_id: Uuid) -> StoreResult<Vec<Task>> {
        self.load(&tasks_key(user_id)).await
    }

    async fn get_task(&self, user_id: Uuid, id: Uuid) -> StoreResult<Option<Task>> {
        let tasks: Vec<Task> = self.load(&tasks_key(user_id)).await?;
        Ok(tasks.into_iter().find(|t| t.id == id))
    }

    async fn insert_task(&self, task: &Task) -> StoreResult<Task> {
        self.modify(&tasks_key(task.user_id), |tasks: &mut Vec<Task>| {
            tasks.push(task.clone());
            Ok(task.clone())
        })
        .await
    }

    async fn update_task(
        &self,
        user_id: Uuid,
        id: Uuid,
        patch: &UpdateTask,
    ) -> StoreResult<Option<Task>> {
        self.modify(&tasks_key(user_id), |tasks: &mut Vec<Task>| {
            Ok(tasks.iter_mut().find(|t| t.id == id).map(|task| {
                patch.apply(task);
                task.clone()
            }))
        })
        .await
    }

    async fn toggle_task(&self, user_id: Uuid, id: Uuid) -> StoreResult<Option<Task>> {
        self.modify(&tasks_key(user_id), |tasks: &mut Vec<Task>| {
            Ok(tasks.iter_mut().find(|t| t.id == id).map(|task| {
                task.completed = !task.completed;
                task.clone()
            }))
        })
        .await
    }

    async fn add_time_spent(
        &self,
        user_id: Uuid,
        id: Uuid,
        minutes: i64,
    ) -> StoreResult<Option<Task>> {
        self.modify(&tasks_key(user_id), |tasks: &mut Vec<Task>| {
            Ok(tasks.iter_mut().find(|t| t.id == id).map(|task| {
                task.add_time_spent(minutes);
                task.clone()
            }))
        })
        .await
    }

    async fn delete_task(&self, user_id: Uuid, id: Uuid) -> StoreResult<bool> {
        self.modify(&tasks_key(user_id), |tasks: &mut Vec<Task>| {
            let before = tasks.len();
            tasks.retain(|t| t.id != id);
            Ok(tasks.len() != before)
        })
        .await
    }
}

#[async_trait]
impl NoteRepository for LocalStore {
    async fn list_notes(&self, user_id: Uuid) -> StoreResult<Vec<Note>> {
        self.load(&notes_key(user_id)).await
    }

    async fn get_note(&self, user_id: Uuid, id: Uuid) -> StoreResult<Option<Note>> {
        let notes: Vec<Note> = self.load(&notes_key(user_id)).await?;
        Ok(notes.into_iter().find(|n| n.id == id))
    }

    async fn insert_note(&self, note: &Note) -> StoreResult<Note> {
        self.modify(&notes_key(note.user_id), |notes: &mut Vec<Note>| {
            notes.push(note.clone());
            Ok(note.clone())
        })
        .await
    }

    async fn update_note(
        &self,
        user_id: Uuid,
        id: Uuid,
        patch: &UpdateNote,
    ) -> StoreResult<Option<Note>> {
        self.modify(&notes_key(user_id), |notes: &mut Vec<Note>| {
            Ok(notes.iter_mut().find(|n| n.id == id).map(|note| {
                patch.apply(note);
                note.clone()
            }))
        })
        .await
    }

    async fn delete_note(&self, user_id: Uuid, id: Uuid) -> StoreResult<bool> {
        self.modify(&notes_key(user_id), |notes: &mut Vec<Note>| {
            let before = notes.len();
            notes.retain(|n| n.id != id);
            Ok(notes.len() != before)
        })
        .await
    }
}

#[async_trait]
impl UserRepository for LocalStore {
    async fn insert_user(&self, user: &UserRecord) -> StoreResult<()> {
        self.modify(USERS_KEY, |users: &mut Vec<UserRecord>| {
            if users.iter().any(|u| u.email == user.email) {
                return Err(StoreError::Conflict(format!(
                    "email {} is already registered",
                    user.email
                )));
            }
            users.push(user.clone());
            Ok(())
        })
        .await
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
        let email = normalize_email(email);
        let users: Vec<UserRecord> = self.load(USERS_KEY).await?;
        Ok(users.into_iter().find(|u| u.email == email))
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let users: Vec<UserRecord> = self.load(USERS_KEY).await?;
        Ok(users.iter().find(|u| u.id == id).map(UserRecord::profile))
    }

    async fn update_user(&self, id: Uuid, patch: &UpdateProfile) -> StoreResult<Option<User>> {
        self.modify(USERS_KEY, |users: &mut Vec<UserRecord>| {
            if let Some(email) = patch.email.as_deref().map(normalize_email) {
                if users.iter().any(|u| u.email == email && u.id != id) {
                    return Err(StoreError::Conflict(format!(
                        "email {email} is already registered"
                    )));
                }
            }

            Ok(users.iter_mut().find(|u| u.id == id).map(|user| {
                if let Some(name) = &patch.name {
                    user.name = name.trim().to_string();
                }
                if let Some(email) = &patch.email {
                    user.email = normalize_email(email);
                }
                user.profile()
            }))
        })
        .await
    }
}
