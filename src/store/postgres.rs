use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{NoteRepository, StoreError, StoreResult, TaskRepository, UserRepository};
use crate::domain::user::normalize_email;
use crate::domain::{Note, Task, UpdateNote, UpdateProfile, UpdateTask, User, UserRecord};

const UNIQUE_VIOLATION: &str = "23505";

const TASK_COLUMNS: &str =
    "id, user_id, title, description, location, due_date, priority, completed, time_spent, created_at";

#[derive(Debug, FromRow)]
struct TaskRow {
    id: Uuid,
    user_id: Uuid,
    title: String,
    description: Option<String>,
    location: Option<String>,
    due_date: Option<DateTime<Utc>>,
    priority: String,
    completed: bool,
    time_spent: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<TaskRow> for Task {
    type Error = StoreError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        Ok(Task {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            description: row.description,
            location: row.location,
            due_date: row.due_date,
            priority: row.priority.parse().map_err(StoreError::Corrupt)?,
            completed: row.completed,
            time_spent: row.time_spent,
            created_at: row.created_at,
        })
    }
}

fn into_tasks(rows: Vec<TaskRow>) -> StoreResult<Vec<Task>> {
    rows.into_iter().map(Task::try_from).collect()
}

fn into_task(row: Option<TaskRow>) -> StoreResult<Option<Task>> {
    row.map(Task::try_from).transpose()
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == UNIQUE_VIOLATION)
}

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

#[async_trait]
impl TaskRepository for PgStore {
    async fn list_tasks(&self, user_id: Uuid) -> StoreResult<Vec<Task>> {
        let rows = sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE user_id = $1 ORDER BY created_at, id"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        into_tasks(rows)
    }

    async fn get_task(&self, user_id: Uuid, id: Uuid) -> StoreResult<Option<Task>> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        into_task(row)
    }

    async fn insert_task(&self, task: &Task) -> StoreResult<Task> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            r#"
            INSERT INTO tasks ({TASK_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(task.id)
        .bind(task.user_id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(&task.location)
        .bind(task.due_date)
        .bind(task.priority.as_str())
        .bind(task.completed)
        .bind(task.time_spent)
        .bind(task.created_at)
        .fetch_one(&self.pool)
        .await?;

        Task::try_from(row)
    }

    async fn update_task(
        &self,
        user_id: Uuid,
        id: Uuid,
        patch: &UpdateTask,
    ) -> StoreResult<Option<Task>> {
        // Nullable fields need "absent" vs "null", so the patch is applied in
        // Rust on a locked row instead of with COALESCE.
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1 AND user_id = $2 FOR UPDATE"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(mut task) = into_task(row)? else {
            return Ok(None);
        };
        patch.apply(&mut task);

        let row = sqlx::query_as::<_, TaskRow>(&format!(
            r#"
            UPDATE tasks
            SET title = $3, description = $4, location = $5, due_date = $6,
                priority = $7, completed = $8, time_spent = $9
            WHERE id = $1 AND user_id = $2
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user_id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(&task.location)
        .bind(task.due_date)
        .bind(task.priority.as_str())
        .bind(task.completed)
        .bind(task.time_spent)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Task::try_from(row).map(Some)
    }

    async fn toggle_task(&self, user_id: Uuid, id: Uuid) -> StoreResult<Option<Task>> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            r#"
            UPDATE tasks SET completed = NOT completed
            WHERE id = $1 AND user_id = $2
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        into_task(row)
    }

    async fn add_time_spent(
        &self,
        user_id: Uuid,
        id: Uuid,
        minutes: i64,
    ) -> StoreResult<Option<Task>> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            r#"
            UPDATE tasks SET time_spent = time_spent + $3
            WHERE id = $1 AND user_id = $2
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user_id)
        .bind(minutes.max(0))
        .fetch_optional(&self.pool)
        .await?;

        into_task(row)
    }

    async fn delete_task(&self, user_id: Uuid, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl NoteRepository for PgStore {
    async fn list_notes(&self, user_id: Uuid) -> StoreResult<Vec<Note>> {
        let notes = sqlx::query_as::<_, Note>(
            r#"
            SELECT id, user_id, title, content, created_at
            FROM notes
            WHERE user_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(notes)
    }

    async fn get_note(&self, user_id: Uuid, id: Uuid) -> StoreResult<Option<Note>> {
        let note = sqlx::query_as::<_, Note>(
            "SELECT id, user_id, title, content, created_at FROM notes WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(note)
    }

    async fn insert_note(&self, note: &Note) -> StoreResult<Note> {
        let note = sqlx::query_as::<_, Note>(
            r#"
            INSERT INTO notes (id, user_id, title, content, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, title, content, created_at
            "#,
        )
        .bind(note.id)
        .bind(note.user_id)
        .bind(&note.title)
        .bind(&note.content)
        .bind(note.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(note)
    }

    async fn update_note(
        &self,
        user_id: Uuid,
        id: Uuid,
        patch: &UpdateNote,
    ) -> StoreResult<Option<Note>> {
        let note = sqlx::query_as::<_, Note>(
            r#"
            UPDATE notes
            SET
                title = COALESCE($3, title),
                content = COALESCE($4, content)
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, title, content, created_at
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(&patch.title)
        .bind(&patch.content)
        .fetch_optional(&self.pool)
        .await?;

        Ok(note)
    }

    async fn delete_note(&self, user_id: Uuid, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM notes WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            name: row.name,
            email: row.email,
        }
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn insert_user(&self, user: &UserRecord) -> StoreResult<()> {
        let res = sqlx::query(
            r#"
            INSERT INTO users (id, name, email, password_hash)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .execute(&self.pool)
        .await;

        match res {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(StoreError::Conflict(format!(
                "email {} is already registered",
                user.email
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
        let row = sqlx::query_as::<_, (Uuid, String, String, String)>(
            "SELECT id, name, email, password_hash FROM users WHERE email = $1",
        )
        .bind(normalize_email(email))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, name, email, password_hash)| UserRecord {
            id,
            name,
            email,
            password_hash,
        }))
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>("SELECT id, name, email FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(User::from))
    }

    async fn update_user(&self, id: Uuid, patch: &UpdateProfile) -> StoreResult<Option<User>> {
        let res = sqlx::query_as::<_, UserRow>(
            r#"
            UPDATE users
            SET
                name = COALESCE($2, name),
                email = COALESCE($3, email)
            WHERE id = $1
            RETURNING id, name, email
            "#,
        )
        .bind(id)
        .bind(patch.name.as_deref().map(str::trim))
        .bind(patch.email.as_deref().map(normalize_email))
        .fetch_optional(&self.pool)
        .await;

        match res {
            Ok(row) => Ok(row.map(User::from)),
            Err(e) if is_unique_violation(&e) => {
                Err(StoreError::Conflict("email is already registered".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}
