//! A user's workspace: the planner core bound to storage, the clock and the
//! per-user time trackers.
//!
//! Every call takes an explicit [`Session`]. Without a signed-in user reads
//! come back empty and writes do nothing.

mod notes;
mod tasks;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::clock::Clock;
use crate::domain::{Note, ValidationError};
use crate::planner::{self, TimeTracker};
use crate::store::{NoteRepository, StoreError, TaskRepository};

pub use notes::NoteWorkspace;
pub use tasks::{StartedTracking, TaskBuckets, TaskView, TaskWorkspace, TrackingView};

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type WorkspaceResult<T> = Result<T, WorkspaceError>;

/// Who is asking. Passed into every workspace call instead of living in a global.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Session {
    user_id: Option<Uuid>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self { user_id: None }
    }

    pub fn authenticated(user_id: Uuid) -> Self {
        Self {
            user_id: Some(user_id),
        }
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.user_id
    }
}

/// One [`TimeTracker`] per user. The lock is never held across an `.await`.
#[derive(Debug, Default)]
pub struct TrackerRegistry {
    trackers: Mutex<HashMap<Uuid, TimeTracker>>,
}

impl TrackerRegistry {
    pub fn with<R>(&self, user_id: Uuid, f: impl FnOnce(&mut TimeTracker) -> R) -> R {
        let mut trackers = self.trackers.lock().unwrap_or_else(|e| e.into_inner());
        f(trackers.entry(user_id).or_default())
    }

    /// Read-only view of a user's tracker. A user who never tracked gets no entry.
    pub fn peek<R>(&self, user_id: Uuid, f: impl FnOnce(&TimeTracker) -> R) -> Option<R> {
        let trackers = self.trackers.lock().unwrap_or_else(|e| e.into_inner());
        trackers.get(&user_id).map(f)
    }

    pub fn tracked_task(&self, user_id: Uuid) -> Option<Uuid> {
        self.peek(user_id, |tracker| tracker.current().map(|s| s.task_id))
            .flatten()
    }
}

#[derive(Debug, Serialize)]
pub struct DashboardView {
    pub total_time_spent: i64,
    pub total_time_spent_label: String,
    pub completed_tasks: usize,
    pub pending_tasks: usize,
    pub upcoming: Vec<TaskView>,
    pub recent_notes: Vec<Note>,
    pub tracking: Option<TrackingView>,
}

pub struct Workspace {
    pub tasks: TaskWorkspace,
    pub notes: NoteWorkspace,
}

impl Workspace {
    pub fn new(
        tasks: Arc<dyn TaskRepository>,
        notes: Arc<dyn NoteRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            tasks: TaskWorkspace::new(tasks, clock.clone()),
            notes: NoteWorkspace::new(notes, clock),
        }
    }

    pub async fn dashboard(&self, session: &Session) -> WorkspaceResult<Option<DashboardView>> {
        let Some(user_id) = session.user_id() else {
            return Ok(None);
        };

        let tasks = self.tasks.load(user_id).await?;
        let notes = self.notes.load(user_id).await?;
        let now = self.tasks.now();
        let summary = planner::summarize(&tasks, &notes, now);
        let tracked = self.tasks.trackers().tracked_task(user_id);

        Ok(Some(DashboardView {
            total_time_spent: summary.total_time_spent,
            total_time_spent_label: summary.total_time_spent_label,
            completed_tasks: summary.completed_tasks,
            pending_tasks: summary.pending_tasks,
            upcoming: summary
                .upcoming
                .into_iter()
                .map(|t| TaskView::new(t.clone(), tracked))
                .collect(),
            recent_notes: summary.recent_notes.into_iter().cloned().collect(),
            tracking: self.tasks.current_tracking_at(user_id, now),
        }))
    }
}
