//! Single-slot time tracker.
//!
//! At most one task is tracked at a time. Starting a task while another one is
//! running stops the running one first and hands back its [`Commit`], so the
//! caller can add the elapsed minutes to that task before anything else
//! happens. Stopping a task that is not being tracked is a no-op.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

const MS_PER_MINUTE: i64 = 60_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrackingSession {
    pub task_id: Uuid,
    pub started_at: DateTime<Utc>,
}

impl TrackingSession {
    pub fn elapsed_minutes(&self, now: DateTime<Utc>) -> i64 {
        elapsed_minutes(self.started_at, now)
    }
}

/// Minutes to add to a task's time spent after its session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Commit {
    pub task_id: Uuid,
    pub minutes: i64,
}

/// Whole minutes between two instants, rounded half-up. A clock that went
/// backwards yields 0.
pub fn elapsed_minutes(started_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let ms = (now - started_at).num_milliseconds().max(0);
    (ms + MS_PER_MINUTE / 2) / MS_PER_MINUTE
}

#[derive(Debug, Default, Clone)]
pub struct TimeTracker {
    active: Option<TrackingSession>,
}

impl TimeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&TrackingSession> {
        self.active.as_ref()
    }

    pub fn is_tracking(&self, task_id: Uuid) -> bool {
        matches!(self.active, Some(s) if s.task_id == task_id)
    }

    /// Start tracking `task_id`, committing whatever session was running
    pub fn start(&mut self, task_id: Uuid, now: DateTime<Utc>) -> Option<Commit> {
        let previous = self
            .active
            .map(|session| session.task_id)
            .and_then(|running| self.stop(running, now));

        self.active = Some(TrackingSession {
            task_id,
            started_at: now,
        });

        previous
    }

    pub fn stop(&mut self, task_id: Uuid, now: DateTime<Utc>) -> Option<Commit> {
        match self.active {
            Some(session) if session.task_id == task_id => {
                self.active = None;
                Some(Commit {
                    task_id,
                    minutes: session.elapsed_minutes(now),
                })
            }
            _ => None,
        }
    }

    /// Drop the session for `task_id` without committing any time
    pub fn cancel(&mut self, task_id: Uuid) -> bool {
        if self.is_tracking(task_id) {
            self.active = None;
            return true;
        }
        false
    }
}
