use chrono::{DateTime, Utc};
use serde::Serialize;

use super::arrange::{arrange, TaskFilter, TaskSort};
use super::duration::format_duration;
use crate::domain::{Note, Task};

pub const UPCOMING_LIMIT: usize = 5;
pub const RECENT_NOTES_LIMIT: usize = 3;

#[derive(Debug, Serialize)]
pub struct Summary<'a> {
    pub total_time_spent: i64,
    pub total_time_spent_label: String,
    pub completed_tasks: usize,
    pub pending_tasks: usize,
    pub upcoming: Vec<&'a Task>,
    pub recent_notes: Vec<&'a Note>,
}

pub fn summarize<'a>(tasks: &'a [Task], notes: &'a [Note], now: DateTime<Utc>) -> Summary<'a> {
    let total_time_spent: i64 = tasks.iter().map(|t| t.time_spent.max(0)).sum();
    let completed_tasks = tasks.iter().filter(|t| t.completed).count();

    let upcoming = arrange(tasks, TaskFilter::Active, TaskSort::DueDate)
        .into_iter()
        .filter(|t| t.due_date.is_some_and(|due| due >= now))
        .take(UPCOMING_LIMIT)
        .collect();

    let mut recent_notes: Vec<&Note> = notes.iter().collect();
    recent_notes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    recent_notes.truncate(RECENT_NOTES_LIMIT);

    Summary {
        total_time_spent,
        total_time_spent_label: format_duration(total_time_spent),
        completed_tasks,
        pending_tasks: tasks.len() - completed_tasks,
        upcoming,
        recent_notes,
    }
}
