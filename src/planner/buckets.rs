//! Date bucketing of tasks relative to "now".
//!
//! Calendar days are evaluated in the time zone of the supplied `now`, and weeks
//! start on Sunday: the current week is `[Sunday 00:00, next Sunday 00:00)`.
//! Membership overlaps: `today` and `tomorrow` tasks are also listed under
//! `this_week`, even when tomorrow already belongs to the next week.

use chrono::{DateTime, Datelike, Days, NaiveDate, TimeZone, Utc};
use serde::Serialize;

use crate::domain::Task;

/// Primary bucket of a single due date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    Today,
    Tomorrow,
    ThisWeek,
    Later,
}

impl Bucket {
    /// Whether tasks in this bucket are also listed under `this_week`
    pub fn in_this_week(self) -> bool {
        matches!(self, Self::Today | Self::Tomorrow | Self::ThisWeek)
    }
}

#[derive(Debug, Default, Serialize)]
pub struct Buckets<'a> {
    pub today: Vec<&'a Task>,
    pub tomorrow: Vec<&'a Task>,
    pub this_week: Vec<&'a Task>,
    pub later: Vec<&'a Task>,
}

/// Sunday on or before `day`
pub fn week_start(day: NaiveDate) -> NaiveDate {
    let offset = u64::from(day.weekday().num_days_from_sunday());
    day.checked_sub_days(Days::new(offset)).unwrap_or(day)
}

pub fn classify<Tz: TimeZone>(due: Option<DateTime<Utc>>, now: &DateTime<Tz>) -> Bucket {
    let Some(due) = due else {
        return Bucket::Later;
    };

    let today = now.date_naive();
    let due_day = due.with_timezone(&now.timezone()).date_naive();

    if due_day == today {
        Bucket::Today
    } else if today.succ_opt() == Some(due_day) {
        Bucket::Tomorrow
    } else if week_start(due_day) == week_start(today) {
        Bucket::ThisWeek
    } else {
        Bucket::Later
    }
}

/// Group tasks into buckets, keeping the input order inside each bucket
pub fn bucket_tasks<'a, Tz: TimeZone>(tasks: &'a [Task], now: &DateTime<Tz>) -> Buckets<'a> {
    let mut buckets = Buckets::default();

    for task in tasks {
        let bucket = classify(task.due_date, now);
        match bucket {
            Bucket::Today => buckets.today.push(task),
            Bucket::Tomorrow => buckets.tomorrow.push(task),
            Bucket::Later => buckets.later.push(task),
            Bucket::ThisWeek => {}
        }
        if bucket.in_this_week() {
            buckets.this_week.push(task);
        }
    }

    buckets
}
