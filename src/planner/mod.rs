//! Pure planning logic: bucketing, ordering, calendar and dashboard views, the
//! time tracker and the duration label. Nothing in here touches storage or the
//! wall clock; callers pass `now` in.

pub mod arrange;
pub mod buckets;
pub mod calendar;
pub mod dashboard;
pub mod duration;
pub mod tracking;

pub use arrange::{arrange, TaskFilter, TaskSort};
pub use buckets::{bucket_tasks, classify, Bucket, Buckets};
pub use calendar::{month_overview, tasks_on, CalendarDay};
pub use dashboard::{summarize, Summary};
pub use duration::format_duration;
pub use tracking::{Commit, TimeTracker, TrackingSession};
