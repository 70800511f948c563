use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::{Session, TrackerRegistry, WorkspaceResult};
use crate::clock::Clock;
use crate::domain::{CreateTask, Task, UpdateTask, ValidationError};
use crate::planner::{self, CalendarDay, Commit, TaskFilter, TaskSort, TrackingSession};
use crate::store::{StoreResult, TaskRepository};

#[derive(Debug, Clone, Serialize)]
pub struct TaskView {
    #[serde(flatten)]
    pub task: Task,
    pub time_spent_label: String,
    pub is_tracking: bool,
}

impl TaskView {
    pub fn new(task: Task, tracked: Option<Uuid>) -> Self {
        Self {
            time_spent_label: planner::format_duration(task.time_spent),
            is_tracking: tracked == Some(task.id),
            task,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackingView {
    pub task_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub elapsed_minutes: i64,
    pub elapsed_label: String,
}

impl TrackingView {
    fn new(session: &TrackingSession, now: DateTime<Utc>) -> Self {
        let elapsed_minutes = session.elapsed_minutes(now);
        Self {
            task_id: session.task_id,
            started_at: session.started_at,
            elapsed_minutes,
            elapsed_label: planner::format_duration(elapsed_minutes),
        }
    }
}

/// Result of starting a timer: the new session plus the task whose running
/// session was closed to make room for it, if any.
#[derive(Debug, Serialize)]
pub struct StartedTracking {
    pub tracking: TrackingView,
    pub committed: Option<TaskView>,
}

#[derive(Debug, Default, Serialize)]
pub struct TaskBuckets {
    pub today: Vec<TaskView>,
    pub tomorrow: Vec<TaskView>,
    pub this_week: Vec<TaskView>,
    pub later: Vec<TaskView>,
}

pub struct TaskWorkspace {
    repo: Arc<dyn TaskRepository>,
    trackers: TrackerRegistry,
    clock: Arc<dyn Clock>,
}

impl TaskWorkspace {
    pub fn new(repo: Arc<dyn TaskRepository>, clock: Arc<dyn Clock>) -> Self {
        Self {
            repo,
            trackers: TrackerRegistry::default(),
            clock,
        }
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub(crate) fn trackers(&self) -> &TrackerRegistry {
        &self.trackers
    }

    pub(crate) async fn load(&self, user_id: Uuid) -> StoreResult<Vec<Task>> {
        self.repo.list_tasks(user_id).await
    }

    fn view(&self, user_id: Uuid, task: Task) -> TaskView {
        TaskView::new(task, self.trackers.tracked_task(user_id))
    }

    fn views<'a>(&self, user_id: Uuid, tasks: impl IntoIterator<Item = &'a Task>) -> Vec<TaskView> {
        let tracked = self.trackers.tracked_task(user_id);
        tasks
            .into_iter()
            .map(|t| TaskView::new(t.clone(), tracked))
            .collect()
    }

    pub async fn list(
        &self,
        session: &Session,
        filter: TaskFilter,
        sort: TaskSort,
    ) -> WorkspaceResult<Vec<TaskView>> {
        let Some(user_id) = session.user_id() else {
            return Ok(Vec::new());
        };

        let tasks = self.load(user_id).await?;
        Ok(self.views(user_id, planner::arrange(&tasks, filter, sort)))
    }

    pub async fn get(&self, session: &Session, id: Uuid) -> WorkspaceResult<Option<TaskView>> {
        let Some(user_id) = session.user_id() else {
            return Ok(None);
        };

        let task = self.repo.get_task(user_id, id).await?;
        Ok(task.map(|t| self.view(user_id, t)))
    }

    pub async fn create(
        &self,
        session: &Session,
        input: CreateTask,
    ) -> WorkspaceResult<Option<TaskView>> {
        let Some(user_id) = session.user_id() else {
            return Ok(None);
        };
        input.validate()?;

        let task = Task::new(user_id, input, self.now());
        let task = self.repo.insert_task(&task).await?;
        tracing::debug!(task_id = %task.id, %user_id, "task created");

        Ok(Some(self.view(user_id, task)))
    }

    pub async fn update(
        &self,
        session: &Session,
        id: Uuid,
        patch: UpdateTask,
    ) -> WorkspaceResult<Option<TaskView>> {
        let Some(user_id) = session.user_id() else {
            return Ok(None);
        };
        patch.validate()?;

        let task = self.repo.update_task(user_id, id, &patch).await?;
        Ok(task.map(|t| self.view(user_id, t)))
    }

    pub async fn toggle_completion(
        &self,
        session: &Session,
        id: Uuid,
    ) -> WorkspaceResult<Option<TaskView>> {
        let Some(user_id) = session.user_id() else {
            return Ok(None);
        };

        let task = self.repo.toggle_task(user_id, id).await?;
        Ok(task.map(|t| self.view(user_id, t)))
    }

    /// Deleting the task that is being tracked drops its session uncommitted
    pub async fn delete(&self, session: &Session, id: Uuid) -> WorkspaceResult<bool> {
        let Some(user_id) = session.user_id() else {
            return Ok(false);
        };

        let deleted = self.repo.delete_task(user_id, id).await?;
        if deleted && self.trackers.with(user_id, |t| t.cancel(id)) {
            tracing::info!(task_id = %id, %user_id, "tracked task deleted, session dropped");
        }
        Ok(deleted)
    }

    async fn commit(&self, user_id: Uuid, commit: Commit) -> WorkspaceResult<Option<Task>> {
        match self
            .repo
            .add_time_spent(user_id, commit.task_id, commit.minutes)
            .await
        {
            Ok(task) => {
                tracing::info!(
                    task_id = %commit.task_id,
                    minutes = commit.minutes,
                    "tracked time committed"
                );
                Ok(task)
            }
            Err(e) => {
                tracing::error!(
                    task_id = %commit.task_id,
                    minutes = commit.minutes,
                    error = %e,
                    "failed to persist tracked time"
                );
                Err(e.into())
            }
        }
    }

    /// Start the timer on `id`. A session already running for this user is
    /// stopped and committed first. `None` when the task does not exist.
    pub async fn start_tracking(
        &self,
        session: &Session,
        id: Uuid,
    ) -> WorkspaceResult<Option<StartedTracking>> {
        let Some(user_id) = session.user_id() else {
            return Ok(None);
        };
        if self.repo.get_task(user_id, id).await?.is_none() {
            return Ok(None);
        }

        let now = self.now();
        let previous = self.trackers.with(user_id, |t| t.start(id, now));

        let committed = match previous {
            Some(commit) => self
                .commit(user_id, commit)
                .await?
                .map(|task| TaskView::new(task, Some(id))),
            None => None,
        };

        let started = TrackingSession {
            task_id: id,
            started_at: now,
        };
        Ok(Some(StartedTracking {
            tracking: TrackingView::new(&started, now),
            committed,
        }))
    }

    /// Stop the timer on `id`. `None` when `id` was not being tracked.
    pub async fn stop_tracking(
        &self,
        session: &Session,
        id: Uuid,
    ) -> WorkspaceResult<Option<TaskView>> {
        let Some(user_id) = session.user_id() else {
            return Ok(None);
        };

        let now = self.now();
        let Some(commit) = self.trackers.with(user_id, |t| t.stop(id, now)) else {
            return Ok(None);
        };

        let task = self.commit(user_id, commit).await?;
        Ok(task.map(|t| TaskView::new(t, None)))
    }

    pub(crate) fn current_tracking_at(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Option<TrackingView> {
        self.trackers
            .peek(user_id, |t| {
                t.current().map(|session| TrackingView::new(session, now))
            })
            .flatten()
    }

    pub fn current_tracking(&self, session: &Session) -> Option<TrackingView> {
        let user_id = session.user_id()?;
        self.current_tracking_at(user_id, self.now())
    }

    /// Today / tomorrow / this week / later, each ordered by due date
    pub async fn buckets(&self, session: &Session, tz: FixedOffset) -> WorkspaceResult<TaskBuckets> {
        let Some(user_id) = session.user_id() else {
            return Ok(TaskBuckets::default());
        };

        let tasks = self.load(user_id).await?;
        let ordered: Vec<Task> = planner::arrange(&tasks, TaskFilter::All, TaskSort::DueDate)
            .into_iter()
            .cloned()
            .collect();
        let now = self.now().with_timezone(&tz);
        let buckets = planner::bucket_tasks(&ordered, &now);

        Ok(TaskBuckets {
            today: self.views(user_id, buckets.today),
            tomorrow: self.views(user_id, buckets.tomorrow),
            this_week: self.views(user_id, buckets.this_week),
            later: self.views(user_id, buckets.later),
        })
    }

    pub async fn calendar_day(
        &self,
        session: &Session,
        date: NaiveDate,
        tz: FixedOffset,
    ) -> WorkspaceResult<Vec<TaskView>> {
        let Some(user_id) = session.user_id() else {
            return Ok(Vec::new());
        };

        let tasks = self.load(user_id).await?;
        Ok(self.views(user_id, planner::tasks_on(&tasks, date, &tz)))
    }

    pub async fn calendar_month(
        &self,
        session: &Session,
        year: i32,
        month: u32,
        tz: FixedOffset,
    ) -> WorkspaceResult<Vec<CalendarDay>> {
        let tasks = match session.user_id() {
            Some(user_id) => self.load(user_id).await?,
            None => Vec::new(),
        };

        planner::month_overview(&tasks, year, month, &tz)
            .ok_or_else(|| ValidationError::OutOfRange { field: "month" }.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::domain::Priority;
    use crate::store::LocalStore;
    use crate::workspace::WorkspaceError;
    use chrono::Duration;

    struct Fixture {
        clock: Arc<FixedClock>,
        store: Arc<LocalStore>,
        ws: TaskWorkspace,
        session: Session,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(FixedClock::new("2024-01-10T09:00:00Z".parse().unwrap()));
        let store = Arc::new(LocalStore::new());
        let ws = TaskWorkspace::new(store.clone(), clock.clone());
        Fixture {
            clock,
            store,
            ws,
            session: Session::authenticated(Uuid::new_v4()),
        }
    }

    fn input(title: &str) -> CreateTask {
        CreateTask {
            title: title.to_string(),
            description: None,
            location: None,
            due_date: None,
            priority: Priority::Medium,
            completed: false,
        }
    }

    fn titles(views: &[TaskView]) -> Vec<String> {
        views.iter().map(|v| v.task.title.clone()).collect()
    }

    async fn create(f: &Fixture, title: &str) -> Task {
        f.ws.create(&f.session, input(title))
            .await
            .unwrap()
            .unwrap()
            .task
    }

    #[tokio::test]
    async fn test_anonymous_session_is_a_noop() {
        let f = fixture();
        let anon = Session::anonymous();

        assert!(f.ws.create(&anon, input("ghost")).await.unwrap().is_none());
        assert!(f.ws.list(&anon, TaskFilter::All, TaskSort::DueDate).await.unwrap().is_empty());
        assert!(!f.ws.delete(&anon, Uuid::new_v4()).await.unwrap());
        assert!(f.ws.start_tracking(&anon, Uuid::new_v4()).await.unwrap().is_none());
        assert!(f.ws.current_tracking(&anon).is_none());
    }

    #[tokio::test]
    async fn test_invalid_title_is_rejected_before_storage() {
        let f = fixture();

        let empty = f.ws.create(&f.session, input("")).await;
        assert!(matches!(empty, Err(WorkspaceError::Validation(_))));

        let long = f.ws.create(&f.session, input(&"x".repeat(101))).await;
        assert!(matches!(long, Err(WorkspaceError::Validation(_))));

        let user_id = f.session.user_id().unwrap();
        assert!(f.store.list_tasks(user_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tracking_commits_rounded_minutes() {
        let f = fixture();
        let task = create(&f, "Write report").await;

        f.ws.start_tracking(&f.session, task.id).await.unwrap().unwrap();
        f.clock.advance(Duration::seconds(90));
        let stopped = f.ws.stop_tracking(&f.session, task.id).await.unwrap().unwrap();

        assert_eq!(stopped.task.time_spent, 2);
        assert_eq!(stopped.time_spent_label, "0h 2m");
        assert!(!stopped.is_tracking);
        assert!(f.ws.current_tracking(&f.session).is_none());
    }

    #[tokio::test]
    async fn test_switching_tasks_commits_previous_first() {
        let f = fixture();
        let a = create(&f, "A").await;
        let b = create(&f, "B").await;

        f.ws.start_tracking(&f.session, a.id).await.unwrap();
        f.clock.advance(Duration::minutes(10));
        let started = f.ws.start_tracking(&f.session, b.id).await.unwrap().unwrap();

        let committed = started.committed.expect("A was running");
        assert_eq!(committed.task.id, a.id);
        assert_eq!(committed.task.time_spent, 10);
        assert_eq!(started.tracking.task_id, b.id);

        let current = f.ws.current_tracking(&f.session).unwrap();
        assert_eq!(current.task_id, b.id);

        let listed = f.ws.list(&f.session, TaskFilter::All, TaskSort::Title).await.unwrap();
        let tracking: Vec<bool> = listed.iter().map(|v| v.is_tracking).collect();
        assert_eq!(tracking, vec![false, true]);
    }

    #[tokio::test]
    async fn test_listing_leaves_tracker_registry_empty() {
        let f = fixture();
        create(&f, "A").await;

        f.ws.list(&f.session, TaskFilter::All, TaskSort::DueDate).await.unwrap();
        assert!(f.ws.current_tracking(&f.session).is_none());

        let user_id = f.session.user_id().unwrap();
        assert!(f.ws.trackers().peek(user_id, |_| ()).is_none());
    }

    #[tokio::test]
    async fn test_stop_on_untracked_task_is_noop() {
        let f = fixture();
        let a = create(&f, "A").await;
        let b = create(&f, "B").await;

        assert!(f.ws.stop_tracking(&f.session, a.id).await.unwrap().is_none());

        f.ws.start_tracking(&f.session, a.id).await.unwrap();
        assert!(f.ws.stop_tracking(&f.session, b.id).await.unwrap().is_none());
        assert_eq!(f.ws.current_tracking(&f.session).map(|t| t.task_id), Some(a.id));
    }

    #[tokio::test]
    async fn test_tracking_unknown_task_does_not_start() {
        let f = fixture();
        assert!(f
            .ws
            .start_tracking(&f.session, Uuid::new_v4())
            .await
            .unwrap()
            .is_none());
        assert!(f.ws.current_tracking(&f.session).is_none());
    }

    #[tokio::test]
    async fn test_deleting_tracked_task_clears_tracker() {
        let f = fixture();
        let task = create(&f, "A").await;

        f.ws.start_tracking(&f.session, task.id).await.unwrap();
        assert!(f.ws.delete(&f.session, task.id).await.unwrap());
        assert!(f.ws.current_tracking(&f.session).is_none());
    }

    #[tokio::test]
    async fn test_completed_task_can_be_tracked() {
        let f = fixture();
        let task = create(&f, "A").await;
        let toggled = f.ws.toggle_completion(&f.session, task.id).await.unwrap().unwrap();
        assert!(toggled.task.completed);

        assert!(f.ws.start_tracking(&f.session, task.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_buckets_order_by_due_date() {
        let f = fixture();
        let now = f.clock.now();
        for (title, offset) in [("later today", 5), ("sooner today", 1), ("tomorrow", 25)] {
            let mut payload = input(title);
            payload.due_date = Some(now + Duration::hours(offset));
            f.ws.create(&f.session, payload).await.unwrap();
        }
        f.ws.create(&f.session, input("someday")).await.unwrap();

        let buckets = f
            .ws
            .buckets(&f.session, FixedOffset::east_opt(0).unwrap())
            .await
            .unwrap();

        assert_eq!(titles(&buckets.today), vec!["sooner today", "later today"]);
        assert_eq!(titles(&buckets.tomorrow), vec!["tomorrow"]);
        assert_eq!(
            titles(&buckets.this_week),
            vec!["sooner today", "later today", "tomorrow"]
        );
        assert_eq!(titles(&buckets.later), vec!["someday"]);
    }

    #[tokio::test]
    async fn test_calendar_month_rejects_bad_month() {
        let f = fixture();
        let result = f
            .ws
            .calendar_month(&f.session, 2024, 0, FixedOffset::east_opt(0).unwrap())
            .await;
        assert!(matches!(result, Err(WorkspaceError::Validation(_))));

        let days = f
            .ws
            .calendar_month(&f.session, 2024, 1, FixedOffset::east_opt(0).unwrap())
            .await
            .unwrap();
        assert_eq!(days.len(), 31);
    }
}
