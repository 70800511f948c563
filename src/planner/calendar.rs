use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use serde::Serialize;

use crate::domain::Task;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub task_count: usize,
    pub completed_count: usize,
}

fn due_day<Tz: TimeZone>(due: DateTime<Utc>, tz: &Tz) -> NaiveDate {
    due.with_timezone(tz).date_naive()
}

/// Tasks due on `date` as seen from `tz`, in input order
pub fn tasks_on<'a, Tz: TimeZone>(tasks: &'a [Task], date: NaiveDate, tz: &Tz) -> Vec<&'a Task> {
    tasks
        .iter()
        .filter(|task| task.due_date.is_some_and(|due| due_day(due, tz) == date))
        .collect()
}

/// One entry per day of the month. `None` for an invalid year/month.
pub fn month_overview<Tz: TimeZone>(
    tasks: &[Task],
    year: i32,
    month: u32,
    tz: &Tz,
) -> Option<Vec<CalendarDay>> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;

    let mut days: Vec<CalendarDay> = first
        .iter_days()
        .take_while(|d| d.month0() == first.month0())
        .map(|date| CalendarDay {
            date,
            task_count: 0,
            completed_count: 0,
        })
        .collect();

    for task in tasks {
        let Some(due) = task.due_date else { continue };
        let day = due_day(due, tz);
        if day < first {
            continue;
        }
        let index = (day - first).num_days() as usize;
        if let Some(entry) = days.get_mut(index) {
            entry.task_count += 1;
            if task.completed {
                entry.completed_count += 1;
            }
        }
    }

    Some(days)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CreateTask, Priority};
    use chrono::FixedOffset;
    use uuid::Uuid;

    fn task(title: &str, due: Option<&str>, completed: bool) -> Task {
        Task::new(
            Uuid::nil(),
            CreateTask {
                title: title.to_string(),
                description: None,
                location: None,
                due_date: due.map(|d| d.parse::<DateTime<Utc>>().unwrap()),
                priority: Priority::Low,
                completed,
            },
            Utc::now(),
        )
    }

    #[test]
    fn test_tasks_on_date() {
        let tasks = vec![
            task("a", Some("2024-02-10T08:00:00Z"), false),
            task("none", None, false),
            task("b", Some("2024-02-11T08:00:00Z"), false),
            task("c", Some("2024-02-10T20:00:00Z"), true),
        ];
        let date = NaiveDate::from_ymd_opt(2024, 2, 10).unwrap();

        let found: Vec<&str> = tasks_on(&tasks, date, &Utc)
            .iter()
            .map(|t| t.title.as_str())
            .collect();
        assert_eq!(found, vec!["a", "c"]);

        // UTC+5: 20:00Z on the 10th is already the 11th
        let plus_five = FixedOffset::east_opt(5 * 3600).unwrap();
        let found: Vec<&str> = tasks_on(&tasks, date, &plus_five)
            .iter()
            .map(|t| t.title.as_str())
            .collect();
        assert_eq!(found, vec!["a"]);
    }

    #[test]
    fn test_month_overview_counts() {
        let tasks = vec![
            task("a", Some("2024-02-10T08:00:00Z"), false),
            task("b", Some("2024-02-10T09:00:00Z"), true),
            task("leap", Some("2024-02-29T09:00:00Z"), false),
            task("march", Some("2024-03-01T09:00:00Z"), false),
            task("january", Some("2024-01-31T09:00:00Z"), false),
        ];

        let days = month_overview(&tasks, 2024, 2, &Utc).unwrap();
        assert_eq!(days.len(), 29);
        assert_eq!(days[9].date, NaiveDate::from_ymd_opt(2024, 2, 10).unwrap());
        assert_eq!(days[9].task_count, 2);
        assert_eq!(days[9].completed_count, 1);
        assert_eq!(days[28].task_count, 1);
        assert_eq!(days.iter().map(|d| d.task_count).sum::<usize>(), 3);
    }

    #[test]
    fn test_month_overview_rejects_invalid_month() {
        assert!(month_overview(&[], 2024, 13, &Utc).is_none());
        assert_eq!(month_overview(&[], 2023, 12, &Utc).map(|d| d.len()), Some(31));
    }
}
