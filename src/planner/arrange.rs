use std::cmp::Ordering;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::domain::Task;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskFilter {
    #[default]
    All,
    Active,
    Completed,
}

impl TaskFilter {
    pub fn accepts(self, task: &Task) -> bool {
        match self {
            Self::All => true,
            Self::Active => !task.completed,
            Self::Completed => task.completed,
        }
    }
}

impl FromStr for TaskFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            other => Err(format!("unknown filter `{other}`")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskSort {
    /// Ascending, undated tasks last
    #[default]
    DueDate,
    /// high, medium, low
    Priority,
    Title,
}

impl TaskSort {
    pub fn compare(self, a: &Task, b: &Task) -> Ordering {
        match self {
            Self::DueDate => match (a.due_date, b.due_date) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
            Self::Priority => a.priority.tier().cmp(&b.priority.tier()),
            Self::Title => compare_titles(&a.title, &b.title),
        }
    }
}

/// Base letters first, then accents, then case with lowercase ahead of
/// uppercase. `"apple" < "Banana" < "Échalote" < "zebra"`.
pub fn compare_titles(a: &str, b: &str) -> Ordering {
    fn base_letters(s: &str) -> String {
        s.nfd()
            .filter(|c| !is_combining_mark(*c))
            .flat_map(char::to_lowercase)
            .collect()
    }

    base_letters(a)
        .cmp(&base_letters(b))
        .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
        .then_with(|| b.cmp(a))
}

impl FromStr for TaskSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "due_date" => Ok(Self::DueDate),
            "priority" => Ok(Self::Priority),
            "title" => Ok(Self::Title),
            other => Err(format!("unknown sort `{other}`")),
        }
    }
}

/// Filter first, then stable-sort. The input slice is left untouched.
pub fn arrange(tasks: &[Task], filter: TaskFilter, sort: TaskSort) -> Vec<&Task> {
    let mut selected: Vec<&Task> = tasks.iter().filter(|t| filter.accepts(t)).collect();
    // sort_by is stable, ties keep their original relative order
    selected.sort_by(|a, b| sort.compare(a, b));
    selected
}
