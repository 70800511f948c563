pub mod routes;

use serde::Deserialize;

use crate::planner::{TaskFilter, TaskSort};

// QUERY PARAMS

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub filter: TaskFilter,
    #[serde(default)]
    pub sort: TaskSort,
}

#[derive(Debug, Default, Deserialize)]
pub struct BucketsQuery {
    /// Minutes east of UTC
    #[serde(default)]
    pub tz_offset: i32,
}
