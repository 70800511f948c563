use axum::{
    extract::State,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;

use super::extract::AppQuery;
use super::fixed_offset;
use super::middleware_auth::JwtUser;
use crate::error::ApiError;
use crate::planner::CalendarDay;
use crate::state::AppState;
use crate::workspace::{DashboardView, TaskView, TrackingView};

#[derive(Debug, Deserialize)]
pub struct DayQuery {
    pub date: NaiveDate,
    #[serde(default)]
    pub tz_offset: i32,
}

#[derive(Debug, Deserialize)]
pub struct MonthQuery {
    pub year: i32,
    pub month: u32,
    #[serde(default)]
    pub tz_offset: i32,
}

pub async fn tracking(
    State(state): State<AppState>,
    JwtUser(session): JwtUser,
) -> Json<Option<TrackingView>> {
    Json(state.workspace.tasks.current_tracking(&session))
}

pub async fn calendar_day(
    State(state): State<AppState>,
    JwtUser(session): JwtUser,
    AppQuery(query): AppQuery<DayQuery>,
) -> Result<Json<Vec<TaskView>>, ApiError> {
    let tz = fixed_offset(query.tz_offset)?;
    let tasks = state
        .workspace
        .tasks
        .calendar_day(&session, query.date, tz)
        .await?;
    Ok(Json(tasks))
}

pub async fn calendar_month(
    State(state): State<AppState>,
    JwtUser(session): JwtUser,
    AppQuery(query): AppQuery<MonthQuery>,
) -> Result<Json<Vec<CalendarDay>>, ApiError> {
    let tz = fixed_offset(query.tz_offset)?;
    let days = state
        .workspace
        .tasks
        .calendar_month(&session, query.year, query.month, tz)
        .await?;
    Ok(Json(days))
}

pub async fn dashboard(
    State(state): State<AppState>,
    JwtUser(session): JwtUser,
) -> Result<Json<DashboardView>, ApiError> {
    state
        .workspace
        .dashboard(&session)
        .await?
        .map(Json)
        .ok_or(ApiError::Unauthorized("missing user"))
}
