use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use super::{BucketsQuery, ListQuery};
use crate::domain::{CreateTask, UpdateTask};
use crate::error::ApiError;
use crate::routes::extract::{AppJson, AppPath, AppQuery};
use crate::routes::fixed_offset;
use crate::routes::middleware_auth::JwtUser;
use crate::state::AppState;
use crate::workspace::{StartedTracking, TaskBuckets, TaskView};

pub async fn create(
    State(state): State<AppState>,
    JwtUser(session): JwtUser,
    AppJson(body): AppJson<CreateTask>,
) -> Result<impl IntoResponse, ApiError> {
    let task = state
        .workspace
        .tasks
        .create(&session, body)
        .await?
        .ok_or(ApiError::Unauthorized("missing user"))?;

    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn list(
    State(state): State<AppState>,
    JwtUser(session): JwtUser,
    AppQuery(query): AppQuery<ListQuery>,
) -> Result<Json<Vec<TaskView>>, ApiError> {
    let tasks = state
        .workspace
        .tasks
        .list(&session, query.filter, query.sort)
        .await?;
    Ok(Json(tasks))
}

pub async fn get(
    State(state): State<AppState>,
    JwtUser(session): JwtUser,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<TaskView>, ApiError> {
    state
        .workspace
        .tasks
        .get(&session, id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("task"))
}

pub async fn update(
    State(state): State<AppState>,
    JwtUser(session): JwtUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(body): AppJson<UpdateTask>,
) -> Result<Json<TaskView>, ApiError> {
    state
        .workspace
        .tasks
        .update(&session, id, body)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("task"))
}

pub async fn toggle(
    State(state): State<AppState>,
    JwtUser(session): JwtUser,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<TaskView>, ApiError> {
    state
        .workspace
        .tasks
        .toggle_completion(&session, id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("task"))
}

pub async fn delete(
    State(state): State<AppState>,
    JwtUser(session): JwtUser,
    AppPath(id): AppPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.workspace.tasks.delete(&session, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("task"))
    }
}

pub async fn start_tracking(
    State(state): State<AppState>,
    JwtUser(session): JwtUser,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<StartedTracking>, ApiError> {
    state
        .workspace
        .tasks
        .start_tracking(&session, id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("task"))
}

/// `null` when the task was not the one being tracked
pub async fn stop_tracking(
    State(state): State<AppState>,
    JwtUser(session): JwtUser,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<Option<TaskView>>, ApiError> {
    let stopped = state.workspace.tasks.stop_tracking(&session, id).await?;
    Ok(Json(stopped))
}

pub async fn buckets(
    State(state): State<AppState>,
    JwtUser(session): JwtUser,
    AppQuery(query): AppQuery<BucketsQuery>,
) -> Result<Json<TaskBuckets>, ApiError> {
    let tz = fixed_offset(query.tz_offset)?;
    let buckets = state.workspace.tasks.buckets(&session, tz).await?;
    Ok(Json(buckets))
}
