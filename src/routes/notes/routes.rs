use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use super::SearchQuery;
use crate::domain::{CreateNote, Note, UpdateNote};
use crate::error::ApiError;
use crate::routes::extract::{AppJson, AppPath, AppQuery};
use crate::routes::middleware_auth::JwtUser;
use crate::state::AppState;

pub async fn create(
    State(state): State<AppState>,
    JwtUser(session): JwtUser,
    AppJson(body): AppJson<CreateNote>,
) -> Result<impl IntoResponse, ApiError> {
    let note = state
        .workspace
        .notes
        .create(&session, body)
        .await?
        .ok_or(ApiError::Unauthorized("missing user"))?;

    Ok((StatusCode::CREATED, Json(note)))
}

pub async fn list(
    State(state): State<AppState>,
    JwtUser(session): JwtUser,
    AppQuery(query): AppQuery<SearchQuery>,
) -> Result<Json<Vec<Note>>, ApiError> {
    let notes = state
        .workspace
        .notes
        .list(&session, query.q.as_deref())
        .await?;
    Ok(Json(notes))
}

pub async fn get(
    State(state): State<AppState>,
    JwtUser(session): JwtUser,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<Note>, ApiError> {
    state
        .workspace
        .notes
        .get(&session, id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("note"))
}

pub async fn update(
    State(state): State<AppState>,
    JwtUser(session): JwtUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(body): AppJson<UpdateNote>,
) -> Result<Json<Note>, ApiError> {
    state
        .workspace
        .notes
        .update(&session, id, body)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("note"))
}

pub async fn delete(
    State(state): State<AppState>,
    JwtUser(session): JwtUser,
    AppPath(id): AppPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.workspace.notes.delete(&session, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("note"))
    }
}
