use argon2::password_hash::{PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::extract::AppJson;
use super::JwtUser;
use crate::domain::user::normalize_email;
use crate::domain::{RegistrationRequest, UpdateProfile, User, UserRecord};
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
}

fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))
}

fn verify_password(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::error!(error = %e, "stored password hash is unreadable");
            false
        }
    }
}

pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegistrationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()?;

    let record = UserRecord {
        id: Uuid::new_v4(),
        name: payload.name.trim().to_string(),
        email: normalize_email(&payload.email),
        password_hash: hash_password(&payload.password)?,
    };
    state.users.insert_user(&record).await?;

    tracing::info!(user_id = %record.id, "user registered");
    Ok((StatusCode::CREATED, Json(record.profile())))
}

pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = state
        .users
        .find_user_by_email(&payload.email)
        .await?
        .filter(|user| verify_password(&payload.password, &user.password_hash))
        .ok_or(ApiError::Unauthorized("invalid credentials"))?;

    let token = state
        .auth
        .issue(user.id)
        .map_err(|e| ApiError::Internal(format!("jwt encode error: {e}")))?;

    Ok(Json(LoginResponse { token }))
}

pub async fn me(
    State(state): State<AppState>,
    JwtUser(session): JwtUser,
) -> Result<Json<User>, ApiError> {
    let user_id = session.user_id().ok_or(ApiError::Unauthorized("missing user"))?;
    state
        .users
        .find_user(user_id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("user"))
}

pub async fn update_me(
    State(state): State<AppState>,
    JwtUser(session): JwtUser,
    AppJson(payload): AppJson<UpdateProfile>,
) -> Result<Json<User>, ApiError> {
    let user_id = session.user_id().ok_or(ApiError::Unauthorized("missing user"))?;
    payload.validate()?;

    state
        .users
        .update_user(user_id, &payload)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("user"))
}
