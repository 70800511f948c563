use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;
use crate::workspace::Session;

/// The signed-in caller, as placed in the request extensions by [`require_auth`]
pub struct JwtUser(pub Session);

impl<S> FromRequestParts<S> for JwtUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Uuid>()
            .copied()
            .map(|user_id| JwtUser(Session::authenticated(user_id)))
            .ok_or(ApiError::Unauthorized("missing user"))
    }
}

pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized("missing token"))?;

    let user_id = state
        .auth
        .verify(token)
        .ok_or(ApiError::Unauthorized("invalid token"))?;

    req.extensions_mut().insert(user_id);
    Ok(next.run(req).await)
}
