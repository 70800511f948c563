use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use chrono::FixedOffset;

mod auth;
mod extract;
mod health;
mod middleware_auth;
mod notes;
mod planner;
mod tasks;

pub use auth::{login, register};
pub use health::health;
pub use middleware_auth::JwtUser;

use crate::domain::ValidationError;
use crate::error::ApiError;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router {
    let task_router = Router::new()
        .route("/", post(tasks::routes::create).get(tasks::routes::list))
        .route("/buckets", get(tasks::routes::buckets))
        .route(
            "/{id}",
            get(tasks::routes::get)
                .put(tasks::routes::update)
                .patch(tasks::routes::update)
                .delete(tasks::routes::delete),
        )
        .route("/{id}/toggle", post(tasks::routes::toggle))
        .route("/{id}/tracking/start", post(tasks::routes::start_tracking))
        .route("/{id}/tracking/stop", post(tasks::routes::stop_tracking));

    let note_router = Router::new()
        .route("/", post(notes::routes::create).get(notes::routes::list))
        .route(
            "/{id}",
            get(notes::routes::get)
                .put(notes::routes::update)
                .patch(notes::routes::update)
                .delete(notes::routes::delete),
        );

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .nest(
            "/api",
            Router::new()
                .route("/me", get(auth::me).put(auth::update_me))
                .route("/tracking", get(planner::tracking))
                .route("/calendar", get(planner::calendar_day))
                .route("/calendar/month", get(planner::calendar_month))
                .route("/dashboard", get(planner::dashboard))
                .nest("/tasks", task_router)
                .nest("/notes", note_router)
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    middleware_auth::require_auth,
                )),
        )
        .with_state(state)
}

async fn root() -> &'static str {
    "Welcome to the daybook API"
}

/// Minutes east of UTC, as sent by the client
fn fixed_offset(minutes: i32) -> Result<FixedOffset, ApiError> {
    minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| ValidationError::OutOfRange { field: "tz_offset" }.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::state::AuthKeys;
    use crate::store::LocalStore;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app() -> Router {
        let clock = Arc::new(FixedClock::new("2024-03-06T10:00:00Z".parse().unwrap()));
        let state = AppState::new(
            Arc::new(LocalStore::new()),
            clock,
            AuthKeys::new("test-secret", 1),
        );
        routes(state)
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn signed_in(app: &Router) -> String {
        let (status, _) = send(
            app,
            "POST",
            "/auth/register",
            None,
            Some(json!({"name": "Demo", "email": "demo@example.com", "password": "password123"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = send(
            app,
            "POST",
            "/auth/login",
            None,
            Some(json!({"email": "Demo@Example.com", "password": "password123"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body["token"].as_str().unwrap().to_string()
    }

    #[test]
    fn test_fixed_offset_bounds() {
        assert_eq!(fixed_offset(330).unwrap().local_minus_utc(), 330 * 60);
        assert!(fixed_offset(-24 * 60).is_err());
        assert!(fixed_offset(i32::MAX).is_err());
    }

    #[tokio::test]
    async fn test_health_and_unauthenticated_api() {
        let app = app();

        let (status, body) = send(&app, "GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": 200}));

        let (status, _) = send(&app, "GET", "/api/tasks", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(&app, "GET", "/api/tasks", Some("garbage"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_register_validation_and_duplicates() {
        let app = app();

        let (status, body) = send(
            &app,
            "POST",
            "/auth/register",
            None,
            Some(json!({"name": "Demo", "email": "demo@example.com", "password": "short"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        signed_in(&app).await;
        let (status, _) = send(
            &app,
            "POST",
            "/auth/register",
            None,
            Some(json!({"name": "Again", "email": "DEMO@example.com", "password": "password123"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = send(
            &app,
            "POST",
            "/auth/login",
            None,
            Some(json!({"email": "demo@example.com", "password": "wrong-password"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_task_roundtrip() {
        let app = app();
        let token = signed_in(&app).await;
        let token = Some(token.as_str());

        let (status, created) = send(
            &app,
            "POST",
            "/api/tasks",
            token,
            Some(json!({"title": "Write report", "priority": "high", "due_date": "2024-03-06"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["time_spent_label"], "0h 0m");
        let id = created["id"].as_str().unwrap().to_string();

        send(&app, "POST", "/api/tasks", token, Some(json!({"title": "Call mom"}))).await;

        let (status, listed) = send(&app, "GET", "/api/tasks?sort=title", token, None).await;
        assert_eq!(status, StatusCode::OK);
        let titles: Vec<&str> = listed
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["title"].as_str().unwrap())
            .collect();
        assert_eq!(titles, vec!["Call mom", "Write report"]);

        let (status, toggled) =
            send(&app, "POST", &format!("/api/tasks/{id}/toggle"), token, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(toggled["completed"], true);

        let (_, active) = send(&app, "GET", "/api/tasks?filter=active", token, None).await;
        assert_eq!(active.as_array().unwrap().len(), 1);

        let (status, _) = send(
            &app,
            "PATCH",
            &format!("/api/tasks/{id}"),
            token,
            Some(json!({"title": ""})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, "DELETE", &format!("/api/tasks/{id}"), token, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, "GET", &format!("/api/tasks/{id}"), token, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_undecodable_input_is_a_json_bad_request() {
        let app = app();
        let token = signed_in(&app).await;
        let token = Some(token.as_str());

        let (status, body) = send(&app, "GET", "/api/tasks?sort=soon", token, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("sort"));

        let (status, body) = send(&app, "GET", "/api/tasks?filter=someday", token, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let (status, body) = send(
            &app,
            "POST",
            "/api/tasks",
            token,
            Some(json!({"title": "Dentist", "due_date": "next tuesday"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let (status, body) = send(&app, "GET", "/api/tasks/not-a-uuid", token, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let (status, body) = send(&app, "GET", "/api/calendar?date=tomorrow", token, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let (_, listed) = send(&app, "GET", "/api/tasks", token, None).await;
        assert!(listed.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tracking_and_planner_views() {
        let app = app();
        let token = signed_in(&app).await;
        let token = Some(token.as_str());

        let (_, created) = send(
            &app,
            "POST",
            "/api/tasks",
            token,
            Some(json!({"title": "Focus", "due_date": "2024-03-07T09:00:00Z"})),
        )
        .await;
        let id = created["id"].as_str().unwrap().to_string();

        let (status, started) = send(
            &app,
            "POST",
            &format!("/api/tasks/{id}/tracking/start"),
            token,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(started["tracking"]["task_id"], id.as_str());
        assert_eq!(started["committed"], Value::Null);

        let (_, current) = send(&app, "GET", "/api/tracking", token, None).await;
        assert_eq!(current["task_id"], id.as_str());

        let (_, buckets) = send(&app, "GET", "/api/tasks/buckets", token, None).await;
        assert_eq!(buckets["tomorrow"][0]["is_tracking"], true);

        let (status, _) = send(&app, "GET", "/api/tasks/buckets?tz_offset=5000", token, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, day) = send(&app, "GET", "/api/calendar?date=2024-03-07", token, None).await;
        assert_eq!(day.as_array().unwrap().len(), 1);

        let (_, month) = send(
            &app,
            "GET",
            "/api/calendar/month?year=2024&month=2",
            token,
            None,
        )
        .await;
        assert_eq!(month.as_array().unwrap().len(), 29);

        let (status, _) = send(
            &app,
            "GET",
            "/api/calendar/month?year=2024&month=13",
            token,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, stopped) = send(
            &app,
            "POST",
            &format!("/api/tasks/{id}/tracking/stop"),
            token,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stopped["is_tracking"], false);

        let (status, again) = send(
            &app,
            "POST",
            &format!("/api/tasks/{id}/tracking/stop"),
            token,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(again, Value::Null);

        let (_, dashboard) = send(&app, "GET", "/api/dashboard", token, None).await;
        assert_eq!(dashboard["pending_tasks"], 1);
        assert_eq!(dashboard["tracking"], Value::Null);
    }

    #[tokio::test]
    async fn test_notes_and_profile() {
        let app = app();
        let token = signed_in(&app).await;
        let token = Some(token.as_str());

        let (status, _) = send(
            &app,
            "POST",
            "/api/notes",
            token,
            Some(json!({"title": "Groceries", "content": "milk, eggs"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, found) = send(&app, "GET", "/api/notes?q=EGGS", token, None).await;
        assert_eq!(found.as_array().unwrap().len(), 1);
        let (_, missing) = send(&app, "GET", "/api/notes?q=bread", token, None).await;
        assert!(missing.as_array().unwrap().is_empty());

        let (status, me) = send(&app, "GET", "/api/me", token, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["email"], "demo@example.com");

        let (status, me) = send(&app, "PUT", "/api/me", token, Some(json!({"name": "Renamed"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["name"], "Renamed");
    }
}
