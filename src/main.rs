use std::sync::Arc;

use sqlx::PgPool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use daybook::clock::SystemClock;
use daybook::config::{Config, StoreBackend};
use daybook::routes;
use daybook::state::{AppState, AuthKeys};
use daybook::store::{LocalStore, PgStore};
use daybook::telemetry;

#[tokio::main]
async fn main() -> Result<(), String> {
    let config = Config::from_env().map_err(|e| format!("config error: {e}"))?;
    telemetry::init_tracing(config.log_format);

    let clock = Arc::new(SystemClock);
    let auth = AuthKeys::new(&config.jwt_secret, config.token_ttl_hours);

    let state = match config.store {
        StoreBackend::Postgres => {
            let url = config.database_url.as_deref().unwrap_or_default();
            let db = PgPool::connect(url)
                .await
                .map_err(|e| format!("error connecting DB: {e}"))?;
            let store = PgStore::new(db);
            store
                .migrate()
                .await
                .map_err(|e| format!("migration failed: {e}"))?;
            AppState::new(Arc::new(store), clock, auth)
        }
        StoreBackend::Local => {
            tracing::warn!("using the in-memory store, data is lost on restart");
            AppState::new(Arc::new(LocalStore::new()), clock, auth)
        }
    };

    let app = routes::routes(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(config.addr())
        .await
        .map_err(|e| format!("bind {} failed: {e}", config.addr()))?;

    tracing::info!(addr = %config.addr(), store = ?config.store, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| format!("server error: {e}"))?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
    }
}
