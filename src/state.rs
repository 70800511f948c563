use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::MAX_TOKEN_TTL_HOURS;
use crate::store::{NoteRepository, TaskRepository, UserRepository};
use crate::workspace::Workspace;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: usize,
    iat: usize,
}

/// HS256 signing material plus the lifetime of issued tokens.
pub struct AuthKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl AuthKeys {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::hours(ttl_hours.clamp(-MAX_TOKEN_TTL_HOURS, MAX_TOKEN_TTL_HOURS)),
        }
    }

    /// Expiry is checked by `jsonwebtoken` against the system time, so tokens
    /// are stamped with it too rather than with the workspace clock.
    pub fn issue(&self, user_id: Uuid) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            exp: (now + self.ttl).timestamp() as usize,
            iat: now.timestamp() as usize,
        };
        encode(&Header::default(), &claims, &self.encoding)
    }

    /// `None` for a bad signature, an expired token or a non-uuid subject
    pub fn verify(&self, token: &str) -> Option<Uuid> {
        let data = match decode::<Claims>(token, &self.decoding, &Validation::default()) {
            Ok(data) => data,
            Err(e) => {
                tracing::debug!(error = %e, "jwt rejected");
                return None;
            }
        };
        Uuid::parse_str(&data.claims.sub).ok()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub workspace: Arc<Workspace>,
    pub users: Arc<dyn UserRepository>,
    pub auth: Arc<AuthKeys>,
}

impl AppState {
    /// Wire every port to the same backing store
    pub fn new<S>(store: Arc<S>, clock: Arc<dyn Clock>, auth: AuthKeys) -> Self
    where
        S: TaskRepository + NoteRepository + UserRepository + 'static,
    {
        Self {
            workspace: Arc::new(Workspace::new(store.clone(), store.clone(), clock)),
            users: store,
            auth: Arc::new(auth),
        }
    }
}
