use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validation::{self, ValidationError};

pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

/// Stored user row, including the argon2 PHC string. Never serialized to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

impl UserRecord {
    pub fn profile(&self) -> User {
        User {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

#[derive(Deserialize)]
pub struct RegistrationRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl RegistrationRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::validate_required("name", &self.name)?;
        validation::validate_email(&self.email)?;
        if self.password.len() < MIN_PASSWORD_LEN {
            return Err(ValidationError::WeakPassword {
                min: MIN_PASSWORD_LEN,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfile {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl UpdateProfile {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = &self.name {
            validation::validate_required("name", name)?;
        }
        if let Some(email) = &self.email {
            validation::validate_email(email)?;
        }
        Ok(())
    }
}

/// E-mails are compared and stored lowercased
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
