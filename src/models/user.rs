//! User model and auth DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Fallback greeting name when neither display name nor email is usable.
pub const DEFAULT_DISPLAY_NAME: &str = "Traveller";

/// Full user row from database (includes password_hash — never serialize to API).
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub display_name: Option<String>,
    pub is_active: bool,
    pub failed_login_attempts: i32,
    pub locked_until: Option<DateTime<Utc>>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Greeting name: display name, else the local part of the email,
    /// else "Traveller".
    pub fn greeting_name(&self) -> String {
        greeting_name(self.display_name.as_deref(), Some(&self.email))
    }
}

/// Resolve a greeting name from optional identity fields.
pub fn greeting_name(display_name: Option<&str>, email: Option<&str>) -> String {
    if let Some(name) = display_name {
        let name = name.trim();
        if !name.is_empty() {
            return name.to_string();
        }
    }
    if let Some(email) = email {
        if let Some(local) = email.split('@').next() {
            if !local.is_empty() {
                return local.to_string();
            }
        }
    }
    DEFAULT_DISPLAY_NAME.to_string()
}

/// User response DTO — excludes password_hash and internal fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            display_name: u.display_name,
            last_login: u.last_login,
            created_at: u.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterUser {
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(display_name: Option<&str>) -> User {
        User {
            id: Uuid::nil(),
            email: "aylin@example.com".to_string(),
            password_hash: "secret_hash".to_string(),
            display_name: display_name.map(str::to_string),
            is_active: true,
            failed_login_attempts: 0,
            locked_until: None,
            last_login: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn greeting_prefers_display_name() {
        assert_eq!(user(Some("Aylin")).greeting_name(), "Aylin");
    }

    #[test]
    fn greeting_falls_back_to_email_local_part() {
        assert_eq!(user(None).greeting_name(), "aylin");
        assert_eq!(user(Some("   ")).greeting_name(), "aylin");
    }

    #[test]
    fn greeting_falls_back_to_traveller() {
        assert_eq!(greeting_name(None, None), "Traveller");
        assert_eq!(greeting_name(Some(""), Some("")), "Traveller");
    }

    #[test]
    fn user_response_excludes_password() {
        let json = serde_json::to_string(&UserResponse::from(user(Some("Aylin")))).unwrap();
        assert!(!json.contains("password"));
        assert!(!json.contains("hash"));
    }
}
