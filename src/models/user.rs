use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

lazy_static! {
    // Alphanumeric, underscores, hyphens
    pub(crate) static ref USERNAME_REGEX: regex::Regex = regex::Regex::new(r"^[a-zA-Z0-9_-]+$").unwrap();
}

/// Columns selected whenever a `User` is loaded. Never includes the password hash.
pub const USER_COLUMNS: &str =
    "id, username, email, full_name, role, manager_id, is_active, created_at, updated_at";

/// Access level of an account.
/// Corresponds to the `user_role` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    User,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::User => "user",
        }
    }

    /// Admins and managers may create projects and lead a team.
    pub fn can_lead(self) -> bool {
        matches!(self, Role::Admin | Role::Manager)
    }
}

/// A user account as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub role: Role,
    /// The manager this user reports to, if any.
    pub manager_id: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for `PUT /api/profile`. Absent fields are left unchanged.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileInput {
    #[validate(
        length(min = 3, max = 32),
        regex(
            path = "USERNAME_REGEX",
            message = "Username must be alphanumeric, underscores, or hyphens"
        )
    )]
    pub username: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 100))]
    pub full_name: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordInput {
    #[validate(length(min = 1))]
    pub current_password: String,
    #[validate(length(min = 6, max = 128))]
    pub new_password: String,
}

/// Payload for `POST /api/admin/users/{id}/promote`.
#[derive(Debug, Deserialize)]
pub struct PromoteInput {
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct AssignManagerInput {
    pub manager_id: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct SetActiveInput {
    pub is_active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::Manager).unwrap(), "\"manager\"");
        let role: Role = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(role, Role::Admin);
        assert!(serde_json::from_str::<Role>("\"owner\"").is_err());
    }

    #[test]
    fn test_role_can_lead() {
        assert!(Role::Admin.can_lead());
        assert!(Role::Manager.can_lead());
        assert!(!Role::User.can_lead());
    }

    #[test]
    fn test_update_profile_validation() {
        let input = UpdateProfileInput {
            username: Some("new_name".to_string()),
            email: None,
            full_name: Some("Ada Lovelace".to_string()),
        };
        assert!(input.validate().is_ok());

        let input = UpdateProfileInput {
            username: Some("bad name!".to_string()),
            email: None,
            full_name: None,
        };
        assert!(input.validate().is_err());

        let input = UpdateProfileInput {
            username: None,
            email: Some("not-an-email".to_string()),
            full_name: None,
        };
        assert!(input.validate().is_err());

        let empty = UpdateProfileInput {
            username: None,
            email: None,
            full_name: None,
        };
        assert!(empty.validate().is_ok());
    }

    #[test]
    fn test_change_password_validation() {
        let input = ChangePasswordInput {
            current_password: "old-password".to_string(),
            new_password: "short".to_string(),
        };
        assert!(input.validate().is_err());

        let input = ChangePasswordInput {
            current_password: "old-password".to_string(),
            new_password: "long-enough".to_string(),
        };
        assert!(input.validate().is_ok());
    }
}
