use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// A personal todo. Only its owner can see it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Todo {
    pub id: Uuid,
    pub user_id: i32,
    /// Optional link to a project the owner is a member of.
    pub project_id: Option<Uuid>,
    pub title: String,
    pub completed: bool,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const TODO_COLUMNS: &str =
    "id, user_id, project_id, title, completed, due_date, created_at, updated_at";

#[derive(Debug, Deserialize, Validate)]
pub struct TodoInput {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub project_id: Option<Uuid>,
    pub due_date: Option<DateTime<Utc>>,
}

/// Partial update; `null` clears `project_id` or `due_date`.
#[derive(Debug, Deserialize, Validate)]
pub struct TodoUpdate {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub completed: Option<bool>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub project_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub due_date: Option<Option<DateTime<Utc>>>,
}

#[derive(Debug, Deserialize)]
pub struct TodoQuery {
    pub completed: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_todo_validation() {
        let input = TodoInput {
            title: "".to_string(),
            project_id: None,
            due_date: None,
        };
        assert!(input.validate().is_err());

        let input = TodoInput {
            title: "Buy milk".to_string(),
            project_id: None,
            due_date: Some(Utc::now()),
        };
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_todo_update_nullable_fields() {
        let update: TodoUpdate = serde_json::from_str(r#"{"due_date": null}"#).unwrap();
        assert_eq!(update.due_date, Some(None));
        assert_eq!(update.project_id, None);
        assert!(update.title.is_none());
    }
}
