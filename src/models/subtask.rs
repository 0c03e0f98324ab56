use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// A checklist item under a task.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Subtask {
    pub id: Uuid,
    pub task_id: Uuid,
    pub title: String,
    pub completed: bool,
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

pub const SUBTASK_COLUMNS: &str = "id, task_id, title, completed, position, created_at";

#[derive(Debug, Deserialize, Validate)]
pub struct SubtaskInput {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SubtaskUpdate {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub completed: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subtask_validation() {
        assert!(SubtaskInput { title: "".into() }.validate().is_err());
        assert!(SubtaskInput { title: "Write tests".into() }.validate().is_ok());

        let toggle_only = SubtaskUpdate {
            title: None,
            completed: Some(true),
        };
        assert!(toggle_only.validate().is_ok());
    }
}
