use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::HashSet;
use uuid::Uuid;
use validator::Validate;

/// An ordered column of a project's board.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TaskList {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

pub const TASK_LIST_COLUMNS: &str = "id, project_id, name, position, created_at";

#[derive(Debug, Deserialize, Validate)]
pub struct TaskListInput {
    #[validate(length(min = 1, max = 80))]
    pub name: String,
}

/// New left-to-right order of a project's lists.
#[derive(Debug, Deserialize)]
pub struct ReorderListsInput {
    pub list_ids: Vec<Uuid>,
}

impl ReorderListsInput {
    /// True when `list_ids` names every existing list exactly once.
    pub fn is_permutation_of(&self, existing: &[Uuid]) -> bool {
        if self.list_ids.len() != existing.len() {
            return false;
        }
        let requested: HashSet<&Uuid> = self.list_ids.iter().collect();
        requested.len() == self.list_ids.len() && existing.iter().all(|id| requested.contains(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permutation_check() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let existing = vec![a, b, c];

        let reorder = |ids: Vec<Uuid>| ReorderListsInput { list_ids: ids };

        assert!(reorder(vec![c, a, b]).is_permutation_of(&existing));
        assert!(!reorder(vec![a, b]).is_permutation_of(&existing));
        assert!(!reorder(vec![a, a, b]).is_permutation_of(&existing));
        assert!(!reorder(vec![a, b, Uuid::new_v4()]).is_permutation_of(&existing));
        assert!(reorder(vec![]).is_permutation_of(&[]));
    }

    #[test]
    fn test_list_name_validation() {
        assert!(TaskListInput { name: "".into() }.validate().is_err());
        assert!(TaskListInput { name: "Backlog".into() }.validate().is_ok());
        assert!(TaskListInput { name: "x".repeat(81) }.validate().is_err());
    }
}
