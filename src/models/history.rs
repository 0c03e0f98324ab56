//! Field-level audit trail of task edits.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::task::Task;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TaskHistoryEntry {
    pub id: Uuid,
    pub task_id: Uuid,
    pub changed_by: i32,
    pub changed_by_username: String,
    pub field: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub changed_at: DateTime<Utc>,
}

/// A single field that differs between two versions of a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    pub field: &'static str,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

fn push_if_changed(
    changes: &mut Vec<FieldChange>,
    field: &'static str,
    old_value: Option<String>,
    new_value: Option<String>,
) {
    if old_value != new_value {
        changes.push(FieldChange {
            field,
            old_value,
            new_value,
        });
    }
}

/// Lists the user-visible fields that differ between `before` and `after`.
/// Position changes are not tracked.
pub fn diff_tasks(before: &Task, after: &Task) -> Vec<FieldChange> {
    let mut changes = Vec::new();

    push_if_changed(
        &mut changes,
        "title",
        Some(before.title.clone()),
        Some(after.title.clone()),
    );
    push_if_changed(
        &mut changes,
        "description",
        before.description.clone(),
        after.description.clone(),
    );
    push_if_changed(
        &mut changes,
        "priority",
        Some(before.priority.as_str().to_string()),
        Some(after.priority.as_str().to_string()),
    );
    push_if_changed(
        &mut changes,
        "status",
        Some(before.status.as_str().to_string()),
        Some(after.status.as_str().to_string()),
    );
    push_if_changed(
        &mut changes,
        "assignee_id",
        before.assignee_id.map(|id| id.to_string()),
        after.assignee_id.map(|id| id.to_string()),
    );
    push_if_changed(
        &mut changes,
        "due_date",
        before.due_date.map(|d| d.to_rfc3339()),
        after.due_date.map(|d| d.to_rfc3339()),
    );
    push_if_changed(
        &mut changes,
        "list_id",
        Some(before.list_id.to_string()),
        Some(after.list_id.to_string()),
    );

    changes
}
