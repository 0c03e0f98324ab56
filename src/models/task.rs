use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use super::comment::TaskComment;
use super::history::TaskHistoryEntry;
use super::subtask::Subtask;

/// Represents the priority of a task.
/// Corresponds to the `task_priority` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "task_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl TaskPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
            TaskPriority::Urgent => "urgent",
        }
    }
}

/// Represents the status of a task.
/// Corresponds to the `task_status` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Task is yet to be started.
    Todo,
    /// Task is currently being worked on.
    InProgress,
    /// Task is completed and under review.
    Review,
    /// Task is completed.
    Done,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Review => "review",
            TaskStatus::Done => "done",
        }
    }
}

/// Represents a task card as stored in the database and returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Task {
    /// Unique identifier for the task (UUID v4).
    pub id: Uuid,
    pub project_id: Uuid,
    /// The list (kanban column) the card sits in.
    pub list_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    /// Zero-based order inside the list.
    pub position: i32,
    pub assignee_id: Option<i32>,
    pub created_by: i32,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const TASK_COLUMNS: &str = "id, project_id, list_id, title, description, priority, status, \
     position, assignee_id, created_by, due_date, created_at, updated_at";

/// Input for creating a task inside a list.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateTaskInput {
    /// Must be between 1 and 200 characters.
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    /// Defaults to `medium`.
    pub priority: Option<TaskPriority>,
    /// Defaults to `todo`.
    pub status: Option<TaskStatus>,
    pub assignee_id: Option<i32>,
    pub due_date: Option<DateTime<Utc>>,
}

/// Partial update of a task. Nullable fields accept an explicit `null` to clear them.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateTaskInput {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "super::double_option")]
    #[validate(length(max = 1000))]
    pub description: Option<Option<String>>,
    pub priority: Option<TaskPriority>,
    pub status: Option<TaskStatus>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub assignee_id: Option<Option<i32>>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub due_date: Option<Option<DateTime<Utc>>>,
}

impl UpdateTaskInput {
    /// Returns the task as it looks after applying this update.
    pub fn apply(&self, task: &Task) -> Task {
        let mut updated = task.clone();
        if let Some(title) = &self.title {
            updated.title = title.clone();
        }
        if let Some(description) = &self.description {
            updated.description = description.clone();
        }
        if let Some(priority) = self.priority {
            updated.priority = priority;
        }
        if let Some(status) = self.status {
            updated.status = status;
        }
        if let Some(assignee_id) = self.assignee_id {
            updated.assignee_id = assignee_id;
        }
        if let Some(due_date) = self.due_date {
            updated.due_date = due_date;
        }
        updated
    }
}

/// Kanban drag-and-drop result: where the card was dropped.
#[derive(Debug, Deserialize)]
pub struct MoveTaskInput {
    pub list_id: Uuid,
    /// Zero-based index in the target list; values past the end append.
    pub position: i32,
    pub status: Option<TaskStatus>,
}

/// Represents query parameters for filtering tasks when listing them.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TaskQuery {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub project_id: Option<Uuid>,
    /// Case-insensitive match on title or description.
    pub search: Option<String>,
}

/// A task with everything shown on its detail view.
#[derive(Debug, Serialize, Deserialize)]
pub struct TaskDetail {
    #[serde(flatten)]
    pub task: Task,
    pub subtasks: Vec<Subtask>,
    pub comments: Vec<TaskComment>,
    pub history: Vec<TaskHistoryEntry>,
}

/// Computes dense positions for a list after inserting `moving` at `position`.
///
/// `siblings` is the current order of the target list and may already contain
/// `moving` (a move within the same list). The result assigns `0..n` in the new order.
pub fn plan_positions(siblings: &[Uuid], moving: Uuid, position: i32) -> Vec<(Uuid, i32)> {
    let mut order: Vec<Uuid> = siblings.iter().copied().filter(|id| *id != moving).collect();
    let index = (position.max(0) as usize).min(order.len());
    order.insert(index, moving);
    order
        .into_iter()
        .enumerate()
        .map(|(i, id)| (id, i as i32))
        .collect()
}
