use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use super::task::Task;
use super::task_list::TaskList;
use super::user::Role;

/// Columns every new project starts with, left to right.
pub const DEFAULT_TASK_LISTS: [&str; 3] = ["To Do", "In Progress", "Done"];

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const PROJECT_COLUMNS: &str = "id, name, description, owner_id, created_at, updated_at";

#[derive(Debug, Deserialize, Validate)]
pub struct ProjectInput {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

/// Partial update of a project. Absent fields are left unchanged; a `null`
/// description clears it.
#[derive(Debug, Deserialize, Validate)]
pub struct ProjectUpdate {
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "super::double_option")]
    #[validate(length(max = 2000))]
    pub description: Option<Option<String>>,
}

/// A member of a project, joined with their account details.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProjectMember {
    pub user_id: i32,
    pub username: String,
    pub full_name: Option<String>,
    pub role: Role,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct AddMemberInput {
    pub user_id: i32,
}

/// One kanban column with its cards in display order.
#[derive(Debug, Serialize, Deserialize)]
pub struct BoardColumn {
    #[serde(flatten)]
    pub list: TaskList,
    pub tasks: Vec<Task>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Board {
    pub project: Project,
    pub columns: Vec<BoardColumn>,
}

impl Board {
    /// Groups tasks under their lists. Lists keep their given order; tasks are sorted by
    /// position inside each column. Tasks whose list is not in `lists` are dropped.
    pub fn assemble(project: Project, lists: Vec<TaskList>, tasks: Vec<Task>) -> Self {
        let mut columns: Vec<BoardColumn> = lists
            .into_iter()
            .map(|list| BoardColumn {
                list,
                tasks: Vec::new(),
            })
            .collect();

        for task in tasks {
            if let Some(column) = columns.iter_mut().find(|c| c.list.id == task.list_id) {
                column.tasks.push(task);
            }
        }

        for column in &mut columns {
            column.tasks.sort_by_key(|t| t.position);
        }

        Self { project, columns }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::task::{TaskPriority, TaskStatus};

    fn project() -> Project {
        let now = Utc::now();
        Project {
            id: Uuid::new_v4(),
            name: "Launch".to_string(),
            description: None,
            owner_id: 1,
            created_at: now,
            updated_at: now,
        }
    }

    fn list(project_id: Uuid, name: &str, position: i32) -> TaskList {
        TaskList {
            id: Uuid::new_v4(),
            project_id,
            name: name.to_string(),
            position,
            created_at: Utc::now(),
        }
    }

    fn task(project_id: Uuid, list_id: Uuid, title: &str, position: i32) -> Task {
        let now = Utc::now();
        Task {
            id: Uuid::new_v4(),
            project_id,
            list_id,
            title: title.to_string(),
            description: None,
            priority: TaskPriority::Medium,
            status: TaskStatus::Todo,
            position,
            assignee_id: None,
            created_by: 1,
            due_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_project_update_can_clear_description() {
        let update: ProjectUpdate = serde_json::from_str(r#"{"description": null}"#).unwrap();
        assert_eq!(update.description, Some(None));
        assert!(update.name.is_none());

        let update: ProjectUpdate = serde_json::from_str(r#"{"name": "Relaunch"}"#).unwrap();
        assert_eq!(update.description, None);

        let update: ProjectUpdate = serde_json::from_str(r#"{"description": "Q3"}"#).unwrap();
        assert_eq!(update.description, Some(Some("Q3".to_string())));
    }

    #[test]
    fn test_board_groups_and_orders_tasks() {
        let project = project();
        let todo = list(project.id, "To Do", 0);
        let done = list(project.id, "Done", 1);
        let tasks = vec![
            task(project.id, todo.id, "second", 1),
            task(project.id, done.id, "shipped", 0),
            task(project.id, todo.id, "first", 0),
            task(project.id, Uuid::new_v4(), "orphan", 0),
        ];

        let board = Board::assemble(project, vec![todo, done], tasks);

        assert_eq!(board.columns.len(), 2);
        let titles: Vec<&str> = board.columns[0].tasks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["first", "second"]);
        assert_eq!(board.columns[1].tasks.len(), 1);
        assert_eq!(board.columns[1].list.name, "Done");
    }

    #[test]
    fn test_empty_board_keeps_columns() {
        let project = project();
        let lists = DEFAULT_TASK_LISTS
            .iter()
            .enumerate()
            .map(|(i, name)| list(project.id, name, i as i32))
            .collect();

        let board = Board::assemble(project, lists, Vec::new());

        assert_eq!(board.columns.len(), 3);
        assert!(board.columns.iter().all(|c| c.tasks.is_empty()));
    }

    #[test]
    fn test_project_input_validation() {
        let input = ProjectInput {
            name: "".to_string(),
            description: None,
        };
        assert!(input.validate().is_err());

        let input = ProjectInput {
            name: "Website relaunch".to_string(),
            description: Some("Q3 work".to_string()),
        };
        assert!(input.validate().is_ok());
    }
}
