//! Project-level authorization.
//!
//! Admins see every project. Everyone else sees the projects they are members of;
//! a project the caller cannot see is reported as not found.

use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::extractors::CurrentUser;
use crate::error::AppError;
use crate::models::project::PROJECT_COLUMNS;
use crate::models::task::TASK_COLUMNS;
use crate::models::task_list::TASK_LIST_COLUMNS;
use crate::models::{Project, Task, TaskList};

pub async fn is_member(pool: &PgPool, project_id: Uuid, user_id: i32) -> Result<bool, AppError> {
    let found = sqlx::query_scalar::<_, i32>(
        "SELECT user_id FROM project_members WHERE project_id = $1 AND user_id = $2",
    )
    .bind(project_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(found.is_some())
}

/// Loads a project the user may read.
pub async fn visible_project(
    pool: &PgPool,
    project_id: Uuid,
    user: &CurrentUser,
) -> Result<Project, AppError> {
    let project = sqlx::query_as::<_, Project>(&format!(
        "SELECT {} FROM projects WHERE id = $1",
        PROJECT_COLUMNS
    ))
    .bind(project_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Project not found".into()))?;

    if user.is_admin() || is_member(pool, project.id, user.id).await? {
        Ok(project)
    } else {
        Err(AppError::NotFound("Project not found".into()))
    }
}

/// Loads a project the user may modify: its owner or an admin.
pub async fn managed_project(
    pool: &PgPool,
    project_id: Uuid,
    user: &CurrentUser,
) -> Result<Project, AppError> {
    let project = visible_project(pool, project_id, user).await?;
    ensure_can_manage(&project, user)?;
    Ok(project)
}

pub fn ensure_can_manage(project: &Project, user: &CurrentUser) -> Result<(), AppError> {
    if user.is_admin() || project.owner_id == user.id {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Only the project owner or an admin can do this".into(),
        ))
    }
}

/// Loads a task list whose project the user may read.
pub async fn visible_list(
    pool: &PgPool,
    list_id: Uuid,
    user: &CurrentUser,
) -> Result<TaskList, AppError> {
    let list = sqlx::query_as::<_, TaskList>(&format!(
        "SELECT {} FROM task_lists WHERE id = $1",
        TASK_LIST_COLUMNS
    ))
    .bind(list_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Task list not found".into()))?;

    visible_project(pool, list.project_id, user)
        .await
        .map_err(|e| {
            e.or_if_not_found(|| AppError::NotFound("Task list not found".into()))
        })?;
    Ok(list)
}

/// Loads a task whose project the user may read.
pub async fn visible_task(pool: &PgPool, task_id: Uuid, user: &CurrentUser) -> Result<Task, AppError> {
    let task = sqlx::query_as::<_, Task>(&format!(
        "SELECT {} FROM tasks WHERE id = $1",
        TASK_COLUMNS
    ))
    .bind(task_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Task not found".into()))?;

    visible_project(pool, task.project_id, user)
        .await
        .map_err(|e| {
            e.or_if_not_found(|| AppError::NotFound("Task not found".into()))
        })?;
    Ok(task)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use chrono::Utc;

    fn project(owner_id: i32) -> Project {
        let now = Utc::now();
        Project {
            id: Uuid::new_v4(),
            name: "Ops".to_string(),
            description: None,
            owner_id,
            created_at: now,
            updated_at: now,
        }
    }

    fn user(id: i32, role: Role) -> CurrentUser {
        CurrentUser {
            id,
            username: format!("user{}", id),
            role,
        }
    }

    #[test]
    fn test_owner_and_admin_can_manage() {
        let project = project(5);
        assert!(ensure_can_manage(&project, &user(5, Role::Manager)).is_ok());
        assert!(ensure_can_manage(&project, &user(1, Role::Admin)).is_ok());
        assert!(matches!(
            ensure_can_manage(&project, &user(6, Role::Manager)),
            Err(AppError::Forbidden(_))
        ));
        assert!(ensure_can_manage(&project, &user(7, Role::User)).is_err());
    }
}
