use crate::{
    auth::{
        access::{is_member, visible_list, visible_task},
        CurrentUser,
    },
    error::AppError,
    models::{
        diff_tasks, plan_positions, subtask::SUBTASK_COLUMNS, task::TASK_COLUMNS, CreateTaskInput,
        FieldChange, MoveTaskInput, Subtask, Task, TaskComment, TaskDetail, TaskHistoryEntry,
        TaskPriority, TaskQuery, TaskStatus, UpdateTaskInput,
    },
};
use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

const HISTORY_QUERY: &str = "SELECT h.id, h.task_id, h.changed_by, u.username AS changed_by_username, \
            h.field, h.old_value, h.new_value, h.changed_at \
     FROM task_history h JOIN users u ON u.id = h.changed_by \
     WHERE h.task_id = $1 ORDER BY h.changed_at DESC, h.field";

pub(crate) const COMMENTS_QUERY: &str = "SELECT c.id, c.task_id, c.author_id, u.username AS author_username, \
            c.body, c.created_at \
     FROM task_comments c JOIN users u ON u.id = c.author_id \
     WHERE c.task_id = $1 ORDER BY c.created_at";

/// Appends one history row per changed field.
async fn record_changes(
    conn: &mut PgConnection,
    task_id: Uuid,
    changed_by: i32,
    changes: &[FieldChange],
) -> Result<(), AppError> {
    for change in changes {
        sqlx::query(
            "INSERT INTO task_history (id, task_id, changed_by, field, old_value, new_value) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(Uuid::new_v4())
        .bind(task_id)
        .bind(changed_by)
        .bind(change.field)
        .bind(&change.old_value)
        .bind(&change.new_value)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn ensure_assignable(
    pool: &PgPool,
    project_id: Uuid,
    assignee_id: Option<i32>,
) -> Result<(), AppError> {
    if let Some(assignee_id) = assignee_id {
        if !is_member(pool, project_id, assignee_id).await? {
            return Err(AppError::BadRequest(
                "Assignee must be a member of the project".into(),
            ));
        }
    }
    Ok(())
}

/// Re-reads a task under a row lock held until the transaction ends.
async fn lock_task(conn: &mut PgConnection, task_id: Uuid) -> Result<Task, AppError> {
    sqlx::query_as::<_, Task>(&format!(
        "SELECT {} FROM tasks WHERE id = $1 FOR UPDATE",
        TASK_COLUMNS
    ))
    .bind(task_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Task not found".into()))
}

/// Locks list rows in id order. Every transaction that rewrites task positions
/// takes these locks first, so concurrent moves and deletes queue per list.
async fn lock_lists(conn: &mut PgConnection, list_ids: &[Uuid]) -> Result<(), AppError> {
    let mut wanted = list_ids.to_vec();
    wanted.sort();
    wanted.dedup();

    let locked = sqlx::query_scalar::<_, Uuid>(
        "SELECT id FROM task_lists WHERE id = ANY($1) ORDER BY id FOR UPDATE",
    )
    .bind(&wanted)
    .fetch_all(&mut *conn)
    .await?;

    if locked.len() != wanted.len() {
        return Err(AppError::NotFound("Task list not found".into()));
    }
    Ok(())
}

/// Rewrites positions in `list_id` to `0..n`, keeping the current order.
async fn compact_list(conn: &mut PgConnection, list_id: Uuid) -> Result<(), AppError> {
    sqlx::query(
        "UPDATE tasks SET position = ordered.rn - 1 \
         FROM (SELECT id, ROW_NUMBER() OVER (ORDER BY position, created_at) AS rn \
               FROM tasks WHERE list_id = $1) AS ordered \
         WHERE tasks.id = ordered.id",
    )
    .bind(list_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Tasks assigned to or created by the caller.
///
/// ## Query Parameters:
/// - `status`, `priority` (optional): exact filters.
/// - `project_id` (optional): only tasks of this project.
/// - `search` (optional): case-insensitive match on title and description.
#[get("")]
pub async fn get_tasks(
    pool: web::Data<PgPool>,
    user: CurrentUser,
    query_params: web::Query<TaskQuery>,
) -> Result<impl Responder, AppError> {
    let mut sql = format!(
        "SELECT {} FROM tasks WHERE (assignee_id = $1 OR created_by = $1)",
        TASK_COLUMNS
    );
    let mut param_count = 2;

    if query_params.status.is_some() {
        sql.push_str(&format!(" AND status = ${}", param_count));
        param_count += 1;
    }
    if query_params.priority.is_some() {
        sql.push_str(&format!(" AND priority = ${}", param_count));
        param_count += 1;
    }
    if query_params.project_id.is_some() {
        sql.push_str(&format!(" AND project_id = ${}", param_count));
        param_count += 1;
    }
    if query_params.search.is_some() {
        sql.push_str(&format!(
            " AND (title ILIKE ${0} OR description ILIKE ${0})",
            param_count
        ));
    }

    sql.push_str(" ORDER BY due_date ASC NULLS LAST, created_at DESC");

    let mut query_builder = sqlx::query_as::<_, Task>(&sql).bind(user.id);

    if let Some(status) = query_params.status {
        query_builder = query_builder.bind(status);
    }
    if let Some(priority) = query_params.priority {
        query_builder = query_builder.bind(priority);
    }
    if let Some(project_id) = query_params.project_id {
        query_builder = query_builder.bind(project_id);
    }
    if let Some(search) = &query_params.search {
        query_builder = query_builder.bind(format!("%{}%", search));
    }

    let tasks = query_builder.fetch_all(&**pool).await?;

    Ok(HttpResponse::Ok().json(tasks))
}

/// Create a task at the bottom of a list.
///
/// ## Responses:
/// - `201 Created`: the new `Task`.
/// - `400 Bad Request`: the assignee is not a project member.
/// - `404 Not Found`: the list does not exist or is not visible.
/// - `422 Unprocessable Entity`: validation failed.
#[post("/{id}/tasks")]
pub async fn create_task(
    pool: web::Data<PgPool>,
    user: CurrentUser,
    list_id: web::Path<Uuid>,
    task_data: web::Json<CreateTaskInput>,
) -> Result<impl Responder, AppError> {
    task_data.validate()?;
    let list = visible_list(&pool, list_id.into_inner(), &user).await?;
    ensure_assignable(&pool, list.project_id, task_data.assignee_id).await?;

    let mut tx = pool.begin().await?;
    lock_lists(&mut tx, &[list.id]).await?;

    let task = sqlx::query_as::<_, Task>(&format!(
        "INSERT INTO tasks (id, project_id, list_id, title, description, priority, status, \
                            position, assignee_id, created_by, due_date) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, \
                 (SELECT COALESCE(MAX(position) + 1, 0) FROM tasks WHERE list_id = $3), \
                 $8, $9, $10) \
         RETURNING {}",
        TASK_COLUMNS
    ))
    .bind(Uuid::new_v4())
    .bind(list.project_id)
    .bind(list.id)
    .bind(&task_data.title)
    .bind(&task_data.description)
    .bind(task_data.priority.unwrap_or(TaskPriority::Medium))
    .bind(task_data.status.unwrap_or(TaskStatus::Todo))
    .bind(task_data.assignee_id)
    .bind(user.id)
    .bind(task_data.due_date)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    Ok(HttpResponse::Created().json(task))
}

/// A task with its subtasks, comments and history.
#[get("/{id}")]
pub async fn get_task(
    pool: web::Data<PgPool>,
    user: CurrentUser,
    task_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let task = visible_task(&pool, task_id.into_inner(), &user).await?;

    let subtasks = sqlx::query_as::<_, Subtask>(&format!(
        "SELECT {} FROM subtasks WHERE task_id = $1 ORDER BY position",
        SUBTASK_COLUMNS
    ))
    .bind(task.id)
    .fetch_all(&**pool)
    .await?;

    let comments = sqlx::query_as::<_, TaskComment>(COMMENTS_QUERY)
        .bind(task.id)
        .fetch_all(&**pool)
        .await?;

    let history = sqlx::query_as::<_, TaskHistoryEntry>(HISTORY_QUERY)
        .bind(task.id)
        .fetch_all(&**pool)
        .await?;

    Ok(HttpResponse::Ok().json(TaskDetail {
        task,
        subtasks,
        comments,
        history,
    }))
}

/// Partially update a task and record every changed field in its history.
#[put("/{id}")]
pub async fn update_task(
    pool: web::Data<PgPool>,
    user: CurrentUser,
    task_id: web::Path<Uuid>,
    task_data: web::Json<UpdateTaskInput>,
) -> Result<impl Responder, AppError> {
    task_data.validate()?;
    let visible = visible_task(&pool, task_id.into_inner(), &user).await?;
    if let Some(assignee_id) = task_data.assignee_id {
        ensure_assignable(&pool, visible.project_id, assignee_id).await?;
    }

    let mut tx = pool.begin().await?;

    // Apply the patch to the locked row so concurrent edits of other fields survive.
    let before = lock_task(&mut tx, visible.id).await?;
    let after = task_data.apply(&before);
    let changes = diff_tasks(&before, &after);
    if changes.is_empty() {
        tx.commit().await?;
        return Ok(HttpResponse::Ok().json(before));
    }

    let updated = sqlx::query_as::<_, Task>(&format!(
        "UPDATE tasks SET title = $2, description = $3, priority = $4, status = $5, \
                          assignee_id = $6, due_date = $7, updated_at = NOW() \
         WHERE id = $1 RETURNING {}",
        TASK_COLUMNS
    ))
    .bind(after.id)
    .bind(&after.title)
    .bind(&after.description)
    .bind(after.priority)
    .bind(after.status)
    .bind(after.assignee_id)
    .bind(after.due_date)
    .fetch_one(&mut *tx)
    .await?;

    record_changes(&mut tx, updated.id, user.id, &changes).await?;
    tx.commit().await?;

    Ok(HttpResponse::Ok().json(updated))
}

/// Drop a card on a board position.
///
/// The card is inserted at `position` in the target list (clamped to the list bounds),
/// positions in the affected lists are rewritten densely, and `status` is written when
/// given. List and status changes are recorded in the task history.
#[post("/{id}/move")]
pub async fn move_task(
    pool: web::Data<PgPool>,
    user: CurrentUser,
    task_id: web::Path<Uuid>,
    input: web::Json<MoveTaskInput>,
) -> Result<impl Responder, AppError> {
    let visible = visible_task(&pool, task_id.into_inner(), &user).await?;
    let target = visible_list(&pool, input.list_id, &user).await?;
    if target.project_id != visible.project_id {
        return Err(AppError::BadRequest(
            "Tasks can only move between lists of the same project".into(),
        ));
    }

    let mut tx = pool.begin().await?;

    lock_lists(&mut tx, &[visible.list_id, target.id]).await?;
    let before = lock_task(&mut tx, visible.id).await?;
    if before.list_id != visible.list_id {
        return Err(AppError::Conflict(
            "The task was moved by someone else, reload the board".into(),
        ));
    }

    let siblings = sqlx::query_scalar::<_, Uuid>(
        "SELECT id FROM tasks WHERE list_id = $1 ORDER BY position, created_at FOR UPDATE",
    )
    .bind(target.id)
    .fetch_all(&mut *tx)
    .await?;

    let updated = sqlx::query_as::<_, Task>(&format!(
        "UPDATE tasks SET list_id = $2, status = COALESCE($3, status), updated_at = NOW() \
         WHERE id = $1 RETURNING {}",
        TASK_COLUMNS
    ))
    .bind(before.id)
    .bind(target.id)
    .bind(input.status)
    .fetch_one(&mut *tx)
    .await?;

    for (id, position) in plan_positions(&siblings, before.id, input.position) {
        sqlx::query("UPDATE tasks SET position = $2 WHERE id = $1")
            .bind(id)
            .bind(position)
            .execute(&mut *tx)
            .await?;
    }

    if before.list_id != target.id {
        compact_list(&mut tx, before.list_id).await?;
    }

    let changes = diff_tasks(&before, &updated);
    record_changes(&mut tx, updated.id, user.id, &changes).await?;

    let moved = sqlx::query_as::<_, Task>(&format!("SELECT {} FROM tasks WHERE id = $1", TASK_COLUMNS))
        .bind(before.id)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(HttpResponse::Ok().json(moved))
}

#[delete("/{id}")]
pub async fn delete_task(
    pool: web::Data<PgPool>,
    user: CurrentUser,
    task_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let task = visible_task(&pool, task_id.into_inner(), &user).await?;

    let mut tx = pool.begin().await?;
    lock_lists(&mut tx, &[task.list_id]).await?;
    let list_id = sqlx::query_scalar::<_, Uuid>("DELETE FROM tasks WHERE id = $1 RETURNING list_id")
        .bind(task.id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".into()))?;
    compact_list(&mut tx, list_id).await?;
    tx.commit().await?;

    Ok(HttpResponse::NoContent().finish())
}

/// Field-level change log of a task, newest first.
#[get("/{id}/history")]
pub async fn task_history(
    pool: web::Data<PgPool>,
    user: CurrentUser,
    task_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let task = visible_task(&pool, task_id.into_inner(), &user).await?;

    let history = sqlx::query_as::<_, TaskHistoryEntry>(HISTORY_QUERY)
        .bind(task.id)
        .fetch_all(&**pool)
        .await?;

    Ok(HttpResponse::Ok().json(history))
}
