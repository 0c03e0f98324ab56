use crate::{
    auth::{
        access::{ensure_can_manage, visible_list, visible_project},
        CurrentUser,
    },
    error::AppError,
    models::{task_list::TASK_LIST_COLUMNS, ReorderListsInput, TaskList, TaskListInput},
};
use actix_web::{delete, post, put, web, HttpResponse, Responder};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

/// Append a list to the right end of a project's board. Any member may add lists.
#[post("/{id}/lists")]
pub async fn create_list(
    pool: web::Data<PgPool>,
    user: CurrentUser,
    project_id: web::Path<Uuid>,
    input: web::Json<TaskListInput>,
) -> Result<impl Responder, AppError> {
    input.validate()?;
    let project = visible_project(&pool, project_id.into_inner(), &user).await?;

    let list = sqlx::query_as::<_, TaskList>(&format!(
        "INSERT INTO task_lists (id, project_id, name, position) \
         VALUES ($1, $2, $3, (SELECT COALESCE(MAX(position) + 1, 0) FROM task_lists WHERE project_id = $2)) \
         RETURNING {}",
        TASK_LIST_COLUMNS
    ))
    .bind(Uuid::new_v4())
    .bind(project.id)
    .bind(&input.name)
    .fetch_one(&**pool)
    .await?;

    Ok(HttpResponse::Created().json(list))
}

/// Rewrite list positions to match the given order.
///
/// ## Responses:
/// - `200 OK`: the lists in their new order.
/// - `400 Bad Request`: `list_ids` is not exactly the project's lists.
#[put("/{id}/lists/order")]
pub async fn reorder_lists(
    pool: web::Data<PgPool>,
    user: CurrentUser,
    project_id: web::Path<Uuid>,
    input: web::Json<ReorderListsInput>,
) -> Result<impl Responder, AppError> {
    let project = visible_project(&pool, project_id.into_inner(), &user).await?;

    let mut tx = pool.begin().await?;

    let existing = sqlx::query_scalar::<_, Uuid>(
        "SELECT id FROM task_lists WHERE project_id = $1 ORDER BY id FOR UPDATE",
    )
    .bind(project.id)
    .fetch_all(&mut *tx)
    .await?;

    if !input.is_permutation_of(&existing) {
        return Err(AppError::BadRequest(
            "list_ids must contain every list of the project exactly once".into(),
        ));
    }

    for (position, list_id) in input.list_ids.iter().enumerate() {
        sqlx::query("UPDATE task_lists SET position = $2 WHERE id = $1")
            .bind(list_id)
            .bind(position as i32)
            .execute(&mut *tx)
            .await?;
    }

    let lists = sqlx::query_as::<_, TaskList>(&format!(
        "SELECT {} FROM task_lists WHERE project_id = $1 ORDER BY position",
        TASK_LIST_COLUMNS
    ))
    .bind(project.id)
    .fetch_all(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(HttpResponse::Ok().json(lists))
}

#[put("/{id}")]
pub async fn rename_list(
    pool: web::Data<PgPool>,
    user: CurrentUser,
    list_id: web::Path<Uuid>,
    input: web::Json<TaskListInput>,
) -> Result<impl Responder, AppError> {
    input.validate()?;
    let list = visible_list(&pool, list_id.into_inner(), &user).await?;

    let updated = sqlx::query_as::<_, TaskList>(&format!(
        "UPDATE task_lists SET name = $2 WHERE id = $1 RETURNING {}",
        TASK_LIST_COLUMNS
    ))
    .bind(list.id)
    .bind(&input.name)
    .fetch_one(&**pool)
    .await?;

    Ok(HttpResponse::Ok().json(updated))
}

/// Delete a list and every task in it. Owner or admin only.
#[delete("/{id}")]
pub async fn delete_list(
    pool: web::Data<PgPool>,
    user: CurrentUser,
    list_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let list = visible_list(&pool, list_id.into_inner(), &user).await?;
    let project = visible_project(&pool, list.project_id, &user).await?;
    ensure_can_manage(&project, &user)?;

    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM task_lists WHERE id = $1")
        .bind(list.id)
        .execute(&mut *tx)
        .await?;

    // Close the gap left by the deleted column.
    sqlx::query(
        "UPDATE task_lists SET position = position - 1 WHERE project_id = $1 AND position > $2",
    )
    .bind(list.project_id)
    .bind(list.position)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(HttpResponse::NoContent().finish())
}
