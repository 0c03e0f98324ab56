use crate::{
    auth::{access::visible_task, CurrentUser},
    error::AppError,
    models::{subtask::SUBTASK_COLUMNS, Subtask, SubtaskInput, SubtaskUpdate},
};
use actix_web::{delete, post, put, web, HttpResponse, Responder};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

/// Loads a subtask whose parent task the user may see.
async fn visible_subtask(
    pool: &PgPool,
    subtask_id: Uuid,
    user: &CurrentUser,
) -> Result<Subtask, AppError> {
    let subtask = sqlx::query_as::<_, Subtask>(&format!(
        "SELECT {} FROM subtasks WHERE id = $1",
        SUBTASK_COLUMNS
    ))
    .bind(subtask_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Subtask not found".into()))?;

    visible_task(pool, subtask.task_id, user)
        .await
        .map_err(|e| {
            e.or_if_not_found(|| AppError::NotFound("Subtask not found".into()))
        })?;
    Ok(subtask)
}

#[post("/{id}/subtasks")]
pub async fn create_subtask(
    pool: web::Data<PgPool>,
    user: CurrentUser,
    task_id: web::Path<Uuid>,
    input: web::Json<SubtaskInput>,
) -> Result<impl Responder, AppError> {
    input.validate()?;
    let task = visible_task(&pool, task_id.into_inner(), &user).await?;

    let subtask = sqlx::query_as::<_, Subtask>(&format!(
        "INSERT INTO subtasks (id, task_id, title, position) \
         VALUES ($1, $2, $3, (SELECT COALESCE(MAX(position) + 1, 0) FROM subtasks WHERE task_id = $2)) \
         RETURNING {}",
        SUBTASK_COLUMNS
    ))
    .bind(Uuid::new_v4())
    .bind(task.id)
    .bind(&input.title)
    .fetch_one(&**pool)
    .await?;

    Ok(HttpResponse::Created().json(subtask))
}

#[put("/{id}")]
pub async fn update_subtask(
    pool: web::Data<PgPool>,
    user: CurrentUser,
    subtask_id: web::Path<Uuid>,
    input: web::Json<SubtaskUpdate>,
) -> Result<impl Responder, AppError> {
    input.validate()?;
    let subtask = visible_subtask(&pool, subtask_id.into_inner(), &user).await?;

    let updated = sqlx::query_as::<_, Subtask>(&format!(
        "UPDATE subtasks SET title = COALESCE($2, title), completed = COALESCE($3, completed) \
         WHERE id = $1 RETURNING {}",
        SUBTASK_COLUMNS
    ))
    .bind(subtask.id)
    .bind(&input.title)
    .bind(input.completed)
    .fetch_one(&**pool)
    .await?;

    Ok(HttpResponse::Ok().json(updated))
}

#[delete("/{id}")]
pub async fn delete_subtask(
    pool: web::Data<PgPool>,
    user: CurrentUser,
    subtask_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let subtask = visible_subtask(&pool, subtask_id.into_inner(), &user).await?;

    sqlx::query("DELETE FROM subtasks WHERE id = $1")
        .bind(subtask.id)
        .execute(&**pool)
        .await?;

    Ok(HttpResponse::NoContent().finish())
}
