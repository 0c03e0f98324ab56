use crate::{
    auth::{access::visible_task, CurrentUser},
    error::AppError,
    models::{CommentInput, TaskComment},
    routes::tasks::COMMENTS_QUERY,
};
use actix_web::{delete, get, post, web, HttpResponse, Responder};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

#[get("/{id}/comments")]
pub async fn list_comments(
    pool: web::Data<PgPool>,
    user: CurrentUser,
    task_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let task = visible_task(&pool, task_id.into_inner(), &user).await?;

    let comments = sqlx::query_as::<_, TaskComment>(COMMENTS_QUERY)
        .bind(task.id)
        .fetch_all(&**pool)
        .await?;

    Ok(HttpResponse::Ok().json(comments))
}

#[post("/{id}/comments")]
pub async fn add_comment(
    pool: web::Data<PgPool>,
    user: CurrentUser,
    task_id: web::Path<Uuid>,
    input: web::Json<CommentInput>,
) -> Result<impl Responder, AppError> {
    input.validate()?;
    let task = visible_task(&pool, task_id.into_inner(), &user).await?;

    let comment = sqlx::query_as::<_, TaskComment>(
        "WITH inserted AS ( \
             INSERT INTO task_comments (id, task_id, author_id, body) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, task_id, author_id, body, created_at) \
         SELECT i.id, i.task_id, i.author_id, u.username AS author_username, i.body, i.created_at \
         FROM inserted i JOIN users u ON u.id = i.author_id",
    )
    .bind(Uuid::new_v4())
    .bind(task.id)
    .bind(user.id)
    .bind(&input.body)
    .fetch_one(&**pool)
    .await?;

    Ok(HttpResponse::Created().json(comment))
}

/// Delete a comment. Only its author or an admin may do this.
#[delete("/{id}")]
pub async fn delete_comment(
    pool: web::Data<PgPool>,
    user: CurrentUser,
    comment_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let comment_id = comment_id.into_inner();

    let (task_id, author_id) = sqlx::query_as::<_, (Uuid, i32)>(
        "SELECT task_id, author_id FROM task_comments WHERE id = $1",
    )
    .bind(comment_id)
    .fetch_optional(&**pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Comment not found".into()))?;

    visible_task(&pool, task_id, &user)
        .await
        .map_err(|e| {
            e.or_if_not_found(|| AppError::NotFound("Comment not found".into()))
        })?;

    if author_id != user.id && !user.is_admin() {
        return Err(AppError::Forbidden(
            "Only the author or an admin can delete a comment".into(),
        ));
    }

    sqlx::query("DELETE FROM task_comments WHERE id = $1")
        .bind(comment_id)
        .execute(&**pool)
        .await?;

    Ok(HttpResponse::NoContent().finish())
}
