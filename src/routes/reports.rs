use crate::{
    auth::CurrentUser,
    error::AppError,
    models::{StatsScope, TaskPriority, TaskStats, TaskStatus},
};
use actix_web::{get, web, HttpResponse, Responder};
use sqlx::PgPool;

/// Runs the three aggregate queries behind `TaskStats` for a scope.
pub async fn task_stats(pool: &PgPool, scope: StatsScope) -> Result<TaskStats, AppError> {
    let (predicate, bind) = scope.predicate();

    let status_sql = format!(
        "SELECT t.status, COUNT(*) FROM tasks t WHERE {} GROUP BY t.status",
        predicate
    );
    let priority_sql = format!(
        "SELECT t.priority, COUNT(*) FROM tasks t WHERE {} GROUP BY t.priority",
        predicate
    );
    let overdue_sql = format!(
        "SELECT COUNT(*) FROM tasks t WHERE {} AND t.status <> 'done' AND t.due_date < NOW()",
        predicate
    );

    let mut status_query = sqlx::query_as::<_, (TaskStatus, i64)>(&status_sql);
    let mut priority_query = sqlx::query_as::<_, (TaskPriority, i64)>(&priority_sql);
    let mut overdue_query = sqlx::query_scalar::<_, i64>(&overdue_sql);
    if let Some(id) = bind {
        status_query = status_query.bind(id);
        priority_query = priority_query.bind(id);
        overdue_query = overdue_query.bind(id);
    }

    let status_counts = status_query.fetch_all(pool).await?;
    let priority_counts = priority_query.fetch_all(pool).await?;
    let overdue = overdue_query.fetch_one(pool).await?;

    Ok(TaskStats::from_counts(&status_counts, &priority_counts, overdue))
}

/// Task statistics scoped by the caller's role.
///
/// Admins get every task, managers the tasks of their projects and direct reports,
/// users the tasks assigned to them.
#[get("/stats")]
pub async fn report_stats(
    pool: web::Data<PgPool>,
    user: CurrentUser,
) -> Result<impl Responder, AppError> {
    let scope = StatsScope::for_role(user.id, user.role);
    Ok(HttpResponse::Ok().json(task_stats(&pool, scope).await?))
}
