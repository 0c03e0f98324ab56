use crate::{
    auth::CurrentUser,
    error::AppError,
    models::{
        stats::{RoleCounts, TeamMemberSummary, TodoCounts},
        task::TASK_COLUMNS,
        AdminDashboard, ManagerDashboard, Role, StatsScope, Task, UserDashboard,
    },
    routes::reports::task_stats,
};
use actix_web::{get, web, HttpResponse, Responder};
use sqlx::PgPool;

/// Days ahead covered by the "due soon" list.
const DUE_SOON_DAYS: i32 = 7;

/// Personal dashboard, available to every role.
#[get("")]
pub async fn user_dashboard(
    pool: web::Data<PgPool>,
    user: CurrentUser,
) -> Result<impl Responder, AppError> {
    let tasks = task_stats(&pool, StatsScope::Assignee(user.id)).await?;

    let (total, completed) = sqlx::query_as::<_, (i64, i64)>(
        "SELECT COUNT(*), COUNT(*) FILTER (WHERE completed) FROM todos WHERE user_id = $1",
    )
    .bind(user.id)
    .fetch_one(&**pool)
    .await?;

    let due_soon = sqlx::query_as::<_, Task>(&format!(
        "SELECT {} FROM tasks WHERE assignee_id = $1 AND status <> 'done' \
         AND due_date IS NOT NULL AND due_date <= NOW() + make_interval(days => $2) \
         ORDER BY due_date ASC LIMIT 20",
        TASK_COLUMNS
    ))
    .bind(user.id)
    .bind(DUE_SOON_DAYS)
    .fetch_all(&**pool)
    .await?;

    Ok(HttpResponse::Ok().json(UserDashboard {
        tasks,
        todos: TodoCounts::new(total, completed),
        due_soon,
    }))
}

/// Team overview for managers (and admins looking at their own reports).
#[get("/manager")]
pub async fn manager_dashboard(
    pool: web::Data<PgPool>,
    user: CurrentUser,
) -> Result<impl Responder, AppError> {
    user.require_lead()?;

    let team = sqlx::query_as::<_, TeamMemberSummary>(
        "SELECT u.id AS user_id, u.username, u.full_name, \
                COUNT(t.id) FILTER (WHERE t.status <> 'done') AS open_tasks, \
                COUNT(t.id) FILTER (WHERE t.status = 'done') AS done_tasks, \
                COUNT(t.id) FILTER (WHERE t.status <> 'done' AND t.due_date < NOW()) AS overdue_tasks \
         FROM users u LEFT JOIN tasks t ON t.assignee_id = u.id \
         WHERE u.manager_id = $1 \
         GROUP BY u.id, u.username, u.full_name \
         ORDER BY u.username",
    )
    .bind(user.id)
    .fetch_all(&**pool)
    .await?;

    let owned_projects =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM projects WHERE owner_id = $1")
            .bind(user.id)
            .fetch_one(&**pool)
            .await?;

    let tasks = task_stats(&pool, StatsScope::Team(user.id)).await?;

    Ok(HttpResponse::Ok().json(ManagerDashboard {
        team,
        owned_projects,
        tasks,
    }))
}

/// System-wide figures. Admins only.
#[get("/admin")]
pub async fn admin_dashboard(
    pool: web::Data<PgPool>,
    user: CurrentUser,
) -> Result<impl Responder, AppError> {
    user.require_admin()?;

    let role_counts = sqlx::query_as::<_, (Role, i64)>(
        "SELECT role, COUNT(*) FROM users GROUP BY role",
    )
    .fetch_all(&**pool)
    .await?;

    let inactive_users =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE NOT is_active")
            .fetch_one(&**pool)
            .await?;

    let pending_registrations = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM user_registration_queue WHERE status = 'pending'",
    )
    .fetch_one(&**pool)
    .await?;

    let projects = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM projects")
        .fetch_one(&**pool)
        .await?;

    let tasks = task_stats(&pool, StatsScope::All).await?;

    Ok(HttpResponse::Ok().json(AdminDashboard {
        users_by_role: RoleCounts::from_counts(&role_counts),
        inactive_users,
        pending_registrations,
        projects,
        tasks,
    }))
}
