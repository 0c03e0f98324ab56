use crate::{
    auth::{
        access::{is_member, managed_project, visible_project},
        CurrentUser,
    },
    error::AppError,
    models::{
        project::{DEFAULT_TASK_LISTS, PROJECT_COLUMNS},
        task::TASK_COLUMNS,
        task_list::TASK_LIST_COLUMNS,
        AddMemberInput, Board, Project, ProjectInput, ProjectMember, ProjectUpdate, Task, TaskList,
    },
};
use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

/// Projects visible to the caller: all of them for admins, otherwise memberships.
#[get("")]
pub async fn list_projects(
    pool: web::Data<PgPool>,
    user: CurrentUser,
) -> Result<impl Responder, AppError> {
    let projects = if user.is_admin() {
        sqlx::query_as::<_, Project>(&format!(
            "SELECT {} FROM projects ORDER BY created_at DESC",
            PROJECT_COLUMNS
        ))
        .fetch_all(&**pool)
        .await?
    } else {
        sqlx::query_as::<_, Project>(
            "SELECT p.id, p.name, p.description, p.owner_id, p.created_at, p.updated_at \
             FROM projects p JOIN project_members m ON m.project_id = p.id \
             WHERE m.user_id = $1 ORDER BY p.created_at DESC",
        )
        .bind(user.id)
        .fetch_all(&**pool)
        .await?
    };

    Ok(HttpResponse::Ok().json(projects))
}

/// Create a project with the default `To Do` / `In Progress` / `Done` lists.
///
/// Managers and admins only. The creator becomes owner and first member.
///
/// ## Responses:
/// - `201 Created`: the new `Project`.
/// - `403 Forbidden`: caller has the `user` role.
/// - `422 Unprocessable Entity`: validation failed.
#[post("")]
pub async fn create_project(
    pool: web::Data<PgPool>,
    user: CurrentUser,
    input: web::Json<ProjectInput>,
) -> Result<impl Responder, AppError> {
    user.require_lead()?;
    input.validate()?;

    let mut tx = pool.begin().await?;

    let project = sqlx::query_as::<_, Project>(&format!(
        "INSERT INTO projects (id, name, description, owner_id) VALUES ($1, $2, $3, $4) RETURNING {}",
        PROJECT_COLUMNS
    ))
    .bind(Uuid::new_v4())
    .bind(&input.name)
    .bind(&input.description)
    .bind(user.id)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("INSERT INTO project_members (project_id, user_id) VALUES ($1, $2)")
        .bind(project.id)
        .bind(user.id)
        .execute(&mut *tx)
        .await?;

    for (position, name) in DEFAULT_TASK_LISTS.iter().enumerate() {
        sqlx::query("INSERT INTO task_lists (id, project_id, name, position) VALUES ($1, $2, $3, $4)")
            .bind(Uuid::new_v4())
            .bind(project.id)
            .bind(*name)
            .bind(position as i32)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    log::info!("user {} created project {}", user.id, project.id);
    Ok(HttpResponse::Created().json(project))
}

#[get("/{id}")]
pub async fn get_project(
    pool: web::Data<PgPool>,
    user: CurrentUser,
    project_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let project = visible_project(&pool, project_id.into_inner(), &user).await?;
    Ok(HttpResponse::Ok().json(project))
}

#[put("/{id}")]
pub async fn update_project(
    pool: web::Data<PgPool>,
    user: CurrentUser,
    project_id: web::Path<Uuid>,
    input: web::Json<ProjectUpdate>,
) -> Result<impl Responder, AppError> {
    input.validate()?;
    let project = managed_project(&pool, project_id.into_inner(), &user).await?;

    let updated = sqlx::query_as::<_, Project>(&format!(
        "UPDATE projects SET name = COALESCE($2, name), \
                             description = CASE WHEN $3 THEN $4 ELSE description END, \
                             updated_at = NOW() \
         WHERE id = $1 RETURNING {}",
        PROJECT_COLUMNS
    ))
    .bind(project.id)
    .bind(&input.name)
    .bind(input.description.is_some())
    .bind(input.description.as_ref().and_then(|d| d.as_deref()))
    .fetch_one(&**pool)
    .await?;

    Ok(HttpResponse::Ok().json(updated))
}

/// Delete a project with all its lists, tasks and memberships.
#[delete("/{id}")]
pub async fn delete_project(
    pool: web::Data<PgPool>,
    user: CurrentUser,
    project_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let project = managed_project(&pool, project_id.into_inner(), &user).await?;

    sqlx::query("DELETE FROM projects WHERE id = $1")
        .bind(project.id)
        .execute(&**pool)
        .await?;

    log::info!("user {} deleted project {}", user.id, project.id);
    Ok(HttpResponse::NoContent().finish())
}

#[get("/{id}/members")]
pub async fn list_members(
    pool: web::Data<PgPool>,
    user: CurrentUser,
    project_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let project = visible_project(&pool, project_id.into_inner(), &user).await?;

    let members = sqlx::query_as::<_, ProjectMember>(
        "SELECT u.id AS user_id, u.username, u.full_name, u.role, m.added_at \
         FROM project_members m JOIN users u ON u.id = m.user_id \
         WHERE m.project_id = $1 ORDER BY m.added_at",
    )
    .bind(project.id)
    .fetch_all(&**pool)
    .await?;

    Ok(HttpResponse::Ok().json(members))
}

#[post("/{id}/members")]
pub async fn add_member(
    pool: web::Data<PgPool>,
    user: CurrentUser,
    project_id: web::Path<Uuid>,
    input: web::Json<AddMemberInput>,
) -> Result<impl Responder, AppError> {
    let project = managed_project(&pool, project_id.into_inner(), &user).await?;

    let active = sqlx::query_scalar::<_, bool>("SELECT is_active FROM users WHERE id = $1")
        .bind(input.user_id)
        .fetch_optional(&**pool)
        .await?;
    match active {
        None => return Err(AppError::BadRequest("User does not exist".into())),
        Some(false) => return Err(AppError::BadRequest("User is deactivated".into())),
        Some(true) => {}
    }

    if is_member(&pool, project.id, input.user_id).await? {
        return Err(AppError::Conflict("User is already a member".into()));
    }

    sqlx::query("INSERT INTO project_members (project_id, user_id) VALUES ($1, $2)")
        .bind(project.id)
        .bind(input.user_id)
        .execute(&**pool)
        .await?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "project_id": project.id,
        "user_id": input.user_id
    })))
}

/// Remove a member. Their task assignments in the project are cleared.
#[delete("/{id}/members/{user_id}")]
pub async fn remove_member(
    pool: web::Data<PgPool>,
    user: CurrentUser,
    path: web::Path<(Uuid, i32)>,
) -> Result<impl Responder, AppError> {
    let (project_id, member_id) = path.into_inner();
    let project = managed_project(&pool, project_id, &user).await?;

    if member_id == project.owner_id {
        return Err(AppError::BadRequest("The project owner cannot be removed".into()));
    }

    let mut tx = pool.begin().await?;

    let removed = sqlx::query("DELETE FROM project_members WHERE project_id = $1 AND user_id = $2")
        .bind(project.id)
        .bind(member_id)
        .execute(&mut *tx)
        .await?;
    if removed.rows_affected() == 0 {
        return Err(AppError::NotFound("Member not found".into()));
    }

    sqlx::query("UPDATE tasks SET assignee_id = NULL WHERE project_id = $1 AND assignee_id = $2")
        .bind(project.id)
        .bind(member_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(HttpResponse::NoContent().finish())
}

/// The kanban board: every list in order, each with its tasks in order.
#[get("/{id}/board")]
pub async fn get_board(
    pool: web::Data<PgPool>,
    user: CurrentUser,
    project_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let project = visible_project(&pool, project_id.into_inner(), &user).await?;

    let lists = sqlx::query_as::<_, TaskList>(&format!(
        "SELECT {} FROM task_lists WHERE project_id = $1 ORDER BY position, created_at",
        TASK_LIST_COLUMNS
    ))
    .bind(project.id)
    .fetch_all(&**pool)
    .await?;

    let tasks = sqlx::query_as::<_, Task>(&format!(
        "SELECT {} FROM tasks WHERE project_id = $1 ORDER BY position",
        TASK_COLUMNS
    ))
    .bind(project.id)
    .fetch_all(&**pool)
    .await?;

    Ok(HttpResponse::Ok().json(Board::assemble(project, lists, tasks)))
}
