//! Administrator-only endpoints: user management and the registration queue.
//! Every handler starts with `require_admin`, so other roles get `403 Forbidden`.

use crate::{
    auth::CurrentUser,
    error::AppError,
    models::{
        registration::REGISTRATION_COLUMNS,
        user::{AssignManagerInput, PromoteInput, SetActiveInput, USER_COLUMNS},
        ApprovalLogEntry, ApproveInput, RegistrationEntry, RegistrationQuery, RegistrationStatus,
        RejectInput, Role, User,
    },
    routes::profile::fetch_user,
};
use actix_web::{get, post, put, web, HttpResponse, Responder};
use serde::de::DeserializeOwned;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

/// Parses an optional JSON body. An empty body means the defaults; anything else
/// must parse, so a typo is reported instead of being replaced by the defaults.
fn optional_json<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::BadRequest(format!("Invalid JSON body: {}", e)))
}

#[get("/users")]
pub async fn list_users(
    pool: web::Data<PgPool>,
    user: CurrentUser,
) -> Result<impl Responder, AppError> {
    user.require_admin()?;
    let users = sqlx::query_as::<_, User>(&format!("SELECT {} FROM users ORDER BY id", USER_COLUMNS))
        .fetch_all(&**pool)
        .await?;
    Ok(HttpResponse::Ok().json(users))
}

/// Change a user's role.
///
/// An admin cannot change their own role, which keeps at least the acting admin in place.
#[post("/users/{id}/promote")]
pub async fn promote_user(
    pool: web::Data<PgPool>,
    user: CurrentUser,
    target_id: web::Path<i32>,
    input: web::Json<PromoteInput>,
) -> Result<impl Responder, AppError> {
    user.require_admin()?;
    let target_id = target_id.into_inner();

    if target_id == user.id && input.role != Role::Admin {
        return Err(AppError::BadRequest("Admins cannot demote themselves".into()));
    }

    let updated = sqlx::query_as::<_, User>(&format!(
        "UPDATE users SET role = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
        USER_COLUMNS
    ))
    .bind(target_id)
    .bind(input.role)
    .fetch_optional(&**pool)
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    log::info!(
        "admin {} set role of user {} to {}",
        user.id,
        updated.id,
        updated.role.as_str()
    );
    Ok(HttpResponse::Ok().json(updated))
}

/// Set or clear the manager a user reports to.
#[put("/users/{id}/manager")]
pub async fn assign_manager(
    pool: web::Data<PgPool>,
    user: CurrentUser,
    target_id: web::Path<i32>,
    input: web::Json<AssignManagerInput>,
) -> Result<impl Responder, AppError> {
    user.require_admin()?;
    let target_id = target_id.into_inner();

    if let Some(manager_id) = input.manager_id {
        if manager_id == target_id {
            return Err(AppError::BadRequest("A user cannot manage themselves".into()));
        }
        let manager = fetch_user(&pool, manager_id)
            .await
            .map_err(|e| {
                e.or_if_not_found(|| AppError::BadRequest("Manager does not exist".into()))
            })?;
        if !manager.role.can_lead() {
            return Err(AppError::BadRequest(
                "Manager must have the manager or admin role".into(),
            ));
        }
    }

    let updated = sqlx::query_as::<_, User>(&format!(
        "UPDATE users SET manager_id = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
        USER_COLUMNS
    ))
    .bind(target_id)
    .bind(input.manager_id)
    .fetch_optional(&**pool)
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    Ok(HttpResponse::Ok().json(updated))
}

#[put("/users/{id}/active")]
pub async fn set_active(
    pool: web::Data<PgPool>,
    user: CurrentUser,
    target_id: web::Path<i32>,
    input: web::Json<SetActiveInput>,
) -> Result<impl Responder, AppError> {
    user.require_admin()?;
    let target_id = target_id.into_inner();

    if target_id == user.id && !input.is_active {
        return Err(AppError::BadRequest("Admins cannot deactivate themselves".into()));
    }

    let updated = sqlx::query_as::<_, User>(&format!(
        "UPDATE users SET is_active = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
        USER_COLUMNS
    ))
    .bind(target_id)
    .bind(input.is_active)
    .fetch_optional(&**pool)
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    log::info!(
        "admin {} set user {} active={}",
        user.id,
        updated.id,
        updated.is_active
    );
    Ok(HttpResponse::Ok().json(updated))
}

/// Queue entries with the given status (pending by default), oldest first.
#[get("/registrations")]
pub async fn list_registrations(
    pool: web::Data<PgPool>,
    user: CurrentUser,
    query: web::Query<RegistrationQuery>,
) -> Result<impl Responder, AppError> {
    user.require_admin()?;
    let status = query.status.unwrap_or(RegistrationStatus::Pending);

    let entries = sqlx::query_as::<_, RegistrationEntry>(&format!(
        "SELECT {} FROM user_registration_queue WHERE status = $1 ORDER BY created_at ASC",
        REGISTRATION_COLUMNS
    ))
    .bind(status)
    .fetch_all(&**pool)
    .await?;

    Ok(HttpResponse::Ok().json(entries))
}

/// Approve a pending signup and create the account.
///
/// Runs in one transaction: the queue row is locked, the user is inserted with the
/// password hash captured at signup, the entry is marked approved and a log row is written.
///
/// ## Responses:
/// - `201 Created`: the new `User`.
/// - `400 Bad Request`: the entry was already decided, the manager is invalid, or the
///   body is not valid JSON.
/// - `404 Not Found`: no such entry.
/// - `409 Conflict`: the username or email was taken since the signup.
#[post("/registrations/{id}/approve")]
pub async fn approve_registration(
    pool: web::Data<PgPool>,
    user: CurrentUser,
    queue_id: web::Path<Uuid>,
    body: web::Bytes,
) -> Result<impl Responder, AppError> {
    user.require_admin()?;
    let queue_id = queue_id.into_inner();
    let input: ApproveInput = optional_json(&body)?;
    let role = input.role.unwrap_or(Role::User);

    if let Some(manager_id) = input.manager_id {
        let manager = fetch_user(&pool, manager_id)
            .await
            .map_err(|e| {
                e.or_if_not_found(|| AppError::BadRequest("Manager does not exist".into()))
            })?;
        if !manager.role.can_lead() {
            return Err(AppError::BadRequest(
                "Manager must have the manager or admin role".into(),
            ));
        }
    }

    let mut tx = pool.begin().await?;

    let entry = sqlx::query_as::<_, RegistrationEntry>(&format!(
        "SELECT {} FROM user_registration_queue WHERE id = $1 FOR UPDATE",
        REGISTRATION_COLUMNS
    ))
    .bind(queue_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound("Registration not found".into()))?;

    if entry.status != RegistrationStatus::Pending {
        return Err(AppError::BadRequest(
            "Registration has already been reviewed".into(),
        ));
    }

    let created = sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (username, email, full_name, password_hash, role, manager_id) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
        USER_COLUMNS
    ))
    .bind(&entry.username)
    .bind(&entry.email)
    .bind(&entry.full_name)
    .bind(&entry.password_hash)
    .bind(role)
    .bind(input.manager_id)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        "UPDATE user_registration_queue \
         SET status = $2, reviewed_by = $3, reviewed_at = NOW() WHERE id = $1",
    )
    .bind(entry.id)
    .bind(RegistrationStatus::Approved)
    .bind(user.id)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "INSERT INTO admin_approval_log (id, queue_id, admin_id, action, note) \
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(Uuid::new_v4())
    .bind(entry.id)
    .bind(user.id)
    .bind(RegistrationStatus::Approved)
    .bind(format!("approved as {}", role.as_str()))
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    log::info!(
        "admin {} approved registration {} as user {}",
        user.id,
        entry.id,
        created.id
    );
    Ok(HttpResponse::Created().json(created))
}

/// Reject a pending signup. The entry stays in the queue for the applicant to look up.
///
/// ## Responses:
/// - `200 OK`: the updated entry.
/// - `400 Bad Request`: the entry was already decided, or the body is not valid JSON.
/// - `404 Not Found`: no such entry.
#[post("/registrations/{id}/reject")]
pub async fn reject_registration(
    pool: web::Data<PgPool>,
    user: CurrentUser,
    queue_id: web::Path<Uuid>,
    body: web::Bytes,
) -> Result<impl Responder, AppError> {
    user.require_admin()?;
    let input: RejectInput = optional_json(&body)?;
    input.validate()?;

    let mut tx = pool.begin().await?;

    let pending = sqlx::query_as::<_, RegistrationEntry>(&format!(
        "SELECT {} FROM user_registration_queue WHERE id = $1 FOR UPDATE",
        REGISTRATION_COLUMNS
    ))
    .bind(queue_id.into_inner())
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound("Registration not found".into()))?;

    if pending.status != RegistrationStatus::Pending {
        return Err(AppError::BadRequest(
            "Registration has already been reviewed".into(),
        ));
    }

    let entry = sqlx::query_as::<_, RegistrationEntry>(&format!(
        "UPDATE user_registration_queue \
         SET status = $2, reviewed_by = $3, reviewed_at = NOW(), rejection_reason = $4 \
         WHERE id = $1 RETURNING {}",
        REGISTRATION_COLUMNS
    ))
    .bind(pending.id)
    .bind(RegistrationStatus::Rejected)
    .bind(user.id)
    .bind(&input.reason)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        "INSERT INTO admin_approval_log (id, queue_id, admin_id, action, note) \
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(Uuid::new_v4())
    .bind(entry.id)
    .bind(user.id)
    .bind(RegistrationStatus::Rejected)
    .bind(&input.reason)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    log::info!("admin {} rejected registration {}", user.id, entry.id);
    Ok(HttpResponse::Ok().json(entry))
}

/// Review decisions, newest first.
#[get("/approval-log")]
pub async fn approval_log(
    pool: web::Data<PgPool>,
    user: CurrentUser,
) -> Result<impl Responder, AppError> {
    user.require_admin()?;
    let entries = sqlx::query_as::<_, ApprovalLogEntry>(
        "SELECT l.id, l.queue_id, l.admin_id, u.username AS admin_username, \
                q.email AS applicant_email, l.action, l.note, l.created_at \
         FROM admin_approval_log l \
         JOIN users u ON u.id = l.admin_id \
         JOIN user_registration_queue q ON q.id = l.queue_id \
         ORDER BY l.created_at DESC \
         LIMIT 500",
    )
    .fetch_all(&**pool)
    .await?;

    Ok(HttpResponse::Ok().json(entries))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_body_uses_defaults() {
        let input: ApproveInput = optional_json(b"").unwrap();
        assert!(input.role.is_none());
        assert!(input.manager_id.is_none());

        let input: RejectInput = optional_json(b"  \n").unwrap();
        assert!(input.reason.is_none());
    }

    #[test]
    fn test_body_is_parsed_when_present() {
        let input: ApproveInput = optional_json(br#"{"role": "manager", "manager_id": 3}"#).unwrap();
        assert_eq!(input.role, Some(Role::Manager));
        assert_eq!(input.manager_id, Some(3));
    }

    #[test]
    fn test_malformed_body_is_rejected() {
        let bodies: [&[u8]; 3] = [br#"{"role": "owner"}"#, b"{not json", br#"{"manager_id": "three"}"#];
        for body in bodies {
            let result = optional_json::<ApproveInput>(body);
            assert!(
                matches!(result, Err(AppError::BadRequest(_))),
                "{:?} should be refused",
                String::from_utf8_lossy(body)
            );
        }

        assert!(matches!(
            optional_json::<RejectInput>(br#"{"reason": 42}"#),
            Err(AppError::BadRequest(_))
        ));
    }
}
