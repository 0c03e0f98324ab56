use crate::{
    auth::{hash_password, verify_password, CurrentUser},
    error::AppError,
    models::{user::USER_COLUMNS, ChangePasswordInput, UpdateProfileInput, User},
};
use actix_web::{get, put, web, HttpResponse, Responder};
use sqlx::PgPool;
use validator::Validate;

pub async fn fetch_user(pool: &PgPool, user_id: i32) -> Result<User, AppError> {
    sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

/// The signed-in user's account.
#[get("")]
pub async fn get_profile(
    pool: web::Data<PgPool>,
    user: CurrentUser,
) -> Result<impl Responder, AppError> {
    Ok(HttpResponse::Ok().json(fetch_user(&pool, user.id).await?))
}

/// Update username, email or display name.
///
/// ## Responses:
/// - `200 OK`: the updated `User`.
/// - `400 Bad Request`: the username or email belongs to another account.
/// - `422 Unprocessable Entity`: validation failed.
#[put("")]
pub async fn update_profile(
    pool: web::Data<PgPool>,
    user: CurrentUser,
    input: web::Json<UpdateProfileInput>,
) -> Result<impl Responder, AppError> {
    input.validate()?;
    let email = input.email.as_ref().map(|e| e.trim().to_lowercase());

    let clash = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM users WHERE id <> $1 AND (email = $2 OR lower(username) = lower($3))",
    )
    .bind(user.id)
    .bind(&email)
    .bind(&input.username)
    .fetch_one(&**pool)
    .await?;
    if clash > 0 {
        return Err(AppError::BadRequest(
            "Email or username already in use".into(),
        ));
    }

    let updated = sqlx::query_as::<_, User>(&format!(
        "UPDATE users SET \
             username = COALESCE($2, username), \
             email = COALESCE($3, email), \
             full_name = COALESCE($4, full_name), \
             updated_at = NOW() \
         WHERE id = $1 RETURNING {}",
        USER_COLUMNS
    ))
    .bind(user.id)
    .bind(&input.username)
    .bind(&email)
    .bind(&input.full_name)
    .fetch_one(&**pool)
    .await?;

    Ok(HttpResponse::Ok().json(updated))
}

#[put("/password")]
pub async fn change_password(
    pool: web::Data<PgPool>,
    user: CurrentUser,
    input: web::Json<ChangePasswordInput>,
) -> Result<impl Responder, AppError> {
    input.validate()?;

    let current_hash =
        sqlx::query_scalar::<_, String>("SELECT password_hash FROM users WHERE id = $1")
            .bind(user.id)
            .fetch_one(&**pool)
            .await?;

    if !verify_password(&input.current_password, &current_hash)? {
        return Err(AppError::BadRequest("Current password is incorrect".into()));
    }

    let new_hash = hash_password(&input.new_password)?;
    sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
        .bind(user.id)
        .bind(new_hash)
        .execute(&**pool)
        .await?;

    log::info!("user {} changed their password", user.id);
    Ok(HttpResponse::NoContent().finish())
}
