use crate::{
    auth::{
        generate_token, hash_password,
        session::{expired_session_cookie, session_cookie},
        verify_password, AuthResponse, LoginRequest,
    },
    config::Config,
    error::AppError,
    models::{
        registration::REGISTRATION_COLUMNS, QueueStatus, RegisterRequest, RegistrationEntry,
        RegistrationStatus, Role,
    },
};
use actix_web::{get, post, web, HttpResponse, Responder};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

/// Computes the applicant-facing status of a queue entry.
pub async fn queue_status(pool: &PgPool, entry: &RegistrationEntry) -> Result<QueueStatus, AppError> {
    let ahead = if entry.status == RegistrationStatus::Pending {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM user_registration_queue WHERE status = 'pending' AND created_at < $1",
        )
        .bind(entry.created_at)
        .fetch_one(pool)
        .await?
    } else {
        0
    };
    Ok(QueueStatus::new(entry, ahead))
}

/// Submit a signup for admin approval.
///
/// The account is not created here; the request is parked in the registration queue
/// and the response tells the applicant their place in line.
///
/// ## Responses:
/// - `202 Accepted`: `QueueStatus` of the new entry.
/// - `400 Bad Request`: email or username already used by an account or a pending signup.
/// - `422 Unprocessable Entity`: validation failed.
#[post("/register")]
pub async fn register(
    pool: web::Data<PgPool>,
    register_data: web::Json<RegisterRequest>,
) -> Result<impl Responder, AppError> {
    register_data.validate()?;
    let email = register_data.email.trim().to_lowercase();

    let existing_users = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM users WHERE email = $1 OR lower(username) = lower($2)",
    )
    .bind(&email)
    .bind(&register_data.username)
    .fetch_one(&**pool)
    .await?;
    if existing_users > 0 {
        return Err(AppError::BadRequest(
            "Email or username already registered".into(),
        ));
    }

    let pending = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM user_registration_queue \
         WHERE status = 'pending' AND (email = $1 OR lower(username) = lower($2))",
    )
    .bind(&email)
    .bind(&register_data.username)
    .fetch_one(&**pool)
    .await?;
    if pending > 0 {
        return Err(AppError::BadRequest(
            "A registration for this email or username is already pending".into(),
        ));
    }

    let password_hash = hash_password(&register_data.password)?;

    let entry = sqlx::query_as::<_, RegistrationEntry>(&format!(
        "INSERT INTO user_registration_queue (id, username, email, full_name, password_hash) \
         VALUES ($1, $2, $3, $4, $5) RETURNING {}",
        REGISTRATION_COLUMNS
    ))
    .bind(Uuid::new_v4())
    .bind(&register_data.username)
    .bind(&email)
    .bind(&register_data.full_name)
    .bind(password_hash)
    .fetch_one(&**pool)
    .await?;

    log::info!("registration {} queued for {}", entry.id, entry.email);

    let status = queue_status(&pool, &entry).await?;
    Ok(HttpResponse::Accepted().json(status))
}

/// Position and ETA of a signup, looked up by its queue id.
#[get("/registration/{id}")]
pub async fn registration_status(
    pool: web::Data<PgPool>,
    queue_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let entry = sqlx::query_as::<_, RegistrationEntry>(&format!(
        "SELECT {} FROM user_registration_queue WHERE id = $1",
        REGISTRATION_COLUMNS
    ))
    .bind(queue_id.into_inner())
    .fetch_optional(&**pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Registration not found".into()))?;

    Ok(HttpResponse::Ok().json(queue_status(&pool, &entry).await?))
}

/// Login user
///
/// Authenticates a user, sets the session cookie and returns the token.
#[post("/login")]
pub async fn login(
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    login_data.validate()?;
    let email = login_data.email.trim().to_lowercase();

    let user = sqlx::query_as::<_, (i32, String, Role, bool)>(
        "SELECT id, password_hash, role, is_active FROM users WHERE email = $1",
    )
    .bind(&email)
    .fetch_optional(&**pool)
    .await?;

    let Some((user_id, password_hash, role, is_active)) = user else {
        let queued = sqlx::query_scalar::<_, RegistrationStatus>(
            "SELECT status FROM user_registration_queue WHERE email = $1 \
             ORDER BY created_at DESC LIMIT 1",
        )
        .bind(&email)
        .fetch_optional(&**pool)
        .await?;

        return Err(match queued {
            Some(RegistrationStatus::Pending) => {
                AppError::Forbidden("Your registration is awaiting admin approval".into())
            }
            Some(RegistrationStatus::Rejected) => {
                AppError::Forbidden("Your registration was rejected".into())
            }
            _ => AppError::Unauthorized("Invalid credentials".into()),
        });
    };

    if !verify_password(&login_data.password, &password_hash)? {
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    }
    if !is_active {
        return Err(AppError::Forbidden("Account is deactivated".into()));
    }

    let token = generate_token(user_id, role)?;
    log::info!("user {} logged in", user_id);

    Ok(HttpResponse::Ok()
        .cookie(session_cookie(&token, config.cookie_secure))
        .json(AuthResponse {
            token,
            user_id,
            role,
        }))
}

/// Ends the browser session by expiring the cookie.
#[post("/logout")]
pub async fn logout(config: web::Data<Config>) -> impl Responder {
    HttpResponse::NoContent()
        .cookie(expired_session_cookie(config.cookie_secure))
        .finish()
}
