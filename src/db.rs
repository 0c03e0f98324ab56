//! Connection pool setup, schema migrations and the first-start admin account.

use crate::{
    auth::hash_password,
    config::{BootstrapAdmin, Config},
    error::AppError,
    models::Role,
};
use sqlx::{postgres::PgPoolOptions, PgPool};

pub async fn connect(config: &Config) -> Result<PgPool, AppError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;
    Ok(pool)
}

/// Applies everything under `migrations/` that has not run yet.
pub async fn migrate(pool: &PgPool) -> Result<(), AppError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Creates the configured admin when the system has no active admin.
///
/// Returns `true` if an account was inserted.
pub async fn seed_admin(pool: &PgPool, admin: &BootstrapAdmin) -> Result<bool, AppError> {
    let admins = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM users WHERE role = 'admin' AND is_active",
    )
    .fetch_one(pool)
    .await?;
    if admins > 0 {
        return Ok(false);
    }

    let password_hash = hash_password(&admin.password)?;
    let result = sqlx::query(
        "INSERT INTO users (username, email, password_hash, role) VALUES ($1, $2, $3, $4) \
         ON CONFLICT DO NOTHING",
    )
    .bind(&admin.username)
    .bind(admin.email.trim().to_lowercase())
    .bind(password_hash)
    .bind(Role::Admin)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        log::warn!(
            "Bootstrap admin {} was not created: the username or email is taken",
            admin.email
        );
        return Ok(false);
    }

    log::info!("Created bootstrap admin account {}", admin.email);
    Ok(true)
}
