use actix_web::dev::Payload;
use actix_web::{web, Error as ActixError, FromRequest, HttpMessage, HttpRequest};
use futures::future::LocalBoxFuture;
use sqlx::PgPool;

use crate::auth::token::Claims;
use crate::error::AppError;
use crate::models::Role;

/// The account behind the current request, resolved from the session claims.
///
/// The role and active flag are re-read from `users` on every request, so a promotion
/// or deactivation takes effect without waiting for the token to expire.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i32,
    pub username: String,
    pub role: Role,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Fails with `Forbidden` unless the user has one of `roles`.
    pub fn require_any(&self, roles: &[Role]) -> Result<(), AppError> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "This action requires one of the roles: {}",
                roles.iter().map(|r| r.as_str()).collect::<Vec<_>>().join(", ")
            )))
        }
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        self.require_any(&[Role::Admin])
    }

    pub fn require_lead(&self) -> Result<(), AppError> {
        self.require_any(&[Role::Admin, Role::Manager])
    }
}

impl FromRequest for CurrentUser {
    type Error = ActixError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let claims = req.extensions().get::<Claims>().cloned();
        let pool = req.app_data::<web::Data<PgPool>>().cloned();

        Box::pin(async move {
            let claims = claims.ok_or_else(|| {
                AppError::Unauthorized(
                    "Session not found in request. Ensure AuthMiddleware is active.".to_string(),
                )
            })?;
            let pool = pool.ok_or_else(|| {
                AppError::InternalServerError("Database pool is not configured".to_string())
            })?;

            let row = sqlx::query_as::<_, (i32, String, Role, bool)>(
                "SELECT id, username, role, is_active FROM users WHERE id = $1",
            )
            .bind(claims.sub)
            .fetch_optional(pool.get_ref())
            .await
            .map_err(AppError::from)?;

            match row {
                Some((id, username, role, true)) => Ok(CurrentUser { id, username, role }),
                Some((_, _, _, false)) => {
                    Err(AppError::Forbidden("Account is deactivated".to_string()).into())
                }
                None => Err(AppError::Unauthorized("Account no longer exists".to_string()).into()),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::dev::Payload;
    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;

    fn user(role: Role) -> CurrentUser {
        CurrentUser {
            id: 1,
            username: "someone".to_string(),
            role,
        }
    }

    #[test]
    fn test_role_guards() {
        assert!(user(Role::Admin).require_admin().is_ok());
        assert!(user(Role::Manager).require_lead().is_ok());
        assert!(user(Role::Admin).require_lead().is_ok());

        match user(Role::Manager).require_admin() {
            Err(AppError::Forbidden(msg)) => assert!(msg.contains("admin")),
            other => panic!("expected Forbidden, got {:?}", other),
        }
        assert!(matches!(
            user(Role::User).require_lead(),
            Err(AppError::Forbidden(_))
        ));
    }

    #[actix_rt::test]
    async fn test_current_user_without_claims() {
        let req = actix_test::TestRequest::default().to_http_request();

        let mut payload = Payload::None;
        let result = CurrentUser::from_request(&req, &mut payload).await;
        assert!(result.is_err());

        let response = result.unwrap_err().error_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
