use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    Error, HttpMessage,
};
use futures::future::{ready, LocalBoxFuture, Ready};

use crate::auth::session::{select_token, SESSION_COOKIE};
use crate::auth::token::verify_token;
use crate::error::AppError;

/// Paths reachable without a session.
fn is_public(path: &str) -> bool {
    path == "/health"
        || path.starts_with("/api/auth/login")
        || path.starts_with("/api/auth/register")
        || path.starts_with("/api/auth/registration/")
}

/// Verifies the session token and stores its `Claims` in the request extensions.
pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService { service }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if is_public(req.path()) {
            return Box::pin(self.service.call(req));
        }

        let authorization = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        let cookie = req.cookie(SESSION_COOKIE);
        let token = select_token(authorization, cookie.as_ref().map(|c| c.value()));

        match token {
            Some(token) => match verify_token(&token) {
                Ok(claims) => {
                    req.extensions_mut().insert(claims);
                    Box::pin(self.service.call(req))
                }
                Err(app_err) => {
                    log::debug!("rejected session on {}: {}", req.path(), app_err);
                    Box::pin(async move { Err(app_err.into()) })
                }
            },
            None => {
                let app_err = AppError::Unauthorized("Missing session".into());
                Box::pin(async move { Err(app_err.into()) })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test as actix_test;
    use actix_web::{http::StatusCode, web, App, HttpResponse};

    #[test]
    fn test_public_paths() {
        assert!(is_public("/health"));
        assert!(is_public("/api/auth/login"));
        assert!(is_public("/api/auth/register"));
        assert!(is_public("/api/auth/registration/5b1d7c7e-0000-0000-0000-000000000000"));
        assert!(!is_public("/api/auth/logout"));
        assert!(!is_public("/api/admin/users"));
    }

    #[actix_web::test]
    async fn test_missing_session_is_rejected() {
        let app = actix_test::init_service(
            App::new().wrap(AuthMiddleware).route(
                "/api/profile",
                web::get().to(|| async { HttpResponse::Ok().finish() }),
            ),
        )
        .await;

        let req = actix_test::TestRequest::get().uri("/api/profile").to_request();
        let err = actix_test::try_call_service(&app, req).await.unwrap_err();
        assert_eq!(err.as_response_error().status_code(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_public_path_skips_auth() {
        let app = actix_test::init_service(
            App::new().wrap(AuthMiddleware).route(
                "/api/auth/login",
                web::post().to(|| async { HttpResponse::Ok().finish() }),
            ),
        )
        .await;

        let req = actix_test::TestRequest::post().uri("/api/auth/login").to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
