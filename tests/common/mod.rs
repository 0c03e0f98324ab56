#![allow(dead_code)]

use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::test;
use dotenv::dotenv;
use serde_json::Value;
use sqlx::PgPool;
use teamforge::auth::password::hash_password_with_cost;
use teamforge::config::Config;
use teamforge::models::Role;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "integration-test-secret";
pub const TEST_PASSWORD: &str = "Password123!";

/// Connects to `DATABASE_URL` and applies migrations.
///
/// Returns `None` when no database is configured so the caller can skip.
pub async fn test_pool() -> Option<PgPool> {
    dotenv().ok();
    if std::env::var("JWT_SECRET").is_err() {
        std::env::set_var("JWT_SECRET", TEST_JWT_SECRET);
    }
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping database test");
        return None;
    };
    let pool = PgPool::connect(&database_url)
        .await
        .expect("Failed to connect to test DB");
    teamforge::db::migrate(&pool)
        .await
        .expect("Failed to run migrations");
    Some(pool)
}

pub fn test_config() -> Config {
    Config {
        database_url: String::new(),
        server_port: 0,
        server_host: "127.0.0.1".to_string(),
        database_max_connections: 5,
        cookie_secure: false,
        cors_origin: None,
        bootstrap_admin: None,
    }
}

/// Builds the full application the way `main` does, minus CORS.
macro_rules! test_app {
    ($pool:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new($pool.clone()))
                .app_data(actix_web::web::Data::new(common::test_config()))
                .wrap(actix_web::middleware::Logger::default())
                .service(teamforge::routes::health::health)
                .service(
                    actix_web::web::scope("/api")
                        .wrap(teamforge::auth::AuthMiddleware)
                        .configure(teamforge::routes::config),
                ),
        )
    };
}

pub struct TestUser {
    pub id: i32,
    pub username: String,
    pub email: String,
}

/// A username and email that no other test run uses.
pub fn unique_identity(prefix: &str) -> (String, String) {
    let tag = Uuid::new_v4().simple().to_string();
    let username = format!("{}_{}", prefix, &tag[..12]);
    let email = format!("{}@example.com", username);
    (username, email)
}

/// Inserts an active account directly, bypassing the approval queue.
pub async fn create_user(pool: &PgPool, prefix: &str, role: Role) -> TestUser {
    let (username, email) = unique_identity(prefix);
    let password_hash = hash_password_with_cost(TEST_PASSWORD, 4).expect("hash password");
    let id = sqlx::query_scalar::<_, i32>(
        "INSERT INTO users (username, email, password_hash, role) VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(&username)
    .bind(&email)
    .bind(password_hash)
    .bind(role)
    .fetch_one(pool)
    .await
    .expect("insert test user");
    TestUser {
        id,
        username,
        email,
    }
}

/// Removes test accounts. Projects, tasks and log rows go with them.
pub async fn cleanup_users(pool: &PgPool, emails: &[&str]) {
    for email in emails {
        let _ = sqlx::query("DELETE FROM users WHERE email = $1")
            .bind(email)
            .execute(pool)
            .await;
        let _ = sqlx::query("DELETE FROM user_registration_queue WHERE email = $1")
            .bind(email)
            .execute(pool)
            .await;
    }
}

/// Sends a request and returns the status with the JSON body (`Null` when empty).
///
/// Errors raised by middleware are rendered the same way the server would.
pub async fn send<S, B>(app: &S, req: actix_http::Request) -> (StatusCode, Value)
where
    S: Service<actix_http::Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let (status, body) = match test::try_call_service(app, req).await {
        Ok(resp) => {
            let status = resp.status();
            (status, test::read_body(resp).await)
        }
        Err(err) => {
            let resp = err.error_response();
            let status = resp.status();
            let body = actix_web::body::to_bytes(resp.into_body())
                .await
                .unwrap_or_default();
            (status, body)
        }
    };

    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into_owned()))
    };
    (status, json)
}

/// Logs in and returns the session token.
pub async fn login<S, B>(app: &S, email: &str, password: &str) -> String
where
    S: Service<actix_http::Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(serde_json::json!({ "email": email, "password": password }))
        .to_request();
    let (status, body) = send(app, req).await;
    assert_eq!(status, StatusCode::OK, "Login failed. Body: {}", body);
    body["token"]
        .as_str()
        .expect("login response carries a token")
        .to_string()
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token))
}
