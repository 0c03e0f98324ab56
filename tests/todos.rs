#[macro_use]
mod common;

use actix_web::http::StatusCode;
use actix_web::test;
use common::{bearer, cleanup_users, create_user, login, send, TEST_PASSWORD};
use pretty_assertions::assert_eq;
use serde_json::json;
use teamforge::models::Role;

#[actix_rt::test]
async fn test_personal_todos() {
    let Some(pool) = common::test_pool().await else {
        return;
    };
    let app = test_app!(pool).await;
    let owner = create_user(&pool, "todoer", Role::User).await;
    let other = create_user(&pool, "nosy", Role::User).await;
    let token = login(&app, &owner.email, TEST_PASSWORD).await;
    let other_token = login(&app, &other.email, TEST_PASSWORD).await;

    let due = chrono::Utc::now() + chrono::Duration::days(1);
    let req = test::TestRequest::post()
        .uri("/api/todos")
        .append_header(bearer(&token))
        .set_json(json!({ "title": "Book flights", "due_date": due }))
        .to_request();
    let (status, todo) = send(&app, req).await;
    assert_eq!(status, StatusCode::CREATED, "Create todo failed. Body: {}", todo);
    assert_eq!(todo["completed"], false);
    let todo_id = todo["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri("/api/todos")
        .append_header(bearer(&token))
        .set_json(json!({ "title": "" }))
        .to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // Linking to a project the caller is not on is refused
    let req = test::TestRequest::post()
        .uri("/api/todos")
        .append_header(bearer(&token))
        .set_json(json!({ "title": "Sneaky", "project_id": uuid::Uuid::new_v4() }))
        .to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Someone else's todo does not exist for them
    let req = test::TestRequest::post()
        .uri(&format!("/api/todos/{}/toggle", todo_id))
        .append_header(bearer(&other_token))
        .to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let req = test::TestRequest::post()
        .uri(&format!("/api/todos/{}/toggle", todo_id))
        .append_header(bearer(&token))
        .to_request();
    let (status, toggled) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(toggled["completed"], true);

    let req = test::TestRequest::get()
        .uri("/api/todos?completed=false")
        .append_header(bearer(&token))
        .to_request();
    let (_, open) = send(&app, req).await;
    assert!(open.as_array().unwrap().is_empty());

    // An explicit null clears the due date; absent fields stay put
    let req = test::TestRequest::put()
        .uri(&format!("/api/todos/{}", todo_id))
        .append_header(bearer(&token))
        .set_json(json!({ "due_date": null, "title": "Book flights and hotel" }))
        .to_request();
    let (status, updated) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK, "Update todo failed. Body: {}", updated);
    assert!(updated["due_date"].is_null());
    assert_eq!(updated["title"], "Book flights and hotel");
    assert_eq!(updated["completed"], true);

    let req = test::TestRequest::get()
        .uri("/api/dashboard")
        .append_header(bearer(&token))
        .to_request();
    let (_, dashboard) = send(&app, req).await;
    assert_eq!(dashboard["todos"]["total"].as_i64(), Some(1));
    assert_eq!(dashboard["todos"]["completed"].as_i64(), Some(1));

    let req = test::TestRequest::delete()
        .uri(&format!("/api/todos/{}", todo_id))
        .append_header(bearer(&other_token))
        .to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/todos/{}", todo_id))
        .append_header(bearer(&token))
        .to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    cleanup_users(&pool, &[&owner.email, &other.email]).await;
}

#[actix_rt::test]
async fn test_concurrent_toggle_and_rename_both_stick() {
    let Some(pool) = common::test_pool().await else {
        return;
    };
    let app = test_app!(pool).await;
    let owner = create_user(&pool, "juggler", Role::User).await;
    let token = login(&app, &owner.email, TEST_PASSWORD).await;

    let req = test::TestRequest::post()
        .uri("/api/todos")
        .append_header(bearer(&token))
        .set_json(json!({ "title": "Round 0" }))
        .to_request();
    let (status, todo) = send(&app, req).await;
    assert_eq!(status, StatusCode::CREATED);
    let todo_id = todo["id"].as_str().unwrap().to_string();

    for round in 1..=8 {
        let toggle = test::TestRequest::post()
            .uri(&format!("/api/todos/{}/toggle", todo_id))
            .append_header(bearer(&token))
            .to_request();
        let rename = test::TestRequest::put()
            .uri(&format!("/api/todos/{}", todo_id))
            .append_header(bearer(&token))
            .set_json(json!({ "title": format!("Round {}", round) }))
            .to_request();

        let ((toggle_status, _), (rename_status, _)) =
            futures::join!(send(&app, toggle), send(&app, rename));
        assert_eq!(toggle_status, StatusCode::OK);
        assert_eq!(rename_status, StatusCode::OK);

        let req = test::TestRequest::get()
            .uri("/api/todos")
            .append_header(bearer(&token))
            .to_request();
        let (_, todos) = send(&app, req).await;
        let current = todos
            .as_array()
            .unwrap()
            .iter()
            .find(|t| t["id"] == todo_id.as_str())
            .expect("todo still listed");
        assert_eq!(current["title"], format!("Round {}", round));
        assert_eq!(current["completed"], round % 2 == 1, "round {}", round);
    }

    cleanup_users(&pool, &[&owner.email]).await;
}
