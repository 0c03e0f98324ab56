pub mod admin;
pub mod auth;
pub mod comments;
pub mod dashboard;
pub mod health;
pub mod profile;
pub mod projects;
pub mod reports;
pub mod subtasks;
pub mod task_lists;
pub mod tasks;
pub mod todos;

use actix_cors::Cors;
use actix_web::{http::header, middleware::Condition, web};

use crate::config::Config;

/// CORS with credentials for `CORS_ORIGIN` only. Without it no CORS headers are sent.
pub fn cors(config: &Config) -> Condition<Cors> {
    let Some(origin) = &config.cors_origin else {
        return Condition::new(false, Cors::default());
    };
    let cors = Cors::default()
        .allowed_origin(origin)
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
        .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .supports_credentials()
        .max_age(3600);
    Condition::new(true, cors)
}

/// Registers every `/api` scope. The caller wraps the result in `AuthMiddleware`.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .service(auth::register)
            .service(auth::registration_status)
            .service(auth::login)
            .service(auth::logout),
    )
    .service(
        web::scope("/profile")
            .service(profile::get_profile)
            .service(profile::update_profile)
            .service(profile::change_password),
    )
    .service(
        web::scope("/admin")
            .service(admin::list_users)
            .service(admin::promote_user)
            .service(admin::assign_manager)
            .service(admin::set_active)
            .service(admin::list_registrations)
            .service(admin::approve_registration)
            .service(admin::reject_registration)
            .service(admin::approval_log),
    )
    .service(
        web::scope("/projects")
            .service(projects::list_projects)
            .service(projects::create_project)
            .service(task_lists::reorder_lists)
            .service(task_lists::create_list)
            .service(projects::list_members)
            .service(projects::add_member)
            .service(projects::remove_member)
            .service(projects::get_board)
            .service(projects::get_project)
            .service(projects::update_project)
            .service(projects::delete_project),
    )
    .service(
        web::scope("/lists")
            .service(tasks::create_task)
            .service(task_lists::rename_list)
            .service(task_lists::delete_list),
    )
    .service(
        web::scope("/tasks")
            .service(tasks::get_tasks)
            .service(tasks::move_task)
            .service(tasks::task_history)
            .service(subtasks::create_subtask)
            .service(comments::list_comments)
            .service(comments::add_comment)
            .service(tasks::get_task)
            .service(tasks::update_task)
            .service(tasks::delete_task),
    )
    .service(
        web::scope("/subtasks")
            .service(subtasks::update_subtask)
            .service(subtasks::delete_subtask),
    )
    .service(web::scope("/comments").service(comments::delete_comment))
    .service(
        web::scope("/todos")
            .service(todos::list_todos)
            .service(todos::create_todo)
            .service(todos::toggle_todo)
            .service(todos::update_todo)
            .service(todos::delete_todo),
    )
    .service(
        web::scope("/dashboard")
            .service(dashboard::user_dashboard)
            .service(dashboard::manager_dashboard)
            .service(dashboard::admin_dashboard),
    )
    .service(web::scope("/reports").service(reports::report_stats));
}
