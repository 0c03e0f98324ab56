use actix_web::{middleware::Logger, web, App, HttpServer};
use std::io;
use teamforge::{auth::AuthMiddleware, config::Config, db, routes};

fn startup_error(context: &str, err: impl std::fmt::Display) -> io::Error {
    io::Error::new(io::ErrorKind::Other, format!("{}: {}", context, err))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env().map_err(|e| startup_error("Invalid configuration", e))?;

    let pool = db::connect(&config)
        .await
        .map_err(|e| startup_error("Failed to connect to database", e))?;
    db::migrate(&pool)
        .await
        .map_err(|e| startup_error("Failed to run migrations", e))?;
    if let Some(admin) = &config.bootstrap_admin {
        db::seed_admin(&pool, admin)
            .await
            .map_err(|e| startup_error("Failed to create bootstrap admin", e))?;
    }

    log::info!("Starting TeamForge server at {}", config.server_url());

    let bind_addr = (config.server_host.clone(), config.server_port);
    let pool_data = web::Data::new(pool);
    let config_data = web::Data::new(config);

    HttpServer::new(move || {
        App::new()
            .app_data(pool_data.clone())
            .app_data(config_data.clone())
            .wrap(routes::cors(&config_data))
            .wrap(Logger::default())
            .service(routes::health::health)
            .service(
                web::scope("/api")
                    .wrap(AuthMiddleware)
                    .configure(routes::config),
            )
    })
    .bind(bind_addr)?
    .run()
    .await
}
