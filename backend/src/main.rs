use actix_cors::Cors;
use actix_web::{http::header, web, App, HttpServer};
use anyhow::Context;
use campus_backend::config::AppConfig;
use campus_backend::routes;
use campus_backend::services::SERVICE_NAME;
use campus_backend::state::AppState;
use campus_database::{Database, DatabaseConfig, Stores};
use campus_middleware::{AccountLookup, AuthMiddlewareFactory};
use campus_observability::{error, info, init_tracing, observability, warn, TracingConfig};
use std::sync::Arc;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    init_tracing(TracingConfig::for_service(SERVICE_NAME));

    info!("Starting campus backend...");

    let config = AppConfig::from_env()?;
    let port = config.backend_port;

    info!("Environment mode: {}", config.env_mode);
    info!("Binding to port: {}", port);

    let (stores, storage) = match config.database_url.clone() {
        Some(database_url) => {
            info!("Connecting to PostgreSQL database...");
            let db_config = DatabaseConfig {
                max_connections: config.db_max_connections,
                ..DatabaseConfig::new(database_url)
            };
            let database = Database::new(&db_config).await?;
            if config.run_migrations {
                database.migrate().await?;
                info!("Migrations applied");
            }
            info!("Database connection established");
            (database.stores(), "postgres")
        }
        None => {
            warn!("DATABASE_URL not set; records are kept in memory and lost on restart");
            (Stores::in_memory(), "memory")
        }
    };

    let bootstrap_admin = config.bootstrap_admin.clone();
    let cors_origins = config.cors_allowed_origins.clone();
    let app_state = AppState::new(stores, storage, config);

    if let Some(admin) = bootstrap_admin {
        match app_state.auth_service.ensure_bootstrap_admin(&admin).await {
            Ok(Some(user)) => info!("Bootstrap admin {} created", user.email),
            Ok(None) => info!("Bootstrap admin already present"),
            Err(e) => error!("Failed to create bootstrap admin: {}", e),
        }
    }

    let jwt = app_state.jwt.clone();
    let accounts: Arc<dyn AccountLookup> = app_state.auth_service.clone();
    let state_data = web::Data::new(app_state);

    info!("Starting HTTP server on 0.0.0.0:{}", port);

    HttpServer::new(move || {
        let cors = cors_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
            .allowed_headers(vec![header::CONTENT_TYPE, header::AUTHORIZATION])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .app_data(state_data.clone())
            // Authentication middleware
            .wrap(AuthMiddlewareFactory::new(jwt.clone()).with_accounts(accounts.clone()))
            // Observability middleware (HTTP logging + tracing)
            .wrap(observability(SERVICE_NAME))
            .wrap(cors)
            .configure(routes::configure_routes)
    })
    .bind(("0.0.0.0", port))
    .with_context(|| format!("Failed to bind port {}", port))?
    .run()
    .await
    .context("HTTP server failed")
}
