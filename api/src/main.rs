mod auth;
mod comments;
mod config;
mod data;
mod db;
mod error;
mod extract;
mod files;
mod likes;
mod notices;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post, put},
    Router,
};
use tokio::signal;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, CorsLayer},
    trace::TraceLayer,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::{
    config::{Config, ConfigError},
    error::AppError,
};

pub type DbPool = r2d2::Pool<r2d2_sqlite::SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Arc<Config>,
}

pub fn router(state: AppState) -> Result<Router, AppError> {
    let origin = state
        .config
        .cors_origin
        .parse::<HeaderValue>()
        .map_err(|e| ConfigError::InvalidValue {
            key: "CORS_ORIGIN",
            message: e.to_string(),
        })?;

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request());

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        // Auth
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/me", get(auth::me))
        // Notices
        .route(
            "/notices",
            get(notices::list_notices).post(notices::create_notice),
        )
        .route(
            "/notices/{id}",
            get(notices::get_notice)
                .put(notices::update_notice)
                .delete(notices::delete_notice),
        )
        // Comments
        .route(
            "/notices/{id}/comments",
            get(comments::list_comments).post(comments::create_comment),
        )
        .route(
            "/notices/{id}/comments/{comment_id}",
            put(comments::update_comment).delete(comments::delete_comment),
        )
        // Likes
        .route(
            "/notices/{id}/like",
            get(likes::get_likes).post(likes::like_notice),
        )
        .route("/notices/{id}/hate", post(likes::hate_notice))
        // Files
        .route("/notices/{id}/files/{file_id}", get(files::download))
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    Ok(app)
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Ok(path) = dotenv {
        debug!("Loaded environment from {}", path.display());
    }

    let config = Config::load()?;

    let pool = db::connect(&config.database_url)?;
    db::run_migrations(&pool)?;
    tokio::fs::create_dir_all(&config.upload_dir).await?;

    let addr = config.bind_addr.clone();
    let state = AppState {
        db: pool,
        config: Arc::new(config),
    };
    let app = router(state)?;

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("API server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
