//! Error type shared by every handler.
//!
//! Client errors carry a message that is returned as `{"error": ...}`. Everything
//! else is logged and reported as a generic 500.

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use noticeboard_shared::ErrorBody;
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum AppError {
    /// 400 Bad Request.
    #[error("{0}")]
    BadRequest(String),

    /// 401 Unauthorized.
    #[error("{0}")]
    Unauthorized(String),

    /// 404 Not Found.
    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Multipart(#[from] MultipartError),

    #[error(transparent)]
    MultipartRequest(#[from] MultipartRejection),

    #[error(transparent)]
    Json(#[from] JsonRejection),

    #[error(transparent)]
    Path(#[from] PathRejection),

    #[error(transparent)]
    Query(#[from] QueryRejection),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Db(#[from] rusqlite::Error),

    #[error(transparent)]
    Pool(#[from] r2d2::Error),

    #[error(transparent)]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Join(#[from] tokio::task::JoinError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(what: &str) -> Self {
        Self::NotFound(format!("{what} not found"))
    }

    pub fn unauthorized() -> Self {
        Self::Unauthorized("Not authenticated".to_string())
    }

    pub fn not_owner() -> Self {
        Self::BadRequest("Only the owner can modify this resource".to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::Multipart(err) => (err.status(), err.body_text()),
            Self::MultipartRequest(err) => (err.status(), err.body_text()),
            Self::Json(err) => (err.status(), err.body_text()),
            Self::Path(err) => (err.status(), err.body_text()),
            Self::Query(err) => (err.status(), err.body_text()),
            err => {
                tracing::error!("{err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
