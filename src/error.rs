use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ApiError {
    #[error("not found")]
    NotFound,
    #[error("content required")]
    MissingContent,
    #[error("insufficient storage")]
    InsufficientStorage,
    #[error("{source}")]
    Json {
        #[from]
        source: JsonRejection,
    },
    #[error("failed to encode or decode paste record")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
    #[error("failed to render page")]
    Template {
        #[from]
        source: askama::Error,
    },
    #[error("database error")]
    Database {
        #[from]
        source: sqlx::Error,
    },
    #[error("IO error")]
    IO { source: std::io::Error },
    #[error("redis error")]
    #[cfg(feature = "redis")]
    Redis {
        #[from]
        source: ::redis::RedisError,
    },
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::MissingContent => StatusCode::BAD_REQUEST,
            ApiError::InsufficientStorage => StatusCode::INSUFFICIENT_STORAGE,
            ApiError::Json { .. } => StatusCode::BAD_REQUEST,
            ApiError::Serialization { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Template { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Database { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::IO { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            #[cfg(feature = "redis")]
            ApiError::Redis { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();

        // the message stays opaque, the cause only goes to the log
        if status_code.is_server_error() {
            error!(error = ?self, "request failed");
        }

        (status_code, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<std::io::Error> for ApiError {
    fn from(source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::StorageFull => ApiError::InsufficientStorage,
            _ => ApiError::IO { source },
        }
    }
}
