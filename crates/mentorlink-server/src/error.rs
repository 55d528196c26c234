//! Server error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::index::IndexKind;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Index not built: {0}")]
    UnknownIndex(IndexKind),

    #[error("Snapshot fetch failed for {kind} index: {reason}")]
    SnapshotFetch { kind: IndexKind, reason: String },

    #[error("Invalid request: {0}")]
    InvalidQuery(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Forbidden")]
    Forbidden,

    #[error("{resource} not found")]
    NotFound {
        resource: String,
        suggestions: Vec<String>,
    },

    #[error("Email already registered")]
    EmailTaken,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn not_found(resource: impl Into<String>) -> Self {
        ServerError::NotFound {
            resource: resource.into(),
            suggestions: Vec::new(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::UnknownIndex(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::SnapshotFetch { .. } => StatusCode::BAD_GATEWAY,
            ServerError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            ServerError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ServerError::Forbidden => StatusCode::FORBIDDEN,
            ServerError::NotFound { .. } => StatusCode::NOT_FOUND,
            ServerError::EmailTaken => StatusCode::CONFLICT,
            ServerError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Json(_) => StatusCode::BAD_REQUEST,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<mentorlink_core::Error> for ServerError {
    fn from(err: mentorlink_core::Error) -> Self {
        match err {
            mentorlink_core::Error::Io(e) => ServerError::Io(e),
            mentorlink_core::Error::Json(e) => ServerError::Json(e),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            ServerError::NotFound {
                resource,
                suggestions,
            } => (
                status,
                Json(json!({
                    "error": format!("{resource} not found"),
                    "suggestions": suggestions,
                })),
            )
                .into_response(),
            other => (status, Json(json!({ "error": other.to_string() }))).into_response(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
