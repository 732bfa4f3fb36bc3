use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Failure of the backing SQLite store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("username already exists: {0}")]
    DuplicateUsername(String),
    #[error("credential store unavailable: {0}")]
    Unavailable(#[from] sqlx::Error),
    #[error("credential store migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    #[error("password hashing failed: {0}")]
    Hash(String),
}

#[derive(Debug, Error)]
pub enum UserError {
    #[error("No {0} provided")]
    MissingParameter(&'static str),
    #[error("User not found")]
    UserNotFound,
    #[error("{0}")]
    InvalidInput(String),
    #[error("Username already registered")]
    UsernameTaken,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Password(#[from] PasswordError),
}

impl UserError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingParameter(_) | Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::Password(PasswordError::InvalidInput(_)) => StatusCode::BAD_REQUEST,
            Self::UserNotFound => StatusCode::NOT_FOUND,
            Self::UsernameTaken => StatusCode::CONFLICT,
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Password(PasswordError::Hash(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for UserError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Store internals stay in the logs.
        let message = match &self {
            Self::Store(_) => "Service unavailable".to_string(),
            Self::Password(PasswordError::Hash(_)) => "Internal error".to_string(),
            other => other.to_string(),
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}
