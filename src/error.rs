use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LimitsError {
    #[error("Redis error: {0}")]
    Redis(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("The --class and --delete options are mutually exclusive.")]
    ConflictingOptions,

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type LimitsResult<T> = Result<T, LimitsError>;

impl From<redis::RedisError> for LimitsError {
    fn from(err: redis::RedisError) -> Self {
        LimitsError::Redis(err.to_string())
    }
}

impl From<std::io::Error> for LimitsError {
    fn from(err: std::io::Error) -> Self {
        LimitsError::Configuration(err.to_string())
    }
}

impl From<toml::de::Error> for LimitsError {
    fn from(err: toml::de::Error) -> Self {
        LimitsError::Configuration(err.to_string())
    }
}

impl From<validator::ValidationErrors> for LimitsError {
    fn from(err: validator::ValidationErrors) -> Self {
        LimitsError::Validation(err.to_string())
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub code: u16,
}

impl ErrorResponse {
    pub fn new(error: &str, message: &str, code: u16) -> Self {
        Self {
            error: error.to_string(),
            message: message.to_string(),
            code,
        }
    }

    pub fn from_error(err: &LimitsError) -> Self {
        let message = err.to_string();
        match err {
            LimitsError::Redis(_) => Self::new("service_unavailable", &message, 503),
            LimitsError::Configuration(_) => Self::new("configuration_error", &message, 500),
            LimitsError::Validation(_) => Self::new("validation_error", &message, 422),
            LimitsError::ConflictingOptions => Self::new("bad_request", &message, 400),
            LimitsError::Internal(_) => Self::new("internal_error", &message, 500),
        }
    }
}

impl IntoResponse for LimitsError {
    fn into_response(self) -> Response {
        let body = ErrorResponse::from_error(&self);
        let status =
            StatusCode::from_u16(body.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        tracing::error!(target: "rs_limits::error", error = %self, "Request failed");

        (status, Json(body)).into_response()
    }
}
