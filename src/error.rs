use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Artifact absent from the registry, or present but inactive
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed or wrong-shaped input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Invalid configuration (normalizer bounds, duplicate artifacts, ...)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Artifact could not be read or deserialized into a predictor
    #[error("Error loading model: {0}")]
    ArtifactLoad(String),

    /// Model invocation failed, including shape mismatch and timeouts
    #[error("Error making predictions: {0}")]
    Inference(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ArtifactLoad(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Inference(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error code string
    pub fn error_code(&self) -> &str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Configuration(_) => "CONFIGURATION_ERROR",
            AppError::ArtifactLoad(_) => "ARTIFACT_LOAD_ERROR",
            AppError::Inference(_) => "INFERENCE_ERROR",
            AppError::Io(_) => "IO_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Client-side errors are recoverable by fixing the request
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    fn log(&self) {
        let status = self.status_code();
        if self.is_client_error() {
            tracing::warn!(
                error_code = self.error_code(),
                status_code = status.as_u16(),
                message = %self,
                "Request rejected"
            );
        } else {
            tracing::error!(
                error_code = self.error_code(),
                status_code = status.as_u16(),
                message = %self,
                "Request error"
            );
        }
        crate::metrics::ERRORS_TOTAL
            .with_label_values(&["api", self.error_code()])
            .inc();
    }
}

/// Convert AppError to HTTP response
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.log();

        let status = self.status_code();
        let body = Json(json!({
            "error": {
                "code": self.error_code(),
                "message": self.to_string(),
                "status": status.as_u16(),
            }
        }));

        (status, body).into_response()
    }
}

/// Error rendered as `{"detail": ...}`, the shape used by the single-student
/// scoring endpoint.
#[derive(Debug)]
pub struct DetailError(pub AppError);

impl From<AppError> for DetailError {
    fn from(err: AppError) -> Self {
        DetailError(err)
    }
}

impl IntoResponse for DetailError {
    fn into_response(self) -> Response {
        self.0.log();

        let status = self.0.status_code();
        (status, Json(json!({ "detail": self.0.to_string() }))).into_response()
    }
}

/// Conversion from serde_json::Error
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Conversion from validator::ValidationErrors
impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}

/// Malformed JSON bodies are client errors
impl From<axum::extract::rejection::JsonRejection> for AppError {
    fn from(rejection: axum::extract::rejection::JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

/// Unparseable path segments are client errors
impl From<axum::extract::rejection::PathRejection> for AppError {
    fn from(rejection: axum::extract::rejection::PathRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

/// Unparseable query strings are client errors
impl From<axum::extract::rejection::QueryRejection> for AppError {
    fn from(rejection: axum::extract::rejection::QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

/// Conversion from config::ConfigError
impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, AppError>;
