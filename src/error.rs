use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Application error type for everything that aborts request processing.
///
/// Failed logins are not errors here; they are carried as
/// [`crate::auth::AuthenticationError`] values and rendered on the login form.
#[derive(Debug, Error)]
pub enum AppError {
    /// Deployment wiring is wrong (routing, firewall, configuration values).
    /// Never recovered locally.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Invalid configuration value for {key}: {reason}")]
    InvalidConfig { key: String, reason: String },

    #[error("Template error: {message}")]
    Template { message: String },

    #[error("Session error: {message}")]
    Session { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AppError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn invalid_config(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub fn template(message: impl Into<String>) -> Self {
        Self::Template {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            AppError::Configuration { .. } | AppError::InvalidConfig { .. }
        )
    }

    /// Convert to HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::Session { .. } => 400,
            AppError::Configuration { .. }
            | AppError::InvalidConfig { .. }
            | AppError::Template { .. }
            | AppError::Internal { .. } => 500,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::Configuration { .. } | AppError::InvalidConfig { .. } => {
                "CONFIGURATION_ERROR"
            }
            AppError::Template { .. } => "TEMPLATE_ERROR",
            AppError::Session { .. } => "SESSION_ERROR",
            AppError::Internal { .. } => "INTERNAL_SERVER_ERROR",
        }
    }
}

/// JSON error body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status: u16,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if self.is_configuration() {
            error!(error = %self, "aborting request on configuration error");
        } else if status.is_server_error() {
            error!(error = %self, "request failed");
        }

        let body = ErrorResponse {
            error: self.code().to_string(),
            message: self.to_string(),
            status: status.as_u16(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<handlebars::RenderError> for AppError {
    fn from(err: handlebars::RenderError) -> Self {
        AppError::template(err.to_string())
    }
}

impl From<handlebars::TemplateError> for AppError {
    fn from(err: handlebars::TemplateError) -> Self {
        AppError::template(err.to_string())
    }
}

// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;
