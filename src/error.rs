use crate::auth::AuthError;
use crate::config::ConfigError;
use crate::notify::DeliveryError;
use crate::store::StoreError;
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use std::fmt;

/// Rendered for any failure that escapes a handler; says nothing about what
/// broke.
const GENERIC_ERROR_PAGE: &str = "<!doctype html>\n<html>\n<head><title>Incident Desk</title></head>\n<body>\n<h1>Something went wrong</h1>\n<p>The request could not be completed. Please try again later.</p>\n</body>\n</html>\n";

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Store(StoreError),
    Auth(AuthError),
    Notifier(DeliveryError),
    Template(handlebars::TemplateError),
    Render(handlebars::RenderError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Store(err) => write!(f, "storage error: {}", err),
            AppError::Auth(err) => write!(f, "auth error: {}", err),
            AppError::Notifier(err) => write!(f, "notifier error: {}", err),
            AppError::Template(err) => write!(f, "template error: {}", err),
            AppError::Render(err) => write!(f, "render error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Store(err) => Some(err),
            AppError::Auth(err) => Some(err),
            AppError::Notifier(err) => Some(err),
            AppError::Template(err) => Some(err),
            AppError::Render(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html(GENERIC_ERROR_PAGE),
        )
            .into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<StoreError> for AppError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<AuthError> for AppError {
    fn from(value: AuthError) -> Self {
        Self::Auth(value)
    }
}

impl From<DeliveryError> for AppError {
    fn from(value: DeliveryError) -> Self {
        Self::Notifier(value)
    }
}

impl From<handlebars::TemplateError> for AppError {
    fn from(value: handlebars::TemplateError) -> Self {
        Self::Template(value)
    }
}

impl From<handlebars::RenderError> for AppError {
    fn from(value: handlebars::RenderError) -> Self {
        Self::Render(value)
    }
}
