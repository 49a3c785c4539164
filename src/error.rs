//! Error types with HTTP status code mapping.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};

/// Error type for routedoc operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // Request errors
    #[error("Bad request: {0}")]
    BadRequest(String),

    // Spec errors
    #[error("OpenAPI document failed validation: {0}")]
    SpecValidation(String),

    #[error("Schema conflict for '{name}': defined differently by multiple operations")]
    SchemaConflict { name: String },

    #[error("Malformed operation metadata in documentation: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Application state missing: {0}")]
    MissingState(&'static str),

    // Config errors
    #[error("Configuration error: {0}")]
    Config(String),

    // System errors
    #[error("Invalid address: {0}")]
    AddrParse(#[from] std::net::AddrParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map error to HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,

            // Startup-time errors; only reachable at runtime through a misconfigured app
            Error::SpecValidation(_)
            | Error::SchemaConflict { .. }
            | Error::Yaml(_)
            | Error::MissingState(_)
            | Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,

            Error::AddrParse(_) | Error::Io(_) | Error::Json(_) | Error::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Convert error into HTTP response.
    pub fn into_response(self) -> Response<Full<Bytes>> {
        let status = self.status_code();
        let message = if status.is_server_error() {
            tracing::error!("Internal error: {self}");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        crate::response::error(status, &message)
    }
}

/// Result type alias using routedoc's Error.
pub type Result<T> = std::result::Result<T, Error>;
