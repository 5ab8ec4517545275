//! Error types for Relay Service

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use p2pchat_relay::RelayError;
use serde::Serialize;
use std::fmt;

/// Service error types
#[derive(Debug)]
pub enum ServiceError {
    /// Resource not found
    NotFound(String),
    /// Invalid request
    BadRequest(String),
    /// Request authentication failed
    Unauthorized(String),
    /// Authenticated caller may not access the resource
    Forbidden(String),
    /// Storage error
    Storage(String),
    /// Internal error
    Internal(String),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ServiceError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ServiceError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ServiceError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ServiceError::Storage(msg) => write!(f, "Storage error: {}", msg),
            ServiceError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: String,
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServiceError::Storage(_) | ServiceError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let code = match self {
            ServiceError::NotFound(_) => "NOT_FOUND",
            ServiceError::BadRequest(_) => "BAD_REQUEST",
            ServiceError::Unauthorized(_) => "UNAUTHORIZED",
            ServiceError::Forbidden(_) => "FORBIDDEN",
            ServiceError::Storage(_) => "STORAGE_ERROR",
            ServiceError::Internal(_) => "INTERNAL_ERROR",
        };

        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        })
    }
}

impl From<RelayError> for ServiceError {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::Auth(e) => ServiceError::Unauthorized(e.to_string()),
            RelayError::Storage(e) => ServiceError::Storage(e),
            RelayError::MessageNotFound(id) => ServiceError::NotFound(id),
            RelayError::Forbidden(e) => ServiceError::Forbidden(e),
            RelayError::InvalidMessage(e) => ServiceError::BadRequest(e),
            RelayError::Config(e) => ServiceError::Internal(e),
            RelayError::Core(e) => ServiceError::BadRequest(e.to_string()),
        }
    }
}

impl From<p2pchat_core::Error> for ServiceError {
    fn from(err: p2pchat_core::Error) -> Self {
        ServiceError::BadRequest(err.to_string())
    }
}
