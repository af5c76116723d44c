//!
//! # Custom Error Handling
//!
//! This module defines the custom error type `AppError` used throughout the
//! application. It centralizes error management, providing a consistent way to
//! handle and represent the error conditions that can occur, from upstream
//! store failures to validation failures.
//!
//! `AppError` implements `actix_web::error::ResponseError` to convert
//! application errors into HTTP responses carrying the uniform JSON envelope
//! `{"success": false, "error": {"message", "details"?}}`. `From` trait
//! implementations for `validator::ValidationErrors`,
//! `jsonwebtoken::errors::Error`, and `bcrypt::BcryptError` allow conversion
//! with the `?` operator.

use actix_web::{error::ResponseError, http::StatusCode, HttpRequest, HttpResponse};
use serde_json::json;
use std::fmt;
use validator::{ValidationErrors, ValidationErrorsKind};

/// Represents all possible errors that can occur within the application.
///
/// Each variant corresponds to a specific failure class and carries a message
/// detailing the issue. These errors are converted into HTTP responses with
/// the uniform error envelope.
#[derive(Debug)]
pub enum AppError {
    /// Missing, invalid or expired credentials, or an inactive user (HTTP 401).
    Unauthorized(String),
    /// Login refused because the account is temporarily locked (HTTP 423).
    AccountLocked(String),
    /// The resource exists but belongs to another user (HTTP 403).
    Forbidden(String),
    /// A requested resource was not found (HTTP 404).
    NotFound(String),
    /// Input validation failed; carries the full list of field-level
    /// messages (HTTP 400).
    Validation(Vec<String>),
    /// A uniqueness or referential constraint was violated, e.g. a duplicate
    /// username or a category still in use (HTTP 400).
    Conflict(String),
    /// A malformed request that is not a field-constraint violation (HTTP 400).
    BadRequest(String),
    /// The sliding-window rate limit was exceeded (HTTP 429).
    TooManyRequests(String),
    /// A failure reported by the external document store; the remote status
    /// is propagated when known, 500 otherwise.
    Upstream { status: u16, message: String },
    /// An unexpected server-side error (HTTP 500).
    InternalServerError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::AccountLocked(msg) => write!(f, "Account Locked: {}", msg),
            AppError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            AppError::Validation(details) => {
                write!(f, "Validation failed: {}", details.join(", "))
            }
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            AppError::TooManyRequests(msg) => write!(f, "Too Many Requests: {}", msg),
            AppError::Upstream { status, message } => {
                write!(f, "Upstream Error ({}): {}", status, message)
            }
            AppError::InternalServerError(msg) => write!(f, "Internal Server Error: {}", msg),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::AccountLocked(_) => StatusCode::LOCKED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) | AppError::Conflict(_) | AppError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            AppError::Validation(details) => json!({
                "success": false,
                "error": {
                    "message": "Validation failed",
                    "details": details,
                }
            }),
            AppError::Unauthorized(msg)
            | AppError::AccountLocked(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::BadRequest(msg)
            | AppError::TooManyRequests(msg)
            | AppError::Upstream { message: msg, .. }
            | AppError::InternalServerError(msg) => json!({
                "success": false,
                "error": {
                    "message": msg,
                }
            }),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

/// Converts `validator::ValidationErrors` into `AppError::Validation`.
///
/// `validator` collects errors in a map, so no insertion order is available;
/// the flattened `field: message` list is sorted by field path to keep the
/// response deterministic. Nested and per-item errors keep their full path
/// (`preferences.language`, `tags[0]`).
impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> AppError {
        let mut details = Vec::new();
        flatten_errors("", &errors, &mut details);
        details.sort();
        AppError::Validation(details)
    }
}

/// Validation runs against Rust field identifiers; clients see the wire
/// names, so snake_case identifiers are reported in camelCase.
fn wire_name(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper_next = false;
    for c in field.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn flatten_errors(prefix: &str, errors: &ValidationErrors, out: &mut Vec<String>) {
    for (field, kind) in errors.errors() {
        let field = wire_name(field);
        let path = if prefix.is_empty() {
            field
        } else {
            format!("{}.{}", prefix, field)
        };
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for err in field_errors {
                    let message = err
                        .message
                        .clone()
                        .unwrap_or_else(|| err.code.clone());
                    out.push(format!("{}: {}", path, message));
                }
            }
            ValidationErrorsKind::Struct(nested) => flatten_errors(&path, nested, out),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    flatten_errors(&format!("{}[{}]", path, index), nested, out);
                }
            }
        }
    }
}

/// Converts `jsonwebtoken::errors::Error` into `AppError::Unauthorized`,
/// distinguishing expiry from every other verification failure.
impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(error: jsonwebtoken::errors::Error) -> AppError {
        match error.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                AppError::Unauthorized("Token expired.".into())
            }
            _ => AppError::Unauthorized("Invalid token.".into()),
        }
    }
}

/// Converts `bcrypt::BcryptError` into `AppError::InternalServerError`.
///
/// This handles errors during password hashing or verification.
impl From<bcrypt::BcryptError> for AppError {
    fn from(error: bcrypt::BcryptError) -> AppError {
        AppError::InternalServerError(format!("Password processing failed: {}", error))
    }
}

/// Maps JSON body deserialization failures into the uniform envelope instead
/// of the framework default.
pub fn json_error_handler(
    err: actix_web::error::JsonPayloadError,
    _req: &HttpRequest,
) -> actix_web::Error {
    AppError::BadRequest(err.to_string()).into()
}

/// Maps query-string deserialization failures into the uniform envelope.
pub fn query_error_handler(
    err: actix_web::error::QueryPayloadError,
    _req: &HttpRequest,
) -> actix_web::Error {
    AppError::BadRequest(err.to_string()).into()
}
