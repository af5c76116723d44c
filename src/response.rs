//! Success-side of the uniform JSON envelope.
//!
//! Every endpoint responds with `{"success": bool, "message"?, "data"?}` on
//! the happy path; the error side lives in [`crate::error`].

use actix_web::HttpResponse;
use serde::Serialize;
use serde_json::json;

/// `200 OK` with a data payload.
pub fn ok<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "success": true,
        "data": data,
    }))
}

/// `200 OK` with a message and a data payload.
pub fn ok_with_message<T: Serialize>(message: &str, data: T) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "success": true,
        "message": message,
        "data": data,
    }))
}

/// `200 OK` with only a message, for operations that return no data.
pub fn message_only(message: &str) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "success": true,
        "message": message,
    }))
}

/// `201 Created` with a message and the created payload.
pub fn created<T: Serialize>(message: &str, data: T) -> HttpResponse {
    HttpResponse::Created().json(json!({
        "success": true,
        "message": message,
        "data": data,
    }))
}
