//! Helpers for the JSON envelope shared by every API response.
//!
//! Every endpoint responds with either
//! `{ "success": true, "status": N, "data": ... }` or
//! `{ "success": false, "status": N, "error": { "reason": ..., "message": ... } }`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ApiSuccess<T> {
    success: bool,
    status: u16,
    data: T,
}

#[derive(Debug, Serialize)]
struct ApiFailure {
    success: bool,
    status: u16,
    error: ErrorDetail,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    reason: &'static str,
    message: String,
}

/// Wrap `data` in the success envelope with the given status code.
pub fn ok<T: Serialize>(status: StatusCode, data: T) -> Response {
    (
        status,
        Json(ApiSuccess {
            success: true,
            status: status.as_u16(),
            data,
        }),
    )
        .into_response()
}

/// Build a failure response with a machine-readable `reason` and a
/// human-readable `message`.
pub fn error_response(status: StatusCode, reason: &'static str, message: &str) -> Response {
    (
        status,
        Json(ApiFailure {
            success: false,
            status: status.as_u16(),
            error: ErrorDetail {
                reason,
                message: message.to_owned(),
            },
        }),
    )
        .into_response()
}
