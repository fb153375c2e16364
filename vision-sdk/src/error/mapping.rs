//! Error mapping for service-specific APIs
//!
//! Converts upstream error responses into the normalized `ServiceError`.

use reqwest::StatusCode;
use serde_json::Value;

use super::{ErrorContext, ServiceError};

/// Map a Gemini API error body to a ServiceError
///
/// Gemini replies with `{"error": {"code": 400, "message": "...", "status": "INVALID_ARGUMENT"}}`.
pub fn map_gemini_error(status: StatusCode, json: &Value, context: &mut ErrorContext) -> ServiceError {
    context.service = "gemini".to_string();

    let error = json.get("error");
    if let Some(kind) = error.and_then(|e| e.get("status")).and_then(|s| s.as_str()) {
        context.add("error_status", kind);
    }

    let message = error
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .unwrap_or("Unknown Gemini error");

    map_status(status, message)
}

/// Map an object detection service error body to a ServiceError
pub fn map_detector_error(status: StatusCode, json: &Value, context: &mut ErrorContext) -> ServiceError {
    context.service = "detector".to_string();

    let message = json
        .get("detail")
        .or_else(|| json.get("error"))
        .and_then(|m| m.as_str())
        .unwrap_or("Unknown detector error");

    map_status(status, message)
}

/// Map a generic HTTP error to a ServiceError
///
/// The imagery provider answers failures with a plain-text body, so anything
/// that is not JSON falls through to the status-based mapping.
pub fn map_http_error(status: StatusCode, body: &str, context: &mut ErrorContext) -> ServiceError {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        match context.service.as_str() {
            "gemini" => return map_gemini_error(status, &json, context),
            "detector" => return map_detector_error(status, &json, context),
            _ => {
                let message = json
                    .get("message")
                    .or_else(|| json.get("error"))
                    .and_then(|m| m.as_str())
                    .unwrap_or(body);

                return map_status(status, message);
            }
        }
    }

    let message = if body.is_empty() {
        status.to_string()
    } else {
        format!("{}: {}", status, crate::util::truncate_string(body, 100))
    };

    map_status(status, message)
}

fn map_status(status: StatusCode, message: impl Into<String>) -> ServiceError {
    let message = message.into();
    match status {
        StatusCode::UNAUTHORIZED => ServiceError::authentication(message),
        StatusCode::FORBIDDEN => ServiceError::authorization(message),
        StatusCode::TOO_MANY_REQUESTS => ServiceError::rate_limit(message),
        StatusCode::REQUEST_TIMEOUT => ServiceError::timeout(message),
        StatusCode::NOT_FOUND => ServiceError::not_found(message),
        s if s.is_client_error() => ServiceError::validation(message),
        _ => ServiceError::service(message),
    }
}

/// Helper function to classify HTTP errors by category
pub fn classify_http_error(status: StatusCode) -> &'static str {
    match status.as_u16() {
        400 => "validation",
        401 => "authentication",
        403 => "authorization",
        404 => "not_found",
        408 => "timeout",
        429 => "rate_limit",
        500..=599 => "server",
        _ => "unknown",
    }
}

