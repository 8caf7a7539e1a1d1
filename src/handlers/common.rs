use crate::errors::ServiceError;
use crate::services::activity::Actor;
use axum::{
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use validator::Validate;

/// Standard success response
pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(data)).into_response()
}

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(data)).into_response()
}

/// Standard no content response
pub fn no_content_response() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// Validate request input
pub fn validate_input<T: Validate>(input: &T) -> Result<(), ServiceError> {
    input
        .validate()
        .map_err(|e| ServiceError::ValidationError(format!("Validation failed: {}", e)))
}

/// Resolves the acting identity from request headers. Authentication happens
/// upstream of this service; here only the claimed username and client
/// address are recorded for the audit trail.
pub fn actor_from_headers(headers: &HeaderMap) -> Actor {
    let username = headers
        .get("x-actor")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from);

    let ip_address = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from);

    Actor {
        username,
        ip_address,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn actor_defaults_to_anonymous() {
        let actor = actor_from_headers(&HeaderMap::new());
        assert!(actor.username.is_none());
        assert!(actor.ip_address.is_none());
    }

    #[test]
    fn actor_takes_first_forwarded_address() {
        let mut headers = HeaderMap::new();
        headers.insert("x-actor", HeaderValue::from_static("magdalene"));
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("10.0.0.9, 172.16.0.1"),
        );
        let actor = actor_from_headers(&headers);
        assert_eq!(actor.username.as_deref(), Some("magdalene"));
        assert_eq!(actor.ip_address.as_deref(), Some("10.0.0.9"));
    }
}
