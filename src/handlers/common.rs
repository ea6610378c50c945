use crate::errors::ServiceError;
use axum::{
    extract::rejection::JsonRejection,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Serialize};
use validator::Validate;

/// Standard created response carrying a `Location` header.
pub fn created_response<T: Serialize>(location: String, data: T) -> Response {
    let mut response = (StatusCode::CREATED, Json(data)).into_response();
    if let Ok(value) = HeaderValue::from_str(&location) {
        response.headers_mut().insert(header::LOCATION, value);
    }
    response
}

/// Standard no content response
pub fn no_content_response() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// Validate request input
pub fn validate_input<T: Validate>(input: &T) -> Result<(), ServiceError> {
    input.validate().map_err(ServiceError::from)
}

/// Unwraps a JSON body, turning malformed input into a 400 validation error,
/// and runs the body's validation rules.
pub fn validated_json<T: Validate>(
    body: Result<Json<T>, JsonRejection>,
) -> Result<T, ServiceError> {
    let Json(payload) = body?;
    validate_input(&payload)?;
    Ok(payload)
}

/// Parses an optional JSON body; an empty body yields `T::default()`.
pub fn optional_json<T: DeserializeOwned + Default + Validate>(
    body: &[u8],
) -> Result<T, ServiceError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    let payload: T = serde_json::from_slice(body)
        .map_err(|e| ServiceError::invalid_field("body", format!("Malformed JSON body: {}", e)))?;
    validate_input(&payload)?;
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::orders::AdvanceStatusRequest;
    use assert_matches::assert_matches;

    #[test]
    fn empty_optional_body_is_default() {
        let parsed: AdvanceStatusRequest = optional_json(b"").unwrap();
        assert!(parsed.note.is_none());
        let parsed: AdvanceStatusRequest = optional_json(b"  \n").unwrap();
        assert!(parsed.note.is_none());
    }

    #[test]
    fn optional_body_is_parsed_and_validated() {
        let parsed: AdvanceStatusRequest = optional_json(br#"{"note":"packed"}"#).unwrap();
        assert_eq!(parsed.note.as_deref(), Some("packed"));

        let long = format!(r#"{{"note":"{}"}}"#, "x".repeat(501));
        let err = optional_json::<AdvanceStatusRequest>(long.as_bytes()).unwrap_err();
        assert_matches!(err, ServiceError::ValidationError { .. });

        let err = optional_json::<AdvanceStatusRequest>(b"{not json").unwrap_err();
        assert_matches!(err, ServiceError::ValidationError { .. });
    }

    #[test]
    fn created_response_sets_location() {
        let response = created_response("/api/orders/7".to_string(), serde_json::json!({"id": 7}));
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/api/orders/7"
        );
    }
}
