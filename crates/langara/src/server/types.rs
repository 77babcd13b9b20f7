use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// JSON error body returned by every endpoint.
#[derive(Debug, Serialize)]
pub struct ApiErrorType {
    #[serde(skip)]
    status: StatusCode,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<String>,
}

impl<T: Into<String>> From<(StatusCode, T, Option<String>)> for ApiErrorType {
    fn from((status, error, context): (StatusCode, T, Option<String>)) -> Self {
        Self {
            status,
            error: error.into(),
            context,
        }
    }
}

impl IntoResponse for ApiErrorType {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_body_omits_missing_context() {
        let err = ApiErrorType::from((StatusCode::NOT_FOUND, "Course not found", None));
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value, serde_json::json!({ "error": "Course not found" }));

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_error_body_keeps_context() {
        let err = ApiErrorType::from((
            StatusCode::BAD_GATEWAY,
            "Upstream failed".to_string(),
            Some("timeout".to_string()),
        ));
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["context"], "timeout");
    }
}
