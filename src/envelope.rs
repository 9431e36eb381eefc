// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Uniform response envelope.
//!
//! Every business operation answers with a [`BaseResult`]. Business failures
//! (duplicate account, wrong code, expired code, missing token) keep HTTP 200
//! and carry their message in `errors`; only malformed requests (400), the
//! admission filter (429) and infrastructure faults (500) change the status.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;

/// Message returned for every infrastructure fault.
pub const INTERNAL_SERVER_ERROR: &str = "internal server error";

/// Message returned when the admission filter rejects a request.
pub const TOO_MANY_REQUESTS: &str = "too many requests";

/// Message returned when a request outlives the read timeout.
pub const REQUEST_TIMED_OUT: &str = "request timed out";

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BaseResult {
    #[serde(skip)]
    pub status: StatusCode,
    /// Human readable failures, `null` on success.
    pub errors: Option<Vec<String>>,
    /// Operation payload, `null` on failure.
    #[schema(value_type = Option<Object>)]
    pub result: Option<serde_json::Value>,
    /// Number of items in `result` for list operations.
    pub result_count: Option<i64>,
}

impl BaseResult {
    /// Successful outcome carrying `value`.
    pub fn success(value: impl Serialize) -> Self {
        match serde_json::to_value(value) {
            Ok(result) => Self {
                status: StatusCode::OK,
                errors: None,
                result: Some(result),
                result_count: None,
            },
            Err(e) => {
                error!(error = %e, "failed to serialize result payload");
                Self::internal()
            }
        }
    }

    /// Successful list outcome.
    pub fn list<T: Serialize>(items: &[T]) -> Self {
        let count = i64::try_from(items.len()).unwrap_or(i64::MAX);
        let mut result = Self::success(items);
        if result.is_success() {
            result.result_count = Some(count);
        }
        result
    }

    /// Business failure, still reported with HTTP 200.
    pub fn failure(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::OK, vec![message.into()])
    }

    /// Request rejected before reaching business logic.
    pub fn bad_request(errors: Vec<String>) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, errors)
    }

    pub fn too_many_requests() -> Self {
        Self::with_status(StatusCode::TOO_MANY_REQUESTS, vec![TOO_MANY_REQUESTS.to_string()])
    }

    pub fn request_timeout() -> Self {
        Self::with_status(StatusCode::REQUEST_TIMEOUT, vec![REQUEST_TIMED_OUT.to_string()])
    }

    /// Infrastructure fault. The cause is logged by the caller, never returned.
    pub fn internal() -> Self {
        Self::with_status(
            StatusCode::INTERNAL_SERVER_ERROR,
            vec![INTERNAL_SERVER_ERROR.to_string()],
        )
    }

    fn with_status(status: StatusCode, errors: Vec<String>) -> Self {
        Self {
            status,
            errors: Some(errors),
            result: None,
            result_count: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.errors.is_none()
    }

    pub fn first_error(&self) -> Option<&str> {
        self.errors
            .as_ref()
            .and_then(|errors| errors.first())
            .map(String::as_str)
    }
}

impl IntoResponse for BaseResult {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn business_failure_is_200_with_errors() {
        let response = BaseResult::failure("OTP Expired").into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body_bytes.to_vec()).unwrap();
        assert_eq!(
            body,
            r#"{"errors":["OTP Expired"],"result":null,"result_count":null}"#
        );
    }

    #[tokio::test]
    async fn internal_fault_hides_details() {
        let response = BaseResult::internal().into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["errors"][0], INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn list_sets_result_count() {
        let result = BaseResult::list(&["a", "b", "c"]);
        assert!(result.is_success());
        assert_eq!(result.result_count, Some(3));
        assert_eq!(result.result, Some(serde_json::json!(["a", "b", "c"])));
    }

    #[test]
    fn success_has_no_count() {
        let result = BaseResult::success("123456 for : 09120000000");
        assert_eq!(result.status, StatusCode::OK);
        assert!(result.result_count.is_none());
        assert!(result.first_error().is_none());
    }

    #[test]
    fn too_many_requests_uses_429() {
        let result = BaseResult::too_many_requests();
        assert_eq!(result.status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(result.first_error(), Some(TOO_MANY_REQUESTS));
    }
}
