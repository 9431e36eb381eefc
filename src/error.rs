// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::envelope::{BaseResult, INTERNAL_SERVER_ERROR};

/// Fixed message for a missing or malformed JSON body.
pub const PROVIDE_REQUIRED_JSON_BODY: &str = "please provide required JSON body";

/// Fixed message for missing or non-numeric path parameters.
pub const PROVIDE_REQUIRED_PARAM: &str = "please provide required path parameters";

/// Request-level failure raised before a business operation runs.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn missing_body() -> Self {
        Self::new(StatusCode::BAD_REQUEST, PROVIDE_REQUIRED_JSON_BODY)
    }

    pub fn missing_param() -> Self {
        Self::new(StatusCode::BAD_REQUEST, PROVIDE_REQUIRED_PARAM)
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_SERVER_ERROR)
    }
}

impl From<ApiError> for BaseResult {
    fn from(err: ApiError) -> Self {
        if err.status.is_server_error() {
            return BaseResult::internal();
        }
        let mut result = BaseResult::bad_request(vec![err.message]);
        result.status = err.status;
        result
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        BaseResult::from(self).into_response()
    }
}
