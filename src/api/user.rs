// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User endpoints under `/api/v1/user`.
//!
//! Handlers only decode the request. Every decision is made by the service
//! chain in [`crate::user`], and its envelope is returned as is.

use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Path, State},
    Json,
};
use tracing::debug;

use crate::auth::RequestContext;
use crate::envelope::BaseResult;
use crate::error::ApiError;
use crate::models::{MobileInput, OtpInput, PageInput};
use crate::state::AppState;

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload.map(|Json(input)| input).map_err(|rejection| {
        debug!(reason = %rejection.body_text(), "rejected request body");
        ApiError::missing_body()
    })
}

/// Register a mobile number and issue its first code.
#[utoipa::path(
    post,
    path = "/api/v1/user/signup",
    tag = "User",
    request_body = MobileInput,
    responses(
        (status = 200, description = "Code issued, or a business error in `errors`", body = BaseResult),
        (status = 400, description = "Missing or invalid JSON body", body = BaseResult),
        (status = 429, description = "Too many requests", body = BaseResult),
        (status = 500, description = "Internal server error", body = BaseResult)
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    ctx: RequestContext,
    payload: Result<Json<MobileInput>, JsonRejection>,
) -> Result<BaseResult, ApiError> {
    let input = body(payload)?;
    Ok(state.users.register(&ctx, input).await)
}

/// Request a fresh code for a registered mobile number.
#[utoipa::path(
    post,
    path = "/api/v1/user/signin",
    tag = "User",
    request_body = MobileInput,
    responses(
        (status = 200, description = "Code issued, or a business error in `errors`", body = BaseResult),
        (status = 400, description = "Missing or invalid JSON body", body = BaseResult),
        (status = 429, description = "Too many requests", body = BaseResult),
        (status = 500, description = "Internal server error", body = BaseResult)
    )
)]
pub async fn signin(
    State(state): State<AppState>,
    ctx: RequestContext,
    payload: Result<Json<MobileInput>, JsonRejection>,
) -> Result<BaseResult, ApiError> {
    let input = body(payload)?;
    Ok(state.users.login(&ctx, input).await)
}

/// Redeem a code for an access and refresh token.
#[utoipa::path(
    post,
    path = "/api/v1/user/otp",
    tag = "User",
    request_body = OtpInput,
    responses(
        (status = 200, description = "Token bundle, or a business error in `errors`", body = BaseResult),
        (status = 400, description = "Missing or invalid JSON body", body = BaseResult),
        (status = 429, description = "Too many requests", body = BaseResult),
        (status = 500, description = "Internal server error", body = BaseResult)
    )
)]
pub async fn verify_otp(
    State(state): State<AppState>,
    ctx: RequestContext,
    payload: Result<Json<OtpInput>, JsonRejection>,
) -> Result<BaseResult, ApiError> {
    let input = body(payload)?;
    Ok(state.users.verify_otp(&ctx, input).await)
}

/// Profile of the account behind the bearer token.
#[utoipa::path(
    get,
    path = "/api/v1/user",
    tag = "User",
    responses(
        (status = 200, description = "Profile, or an authorization error in `errors`", body = BaseResult),
        (status = 429, description = "Too many requests", body = BaseResult),
        (status = 500, description = "Internal server error", body = BaseResult)
    ),
    security(("bearer" = []))
)]
pub async fn get_user(State(state): State<AppState>, ctx: RequestContext) -> BaseResult {
    state.users.get_user(&ctx).await
}

/// One page of accounts, ordered by creation.
#[utoipa::path(
    get,
    path = "/api/v1/user/{offset}/{page}",
    tag = "User",
    params(
        ("offset" = i64, Path, description = "Page size"),
        ("page" = i64, Path, description = "1-based page number")
    ),
    responses(
        (status = 200, description = "Accounts, or an authorization error in `errors`", body = BaseResult),
        (status = 400, description = "Missing or non-numeric path parameters", body = BaseResult),
        (status = 429, description = "Too many requests", body = BaseResult),
        (status = 500, description = "Internal server error", body = BaseResult)
    ),
    security(("bearer" = []))
)]
pub async fn list_users(
    State(state): State<AppState>,
    ctx: RequestContext,
    params: Result<Path<(i64, i64)>, PathRejection>,
) -> Result<BaseResult, ApiError> {
    let Path((offset, page)) = params.map_err(|rejection| {
        debug!(reason = %rejection.body_text(), "rejected path parameters");
        ApiError::missing_param()
    })?;
    Ok(state.users.get_all_users(&ctx, PageInput { offset, page }).await)
}
