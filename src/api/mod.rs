// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::time::Duration;

use axum::{
    body::Body,
    extract::MatchedPath,
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info_span, warn, Span};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    envelope::BaseResult,
    metrics::track_http,
    models::{MobileInput, OtpInput, PageInput, TokenBundle, UserProfile},
    ratelimit::{admit, resolve_client},
    state::AppState,
};

pub mod health;
pub mod metrics;
pub mod user;

/// Build the HTTP application.
///
/// Layers, outermost first: request id and tracing, timeout, CORS (optional),
/// HTTP metrics, client resolution, rate limiting (optional), handlers.
pub fn router(state: AppState) -> Router {
    let mut app = Router::new()
        .route("/api/v1/user/signup", post(user::signup))
        .route("/api/v1/user/signin", post(user::signin))
        .route("/api/v1/user/otp", post(user::verify_otp))
        .route("/api/v1/user", get(user::get_user))
        .route("/api/v1/user/", get(user::get_user))
        .route("/api/v1/user/{offset}/{page}", get(user::list_users))
        .route("/metrics", get(metrics::scrape))
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state.clone());

    if state.http.swagger_enabled {
        app = app.merge(SwaggerUi::new("/swagger").url("/api-doc/openapi.json", ApiDoc::openapi()));
    }

    if let Some(limiter) = state.rate_limiter.clone() {
        app = app.layer(middleware::from_fn_with_state(limiter, admit));
    }

    app = app
        .layer(middleware::from_fn_with_state(
            state.client_resolver.clone(),
            resolve_client,
        ))
        .layer(middleware::from_fn_with_state(state.metrics.clone(), track_http));

    if state.http.cors_enabled {
        app = app.layer(CorsLayer::permissive());
    }

    with_deadline(app, state.http.read_timeout).layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http().make_span_with(make_span))
            .layer(PropagateRequestIdLayer::x_request_id()),
    )
}

/// Bound every request by `timeout`, answering late ones with a 408 envelope.
fn with_deadline(app: Router, timeout: Duration) -> Router {
    app.layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout))
        .layer(middleware::from_fn(envelope_timeout))
}

async fn envelope_timeout(request: Request<Body>, next: Next) -> Response {
    let path = request.uri().path().to_owned();
    let response = next.run(request).await;
    if response.status() == StatusCode::REQUEST_TIMEOUT {
        warn!(path = %path, "request timed out");
        return BaseResult::request_timeout().into_response();
    }
    response
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("PASETO")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        user::signup,
        user::signin,
        user::verify_otp,
        user::get_user,
        user::list_users,
        metrics::scrape,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            BaseResult,
            MobileInput,
            OtpInput,
            PageInput,
            UserProfile,
            TokenBundle,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "User", description = "OTP registration, login and session tokens"),
        (name = "Metrics", description = "Prometheus metrics"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::{
        body::to_bytes,
        http::{header::AUTHORIZATION, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::auth::PasetoMaker;
    use crate::clock::SystemClock;
    use crate::config::RateLimitConfig;
    use crate::error::{PROVIDE_REQUIRED_JSON_BODY, PROVIDE_REQUIRED_PARAM};
    use crate::metrics::Metrics;
    use crate::ratelimit::{InMemoryCounterStore, RateLimiter};
    use crate::schema::SchemaRegistry;
    use crate::state::HttpSettings;
    use crate::storage::InMemoryAccountStore;
    use crate::user::{compose, SessionPolicy, UserEngine};

    const MOBILE: &str = "09121234567";

    fn state(rate_limit: Option<u64>, swagger: bool) -> AppState {
        let clock = Arc::new(SystemClock);
        let store = Arc::new(InMemoryAccountStore::new());
        let tokens = Arc::new(
            PasetoMaker::new(
                "0123456789abcdef0123456789abcdef",
                "otp-auth-server",
                "otp-auth-clients",
                clock.clone(),
            )
            .unwrap(),
        );
        let metrics = Arc::new(Metrics::new());
        let engine = Arc::new(UserEngine::new(
            store.clone(),
            tokens.clone(),
            clock,
            Duration::from_secs(180),
            SessionPolicy {
                issuer: "otp-auth-server".to_string(),
                audience: "otp-auth-clients".to_string(),
                access_ttl: Duration::from_secs(3600),
                refresh_ttl: Duration::from_secs(86_400),
            },
        ));
        let users = compose(
            engine,
            Arc::new(SchemaRegistry::embedded().unwrap()),
            metrics.clone(),
            tokens,
        );

        let mut state = AppState::new(users, store, metrics).with_http(HttpSettings {
            swagger_enabled: swagger,
            ..HttpSettings::default()
        });
        if let Some(limit) = rate_limit {
            state = state.with_rate_limiter(Arc::new(RateLimiter::new(
                Arc::new(InMemoryCounterStore::new(64)),
                RateLimitConfig {
                    requests_per_window: limit,
                    ..RateLimitConfig::default()
                },
            )));
        }
        state
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_with_token(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::get(uri);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn code_of(body: &Value) -> String {
        let text = body["result"].as_str().unwrap();
        text.split_once(" for : ").unwrap().0.to_string()
    }

    /// Register `mobile`, redeem its code and return the access token.
    async fn sign_in(app: &Router, mobile: &str) -> String {
        let response = app
            .clone()
            .oneshot(post_json("/api/v1/user/signup", json!({ "mobile": mobile })))
            .await
            .unwrap();
        let code = code_of(&json_body(response).await);

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/v1/user/otp",
                json!({ "mobile": mobile, "verification": code }),
            ))
            .await
            .unwrap();
        let body = json_body(response).await;
        body["result"]["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn signup_returns_code_in_envelope() {
        let app = router(state(None, false));
        let response = app
            .oneshot(post_json("/api/v1/user/signup", json!({ "mobile": MOBILE })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert!(body["errors"].is_null());
        let code = code_of(&body);
        assert_eq!(code.len(), 6);
        assert_eq!(body["result"], format!("{code} for : {MOBILE}"));
    }

    #[tokio::test]
    async fn duplicate_signup_is_business_error() {
        let app = router(state(None, false));
        app.clone()
            .oneshot(post_json("/api/v1/user/signup", json!({ "mobile": MOBILE })))
            .await
            .unwrap();
        let response = app
            .oneshot(post_json("/api/v1/user/signup", json!({ "mobile": MOBILE })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["errors"][0], "account with specified params already exists");
        assert!(body["result"].is_null());
    }

    #[tokio::test]
    async fn malformed_body_is_400() {
        let app = router(state(None, false));
        let request = Request::post("/api/v1/user/signin")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["errors"][0], PROVIDE_REQUIRED_JSON_BODY);
    }

    #[tokio::test]
    async fn schema_violation_is_400() {
        let app = router(state(None, false));
        let response = app
            .oneshot(post_json("/api/v1/user/signup", json!({ "mobile": "call me" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["errors"][0], "mobile has an invalid format");
    }

    #[tokio::test]
    async fn signin_during_active_challenge_is_refused() {
        let app = router(state(None, false));
        app.clone()
            .oneshot(post_json("/api/v1/user/signup", json!({ "mobile": MOBILE })))
            .await
            .unwrap();
        let response = app
            .oneshot(post_json("/api/v1/user/signin", json!({ "mobile": MOBILE })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await["errors"][0],
            "previous otp not expired, please wait a few minutes"
        );
    }

    #[tokio::test]
    async fn verified_session_reads_profile_and_listing() {
        let app = router(state(None, false));
        let token = sign_in(&app, MOBILE).await;
        sign_in(&app, "09127654321").await;

        for uri in ["/api/v1/user", "/api/v1/user/"] {
            let response = app
                .clone()
                .oneshot(get_with_token(uri, Some(&token)))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let body = json_body(response).await;
            assert_eq!(body["result"]["mobile"], MOBILE);
            assert!(body["result"].get("verification").is_none());
        }

        let response = app
            .oneshot(get_with_token("/api/v1/user/10/1", Some(&token)))
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["result_count"], 2);
        assert_eq!(body["result"][0]["mobile"], MOBILE);
        assert_eq!(body["result"][1]["mobile"], "09127654321");
    }

    #[tokio::test]
    async fn identity_routes_need_a_token() {
        let app = router(state(None, false));
        let response = app
            .oneshot(get_with_token("/api/v1/user", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["errors"][0], "Authorization header is required");
    }

    #[tokio::test]
    async fn non_numeric_path_is_400() {
        let app = router(state(None, false));
        let token = sign_in(&app, MOBILE).await;
        let response = app
            .oneshot(get_with_token("/api/v1/user/ten/1", Some(&token)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["errors"][0], PROVIDE_REQUIRED_PARAM);
    }

    #[tokio::test]
    async fn rate_limit_rejects_with_429_but_not_health() {
        let app = router(state(Some(2), false));
        for _ in 0..2 {
            let response = app
                .clone()
                .oneshot(post_json("/api/v1/user/signin", json!({ "mobile": MOBILE })))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
        let response = app
            .clone()
            .oneshot(post_json("/api/v1/user/signin", json!({ "mobile": MOBILE })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn sixth_request_in_window_is_rejected_at_threshold_five() {
        let app = router(state(Some(5), false));
        for _ in 0..5 {
            let response = app
                .clone()
                .oneshot(post_json("/api/v1/user/signup", json!({ "mobile": MOBILE })))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app
            .oneshot(post_json("/api/v1/user/signup", json!({ "mobile": MOBILE })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(json_body(response).await["errors"][0], "too many requests");
    }

    #[tokio::test(start_paused = true)]
    async fn slow_request_gets_timeout_envelope() {
        let app = with_deadline(
            Router::new().route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "late"
                }),
            ),
            Duration::from_millis(100),
        );

        let response = app
            .oneshot(Request::get("/slow").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(json_body(response).await["errors"][0], "request timed out");
    }

    #[tokio::test]
    async fn metrics_report_operations_and_http_status() {
        let app = router(state(None, false));
        app.clone()
            .oneshot(post_json("/api/v1/user/signup", json!({ "mobile": MOBILE })))
            .await
            .unwrap();

        let response = app
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("api_user_request_count{method=\"Register\"} 1"));
        assert!(text.contains("http_requests_total{method=\"POST\",status=\"200\"} 1"));
    }

    #[tokio::test]
    async fn request_id_is_propagated() {
        let app = router(state(None, false));
        let response = app
            .oneshot(Request::get("/health/live").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn swagger_is_mounted_only_when_enabled() {
        let response = router(state(None, true))
            .oneshot(Request::get("/api-doc/openapi.json").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let doc = json_body(response).await;
        assert!(doc["paths"].get("/api/v1/user/signup").is_some());

        let response = router(state(None, false))
            .oneshot(Request::get("/api-doc/openapi.json").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
