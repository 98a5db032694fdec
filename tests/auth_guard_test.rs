//! # 认证守卫集成测试
//!
//! 通过 axum 路由验证拒绝顺序、信封内容以及版本存储的访问次数。

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header::AUTHORIZATION},
    middleware,
    response::Response,
    routing::get,
};
use chrono::Utc;
use mockall::mock;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tower::ServiceExt;

use htxp::auth::{
    AuthContext, AuthGuard, MemoryTokenVersionStore, TokenIssuer, TokenVersionStore, UserClaims, auth_guard,
};
use htxp::server::{AppState, build_router};
use htxp::{HtxpError, Result};

const SECRET: &str = "guard-test-secret";

mock! {
    pub VersionStore {}

    #[async_trait]
    impl TokenVersionStore for VersionStore {
        async fn raw_version(&self, user_id: i64) -> Result<Option<String>>;
    }
}

fn issuer() -> Arc<TokenIssuer> {
    Arc::new(TokenIssuer::new(SECRET, 3600))
}

fn untouched_store() -> MockVersionStore {
    let mut store = MockVersionStore::new();
    store.expect_raw_version().never();
    store
}

fn store_returning(raw: Option<&'static str>) -> MockVersionStore {
    let mut store = MockVersionStore::new();
    store
        .expect_raw_version()
        .times(1)
        .returning(move |_| Ok(raw.map(ToString::to_string)));
    store
}

async fn call(store: impl TokenVersionStore + 'static, authorization: Option<String>) -> Response {
    let router = build_router(AppState::new(issuer(), Arc::new(store)));
    let mut request = Request::builder().uri("/api/me");
    if let Some(value) = authorization {
        request = request.header(AUTHORIZATION, value);
    }
    router
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn bearer(token: &str) -> Option<String> {
    Some(format!("Bearer {token}"))
}

#[tokio::test]
async fn missing_header_is_rejected_without_lookup() {
    let response = call(untouched_store(), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(response).await,
        json!({"code": 401, "msg": "authorization header required"})
    );
}

#[tokio::test]
async fn non_bearer_header_is_rejected_without_lookup() {
    let response = call(untouched_store(), Some("Basic dXNlcjpwYXNz".into())).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["msg"], "invalid authorization header format");
}

#[tokio::test]
async fn foreign_signature_is_invalid_token() {
    let token = TokenIssuer::new("someone-else", 3600)
        .issue(&UserClaims::new(1, 1))
        .unwrap();
    let response = call(untouched_store(), bearer(&token)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["msg"], "invalid token");
}

#[tokio::test]
async fn expired_token_is_invalid_token() {
    let now = Utc::now().timestamp();
    let token = issuer().issue_at(&UserClaims::new(1, 1), now - 7200, 60).unwrap();
    let response = call(untouched_store(), bearer(&token)).await;
    assert_eq!(body_json(response).await["msg"], "invalid token");
}

#[tokio::test]
async fn garbage_token_is_invalid_token() {
    let response = call(untouched_store(), bearer("not.a.jwt")).await;
    assert_eq!(body_json(response).await["msg"], "invalid token");
}

#[tokio::test]
async fn stale_version_is_rejected() {
    let token = issuer().issue(&UserClaims::new(42, 2)).unwrap();
    let response = call(store_returning(Some("3")), bearer(&token)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(response).await,
        json!({"code": 401, "msg": "token expired, please refresh"})
    );
}

#[tokio::test]
async fn current_version_is_admitted_with_context() {
    let token = issuer()
        .issue(&UserClaims::new(42, 3).with_roles(["admin"]))
        .unwrap();
    let response = call(store_returning(Some("3")), bearer(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({
            "code": 200,
            "msg": "success",
            "data": {"user_id": 42, "version": 3, "roles": ["admin"]}
        })
    );
}

#[tokio::test]
async fn missing_record_defaults_to_version_one() {
    let token = issuer().issue(&UserClaims::new(7, 1)).unwrap();
    let response = call(store_returning(None), bearer(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn malformed_record_defaults_to_version_one() {
    let token = issuer().issue(&UserClaims::new(7, 1)).unwrap();
    let response = call(store_returning(Some("v2")), bearer(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn store_failure_fails_open() {
    let mut store = MockVersionStore::new();
    store
        .expect_raw_version()
        .times(1)
        .returning(|_| Err(HtxpError::cache("connection refused")));

    let token = issuer().issue(&UserClaims::new(7, 1)).unwrap();
    let response = call(store, bearer(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn legacy_token_without_version_is_rejected() {
    let now = Utc::now().timestamp();
    let token = issuer().issue_custom(&json!({"uid": 5}), now, 3600).unwrap();
    let response = call(store_returning(None), bearer(&token)).await;
    assert_eq!(body_json(response).await["msg"], "token expired, please refresh");
}

#[tokio::test]
async fn lookup_uses_token_subject() {
    let mut store = MockVersionStore::new();
    store
        .expect_raw_version()
        .withf(|user_id| *user_id == 99)
        .times(1)
        .returning(|_| Ok(Some("1".into())));

    let token = issuer().issue(&UserClaims::new(99, 1)).unwrap();
    assert_eq!(call(store, bearer(&token)).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn rejection_status_is_configurable() {
    let guard = AuthGuard::new(issuer(), Arc::new(MemoryTokenVersionStore::new()))
        .with_rejection_status(StatusCode::OK);
    let router = Router::new()
        .route("/me", get(|ctx: AuthContext| async move { ctx.user_id.to_string() }))
        .layer(middleware::from_fn_with_state(guard, auth_guard));

    let response = router
        .oneshot(Request::builder().uri("/me").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["code"], 401);
}

#[tokio::test]
async fn issued_pair_round_trips_through_guard() {
    let store = Arc::new(MemoryTokenVersionStore::new());
    store.set_version(11, 4);
    let router = build_router(AppState::new(issuer(), store.clone()).with_token_endpoint(true));

    let response = router
        .clone()
        .oneshot(Request::builder().uri("/token/11").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let token = body_json(response).await["data"]["access_token"]
        .as_str()
        .unwrap()
        .to_string();

    let me = |token: String| {
        let router = router.clone();
        async move {
            router
                .oneshot(
                    Request::builder()
                        .uri("/api/me")
                        .header(AUTHORIZATION, format!("Bearer {token}"))
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap()
        }
    };

    let response = me(token.clone()).await;
    assert_eq!(body_json(response).await["data"]["version"], 4);

    // 提升最低版本后，旧 token 失效
    store.set_version(11, 5);
    let response = me(token).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_route_is_absent_by_default() {
    let store = Arc::new(MemoryTokenVersionStore::new());
    let response = build_router(AppState::new(issuer(), store))
        .oneshot(Request::builder().uri("/token/11").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
