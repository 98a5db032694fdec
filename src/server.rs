//! # 演示服务
//!
//! 组装 axum 路由：信封示例、标识符生成以及受保护的 `/api/me`。
//! 调试用的 token 签发接口默认关闭。

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, State},
    http::{Method, header},
    middleware,
    response::Response,
    routing::get,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::{AuthContext, AuthGuard, TokenIssuer, TokenVersionStore, UserClaims, auth_guard, minimum_version};
use crate::error::{HtxpError, Result};
use crate::{linfo, lwarn};
use crate::logging::{LogComponent, LogStage};
use crate::response::{app_error, error, success};
use crate::utils::{generate_name, generate_order_id, generate_order_no, md5_hex};

/// 路由共享状态
#[derive(Clone)]
pub struct AppState {
    pub issuer: Arc<TokenIssuer>,
    pub versions: Arc<dyn TokenVersionStore>,
    /// 是否挂载 `/token/{user_id}`
    pub token_endpoint: bool,
}

impl AppState {
    #[must_use]
    pub fn new(issuer: Arc<TokenIssuer>, versions: Arc<dyn TokenVersionStore>) -> Self {
        Self {
            issuer,
            versions,
            token_endpoint: false,
        }
    }

    /// 开启无鉴权的调试签发接口
    #[must_use]
    pub const fn with_token_endpoint(mut self, enabled: bool) -> Self {
        self.token_endpoint = enabled;
        self
    }

    #[must_use]
    pub fn guard(&self) -> AuthGuard {
        AuthGuard::new(Arc::clone(&self.issuer), Arc::clone(&self.versions))
    }
}

#[derive(Serialize)]
struct Generated {
    order_no: String,
    order_id: String,
    name: String,
    md5: String,
}

async fn success_handler() -> Response {
    success(serde_json::json!({ "hello": "htxp" }))
}

async fn error_handler() -> Response {
    error("something went wrong")
}

async fn generate_handler() -> Response {
    let name = generate_name(12);
    success(Generated {
        order_no: generate_order_no(),
        order_id: generate_order_id("wechat"),
        md5: md5_hex(&name),
        name,
    })
}

/// 以当前最低版本为用户签发 token 对
async fn token_handler(State(state): State<AppState>, Path(user_id): Path<i64>) -> Response {
    let version = minimum_version(state.versions.as_ref(), user_id).await;
    match state.issuer.issue_pair(&UserClaims::new(user_id, version)) {
        Ok(pair) => success(pair),
        Err(e) => app_error(e),
    }
}

async fn me_handler(context: AuthContext) -> Response {
    success(context)
}

/// 构建路由
pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/me", get(me_handler))
        .route_layer(middleware::from_fn_with_state(state.guard(), auth_guard));

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_origin(Any);

    let mut router = Router::new()
        .route("/success", get(success_handler))
        .route("/error", get(error_handler))
        .route("/generate", get(generate_handler));
    if state.token_endpoint {
        lwarn!(
            "system",
            LogStage::Startup,
            LogComponent::Main,
            "debug_token_endpoint",
            "已开启无鉴权的 /token/{user_id} 签发接口，请勿用于生产环境"
        );
        router = router.route("/token/{user_id}", get(token_handler));
    }

    router
        .nest("/api", protected)
        .with_state(state)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(cors))
}

/// 绑定地址并启动服务
pub async fn serve(router: Router, bind_address: &str) -> Result<()> {
    let addr: SocketAddr = bind_address
        .parse()
        .map_err(|e| HtxpError::config_with_source(format!("无效的监听地址: {bind_address}"), e))?;

    linfo!(
        "system",
        LogStage::Startup,
        LogComponent::Main,
        "server_start",
        &format!("Starting server on {addr}")
    );

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| HtxpError::network_with_source("服务运行失败", e))?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        linfo!("system", LogStage::Shutdown, LogComponent::Main, "shutdown_signal", "收到退出信号");
    }
}
