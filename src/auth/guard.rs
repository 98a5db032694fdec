//! # 认证中间件
//!
//! 从请求头中提取 JWT，本地验证签名后检查 token 版本，
//! 并将解析出的用户信息注入到请求扩展中。
//!
//! 拒绝顺序：
//! 1. 缺少 `Authorization` 或不是 `Bearer ` 前缀，此时不访问版本存储
//! 2. 签名或有效期校验失败
//! 3. token 版本低于存储中的最低版本

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use serde::Serialize;
use std::sync::Arc;

use crate::auth::jwt::TokenIssuer;
use crate::auth::token_version::{TokenVersionStore, is_version_current, minimum_version};
use crate::error::AuthError;
use crate::logging::{LogComponent, LogStage};
use crate::response::error_with_status;
use crate::{ldebug, lwarn};

/// 拒绝信封中的 `code`
pub const REJECTION_CODE: i32 = 401;

const BEARER_PREFIX: &str = "Bearer ";

/// 包含认证用户信息的上下文
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthContext {
    pub user_id: i64,
    pub version: i64,
    pub roles: Vec<String>,
}

impl AuthContext {
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.has_role("admin")
    }
}

impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Arc<Self>>()
            .map(|ctx| ctx.as_ref().clone())
            .ok_or_else(|| {
                error_with_status(
                    StatusCode::UNAUTHORIZED,
                    REJECTION_CODE,
                    AuthError::MissingHeader.to_string(),
                )
            })
    }
}

/// 从 `Authorization` 头中提取 Bearer token
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers.get(AUTHORIZATION).ok_or(AuthError::MissingHeader)?;
    if value.is_empty() {
        return Err(AuthError::MissingHeader);
    }
    value
        .to_str()
        .ok()
        .and_then(|header| header.strip_prefix(BEARER_PREFIX))
        .ok_or(AuthError::InvalidHeaderFormat)
}

/// 认证守卫状态
#[derive(Clone)]
pub struct AuthGuard {
    issuer: Arc<TokenIssuer>,
    versions: Arc<dyn TokenVersionStore>,
    rejection_status: StatusCode,
}

impl AuthGuard {
    #[must_use]
    pub fn new(issuer: Arc<TokenIssuer>, versions: Arc<dyn TokenVersionStore>) -> Self {
        Self {
            issuer,
            versions,
            rejection_status: StatusCode::UNAUTHORIZED,
        }
    }

    /// 拒绝时使用的 HTTP 状态码，信封中的 `code` 始终为 401
    #[must_use]
    pub const fn with_rejection_status(mut self, status: StatusCode) -> Self {
        self.rejection_status = status;
        self
    }

    /// 执行全部检查，成功时返回认证上下文
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<AuthContext, AuthError> {
        let token = extract_bearer_token(headers)?;
        let claims = self.issuer.verify(token)?;

        let min_version = minimum_version(self.versions.as_ref(), claims.user_id).await;
        if !is_version_current(claims.version, min_version) {
            return Err(AuthError::VersionExpired {
                user_id: claims.user_id,
                token_version: claims.version,
                min_version,
            });
        }

        Ok(AuthContext {
            user_id: claims.user_id,
            version: claims.version,
            roles: claims.roles,
        })
    }

    fn reject(&self, err: &AuthError) -> Response {
        let detail = match err {
            AuthError::InvalidToken(source) => source.to_string(),
            AuthError::VersionExpired {
                user_id,
                token_version,
                min_version,
            } => format!("user_id={user_id}, token_version={token_version}, min_version={min_version}"),
            other => other.to_string(),
        };
        lwarn!(
            "system",
            LogStage::Authentication,
            LogComponent::AuthGuard,
            "reject",
            &format!("请求被拒绝: {detail}"),
            reason = err.reason()
        );
        error_with_status(self.rejection_status, REJECTION_CODE, err.to_string())
    }
}

/// Axum认证中间件
///
/// 用法: `axum::middleware::from_fn_with_state(guard, auth_guard)`
pub async fn auth_guard(State(guard): State<AuthGuard>, mut request: Request, next: Next) -> Response {
    match guard.authenticate(request.headers()).await {
        Ok(context) => {
            ldebug!(
                "system",
                LogStage::Authentication,
                LogComponent::AuthGuard,
                "admit",
                &format!("认证通过: user_id={}", context.user_id)
            );
            request.extensions_mut().insert(Arc::new(context));
            next.run(request).await
        }
        Err(err) => guard.reject(&err),
    }
}
