//! # 认证模块
//!
//! JWT 签发与校验、token 版本检查以及 axum 认证中间件

pub mod claims;
pub mod guard;
pub mod jwt;
pub mod token_version;

pub use claims::{ClaimShape, UserClaims, VerifiedClaims};
pub use guard::{AuthContext, AuthGuard, auth_guard, extract_bearer_token};
pub use jwt::{TokenIssuer, TokenPair, generate_refresh_token};
pub use token_version::{
    DEFAULT_TOKEN_VERSION, MemoryTokenVersionStore, RedisTokenVersionStore, TokenVersionStore,
    is_version_current, minimum_version,
};
