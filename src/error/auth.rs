//! Errors raised while issuing or checking bearer tokens.
//!
//! The `Display` strings of the rejection variants are exactly the `msg`
//! values written into the 401 envelope by the auth guard.

use thiserror::Error;

/// The primary error type for token issuance and the auth guard.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("authorization header required")]
    MissingHeader,

    #[error("invalid authorization header format")]
    InvalidHeaderFormat,

    #[error("invalid token")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),

    /// Signature is fine but no claim shape yields a user id.
    #[error("invalid token")]
    MissingSubject,

    #[error("token expired, please refresh")]
    VersionExpired {
        user_id: i64,
        token_version: i64,
        min_version: i64,
    },

    #[error("token generation failed: {0}")]
    Generation(#[source] jsonwebtoken::errors::Error),

    #[error("random source unavailable: {0}")]
    Random(String),
}

impl AuthError {
    /// 是否属于应直接拒绝请求的认证失败
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::MissingHeader
                | Self::InvalidHeaderFormat
                | Self::InvalidToken(_)
                | Self::MissingSubject
                | Self::VersionExpired { .. }
        )
    }

    /// 日志使用的简短原因标识
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::MissingHeader => "missing_header",
            Self::InvalidHeaderFormat => "invalid_header_format",
            Self::InvalidToken(_) => "invalid_token",
            Self::MissingSubject => "missing_subject",
            Self::VersionExpired { .. } => "version_expired",
            Self::Generation(_) => "generation_failed",
            Self::Random(_) => "random_unavailable",
        }
    }
}
