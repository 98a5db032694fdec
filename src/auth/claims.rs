//! Token claim types
//!
//! Tokens are issued in one shape (`user_id`, `version`, `roles`) but older
//! issuers put the subject in `payload` or `uid` and sometimes add a client
//! id under `cid`. Decoding goes through [`WireClaims`], which accepts all of
//! them and resolves to a single [`VerifiedClaims`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AuthError;

/// Claims supplied by the caller when issuing a token
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserClaims {
    pub user_id: i64,
    /// Must be >= the stored minimum version for the token to be admitted
    pub version: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
}

impl UserClaims {
    #[must_use]
    pub const fn new(user_id: i64, version: i64) -> Self {
        Self {
            user_id,
            version,
            roles: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }
}

/// Which claim the subject was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimShape {
    /// `user_id`
    Current,
    /// `uid`
    LegacyUid,
    /// `payload`
    LegacyPayload,
}

/// Claims after signature verification and shape resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifiedClaims {
    pub user_id: i64,
    /// 0 when the token carries no `version`
    pub version: i64,
    pub roles: Vec<String>,
    pub iat: Option<i64>,
    pub exp: i64,
    pub client_id: Option<String>,
    pub shape: ClaimShape,
}

/// A subject id that may be encoded as a JSON number or a numeric string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum NumericId {
    Int(i64),
    Text(String),
}

impl NumericId {
    fn resolve(&self) -> Option<i64> {
        match self {
            Self::Int(id) => Some(*id),
            Self::Text(text) => text.trim().parse().ok(),
        }
    }
}

/// Every claim shape seen on the wire
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WireClaims {
    pub exp: i64,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub user_id: Option<NumericId>,
    #[serde(default)]
    pub uid: Option<NumericId>,
    #[serde(default)]
    pub payload: Option<NumericId>,
    #[serde(default)]
    pub cid: Option<Value>,
    #[serde(default)]
    pub version: Option<i64>,
    /// `null` 与缺省都视为空列表
    #[serde(default)]
    pub roles: Option<Vec<String>>,
}

impl TryFrom<WireClaims> for VerifiedClaims {
    type Error = AuthError;

    /// Subject precedence: `user_id`, then `uid`, then `payload`.
    fn try_from(wire: WireClaims) -> Result<Self, Self::Error> {
        let (user_id, shape) = [
            (wire.user_id.as_ref(), ClaimShape::Current),
            (wire.uid.as_ref(), ClaimShape::LegacyUid),
            (wire.payload.as_ref(), ClaimShape::LegacyPayload),
        ]
        .into_iter()
        .find_map(|(id, shape)| id.and_then(NumericId::resolve).map(|id| (id, shape)))
        .ok_or(AuthError::MissingSubject)?;

        let client_id = match wire.cid {
            Some(Value::String(cid)) => Some(cid),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        };

        Ok(Self {
            user_id,
            version: wire.version.unwrap_or(0),
            roles: wire.roles.unwrap_or_default(),
            iat: wire.iat,
            exp: wire.exp,
            client_id,
            shape,
        })
    }
}
