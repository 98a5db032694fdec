//! JWT token issuance and verification
//!
//! HS256 with a shared secret. Verification is purely local.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::auth::claims::{UserClaims, VerifiedClaims, WireClaims};
use crate::config::JwtConfig;
use crate::error::{AuthError, HtxpError, Result};
use crate::ldebug;
use crate::logging::{LogComponent, LogStage};

/// Refresh token length in random bytes
pub const REFRESH_TOKEN_BYTES: usize = 16;
/// Default refresh token lifetime, 7 days
pub const DEFAULT_REFRESH_TTL_SECS: u64 = 7 * 24 * 3600;

/// JWT token issuer
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    /// Access token lifetime in seconds
    access_ttl_secs: i64,
    /// Refresh token lifetime in seconds, reported to the caller for server-side storage
    refresh_ttl_secs: i64,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .field("leeway", &self.validation.leeway)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    /// Create new issuer with zero leeway
    #[must_use]
    pub fn new(secret: &str, access_ttl_secs: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.validate_nbf = false;
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            access_ttl_secs: i64::try_from(access_ttl_secs).unwrap_or(i64::MAX),
            refresh_ttl_secs: i64::try_from(DEFAULT_REFRESH_TTL_SECS).unwrap_or(i64::MAX),
        }
    }

    #[must_use]
    pub fn from_config(config: &JwtConfig) -> Self {
        Self::new(&config.secret, config.access_ttl_secs)
            .with_leeway(config.leeway_secs)
            .with_refresh_ttl(config.refresh_ttl_secs)
    }

    #[must_use]
    pub fn with_refresh_ttl(mut self, refresh_ttl_secs: u64) -> Self {
        self.refresh_ttl_secs = i64::try_from(refresh_ttl_secs).unwrap_or(i64::MAX);
        self
    }

    /// Clock skew tolerated when checking `exp`
    #[must_use]
    pub const fn with_leeway(mut self, leeway_secs: u64) -> Self {
        self.validation.leeway = leeway_secs;
        self
    }

    #[must_use]
    pub const fn access_ttl_secs(&self) -> i64 {
        self.access_ttl_secs
    }

    #[must_use]
    pub const fn refresh_ttl_secs(&self) -> i64 {
        self.refresh_ttl_secs
    }

    /// Issue an access token valid from now for the configured lifetime
    pub fn issue(&self, claims: &UserClaims) -> Result<String> {
        self.issue_at(claims, Utc::now().timestamp(), self.access_ttl_secs)
    }

    /// Issue with an explicit `iat` and lifetime
    pub fn issue_at(&self, claims: &UserClaims, iat: i64, lifetime_secs: i64) -> Result<String> {
        self.issue_custom(claims, iat, lifetime_secs)
    }

    /// Merge arbitrary caller claims with `iat` and `exp = iat + lifetime_secs`
    ///
    /// Caller fields named `iat` or `exp` are overwritten.
    pub fn issue_custom<T: Serialize>(&self, claims: &T, iat: i64, lifetime_secs: i64) -> Result<String> {
        let mut map = match serde_json::to_value(claims)? {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(HtxpError::auth(format!(
                    "token claims must be a JSON object, got {other}"
                )));
            }
        };
        let exp = iat.saturating_add(lifetime_secs);
        map.insert("iat".to_string(), Value::from(iat));
        map.insert("exp".to_string(), Value::from(exp));

        let token = encode(&Header::new(Algorithm::HS256), &map, &self.encoding_key)
            .map_err(AuthError::Generation)?;

        ldebug!(
            "system",
            LogStage::Authentication,
            LogComponent::TokenIssuer,
            "issue_token",
            &format!("签发 token: iat={iat}, exp={exp}")
        );
        Ok(token)
    }

    /// Legacy shape `{exp, iat, payload}` where payload is the user id as a string
    pub fn issue_payload(&self, payload: &str, iat: i64, seconds: i64) -> Result<String> {
        #[derive(Serialize)]
        struct LegacyClaims<'a> {
            payload: &'a str,
        }
        self.issue_custom(&LegacyClaims { payload }, iat, seconds)
    }

    /// Access token plus an opaque refresh token
    pub fn issue_pair(&self, claims: &UserClaims) -> Result<TokenPair> {
        Ok(TokenPair {
            access_token: self.issue(claims)?,
            refresh_token: generate_refresh_token()?,
            token_type: "Bearer".to_string(),
            expires_in: self.access_ttl_secs,
            refresh_expires_in: self.refresh_ttl_secs,
        })
    }

    /// Verify signature and expiry, then resolve the claim shape
    pub fn verify(&self, token: &str) -> std::result::Result<VerifiedClaims, AuthError> {
        let data = decode::<WireClaims>(token, &self.decoding_key, &self.validation)
            .map_err(AuthError::InvalidToken)?;
        VerifiedClaims::try_from(data.claims)
    }
}

/// Opaque refresh token: 16 random bytes, URL-safe base64 without padding
///
/// Only validated by server-side lookup.
pub fn generate_refresh_token() -> Result<String> {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| AuthError::Random(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Token pair structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
    /// Refresh token lifetime in seconds
    pub refresh_expires_in: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::ClaimShape;

    fn create_test_issuer() -> TokenIssuer {
        TokenIssuer::new("test-secret-key-for-jwt-testing", 3600)
    }

    #[test]
    fn test_token_generation_and_validation() {
        let issuer = create_test_issuer();
        let claims = UserClaims::new(42, 3).with_roles(["admin"]);

        let token = issuer.issue(&claims).unwrap();
        let verified = issuer.verify(&token).unwrap();

        assert_eq!(verified.user_id, 42);
        assert_eq!(verified.version, 3);
        assert_eq!(verified.roles, vec!["admin"]);
        assert_eq!(verified.shape, ClaimShape::Current);
        assert_eq!(verified.exp - verified.iat.unwrap(), 3600);
    }

    #[test]
    fn test_token_verifies_before_and_fails_after_lifetime() {
        let issuer = create_test_issuer();
        let now = Utc::now().timestamp();
        let claims = UserClaims::new(1, 1);

        let live = issuer.issue_at(&claims, now - 10, 60).unwrap();
        assert!(issuer.verify(&live).is_ok());

        let expired = issuer.issue_at(&claims, now - 120, 60).unwrap();
        assert!(matches!(issuer.verify(&expired), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn test_leeway_accepts_recent_expiry() {
        let issuer = create_test_issuer().with_leeway(300);
        let now = Utc::now().timestamp();
        let token = issuer.issue_at(&UserClaims::new(1, 1), now - 120, 60).unwrap();
        assert!(issuer.verify(&token).is_ok());
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let token = create_test_issuer().issue(&UserClaims::new(1, 1)).unwrap();
        let other = TokenIssuer::new("another-secret", 3600);
        let err = other.verify(&token).unwrap_err();
        assert_eq!(err.to_string(), "invalid token");
    }

    #[test]
    fn test_garbage_token_is_invalid() {
        assert!(matches!(
            create_test_issuer().verify("not.a.jwt"),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_issue_payload_legacy_shape() {
        let issuer = create_test_issuer();
        let iat = Utc::now().timestamp();
        let token = issuer.issue_payload("1001", iat, 600).unwrap();

        let verified = issuer.verify(&token).unwrap();
        assert_eq!(verified.user_id, 1001);
        assert_eq!(verified.version, 0);
        assert_eq!(verified.shape, ClaimShape::LegacyPayload);
        assert_eq!(verified.exp, iat + 600);
    }

    #[test]
    fn test_issue_custom_overrides_time_claims() {
        let issuer = create_test_issuer();
        let iat = Utc::now().timestamp();
        let extra = serde_json::json!({"uid": 9, "cid": "ios", "exp": 1, "iat": 1});
        let token = issuer.issue_custom(&extra, iat, 60).unwrap();

        let verified = issuer.verify(&token).unwrap();
        assert_eq!(verified.iat, Some(iat));
        assert_eq!(verified.exp, iat + 60);
        assert_eq!(verified.client_id.as_deref(), Some("ios"));
    }

    #[test]
    fn test_issue_custom_rejects_non_object() {
        let issuer = create_test_issuer();
        assert!(issuer.issue_custom(&"scalar", 0, 60).is_err());
    }

    #[test]
    fn test_token_pair() {
        let pair = create_test_issuer().issue_pair(&UserClaims::new(1, 1)).unwrap();
        assert_eq!(pair.token_type, "Bearer");
        assert_eq!(pair.expires_in, 3600);
        assert_eq!(pair.refresh_expires_in, 7 * 24 * 3600);
        assert_eq!(pair.refresh_token.len(), 22);
    }

    #[test]
    fn test_refresh_ttl_from_config() {
        let config = JwtConfig {
            secret: "test-secret".to_string(),
            refresh_ttl_secs: 86_400,
            ..JwtConfig::default()
        };
        let issuer = TokenIssuer::from_config(&config);
        assert_eq!(issuer.refresh_ttl_secs(), 86_400);

        let pair = issuer.issue_pair(&UserClaims::new(1, 1)).unwrap();
        assert_eq!(pair.refresh_expires_in, 86_400);
    }

    #[test]
    fn test_signed_null_roles_are_accepted() {
        let issuer = create_test_issuer();
        let extra = serde_json::json!({"user_id": 1, "version": 1, "roles": null});
        let token = issuer.issue_custom(&extra, Utc::now().timestamp(), 60).unwrap();

        let verified = issuer.verify(&token).unwrap();
        assert_eq!(verified.user_id, 1);
        assert!(verified.roles.is_empty());
    }

    #[test]
    fn test_refresh_tokens_are_url_safe_and_unique() {
        let a = generate_refresh_token().unwrap();
        let b = generate_refresh_token().unwrap();
        assert_ne!(a, b);
        assert_eq!(URL_SAFE_NO_PAD.decode(&a).unwrap().len(), REFRESH_TOKEN_BYTES);
        assert!(!a.contains('=') && !a.contains('+') && !a.contains('/'));
    }
}
