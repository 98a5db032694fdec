//! # 应用配置结构定义

use serde::{Deserialize, Serialize};

use crate::cache::RedisConfig;
use crate::messaging::RabbitConf;
use crate::oauth::QqConfig;
use crate::sms::SmsConfig;
use crate::storage::StorageConfig;

/// 应用主配置结构
///
/// 除 `server` 与 `jwt` 外，各外部服务配置都是可选的，
/// 未配置的服务在启动时不会被初始化。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP 服务配置
    #[serde(default)]
    pub server: ServerConfig,
    /// JWT 签发配置
    #[serde(default)]
    pub jwt: JwtConfig,
    /// Redis 配置
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redis: Option<RedisConfig>,
    /// 对象存储配置
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<StorageConfig>,
    /// RabbitMQ 配置
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rabbitmq: Option<RabbitConf>,
    /// 短信配置
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sms: Option<SmsConfig>,
    /// QQ 登录配置
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qq: Option<QqConfig>,
}

/// HTTP 服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 监听地址
    pub host: String,
    /// 监听端口
    pub port: u16,
    /// 是否开放无鉴权的 `/token/{user_id}` 签发接口，仅限本地调试
    pub debug_token_endpoint: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            debug_token_endpoint: false,
        }
    }
}

impl ServerConfig {
    /// 监听地址字符串，形如 `0.0.0.0:8080`
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// JWT 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JwtConfig {
    /// HS256 共享密钥
    pub secret: String,
    /// access token 有效期（秒）
    pub access_ttl_secs: u64,
    /// refresh token 有效期（秒），随 token 对返回，供服务端存储设置过期时间
    pub refresh_ttl_secs: u64,
    /// 校验 exp 时允许的时钟偏差（秒）
    pub leeway_secs: u64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            access_ttl_secs: 7200,
            refresh_ttl_secs: 7 * 24 * 3600,
            leeway_secs: 0,
        }
    }
}

impl AppConfig {
    /// 验证配置的有效性
    pub fn validate(&self) -> crate::error::Result<()> {
        crate::ensure_config!(self.server.port != 0, "无效的服务器端口: 0");
        crate::ensure_config!(!self.jwt.secret.is_empty(), "JWT secret 不能为空");
        crate::ensure_config!(self.jwt.access_ttl_secs > 0, "JWT access_ttl_secs 必须大于0");

        if let Some(redis) = &self.redis {
            crate::ensure_config!(!redis.build_url().is_empty(), "Redis URL不能为空");
            crate::ensure_config!(!redis.host.is_empty() || redis.url.is_some(), "Redis host不能为空");
        }

        if let Some(storage) = &self.storage {
            crate::ensure_config!(!storage.endpoint.is_empty(), "对象存储 endpoint 不能为空");
        }

        if let Some(rabbit) = &self.rabbitmq {
            crate::ensure_config!(!rabbit.host.is_empty(), "RabbitMQ host不能为空");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AppConfig {
        AppConfig {
            jwt: JwtConfig {
                secret: "test-secret".to_string(),
                ..JwtConfig::default()
            },
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_default_server_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.jwt.access_ttl_secs, 7200);
        assert!(config.redis.is_none());
        assert!(!config.server.debug_token_endpoint);
    }

    #[test]
    fn test_validate_requires_jwt_secret() {
        let err = AppConfig::default().validate().unwrap_err();
        assert!(err.to_string().contains("JWT secret"));
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_port_and_ttl() {
        let mut config = valid_config();
        config.server.port = 0;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.jwt.access_ttl_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: AppConfig = toml::from_str(
            r#"
            [jwt]
            secret = "abc"

            [redis]
            host = "10.0.0.1"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.jwt.secret, "abc");
        let redis = config.redis.unwrap();
        assert_eq!(redis.host, "10.0.0.1");
        assert_eq!(redis.port, 6379);
        assert!(config.storage.is_none());
    }
}
