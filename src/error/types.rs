//! # 错误类型定义

use axum::http::StatusCode;
use thiserror::Error;

/// 应用主要错误类型
#[derive(Debug, Error)]
pub enum HtxpError {
    /// 配置相关错误
    #[error("配置错误: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 认证和授权错误
    #[error("认证错误: {message}")]
    Auth {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 缓存 / Redis 错误
    #[error("缓存错误: {message}")]
    Cache {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 对象存储错误
    #[error("对象存储错误: {message}")]
    Storage {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 消息队列错误
    #[error("消息队列错误: {message}")]
    Messaging {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 短信网关错误
    #[error("短信错误: {message}")]
    Sms {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 第三方登录错误
    #[error("OAuth错误: {message}")]
    OAuth {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 网络通信错误
    #[error("网络错误: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 序列化/反序列化错误
    #[error("序列化错误: {message}")]
    Serialization {
        message: String,
        #[source]
        source: anyhow::Error,
    },

    /// 字符串解析错误
    #[error("解析错误: {message}")]
    Parse {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// IO相关错误
    #[error("IO错误: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// 系统内部错误
    #[error("内部错误: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 附带上下文的错误
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<HtxpError>,
    },
}

impl HtxpError {
    /// 将错误转换为HTTP状态码和错误代码
    #[must_use]
    pub fn to_http_response_parts(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Config { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR"),
            Self::Auth { .. } => (StatusCode::UNAUTHORIZED, "AUTH_ERROR"),
            Self::Cache { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "CACHE_ERROR"),
            Self::Storage { .. } => (StatusCode::BAD_GATEWAY, "STORAGE_ERROR"),
            Self::Messaging { .. } => (StatusCode::BAD_GATEWAY, "MESSAGING_ERROR"),
            Self::Sms { .. } => (StatusCode::BAD_GATEWAY, "SMS_ERROR"),
            Self::OAuth { .. } => (StatusCode::BAD_GATEWAY, "OAUTH_ERROR"),
            Self::Network { .. } => (StatusCode::BAD_GATEWAY, "NETWORK_ERROR"),
            Self::Serialization { .. } => (StatusCode::BAD_REQUEST, "SERIALIZATION_ERROR"),
            Self::Parse { .. } => (StatusCode::BAD_REQUEST, "PARSE_ERROR"),
            Self::Io { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
            Self::Internal { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            Self::Context { source, .. } => source.to_http_response_parts(),
        }
    }

    /// 错误分类
    #[must_use]
    pub fn category(&self) -> super::ErrorCategory {
        if self.to_http_response_parts().0.is_client_error() {
            super::ErrorCategory::Client
        } else {
            super::ErrorCategory::Server
        }
    }

    /// 创建配置错误
    pub fn config<T: Into<String>>(message: T) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    /// 创建带来源的配置错误
    pub fn config_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建认证错误
    pub fn auth<T: Into<String>>(message: T) -> Self {
        Self::Auth {
            message: message.into(),
            source: None,
        }
    }

    /// 创建带来源的认证错误
    pub fn auth_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Auth {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建缓存错误
    pub fn cache<T: Into<String>>(message: T) -> Self {
        Self::Cache {
            message: message.into(),
            source: None,
        }
    }

    /// 创建带来源的缓存错误
    pub fn cache_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Cache {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建对象存储错误
    pub fn storage<T: Into<String>>(message: T) -> Self {
        Self::Storage {
            message: message.into(),
            source: None,
        }
    }

    /// 创建带来源的对象存储错误
    pub fn storage_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Storage {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建消息队列错误
    pub fn messaging<T: Into<String>>(message: T) -> Self {
        Self::Messaging {
            message: message.into(),
            source: None,
        }
    }

    /// 创建带来源的消息队列错误
    pub fn messaging_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Messaging {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建短信错误
    pub fn sms<T: Into<String>>(message: T) -> Self {
        Self::Sms {
            message: message.into(),
            source: None,
        }
    }

    /// 创建带来源的短信错误
    pub fn sms_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Sms {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建OAuth错误
    pub fn oauth<T: Into<String>>(message: T) -> Self {
        Self::OAuth {
            message: message.into(),
            source: None,
        }
    }

    /// 创建带来源的OAuth错误
    pub fn oauth_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::OAuth {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建网络错误
    pub fn network<T: Into<String>>(message: T) -> Self {
        Self::Network {
            message: message.into(),
            source: None,
        }
    }

    /// 创建带来源的网络错误
    pub fn network_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Network {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建解析错误
    pub fn parse<T: Into<String>>(message: T) -> Self {
        Self::Parse {
            message: message.into(),
            source: None,
        }
    }

    /// 创建带来源的解析错误
    pub fn parse_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Parse {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建内部错误
    pub fn internal<T: Into<String>>(message: T) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// 创建带来源的内部错误
    pub fn internal_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

impl From<std::io::Error> for HtxpError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: "文件操作失败".to_string(),
            source: err,
        }
    }
}

impl From<toml::de::Error> for HtxpError {
    fn from(err: toml::de::Error) -> Self {
        Self::config_with_source("TOML解析失败", err)
    }
}

impl From<serde_json::Error> for HtxpError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: "JSON处理失败".to_string(),
            source: err.into(),
        }
    }
}

// 认证相关错误转换
impl From<super::auth::AuthError> for HtxpError {
    fn from(err: super::auth::AuthError) -> Self {
        Self::Auth {
            message: err.to_string(),
            source: Some(anyhow::Error::new(err)),
        }
    }
}

// Redis错误转换
impl From<redis::RedisError> for HtxpError {
    fn from(err: redis::RedisError) -> Self {
        Self::cache_with_source("Redis操作失败", err)
    }
}

// Reqwest错误转换
impl From<reqwest::Error> for HtxpError {
    fn from(err: reqwest::Error) -> Self {
        Self::network_with_source("HTTP请求失败", err)
    }
}

// Bcrypt错误转换
impl From<bcrypt::BcryptError> for HtxpError {
    fn from(err: bcrypt::BcryptError) -> Self {
        Self::auth_with_source("密码处理失败", err)
    }
}

// AMQP错误转换
impl From<lapin::Error> for HtxpError {
    fn from(err: lapin::Error) -> Self {
        Self::messaging_with_source("AMQP操作失败", err)
    }
}
