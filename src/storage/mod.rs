//! # 对象存储模块
//!
//! S3 兼容对象存储（MinIO）的桶/对象操作，以及 MinIO 管理 API 的用户与策略管理。
//! 所有操作都是对底层 SDK / HTTP 调用的一对一封装，不做重试。

pub mod admin;
pub mod client;
pub mod crypto;

pub use admin::{StorageAdmin, UserInfo};
pub use client::{BucketInfo, ObjectInfo, StorageClient};

use serde::{Deserialize, Serialize};

/// 默认区域
pub const DEFAULT_REGION: &str = "us-east-1";

/// 对象存储配置
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// `host:port`，或带协议的完整地址
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    /// `endpoint` 不带协议时决定使用 https 还是 http
    pub use_ssl: bool,
    pub region: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            endpoint: "127.0.0.1:9000".to_string(),
            access_key: String::new(),
            secret_key: String::new(),
            use_ssl: false,
            region: DEFAULT_REGION.to_string(),
        }
    }
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("endpoint", &self.endpoint)
            .field("access_key", &self.access_key)
            .field("secret_key", &crate::logging::mask_secret(&self.secret_key))
            .field("use_ssl", &self.use_ssl)
            .field("region", &self.region)
            .finish()
    }
}

impl StorageConfig {
    #[must_use]
    pub fn new(
        endpoint: impl Into<String>,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
        use_ssl: bool,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            use_ssl,
            region: DEFAULT_REGION.to_string(),
        }
    }

    /// 带协议、无结尾斜杠的服务地址
    #[must_use]
    pub fn endpoint_url(&self) -> String {
        let endpoint = self.endpoint.trim_end_matches('/');
        if endpoint.contains("://") {
            endpoint.to_string()
        } else if self.use_ssl {
            format!("https://{endpoint}")
        } else {
            format!("http://{endpoint}")
        }
    }
}
