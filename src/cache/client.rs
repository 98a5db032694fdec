//! # Redis 缓存客户端
//!
//! 提供 Redis 连接管理和基础操作

use std::time::Duration;

use crate::{ldebug, lerror, linfo, logging::{LogComponent, LogStage}};
use redis::{AsyncCommands, Client, aio::{ConnectionManager, ConnectionManagerConfig}};
use serde::{Deserialize, Serialize};

use crate::error::{HtxpError, Result};

/// Redis 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    /// 完整连接 URL，设置后忽略 host/port/database/password
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Redis 服务器地址
    pub host: String,
    /// Redis 服务器端口
    pub port: u16,
    /// 数据库编号
    pub database: u8,
    /// 连接密码（可选）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// 连接超时时间（秒）
    pub connection_timeout: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "127.0.0.1".to_string(),
            port: 6379,
            database: 0,
            password: None,
            connection_timeout: 10,
        }
    }
}

impl RedisConfig {
    /// 构建 Redis 连接 URL
    #[must_use]
    pub fn build_url(&self) -> String {
        if let Some(url) = &self.url {
            return url.clone();
        }
        if let Some(password) = &self.password {
            format!(
                "redis://:{}@{}:{}/{}",
                urlencoding::encode(password),
                self.host,
                self.port,
                self.database
            )
        } else {
            format!("redis://{}:{}/{}", self.host, self.port, self.database)
        }
    }

    /// 日志中使用的地址，不含密码
    #[must_use]
    pub fn display_address(&self) -> String {
        self.url.as_ref().map_or_else(
            || format!("{}:{}/{}", self.host, self.port, self.database),
            |url| {
                url::Url::parse(url).map_or_else(
                    |_| "<invalid url>".to_string(),
                    |parsed| {
                        format!(
                            "{}:{}",
                            parsed.host_str().unwrap_or_default(),
                            parsed.port().unwrap_or(6379)
                        )
                    },
                )
            },
        )
    }
}

/// Redis 缓存客户端
#[derive(Clone)]
pub struct CacheClient {
    /// Redis 连接管理器
    connection_manager: ConnectionManager,
    /// 配置信息
    config: RedisConfig,
}

impl CacheClient {
    /// 创建新的缓存客户端
    pub async fn new(config: RedisConfig) -> Result<Self> {
        linfo!(
            "system",
            LogStage::Cache,
            LogComponent::Cache,
            "connect_to_redis",
            &format!("正在连接 Redis 服务器: {}", config.display_address())
        );

        let client = Client::open(config.build_url())
            .map_err(|e| HtxpError::cache_with_source("创建 Redis 客户端失败", e))?;

        let timeout = Duration::from_secs(config.connection_timeout);
        let manager_config = ConnectionManagerConfig::new()
            .set_connection_timeout(timeout)
            .set_response_timeout(timeout);

        let connection_manager = ConnectionManager::new_with_config(client, manager_config)
            .await
            .map_err(|e| HtxpError::cache_with_source("建立 Redis 连接失败", e))?;

        linfo!("system", LogStage::Cache, LogComponent::Cache, "redis_connected", "Redis 连接建立成功");

        Ok(Self {
            connection_manager,
            config,
        })
    }

    /// 读取原始字符串值
    pub async fn get_raw(&self, key: &str) -> Result<Option<String>> {
        ldebug!("system", LogStage::Cache, LogComponent::Cache, "get_cache", &format!("获取缓存: key={key}"));

        let mut conn = self.connection_manager.clone();

        let result: Option<String> = conn
            .get(key)
            .await
            .map_err(|e| HtxpError::cache_with_source(format!("获取缓存失败: {key}"), e))?;

        ldebug!(
            "system",
            LogStage::Cache,
            LogComponent::Cache,
            "get_cache_result",
            &format!("缓存{}: {key}", if result.is_some() { "命中" } else { "未命中" })
        );
        Ok(result)
    }

    /// 写入原始字符串值，`ttl_seconds` 为空时不过期
    pub async fn set_raw(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> Result<()> {
        ldebug!(
            "system",
            LogStage::Cache,
            LogComponent::Cache,
            "set_cache",
            &format!("设置缓存: key={key}, ttl={ttl_seconds:?}")
        );

        let mut conn = self.connection_manager.clone();

        match ttl_seconds {
            Some(ttl) => conn.set_ex::<_, _, ()>(key, value, ttl).await,
            None => conn.set::<_, _, ()>(key, value).await,
        }
        .map_err(|e| HtxpError::cache_with_source(format!("设置缓存失败: {key}"), e))?;

        Ok(())
    }

    /// 删除缓存
    pub async fn delete(&self, key: &str) -> Result<bool> {
        ldebug!("system", LogStage::Cache, LogComponent::Cache, "delete_cache", &format!("删除缓存: key={key}"));

        let mut conn = self.connection_manager.clone();

        let deleted_count: i64 = conn
            .del(key)
            .await
            .map_err(|e| HtxpError::cache_with_source(format!("删除缓存失败: {key}"), e))?;

        Ok(deleted_count > 0)
    }

    /// 测试连接
    pub async fn ping(&self) -> Result<()> {
        ldebug!("system", LogStage::Cache, LogComponent::Cache, "ping", "测试 Redis 连接");

        let mut conn = self.connection_manager.clone();

        let response: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| HtxpError::cache_with_source("Redis ping 失败", e))?;

        if response == "PONG" {
            linfo!("system", LogStage::Cache, LogComponent::Cache, "ping_success", "Redis 连接测试成功");
            Ok(())
        } else {
            lerror!("system", LogStage::Cache, LogComponent::Cache, "ping_fail", &format!("Redis ping 响应异常: {response}"));
            Err(HtxpError::cache("Redis 连接测试失败"))
        }
    }

    /// 获取配置信息
    #[must_use]
    pub const fn config(&self) -> &RedisConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_url_from_parts() {
        let config = RedisConfig::default();
        assert_eq!(config.build_url(), "redis://127.0.0.1:6379/0");

        let config = RedisConfig {
            password: Some("p@ss".to_string()),
            database: 2,
            ..RedisConfig::default()
        };
        assert_eq!(config.build_url(), "redis://:p%40ss@127.0.0.1:6379/2");
    }

    #[test]
    fn test_url_takes_precedence() {
        let config = RedisConfig {
            url: Some("redis://:secret@cache.internal:6380/1".to_string()),
            ..RedisConfig::default()
        };
        assert_eq!(config.build_url(), "redis://:secret@cache.internal:6380/1");
        assert_eq!(config.display_address(), "cache.internal:6380");
    }
}
