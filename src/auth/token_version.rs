//! # Token 版本检查
//!
//! 每个用户在键值存储中保存最低可接受的 token 版本，
//! 键为 `user:token_version:<user_id>`，值为十进制整数字符串。
//! 该模块只读，不写入版本记录。
//!
//! 记录缺失、格式错误或存储不可用时，最低版本按 1 处理，
//! 兼容在引入版本号之前签发的 token。

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use crate::cache::{CacheClient, CacheKey};
use crate::error::Result;
use crate::logging::{LogComponent, LogStage};
use crate::{ldebug, lwarn};

/// 无法取得版本记录时使用的最低版本
pub const DEFAULT_TOKEN_VERSION: i64 = 1;

/// 最低 token 版本的只读存储
#[async_trait]
pub trait TokenVersionStore: Send + Sync {
    /// 读取原始记录，不存在时返回 `None`
    async fn raw_version(&self, user_id: i64) -> Result<Option<String>>;
}

/// 解析用户的最低可接受版本
pub async fn minimum_version(store: &dyn TokenVersionStore, user_id: i64) -> i64 {
    match store.raw_version(user_id).await {
        Ok(Some(raw)) => raw.trim().parse().unwrap_or_else(|e| {
            lwarn!(
                "system",
                LogStage::Authentication,
                LogComponent::AuthGuard,
                "parse_token_version",
                &format!("解析Token版本号失败，按默认版本处理: {e}"),
                user_id = user_id,
                raw = raw
            );
            DEFAULT_TOKEN_VERSION
        }),
        Ok(None) => DEFAULT_TOKEN_VERSION,
        Err(e) => {
            lwarn!(
                "system",
                LogStage::Authentication,
                LogComponent::AuthGuard,
                "load_token_version",
                &format!("获取用户Token版本号失败，按默认版本处理: {e}"),
                user_id = user_id
            );
            DEFAULT_TOKEN_VERSION
        }
    }
}

/// token 版本必须不低于最低版本
#[must_use]
pub const fn is_version_current(token_version: i64, minimum_version: i64) -> bool {
    token_version >= minimum_version
}

/// 基于 Redis 的版本存储
#[derive(Clone)]
pub struct RedisTokenVersionStore {
    client: CacheClient,
}

impl RedisTokenVersionStore {
    #[must_use]
    pub const fn new(client: CacheClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TokenVersionStore for RedisTokenVersionStore {
    async fn raw_version(&self, user_id: i64) -> Result<Option<String>> {
        let key = CacheKey::TokenVersion { user_id }.build();
        self.client.get_raw(&key).await
    }
}

/// 进程内版本存储，用于测试和单进程部署
#[derive(Debug, Default)]
pub struct MemoryTokenVersionStore {
    versions: RwLock<HashMap<i64, String>>,
}

impl MemoryTokenVersionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_version(&self, user_id: i64, version: i64) {
        self.set_raw(user_id, version.to_string());
    }

    /// 写入原始字符串，可用于模拟格式错误的记录
    pub fn set_raw(&self, user_id: i64, raw: impl Into<String>) {
        self.versions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(user_id, raw.into());
    }

    pub fn remove(&self, user_id: i64) {
        self.versions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&user_id);
    }
}

#[async_trait]
impl TokenVersionStore for MemoryTokenVersionStore {
    async fn raw_version(&self, user_id: i64) -> Result<Option<String>> {
        let raw = self
            .versions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&user_id)
            .cloned();
        ldebug!(
            "system",
            LogStage::Authentication,
            LogComponent::AuthGuard,
            "memory_token_version",
            &format!("读取内存版本记录: user_id={user_id}, found={}", raw.is_some())
        );
        Ok(raw)
    }
}
