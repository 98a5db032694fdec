//! # 缓存模块
//!
//! Redis 客户端与缓存键规范

pub mod client;
pub mod keys;

pub use client::{CacheClient, RedisConfig};
pub use keys::CacheKey;
