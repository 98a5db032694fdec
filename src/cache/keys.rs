//! # 缓存键命名规范

use std::fmt;

/// 缓存键类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheKey {
    /// 用户最低可接受 token 版本 - `user:token_version:{user_id}`
    TokenVersion { user_id: i64 },

    /// 自定义键 - `{prefix}:{key}`
    Custom { prefix: String, key: String },
}

impl CacheKey {
    /// 生成缓存键字符串
    #[must_use]
    pub fn build(&self) -> String {
        match self {
            Self::TokenVersion { user_id } => format!("user:token_version:{user_id}"),
            Self::Custom { prefix, key } => format!("{prefix}:{key}"),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_version_key() {
        assert_eq!(
            CacheKey::TokenVersion { user_id: 42 }.to_string(),
            "user:token_version:42"
        );
    }

    #[test]
    fn test_custom_key() {
        let key = CacheKey::Custom {
            prefix: "refresh".into(),
            key: "abc".into(),
        };
        assert_eq!(key.build(), "refresh:abc");
    }
}
