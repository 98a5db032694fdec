//! # 哈希工具

use crate::error::Result;

/// 小写十六进制 MD5 摘要
#[must_use]
pub fn md5_hex(input: &str) -> String {
    format!("{:x}", md5::compute(input.as_bytes()))
}

/// 使用 bcrypt 默认成本哈希密码
pub fn hash_password(password: &str) -> Result<String> {
    hash_password_with_cost(password, bcrypt::DEFAULT_COST)
}

pub fn hash_password_with_cost(password: &str, cost: u32) -> Result<String> {
    Ok(bcrypt::hash(password, cost)?)
}

/// 校验密码，哈希格式错误也视为不匹配
#[must_use]
pub fn check_password(password: &str, hashed: &str) -> bool {
    bcrypt::verify(password, hashed).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_md5_hex_known_digests() {
        assert_eq!(md5_hex("password123"), "482c811da5d5b4bc6d497ffa98491e38");
        assert_eq!(md5_hex(""), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn test_hash_and_check_password() {
        let hashed = hash_password_with_cost("s3cret", 4).unwrap();
        assert!(hashed.starts_with("$2"));
        assert!(check_password("s3cret", &hashed));
        assert!(!check_password("wrong", &hashed));
    }

    #[test]
    fn test_check_password_malformed_hash() {
        assert!(!check_password("s3cret", "not-a-bcrypt-hash"));
    }

    #[test]
    fn test_invalid_cost_is_error() {
        assert!(hash_password_with_cost("s3cret", 1).is_err());
    }
}
