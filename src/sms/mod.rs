//! # 短信模块
//!
//! 阿里云短信服务（Dysmsapi）的 `SendSms` 调用。

pub mod aliyun;

pub use aliyun::{AliyunSmsClient, SmsResponse};

use serde::{Deserialize, Serialize};

/// 默认区域
pub const DEFAULT_SMS_REGION: &str = "cn-hangzhou";
/// 默认接入地址
pub const DEFAULT_SMS_ENDPOINT: &str = "https://dysmsapi.aliyuncs.com/";

/// 短信配置
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmsConfig {
    pub access_key_id: String,
    pub access_key_secret: String,
    /// 短信签名
    pub sign_name: String,
    pub region_id: String,
    pub endpoint: String,
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            access_key_id: String::new(),
            access_key_secret: String::new(),
            sign_name: String::new(),
            region_id: DEFAULT_SMS_REGION.to_string(),
            endpoint: DEFAULT_SMS_ENDPOINT.to_string(),
        }
    }
}

impl std::fmt::Debug for SmsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmsConfig")
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &crate::logging::mask_secret(&self.access_key_secret))
            .field("sign_name", &self.sign_name)
            .field("region_id", &self.region_id)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl SmsConfig {
    #[must_use]
    pub fn new(
        access_key_id: impl Into<String>,
        access_key_secret: impl Into<String>,
        sign_name: impl Into<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            access_key_secret: access_key_secret.into(),
            sign_name: sign_name.into(),
            ..Self::default()
        }
    }
}
