//! # 第三方登录
//!
//! QQ 互联 OAuth2 授权码流程。

pub mod qq;

pub use qq::{PrivateInfo, QqProvider, UserInfo};

use serde::{Deserialize, Serialize};

pub const QQ_AUTH_URL: &str = "https://graph.qq.com/oauth2.0/authorize";
pub const QQ_TOKEN_URL: &str = "https://graph.qq.com/oauth2.0/token";
pub const QQ_OPENID_URL: &str = "https://graph.qq.com/oauth2.0/me";
pub const QQ_USER_INFO_URL: &str = "https://graph.qq.com/user/get_user_info";

/// QQ 登录配置
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QqConfig {
    pub app_id: String,
    pub app_key: String,
    pub redirect_url: String,
    pub auth_url: String,
    pub token_url: String,
    pub openid_url: String,
    pub user_info_url: String,
}

impl Default for QqConfig {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            app_key: String::new(),
            redirect_url: String::new(),
            auth_url: QQ_AUTH_URL.to_string(),
            token_url: QQ_TOKEN_URL.to_string(),
            openid_url: QQ_OPENID_URL.to_string(),
            user_info_url: QQ_USER_INFO_URL.to_string(),
        }
    }
}

impl std::fmt::Debug for QqConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QqConfig")
            .field("app_id", &self.app_id)
            .field("app_key", &crate::logging::mask_secret(&self.app_key))
            .field("redirect_url", &self.redirect_url)
            .finish_non_exhaustive()
    }
}

impl QqConfig {
    #[must_use]
    pub fn new(app_id: impl Into<String>, app_key: impl Into<String>, redirect_url: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            app_key: app_key.into(),
            redirect_url: redirect_url.into(),
            ..Self::default()
        }
    }

    /// 将四个接口地址指向同一个基础地址，用于测试或代理
    #[must_use]
    pub fn with_base_url(mut self, base: &str) -> Self {
        let base = base.trim_end_matches('/');
        self.auth_url = format!("{base}/oauth2.0/authorize");
        self.token_url = format!("{base}/oauth2.0/token");
        self.openid_url = format!("{base}/oauth2.0/me");
        self.user_info_url = format!("{base}/user/get_user_info");
        self
    }
}
