//! # QQ 登录
//!
//! 令牌接口返回 url 编码的表单串，openid 接口返回 JSONP，
//! 出错时两个接口都返回 `callback( {"error":..,"error_description":..} );`。

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use super::QqConfig;
use crate::error::{HtxpError, Result};
use crate::logging::{LogComponent, LogStage};
use crate::utils::parse_query_map;
use crate::{ldebug, lerror};

/// 令牌信息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateInfo {
    pub access_token: String,
    pub expires_in: String,
    pub refresh_token: String,
    #[serde(rename = "openid")]
    pub open_id: String,
}

/// 用户资料
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserInfo {
    pub ret: i64,
    pub msg: String,
    pub nickname: String,
    pub figureurl: String,
    #[serde(rename = "figureurl_1")]
    pub figureurl1: String,
    #[serde(rename = "figureurl_2")]
    pub figureurl2: String,
    pub gender: String,
    pub vip: String,
    pub level: String,
}

/// 解析 `callback( {...} );` 形式的响应
pub(crate) fn parse_jsonp(body: &str) -> Result<Value> {
    let body = body.trim();
    let inner = match (body.find('('), body.rfind(')')) {
        (Some(start), Some(end)) if start < end => &body[start + 1..end],
        _ => body,
    };
    serde_json::from_str(inner.trim())
        .map_err(|e| HtxpError::oauth_with_source(format!("无法解析QQ响应: {body}"), e))
}

fn jsonp_error(value: &Value) -> Option<HtxpError> {
    let code = value.get("error")?;
    let description = value
        .get("error_description")
        .and_then(Value::as_str)
        .unwrap_or_default();
    Some(HtxpError::oauth(format!("QQ接口返回错误 {code}: {description}")))
}

/// QQ 登录提供者
#[derive(Clone, Debug)]
pub struct QqProvider {
    http: reqwest::Client,
    config: QqConfig,
}

impl QqProvider {
    pub fn new(config: QqConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| HtxpError::network_with_source("创建QQ登录HTTP客户端失败", e))?;
        Ok(Self { http, config })
    }

    #[must_use]
    pub const fn config(&self) -> &QqConfig {
        &self.config
    }

    /// 授权页地址
    pub fn auth_code_url(&self, state: &str) -> Result<String> {
        let url = build_url(
            &self.config.auth_url,
            &[
                ("response_type", "code"),
                ("client_id", self.config.app_id.as_str()),
                ("redirect_uri", self.config.redirect_url.as_str()),
                ("state", state),
            ],
        )?;
        Ok(url.into())
    }

    /// 用授权码换取令牌
    pub async fn access_token(&self, code: &str) -> Result<PrivateInfo> {
        let url = build_url(
            &self.config.token_url,
            &[
                ("grant_type", "authorization_code"),
                ("client_id", self.config.app_id.as_str()),
                ("client_secret", self.config.app_key.as_str()),
                ("code", code),
                ("redirect_uri", self.config.redirect_url.as_str()),
            ],
        )?;
        let body = self.fetch(url, "access_token").await?;

        if body.trim_start().starts_with("callback") {
            let value = parse_jsonp(&body)?;
            return Err(jsonp_error(&value).unwrap_or_else(|| HtxpError::oauth(format!("QQ令牌响应异常: {body}"))));
        }

        let mut fields = parse_query_map(body.trim());
        let info = PrivateInfo {
            access_token: fields.remove("access_token").unwrap_or_default(),
            expires_in: fields.remove("expires_in").unwrap_or_default(),
            refresh_token: fields.remove("refresh_token").unwrap_or_default(),
            open_id: fields.remove("openid").unwrap_or_default(),
        };
        if info.access_token.is_empty() {
            return Err(HtxpError::oauth(format!("QQ令牌响应缺少access_token: {body}")));
        }
        Ok(info)
    }

    /// 查询令牌对应的 openid
    pub async fn open_id(&self, access_token: &str) -> Result<String> {
        let url = build_url(&self.config.openid_url, &[("access_token", access_token)])?;
        let body = self.fetch(url, "open_id").await?;
        let value = parse_jsonp(&body)?;
        if let Some(err) = jsonp_error(&value) {
            return Err(err);
        }
        value
            .get("openid")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(ToString::to_string)
            .ok_or_else(|| HtxpError::oauth(format!("QQ响应缺少openid: {body}")))
    }

    /// 获取用户资料，`ret` 非 0 时返回错误
    pub async fn user_info(&self, access_token: &str, open_id: &str) -> Result<UserInfo> {
        let url = build_url(
            &self.config.user_info_url,
            &[
                ("access_token", access_token),
                ("oauth_consumer_key", self.config.app_id.as_str()),
                ("openid", open_id),
            ],
        )?;
        let body = self.fetch(url, "user_info").await?;
        let info: UserInfo = serde_json::from_str(&body).map_err(|e| {
            lerror!("system", LogStage::ExternalApi, LogComponent::QqOAuth, "user_info", &format!("Failed to parse user info JSON: {e}"));
            HtxpError::oauth_with_source("QQ用户信息解析失败", e)
        })?;
        if info.ret != 0 {
            return Err(HtxpError::oauth(format!("QQ用户信息获取失败 {}: {}", info.ret, info.msg)));
        }
        Ok(info)
    }

    async fn fetch(&self, url: Url, operation: &str) -> Result<String> {
        ldebug!(
            "system",
            LogStage::ExternalApi,
            LogComponent::QqOAuth,
            operation,
            &format!("GET {}{}", url.origin().ascii_serialization(), url.path())
        );
        let response = self.http.get(url).send().await.map_err(|e| {
            lerror!("system", LogStage::ExternalApi, LogComponent::QqOAuth, operation, &format!("QQ接口请求失败: {e}"));
            HtxpError::oauth_with_source("QQ接口请求失败", e)
        })?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(HtxpError::oauth(format!("QQ接口返回状态 {status}: {body}")));
        }
        Ok(body)
    }
}

fn build_url(base: &str, params: &[(&str, &str)]) -> Result<Url> {
    let mut url = Url::parse(base).map_err(|e| HtxpError::config_with_source(format!("QQ接口地址无效: {base}"), e))?;
    url.query_pairs_mut().extend_pairs(params);
    Ok(url)
}
