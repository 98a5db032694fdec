//! # 阿里云短信客户端
//!
//! RPC 风格签名：参数按键排序并做 RFC 3986 编码，
//! 待签名串为 `GET&%2F&<编码后的规范化查询串>`，
//! 使用 `AccessKeySecret&` 作为 HMAC-SHA1 密钥，结果做 Base64。

use std::collections::BTreeMap;
use std::time::Duration;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha1::Sha1;

use super::{DEFAULT_SMS_ENDPOINT, DEFAULT_SMS_REGION, SmsConfig};
use crate::error::{HtxpError, Result};
use crate::logging::{LogComponent, LogStage};
use crate::{lerror, linfo};

const API_VERSION: &str = "2017-05-25";
const SUCCESS_CODE: &str = "OK";

/// `SendSms` 的响应
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SmsResponse {
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub biz_id: String,
}

impl SmsResponse {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.code == SUCCESS_CODE
    }
}

/// 规范化查询串：键排序后逐项编码
#[must_use]
pub fn canonical_query(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// 待签名串
#[must_use]
pub fn string_to_sign(params: &BTreeMap<String, String>) -> String {
    format!("GET&%2F&{}", urlencoding::encode(&canonical_query(params)))
}

/// 计算请求签名
pub fn sign_request(params: &BTreeMap<String, String>, access_key_secret: &str) -> Result<String> {
    let mut mac = Hmac::<Sha1>::new_from_slice(format!("{access_key_secret}&").as_bytes())
        .map_err(|e| HtxpError::internal(format!("HMAC密钥无效: {e}")))?;
    mac.update(string_to_sign(params).as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// 阿里云短信客户端
#[derive(Clone)]
pub struct AliyunSmsClient {
    http: reqwest::Client,
    config: SmsConfig,
}

impl AliyunSmsClient {
    pub fn new(mut config: SmsConfig) -> Result<Self> {
        if config.region_id.is_empty() {
            config.region_id = DEFAULT_SMS_REGION.to_string();
        }
        if config.endpoint.is_empty() {
            config.endpoint = DEFAULT_SMS_ENDPOINT.to_string();
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| HtxpError::network_with_source("创建短信HTTP客户端失败", e))?;
        Ok(Self { http, config })
    }

    #[must_use]
    pub const fn config(&self) -> &SmsConfig {
        &self.config
    }

    /// 发送短信
    ///
    /// 只发送给列表中的第一个号码；`params` 序列化为 JSON 作为模板参数。
    pub async fn send_sms<P>(&self, mobiles: &[impl AsRef<str>], template_code: &str, params: &P) -> Result<SmsResponse>
    where
        P: Serialize + ?Sized,
    {
        let Some(phone) = mobiles.first().map(AsRef::as_ref) else {
            lerror!("system", LogStage::ExternalApi, LogComponent::Sms, "send_sms", "手机号列表不能为空");
            return Err(HtxpError::sms("手机号列表不能为空"));
        };
        let template_param = serde_json::to_string(params)
            .map_err(|e| HtxpError::sms_with_source("参数序列化失败", e))?;

        linfo!(
            "system",
            LogStage::ExternalApi,
            LogComponent::Sms,
            "send_sms",
            &format!("发送短信请求: PhoneNumbers={phone}, TemplateCode={template_code}, TemplateParam={template_param}")
        );

        let query = self.build_query(
            phone,
            template_code,
            &template_param,
            &Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            &uuid::Uuid::new_v4().to_string(),
        );
        let signature = sign_request(&query, &self.config.access_key_secret)?;
        let url = format!(
            "{}?Signature={}&{}",
            self.config.endpoint,
            urlencoding::encode(&signature),
            canonical_query(&query)
        );

        let response = self.http.get(url).send().await.map_err(|e| {
            lerror!("system", LogStage::ExternalApi, LogComponent::Sms, "send_sms", &format!("发送短信失败: {e}"));
            HtxpError::sms_with_source("发送短信失败", e)
        })?;
        let status = response.status();
        let body = response.text().await?;
        let result: SmsResponse = serde_json::from_str(&body)
            .map_err(|e| HtxpError::sms_with_source(format!("短信响应解析失败 ({status}): {body}"), e))?;

        linfo!(
            "system",
            LogStage::ExternalApi,
            LogComponent::Sms,
            "send_sms",
            &format!(
                "短信发送响应: RequestId={}, Code={}, Message={}, BizId={}",
                result.request_id, result.code, result.message, result.biz_id
            )
        );

        if result.is_ok() {
            Ok(result)
        } else {
            lerror!("system", LogStage::ExternalApi, LogComponent::Sms, "send_sms", &format!("短信发送失败: {}", result.message));
            Err(HtxpError::sms(format!(
                "短信发送失败: {} {} (RequestId={})",
                result.code, result.message, result.request_id
            )))
        }
    }

    fn build_query(
        &self,
        phone: &str,
        template_code: &str,
        template_param: &str,
        timestamp: &str,
        nonce: &str,
    ) -> BTreeMap<String, String> {
        [
            ("AccessKeyId", self.config.access_key_id.as_str()),
            ("Action", "SendSms"),
            ("Format", "JSON"),
            ("PhoneNumbers", phone),
            ("RegionId", self.config.region_id.as_str()),
            ("SignName", self.config.sign_name.as_str()),
            ("SignatureMethod", "HMAC-SHA1"),
            ("SignatureNonce", nonce),
            ("SignatureVersion", "1.0"),
            ("TemplateCode", template_code),
            ("TemplateParam", template_param),
            ("Timestamp", timestamp),
            ("Version", API_VERSION),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }
}
