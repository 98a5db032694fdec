//! # 对象存储管理接口
//!
//! 调用 MinIO 管理 REST API（`/minio/admin/v3`），请求使用 SigV4 签名，
//! 服务名 `s3`。新建用户与列举用户的载荷经过 [`super::crypto`] 加密。

use std::collections::BTreeMap;
use std::time::SystemTime;

use aws_credential_types::Credentials;
use aws_sigv4::http_request::{PayloadChecksumKind, SignableBody, SignableRequest, SigningSettings, sign};
use aws_sigv4::sign::v4;
use aws_smithy_runtime_api::client::identity::Identity;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use super::crypto::{decrypt_data, encrypt_data};
use super::{DEFAULT_REGION, StorageConfig};
use crate::error::{HtxpError, Result};
use crate::logging::{LogComponent, LogStage};
use crate::{ldebug, lerror, linfo};

const ADMIN_PREFIX: &str = "/minio/admin/v3";

/// 用户信息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,
    #[serde(default)]
    pub policy_name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub member_of: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AddUserRequest<'a> {
    secret_key: &'a str,
    status: &'a str,
}

#[derive(Deserialize)]
struct AdminErrorBody {
    #[serde(rename = "Code", default)]
    code: String,
    #[serde(rename = "Message", default)]
    message: String,
}

/// 管理接口客户端
#[derive(Clone)]
pub struct StorageAdmin {
    http: reqwest::Client,
    base_url: String,
    access_key: String,
    secret_key: String,
    region: String,
}

impl std::fmt::Debug for StorageAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageAdmin")
            .field("base_url", &self.base_url)
            .field("access_key", &self.access_key)
            .finish_non_exhaustive()
    }
}

impl StorageAdmin {
    pub fn new(config: &StorageConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| HtxpError::network_with_source("创建管理接口HTTP客户端失败", e))?;
        Ok(Self {
            http,
            base_url: config.endpoint_url(),
            access_key: config.access_key.clone(),
            secret_key: config.secret_key.clone(),
            region: if config.region.is_empty() {
                DEFAULT_REGION.to_string()
            } else {
                config.region.clone()
            },
        })
    }

    /// 新建启用状态的用户
    pub async fn create_user(&self, access_key: &str, secret_key: &str) -> Result<()> {
        let payload = serde_json::to_vec(&AddUserRequest {
            secret_key,
            status: "enabled",
        })?;
        let body = encrypt_data(&self.secret_key, &payload)?;
        self.execute(Method::PUT, "add-user", &[("accessKey", access_key)], body)
            .await?;
        linfo!(
            "system",
            LogStage::Storage,
            LogComponent::StorageAdmin,
            "create_user",
            &format!("用户已创建: {access_key}")
        );
        Ok(())
    }

    /// 为用户绑定策略
    pub async fn set_user_policy(&self, policy_name: &str, user: &str) -> Result<()> {
        self.execute(
            Method::PUT,
            "set-user-or-group-policy",
            &[("policyName", policy_name), ("userOrGroup", user), ("isGroup", "false")],
            Vec::new(),
        )
        .await?;
        linfo!(
            "system",
            LogStage::Storage,
            LogComponent::StorageAdmin,
            "set_user_policy",
            &format!("策略已设置: user={user}, policy={policy_name}")
        );
        Ok(())
    }

    pub async fn user_info(&self, access_key: &str) -> Result<UserInfo> {
        let body = self
            .execute(Method::GET, "user-info", &[("accessKey", access_key)], Vec::new())
            .await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// 列举全部用户，响应体为加密数据
    pub async fn list_users(&self) -> Result<BTreeMap<String, UserInfo>> {
        let body = self.execute(Method::GET, "list-users", &[], Vec::new()).await?;
        let plain = decrypt_data(&self.secret_key, &body)?;
        Ok(serde_json::from_slice(&plain)?)
    }

    /// 列举预置策略，值为策略文档
    pub async fn list_policies(&self) -> Result<BTreeMap<String, Value>> {
        let body = self
            .execute(Method::GET, "list-canned-policies", &[], Vec::new())
            .await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn execute(&self, method: Method, api: &str, query: &[(&str, &str)], body: Vec<u8>) -> Result<Vec<u8>> {
        let mut url = Url::parse(&format!("{}{ADMIN_PREFIX}/{api}", self.base_url))
            .map_err(|e| HtxpError::config_with_source(format!("对象存储地址无效: {}", self.base_url), e))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }

        let signed_headers = self.sign(method.as_str(), url.as_str(), &body)?;
        ldebug!(
            "system",
            LogStage::ExternalApi,
            LogComponent::StorageAdmin,
            "admin_request",
            &format!("{method} {}", url.path())
        );

        let mut request = self.http.request(method, url.as_str()).body(body);
        for (name, value) in signed_headers {
            request = request.header(name, value);
        }
        let response = request.send().await?;

        let status = response.status();
        let bytes = response.bytes().await?;
        if !status.is_success() {
            let detail = serde_json::from_slice::<AdminErrorBody>(&bytes).map_or_else(
                |_| String::from_utf8_lossy(&bytes).into_owned(),
                |err| format!("{}: {}", err.code, err.message),
            );
            let message = format!("管理接口 {api} 调用失败 ({status}): {detail}");
            lerror!("system", LogStage::ExternalApi, LogComponent::StorageAdmin, "admin_request", &message);
            return Err(HtxpError::storage(message));
        }
        Ok(bytes.to_vec())
    }

    fn sign(&self, method: &str, url: &str, body: &[u8]) -> Result<Vec<(String, String)>> {
        let identity: Identity =
            Credentials::new(&self.access_key, &self.secret_key, None, None, "htxp-admin").into();
        let mut settings = SigningSettings::default();
        settings.payload_checksum_kind = PayloadChecksumKind::XAmzSha256;

        let params = v4::SigningParams::builder()
            .identity(&identity)
            .region(&self.region)
            .name("s3")
            .time(SystemTime::now())
            .settings(settings)
            .build()
            .map_err(|e| HtxpError::internal_with_source("构建签名参数失败", e))?
            .into();
        let signable = SignableRequest::new(method, url, std::iter::empty(), SignableBody::Bytes(body))
            .map_err(|e| HtxpError::internal_with_source("构建签名请求失败", e))?;
        let (instructions, _signature) = sign(signable, &params)
            .map_err(|e| HtxpError::internal_with_source("请求签名失败", e))?
            .into_parts();

        Ok(instructions
            .headers()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect())
    }
}
