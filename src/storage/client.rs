//! # 对象存储客户端
//!
//! 基于 aws-sdk-s3，使用静态凭证和 path-style 寻址。

use std::path::Path;
use std::time::Duration;

use aws_sdk_s3::Client;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::{ByteStream, DateTime as SmithyDateTime};
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration, Delete, ObjectIdentifier};
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{DEFAULT_REGION, StorageConfig};
use crate::error::{HtxpError, Result};
use crate::logging::{LogComponent, LogStage};
use crate::{ldebug, lerror, linfo};

/// 单次 DeleteObjects 请求的最大对象数
pub const DELETE_BATCH_SIZE: usize = 1000;

/// 桶信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketInfo {
    pub name: String,
    pub creation_date: Option<DateTime<Utc>>,
}

/// 对象信息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ObjectInfo {
    pub key: String,
    pub size: i64,
    pub etag: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
    pub content_type: Option<String>,
    /// 非递归列举时的“目录”前缀
    pub is_prefix: bool,
}

fn to_chrono(value: Option<&SmithyDateTime>) -> Option<DateTime<Utc>> {
    value.and_then(|dt| DateTime::<Utc>::from_timestamp(dt.secs(), dt.subsec_nanos()))
}

fn storage_err<E>(operation: &str, err: E) -> HtxpError
where
    E: std::error::Error + Send + Sync + 'static,
{
    let message = format!("{operation}失败: {}", DisplayErrorContext(&err));
    lerror!("system", LogStage::Storage, LogComponent::Storage, operation, &message);
    HtxpError::storage_with_source(message, err)
}

/// 对象存储客户端
#[derive(Clone, Debug)]
pub struct StorageClient {
    client: Client,
    region: String,
}

impl StorageClient {
    /// 创建客户端，不会发起网络请求
    #[must_use]
    pub fn new(config: &StorageConfig) -> Self {
        let credentials = Credentials::new(
            config.access_key.clone(),
            config.secret_key.clone(),
            None,
            None,
            "htxp-static",
        );
        let region = if config.region.is_empty() {
            DEFAULT_REGION.to_string()
        } else {
            config.region.clone()
        };

        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(config.endpoint_url())
            .credentials_provider(credentials)
            .region(Region::new(region.clone()))
            .force_path_style(true)
            .build();

        linfo!(
            "system",
            LogStage::Startup,
            LogComponent::Storage,
            "storage_client_created",
            &format!("对象存储客户端已创建: {}", config.endpoint_url())
        );

        Self {
            client: Client::from_conf(s3_config),
            region,
        }
    }

    /// 底层 SDK 客户端
    #[must_use]
    pub const fn inner(&self) -> &Client {
        &self.client
    }

    // ---- 桶操作 ----

    pub async fn create_bucket(&self, bucket: &str) -> Result<()> {
        let mut request = self.client.create_bucket().bucket(bucket);
        if self.region != DEFAULT_REGION {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                    .build(),
            );
        }
        request.send().await.map_err(|e| storage_err("create_bucket", e))?;
        linfo!("system", LogStage::Storage, LogComponent::Storage, "create_bucket", &format!("Successfully created {bucket}"));
        Ok(())
    }

    pub async fn remove_bucket(&self, bucket: &str) -> Result<()> {
        self.client
            .delete_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| storage_err("remove_bucket", e))?;
        linfo!("system", LogStage::Storage, LogComponent::Storage, "remove_bucket", &format!("Successfully removed {bucket}"));
        Ok(())
    }

    pub async fn list_buckets(&self) -> Result<Vec<BucketInfo>> {
        let output = self
            .client
            .list_buckets()
            .send()
            .await
            .map_err(|e| storage_err("list_buckets", e))?;

        Ok(output
            .buckets()
            .iter()
            .map(|bucket| BucketInfo {
                name: bucket.name().unwrap_or_default().to_string(),
                creation_date: to_chrono(bucket.creation_date()),
            })
            .collect())
    }

    pub async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(err) => {
                let not_found = err.as_service_error().is_some_and(|e| e.is_not_found())
                    || err.raw_response().is_some_and(|r| r.status().as_u16() == 404);
                if not_found {
                    Ok(false)
                } else {
                    Err(storage_err("bucket_exists", err))
                }
            }
        }
    }

    // ---- 策略 ----

    /// 设置桶策略，空字符串表示删除策略
    pub async fn set_bucket_policy(&self, bucket: &str, policy: &str) -> Result<()> {
        if policy.trim().is_empty() {
            self.client
                .delete_bucket_policy()
                .bucket(bucket)
                .send()
                .await
                .map_err(|e| storage_err("delete_bucket_policy", e))?;
        } else {
            self.client
                .put_bucket_policy()
                .bucket(bucket)
                .policy(policy)
                .send()
                .await
                .map_err(|e| storage_err("set_bucket_policy", e))?;
        }
        linfo!("system", LogStage::Storage, LogComponent::Storage, "set_bucket_policy", &format!("Successfully set policy on {bucket}"));
        Ok(())
    }

    /// 读取桶策略，未设置时返回空字符串
    pub async fn get_bucket_policy(&self, bucket: &str) -> Result<String> {
        match self.client.get_bucket_policy().bucket(bucket).send().await {
            Ok(output) => Ok(output.policy().unwrap_or_default().to_string()),
            Err(err) if err.as_service_error().and_then(|e| e.code()) == Some("NoSuchBucketPolicy") => {
                Ok(String::new())
            }
            Err(err) => Err(storage_err("get_bucket_policy", err)),
        }
    }

    // ---- 对象操作 ----

    /// 列举对象
    ///
    /// 非递归时以 `/` 为分隔符，子目录以 `is_prefix = true` 的条目返回。
    pub async fn list_objects(&self, bucket: &str, prefix: &str, recursive: bool) -> Result<Vec<ObjectInfo>> {
        let mut objects = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .prefix(prefix)
                .set_continuation_token(continuation.take());
            if !recursive {
                request = request.delimiter("/");
            }
            let output = request.send().await.map_err(|e| storage_err("list_objects", e))?;

            objects.extend(output.contents().iter().map(|object| ObjectInfo {
                key: object.key().unwrap_or_default().to_string(),
                size: object.size().unwrap_or_default(),
                etag: object.e_tag().map(ToString::to_string),
                last_modified: to_chrono(object.last_modified()),
                content_type: None,
                is_prefix: false,
            }));
            objects.extend(output.common_prefixes().iter().filter_map(|p| p.prefix()).map(|p| ObjectInfo {
                key: p.to_string(),
                is_prefix: true,
                ..ObjectInfo::default()
            }));

            match output.next_continuation_token() {
                Some(token) if !token.is_empty() => continuation = Some(token.to_string()),
                _ => break,
            }
        }

        ldebug!(
            "system",
            LogStage::Storage,
            LogComponent::Storage,
            "list_objects",
            &format!("列举对象: bucket={bucket}, prefix={prefix}, count={}", objects.len())
        );
        Ok(objects)
    }

    pub async fn stat_object(&self, bucket: &str, key: &str) -> Result<ObjectInfo> {
        let output = self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| storage_err("stat_object", e))?;

        Ok(ObjectInfo {
            key: key.to_string(),
            size: output.content_length().unwrap_or_default(),
            etag: output.e_tag().map(ToString::to_string),
            last_modified: to_chrono(output.last_modified()),
            content_type: output.content_type().map(ToString::to_string),
            is_prefix: false,
        })
    }

    /// 上传内存中的数据，返回写入字节数
    pub async fn put_object(&self, bucket: &str, key: &str, data: Vec<u8>, content_type: &str) -> Result<usize> {
        let size = data.len();
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| storage_err("put_object", e))?;
        linfo!("system", LogStage::Storage, LogComponent::Storage, "put_object", &format!("Successfully PutObject {key} of size {size}"));
        Ok(size)
    }

    /// 上传本地文件
    pub async fn upload_file(&self, bucket: &str, key: &str, path: impl AsRef<Path>, content_type: &str) -> Result<()> {
        let path = path.as_ref();
        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| HtxpError::storage_with_source(format!("读取上传文件失败: {}", path.display()), e))?;
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| storage_err("upload_file", e))?;
        linfo!("system", LogStage::Storage, LogComponent::Storage, "upload_file", &format!("Successfully uploaded {} as {key}", path.display()));
        Ok(())
    }

    /// 下载对象到本地文件
    pub async fn download_object(&self, bucket: &str, key: &str, path: impl AsRef<Path>) -> Result<()> {
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| storage_err("download_object", e))?;
        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| HtxpError::storage_with_source(format!("读取对象内容失败: {key}"), e))?
            .into_bytes();
        tokio::fs::write(path.as_ref(), &bytes).await?;
        Ok(())
    }

    /// 删除单个对象，绕过 governance 保留
    pub async fn remove_object(&self, bucket: &str, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .bypass_governance_retention(true)
            .send()
            .await
            .map_err(|e| storage_err("remove_object", e))?;
        linfo!("system", LogStage::Storage, LogComponent::Storage, "remove_object", &format!("Successfully removed {key}"));
        Ok(())
    }

    /// 批量删除前缀下的全部对象，返回成功删除的数量
    ///
    /// 每批最多 1000 个。某个对象删除失败时继续处理其余对象，最后返回错误。
    pub async fn remove_objects(&self, bucket: &str, prefix: &str) -> Result<usize> {
        linfo!(
            "system",
            LogStage::Storage,
            LogComponent::Storage,
            "remove_objects",
            &format!("Removing all objects in {bucket} with prefix {prefix}")
        );

        let keys: Vec<String> = self
            .list_objects(bucket, prefix, true)
            .await?
            .into_iter()
            .map(|object| object.key)
            .collect();

        let mut removed = 0usize;
        let mut failures = Vec::new();

        for batch in keys.chunks(DELETE_BATCH_SIZE) {
            let identifiers = batch
                .iter()
                .map(|key| ObjectIdentifier::builder().key(key).build())
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| HtxpError::storage_with_source("构建删除请求失败", e))?;
            let delete = Delete::builder()
                .set_objects(Some(identifiers))
                .quiet(true)
                .build()
                .map_err(|e| HtxpError::storage_with_source("构建删除请求失败", e))?;

            let output = self
                .client
                .delete_objects()
                .bucket(bucket)
                .delete(delete)
                .bypass_governance_retention(true)
                .send()
                .await
                .map_err(|e| storage_err("remove_objects", e))?;

            for error in output.errors() {
                lerror!(
                    "system",
                    LogStage::Storage,
                    LogComponent::Storage,
                    "remove_objects",
                    &format!(
                        "Error detected during deletion: {} {}",
                        error.key().unwrap_or_default(),
                        error.message().unwrap_or_default()
                    )
                );
                failures.push(error.key().unwrap_or_default().to_string());
            }
            removed += batch.len() - output.errors().len();
        }

        if failures.is_empty() {
            Ok(removed)
        } else {
            Err(HtxpError::storage(format!(
                "{} 个对象删除失败: {}",
                failures.len(),
                failures.join(", ")
            )))
        }
    }

    /// 生成预签名下载地址
    pub async fn presigned_get_url(&self, bucket: &str, key: &str, expires_in: Duration) -> Result<String> {
        let presigning = PresigningConfig::expires_in(expires_in)
            .map_err(|e| HtxpError::storage_with_source("预签名有效期无效", e))?;
        let request = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| storage_err("presigned_get_url", e))?;
        Ok(request.uri().to_string())
    }

    /// 以小时为单位的预览地址
    pub async fn preview_url(&self, bucket: &str, key: &str, hours: u64) -> Result<String> {
        self.presigned_get_url(bucket, key, Duration::from_secs(hours.saturating_mul(3600)))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> StorageClient {
        StorageClient::new(&StorageConfig::new("127.0.0.1:9000", "minioadmin", "minioadmin", false))
    }

    #[tokio::test]
    async fn test_preview_url_is_presigned_path_style() {
        let url = test_client().preview_url("photos", "2024/cat.png", 2).await.unwrap();
        assert!(url.starts_with("http://127.0.0.1:9000/photos/2024/cat.png?"));
        assert!(url.contains("X-Amz-Expires=7200"));
        assert!(url.contains("X-Amz-Signature="));
    }

    #[tokio::test]
    async fn test_presign_rejects_over_one_week() {
        let err = test_client().preview_url("photos", "a.png", 24 * 8).await.unwrap_err();
        assert!(matches!(err, HtxpError::Storage { .. }));
    }

    #[test]
    fn test_to_chrono() {
        let dt = SmithyDateTime::from_secs(1_700_000_000);
        assert_eq!(to_chrono(Some(&dt)).unwrap().timestamp(), 1_700_000_000);
        assert!(to_chrono(None).is_none());
    }
}
