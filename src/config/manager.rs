//! # 配置管理器
//!
//! 统一的配置管理接口，支持手动重载和环境变量覆盖

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::AppConfig;
use crate::cache::RedisConfig;
use crate::error::{HtxpError, Result};
use crate::logging::{LogComponent, LogStage, mask_secret};
use crate::messaging::RabbitConf;
use crate::oauth::QqConfig;
use crate::sms::SmsConfig;
use crate::storage::StorageConfig;
use crate::{ldebug, linfo, lwarn};

/// 环境变量前缀
pub const ENV_PREFIX: &str = "HTXP_";

/// 指定配置文件路径的环境变量
pub const CONFIG_PATH_ENV: &str = "HTXP_CONFIG_PATH";

/// 配置管理器
pub struct ConfigManager {
    /// 配置文件路径
    path: PathBuf,
    /// 当前配置
    config: Arc<RwLock<AppConfig>>,
    /// 环境变量覆盖映射
    env_overrides: HashMap<String, String>,
}

impl ConfigManager {
    /// 创建配置管理器
    pub fn new() -> Result<Self> {
        Self::from_file(super::default_config_path())
    }

    /// 从指定文件创建配置管理器
    pub fn from_file(config_path: impl AsRef<Path>) -> Result<Self> {
        Self::from_file_with_env(config_path, env::vars())
    }

    /// 从指定文件创建，环境变量由调用方提供
    pub fn from_file_with_env<I>(config_path: impl AsRef<Path>, vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let path = config_path.as_ref().to_path_buf();
        let env_overrides = Self::build_env_overrides(vars);
        let config = Self::load(&path, &env_overrides)?;

        linfo!(
            "system",
            LogStage::Configuration,
            LogComponent::Config,
            "config_loaded",
            &format!(
                "配置加载完成: {}, 环境变量覆盖 {} 个",
                path.display(),
                env_overrides.len()
            )
        );

        Ok(Self {
            path,
            config: Arc::new(RwLock::new(config)),
            env_overrides,
        })
    }

    /// 获取当前配置
    pub async fn get_config(&self) -> AppConfig {
        self.config.read().await.clone()
    }

    /// 配置文件路径
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 重新读取配置文件并应用环境变量覆盖
    ///
    /// 新配置验证失败时保留旧配置。
    pub async fn reload(&self) -> Result<()> {
        let config = Self::load(&self.path, &self.env_overrides)?;
        *self.config.write().await = config;
        linfo!("system", LogStage::Configuration, LogComponent::Config, "config_reloaded", "手动重载配置成功");
        Ok(())
    }

    pub(crate) fn load(path: &Path, overrides: &HashMap<String, String>) -> Result<AppConfig> {
        let mut config = super::read_config_file(path)?;
        Self::apply_env_overrides(&mut config, overrides)?;
        config.validate()?;
        Ok(config)
    }

    /// 构建环境变量覆盖映射
    ///
    /// `HTXP_JWT_ACCESS_TTL_SECS` -> `jwt.access_ttl_secs`
    pub fn build_env_overrides<I>(vars: I) -> HashMap<String, String>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut overrides = HashMap::new();

        for (key, value) in vars {
            if key == CONFIG_PATH_ENV {
                continue;
            }
            if let Some(config_key) = key.strip_prefix(ENV_PREFIX) {
                let lower = config_key.to_lowercase();
                if let Some((section, field)) = lower.split_once('_') {
                    overrides.insert(format!("{section}.{field}"), value);
                }
            }
        }

        ldebug!(
            "system",
            LogStage::Configuration,
            LogComponent::Config,
            "env_overrides",
            &format!("发现 {} 个环境变量覆盖", overrides.len())
        );
        overrides
    }

    /// 应用环境变量覆盖
    pub fn apply_env_overrides(
        config: &mut AppConfig,
        overrides: &HashMap<String, String>,
    ) -> Result<()> {
        for (path, value) in overrides {
            let shown = if is_sensitive(path) {
                mask_secret(value)
            } else {
                value.clone()
            };
            ldebug!(
                "system",
                LogStage::Configuration,
                LogComponent::Config,
                "apply_override",
                &format!("应用环境变量覆盖: {path} = {shown}")
            );

            Self::apply_override_to_config(config, path, value)?;
        }
        Ok(())
    }

    /// 将环境变量覆盖应用到配置对象
    fn apply_override_to_config(config: &mut AppConfig, path: &str, value: &str) -> Result<()> {
        let parts: Vec<&str> = path.split('.').collect();

        match parts.as_slice() {
            ["server", "host"] => config.server.host = value.to_string(),
            ["server", "port"] => config.server.port = parse_value(path, value)?,
            ["server", "debug_token_endpoint"] => config.server.debug_token_endpoint = parse_value(path, value)?,

            ["jwt", "secret"] => config.jwt.secret = value.to_string(),
            ["jwt", "access_ttl_secs"] => config.jwt.access_ttl_secs = parse_value(path, value)?,
            ["jwt", "refresh_ttl_secs"] => config.jwt.refresh_ttl_secs = parse_value(path, value)?,
            ["jwt", "leeway_secs"] => config.jwt.leeway_secs = parse_value(path, value)?,

            ["redis", field] => {
                let redis = config.redis.get_or_insert_with(RedisConfig::default);
                match *field {
                    "url" => redis.url = Some(value.to_string()),
                    "host" => redis.host = value.to_string(),
                    "port" => redis.port = parse_value(path, value)?,
                    "database" => redis.database = parse_value(path, value)?,
                    "password" => redis.password = Some(value.to_string()),
                    "connection_timeout" => redis.connection_timeout = parse_value(path, value)?,
                    _ => warn_unknown(path),
                }
            }

            ["storage", field] => {
                let storage = config.storage.get_or_insert_with(StorageConfig::default);
                match *field {
                    "endpoint" => storage.endpoint = value.to_string(),
                    "access_key" => storage.access_key = value.to_string(),
                    "secret_key" => storage.secret_key = value.to_string(),
                    "use_ssl" => storage.use_ssl = parse_value(path, value)?,
                    "region" => storage.region = value.to_string(),
                    _ => warn_unknown(path),
                }
            }

            ["rabbitmq", field] => {
                let rabbit = config.rabbitmq.get_or_insert_with(RabbitConf::default);
                match *field {
                    "username" => rabbit.username = value.to_string(),
                    "password" => rabbit.password = value.to_string(),
                    "host" => rabbit.host = value.to_string(),
                    "port" => rabbit.port = parse_value(path, value)?,
                    "vhost" => rabbit.vhost = value.to_string(),
                    "content_type" => rabbit.content_type = value.to_string(),
                    _ => warn_unknown(path),
                }
            }

            ["sms", field] => {
                let sms = config.sms.get_or_insert_with(SmsConfig::default);
                match *field {
                    "access_key_id" => sms.access_key_id = value.to_string(),
                    "access_key_secret" => sms.access_key_secret = value.to_string(),
                    "sign_name" => sms.sign_name = value.to_string(),
                    "region_id" => sms.region_id = value.to_string(),
                    "endpoint" => sms.endpoint = value.to_string(),
                    _ => warn_unknown(path),
                }
            }

            ["qq", field] => {
                let qq = config.qq.get_or_insert_with(QqConfig::default);
                match *field {
                    "app_id" => qq.app_id = value.to_string(),
                    "app_key" => qq.app_key = value.to_string(),
                    "redirect_url" => qq.redirect_url = value.to_string(),
                    _ => warn_unknown(path),
                }
            }

            _ => warn_unknown(path),
        }

        Ok(())
    }
}

fn is_sensitive(path: &str) -> bool {
    path.contains("password") || path.contains("secret") || path.contains("key")
}

fn warn_unknown(path: &str) {
    lwarn!(
        "system",
        LogStage::Configuration,
        LogComponent::Config,
        "unknown_override",
        &format!("未知的配置路径，忽略环境变量覆盖: {path}")
    );
}

fn parse_value<T>(path: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse()
        .map_err(|e| HtxpError::config_with_source(format!("无效的配置值 {path}: {value}"), e))
}
