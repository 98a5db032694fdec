//! # 配置管理模块
//!
//! 处理应用配置加载、验证和管理

mod app_config;
mod manager;

pub use app_config::{AppConfig, JwtConfig, ServerConfig};
pub use manager::{CONFIG_PATH_ENV, ConfigManager, ENV_PREFIX};

use std::env;
use std::path::{Path, PathBuf};

/// 默认配置文件路径
///
/// 优先使用 `HTXP_CONFIG_PATH`，否则为 `config/config.{RUST_ENV}.toml`。
#[must_use]
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = env::var(CONFIG_PATH_ENV) {
        return PathBuf::from(path);
    }
    let env = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
    PathBuf::from(format!("config/config.{env}.toml"))
}

/// 加载配置文件（含环境变量覆盖与校验）
pub fn load_config() -> crate::error::Result<AppConfig> {
    let env_overrides = ConfigManager::build_env_overrides(env::vars());
    ConfigManager::load(&default_config_path(), &env_overrides)
}

/// 读取并解析配置文件，不做校验
pub(crate) fn read_config_file(path: &Path) -> crate::error::Result<AppConfig> {
    if !path.exists() {
        return Err(crate::config_error!("配置文件不存在: {}", path.display()));
    }

    let config_content = std::fs::read_to_string(path).map_err(|e| {
        crate::error::HtxpError::config_with_source(
            format!("读取配置文件失败: {}", path.display()),
            e,
        )
    })?;

    toml::from_str(&config_content).map_err(|e| {
        crate::error::HtxpError::config_with_source(
            format!("TOML解析失败 - 配置文件: {}", path.display()),
            e,
        )
    })
}
