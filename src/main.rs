//! # htxp 演示服务

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use htxp::{
    Result,
    auth::{MemoryTokenVersionStore, RedisTokenVersionStore, TokenIssuer, TokenVersionStore},
    cache::CacheClient,
    config::ConfigManager,
    lerror, linfo,
    logging::{self, LogComponent, LogStage},
    lwarn,
    server::{self, AppState},
};

#[derive(Debug, Parser)]
#[command(name = "htxp", version, about = "htxp demo server")]
struct Args {
    /// 配置文件路径
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// 覆盖监听地址
    #[arg(long)]
    host: Option<String>,
    /// 覆盖监听端口
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init_logging(None);

    let manager = match &args.config {
        Some(path) => ConfigManager::from_file(path),
        None => ConfigManager::new(),
    }
    .inspect_err(|e| {
        lerror!(
            "system",
            LogStage::Startup,
            LogComponent::Config,
            "config_load_failed",
            &format!("配置加载失败: {e}")
        );
    })?;
    let mut config = manager.get_config().await;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let versions: Arc<dyn TokenVersionStore> = match config.redis.clone() {
        Some(redis) => {
            let client = CacheClient::new(redis).await?;
            client.ping().await?;
            Arc::new(RedisTokenVersionStore::new(client))
        }
        None => {
            lwarn!(
                "system",
                LogStage::Startup,
                LogComponent::Main,
                "memory_version_store",
                "未配置Redis，使用进程内token版本存储"
            );
            Arc::new(MemoryTokenVersionStore::new())
        }
    };

    let issuer = Arc::new(TokenIssuer::from_config(&config.jwt));
    let state = AppState::new(issuer, versions).with_token_endpoint(config.server.debug_token_endpoint);
    let router = server::build_router(state);

    linfo!(
        "system",
        LogStage::Startup,
        LogComponent::Main,
        "service_starting",
        "服务启动"
    );
    if let Err(e) = server::serve(router, &config.server.bind_address()).await {
        lerror!(
            "system",
            LogStage::Startup,
            LogComponent::Main,
            "service_start_failed",
            &format!("服务启动失败: {e:?}")
        );
        return Err(e);
    }

    linfo!(
        "system",
        LogStage::Shutdown,
        LogComponent::Main,
        "service_shutdown",
        "服务正常关闭"
    );
    Ok(())
}
