//! # 日志配置模块
//!
//! 统一的日志初始化与结构化日志宏。
//!
//! 所有日志事件都带有 `request_id`、`stage`、`component`、`operation` 四个字段，
//! 例如:
//!
//! ```ignore
//! linfo!("system", LogStage::Cache, LogComponent::Cache, "redis_connected", "Redis 连接建立成功");
//! lwarn!(req_id, LogStage::Authentication, LogComponent::AuthGuard, "reject", "token 已过期", user_id = 42);
//! ```

use std::fmt;
use std::sync::Once;
use tracing_subscriber::{EnvFilter, fmt as tracing_fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// 默认过滤规则
pub const DEFAULT_FILTER: &str = "info,htxp=debug";

/// 请求处理阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogStage {
    Startup,
    Configuration,
    Authentication,
    Cache,
    Storage,
    Messaging,
    ExternalApi,
    Response,
    Internal,
    Shutdown,
}

impl LogStage {
    /// 日志字段中的名称
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::Configuration => "configuration",
            Self::Authentication => "authentication",
            Self::Cache => "cache",
            Self::Storage => "storage",
            Self::Messaging => "messaging",
            Self::ExternalApi => "external_api",
            Self::Response => "response",
            Self::Internal => "internal",
            Self::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for LogStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 产生日志的组件
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogComponent {
    Main,
    Config,
    Cache,
    AuthGuard,
    TokenIssuer,
    IdGenerator,
    Storage,
    StorageAdmin,
    Rabbit,
    Sms,
    QqOAuth,
    Filesystem,
}

impl LogComponent {
    /// 日志字段中的名称
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Config => "config",
            Self::Cache => "cache",
            Self::AuthGuard => "auth_guard",
            Self::TokenIssuer => "token_issuer",
            Self::IdGenerator => "id_generator",
            Self::Storage => "storage",
            Self::StorageAdmin => "storage_admin",
            Self::Rabbit => "rabbit",
            Self::Sms => "sms",
            Self::QqOAuth => "qq_oauth",
            Self::Filesystem => "filesystem",
        }
    }
}

impl fmt::Display for LogComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! __log_event {
    ($level:ident, $request_id:expr, $stage:expr, $component:expr, $operation:expr, $message:expr $(, $key:ident = $value:expr)* $(,)?) => {
        ::tracing::$level!(
            request_id = %$request_id,
            stage = %$stage,
            component = %$component,
            operation = $operation,
            $($key = ?$value,)*
            "{}",
            $message
        )
    };
}

/// info 级别结构化日志
#[macro_export]
macro_rules! linfo {
    ($($arg:tt)+) => { $crate::__log_event!(info, $($arg)+) };
}

/// debug 级别结构化日志
#[macro_export]
macro_rules! ldebug {
    ($($arg:tt)+) => { $crate::__log_event!(debug, $($arg)+) };
}

/// warn 级别结构化日志
#[macro_export]
macro_rules! lwarn {
    ($($arg:tt)+) => { $crate::__log_event!(warn, $($arg)+) };
}

/// error 级别结构化日志
#[macro_export]
macro_rules! lerror {
    ($($arg:tt)+) => { $crate::__log_event!(error, $($arg)+) };
}

static INIT: Once = Once::new();

/// 初始化日志系统
///
/// `RUST_LOG` 优先，其次是传入的级别，最后是 [`DEFAULT_FILTER`]。
/// 重复调用是安全的，只有第一次生效。
pub fn init_logging(log_level: Option<&str>) {
    let fallback = log_level.map_or_else(
        || DEFAULT_FILTER.to_string(),
        |level| format!("{level},htxp={level}"),
    );

    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

        // 测试中可能已有全局 subscriber
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_thread_ids(false)
                    .with_thread_names(false)
                    .with_file(false)
                    .with_line_number(false)
                    .compact(),
            )
            .try_init();
    });
}

/// 打码敏感信息，仅保留前四个字符
#[must_use]
pub fn mask_secret(value: &str) -> String {
    if value.is_empty() {
        return String::new();
    }
    let visible: String = value.chars().take(4).collect();
    format!("{visible}****")
}
