//! # 错误处理宏

/// 快速创建配置错误的宏
#[macro_export]
macro_rules! config_error {
    ($msg:expr) => {
        $crate::error::HtxpError::config($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::HtxpError::config(format!($fmt, $($arg)*))
    };
}

/// 快速创建认证错误的宏
#[macro_export]
macro_rules! auth_error {
    ($msg:expr) => {
        $crate::error::HtxpError::auth($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::HtxpError::auth(format!($fmt, $($arg)*))
    };
}

/// 快速创建内部错误的宏
#[macro_export]
macro_rules! internal_error {
    ($msg:expr) => {
        $crate::error::HtxpError::internal($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::HtxpError::internal(format!($fmt, $($arg)*))
    };
}

/// 确保条件成立，否则返回配置错误
#[macro_export]
macro_rules! ensure_config {
    ($cond:expr, $msg:expr) => {
        if !($cond) {
            return Err($crate::config_error!($msg));
        }
    };
    ($cond:expr, $fmt:expr, $($arg:tt)*) => {
        if !($cond) {
            return Err($crate::config_error!($fmt, $($arg)*));
        }
    };
}
