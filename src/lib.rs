//! # htxp
//!
//! Web 后端通用工具库：认证守卫与 token 签发、统一响应信封、
//! 标识符生成，以及对象存储、消息队列、短信和 QQ 登录的轻量封装。

pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod logging;
pub mod messaging;
pub mod oauth;
pub mod response;
pub mod server;
pub mod sms;
pub mod storage;
pub mod utils;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{HtxpError, Result};
