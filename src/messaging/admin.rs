//! 交换机与队列管理

use lapin::options::{ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions};
use lapin::types::FieldTable;
use lapin::{Channel, Connection, ExchangeKind};
use serde::{Deserialize, Serialize};

use super::{RabbitConf, open_channel};
use crate::error::{HtxpError, Result};
use crate::logging::{LogComponent, LogStage};
use crate::{ldebug, lerror};

/// 交换机声明参数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeConf {
    pub name: String,
    /// `direct` / `fanout` / `topic` / `headers` 或插件类型
    pub kind: String,
    pub durable: bool,
    pub auto_delete: bool,
    pub internal: bool,
    pub no_wait: bool,
}

impl ExchangeConf {
    /// 持久化、不自动删除的交换机
    #[must_use]
    pub fn durable(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            durable: true,
            auto_delete: false,
            internal: false,
            no_wait: false,
        }
    }

    #[must_use]
    pub fn exchange_kind(&self) -> ExchangeKind {
        match self.kind.as_str() {
            "direct" => ExchangeKind::Direct,
            "fanout" => ExchangeKind::Fanout,
            "topic" => ExchangeKind::Topic,
            "headers" => ExchangeKind::Headers,
            other => ExchangeKind::Custom(other.to_string()),
        }
    }
}

impl From<&ExchangeConf> for ExchangeDeclareOptions {
    fn from(conf: &ExchangeConf) -> Self {
        Self {
            passive: false,
            durable: conf.durable,
            auto_delete: conf.auto_delete,
            internal: conf.internal,
            nowait: conf.no_wait,
        }
    }
}

/// 队列声明参数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConf {
    pub name: String,
    pub durable: bool,
    pub auto_delete: bool,
    pub exclusive: bool,
    pub no_wait: bool,
}

impl QueueConf {
    #[must_use]
    pub fn durable(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            durable: true,
            auto_delete: false,
            exclusive: false,
            no_wait: false,
        }
    }
}

impl From<&QueueConf> for QueueDeclareOptions {
    fn from(conf: &QueueConf) -> Self {
        Self {
            passive: false,
            durable: conf.durable,
            exclusive: conf.exclusive,
            auto_delete: conf.auto_delete,
            nowait: conf.no_wait,
        }
    }
}

/// 持有一个连接和通道的管理客户端
pub struct Admin {
    _connection: Connection,
    channel: Channel,
}

impl Admin {
    pub async fn connect(conf: &RabbitConf) -> Result<Self> {
        let (connection, channel) = open_channel(conf, "admin_connect").await?;
        Ok(Self {
            _connection: connection,
            channel,
        })
    }

    pub async fn declare_exchange(&self, conf: &ExchangeConf, args: FieldTable) -> Result<()> {
        self.channel
            .exchange_declare(&conf.name, conf.exchange_kind(), conf.into(), args)
            .await
            .map_err(|e| failure("declare_exchange", &conf.name, e))?;
        ldebug!(
            "system",
            LogStage::Messaging,
            LogComponent::Rabbit,
            "declare_exchange",
            &format!("交换机已声明: {} ({})", conf.name, conf.kind)
        );
        Ok(())
    }

    pub async fn declare_queue(&self, conf: &QueueConf, args: FieldTable) -> Result<()> {
        self.channel
            .queue_declare(&conf.name, conf.into(), args)
            .await
            .map_err(|e| failure("declare_queue", &conf.name, e))?;
        ldebug!(
            "system",
            LogStage::Messaging,
            LogComponent::Rabbit,
            "declare_queue",
            &format!("队列已声明: {}", conf.name)
        );
        Ok(())
    }

    pub async fn bind(&self, queue: &str, route_key: &str, exchange: &str, no_wait: bool, args: FieldTable) -> Result<()> {
        self.channel
            .queue_bind(queue, exchange, route_key, QueueBindOptions { nowait: no_wait }, args)
            .await
            .map_err(|e| failure("bind", queue, e))?;
        ldebug!(
            "system",
            LogStage::Messaging,
            LogComponent::Rabbit,
            "bind",
            &format!("队列已绑定: {queue} -> {exchange} ({route_key})")
        );
        Ok(())
    }

    /// 声明同名的持久化交换机和队列，并以名称作为路由键绑定
    pub async fn init(&self, name: &str, kind: &str) -> Result<()> {
        self.declare_exchange(&ExchangeConf::durable(name, kind), FieldTable::default())
            .await?;
        self.declare_queue(&QueueConf::durable(name), FieldTable::default())
            .await?;
        self.bind(name, name, name, false, FieldTable::default()).await
    }
}

fn failure(operation: &str, target: &str, err: lapin::Error) -> HtxpError {
    lerror!(
        "system",
        LogStage::Messaging,
        LogComponent::Rabbit,
        operation,
        &format!("{operation} {target} 失败: {err}")
    );
    HtxpError::messaging_with_source(format!("{operation} {target} 失败"), err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exchange_kind_mapping() {
        assert_eq!(ExchangeConf::durable("a", "direct").exchange_kind(), ExchangeKind::Direct);
        assert_eq!(ExchangeConf::durable("a", "fanout").exchange_kind(), ExchangeKind::Fanout);
        assert_eq!(ExchangeConf::durable("a", "topic").exchange_kind(), ExchangeKind::Topic);
        assert_eq!(
            ExchangeConf::durable("a", "x-delayed-message").exchange_kind(),
            ExchangeKind::Custom("x-delayed-message".into())
        );
    }

    #[test]
    fn test_init_declarations_are_durable() {
        let exchange: ExchangeDeclareOptions = (&ExchangeConf::durable("orders", "direct")).into();
        assert!(exchange.durable);
        assert!(!exchange.auto_delete && !exchange.internal && !exchange.nowait && !exchange.passive);

        let queue: QueueDeclareOptions = (&QueueConf::durable("orders")).into();
        assert!(queue.durable);
        assert!(!queue.exclusive && !queue.auto_delete);
    }
}
