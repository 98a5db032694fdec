//! 消息发布

use async_trait::async_trait;
use lapin::options::BasicPublishOptions;
use lapin::{BasicProperties, Channel, Connection};

use super::{RabbitConf, open_channel};
use crate::error::{HtxpError, Result};
use crate::logging::{LogComponent, LogStage};
use crate::{ldebug, lerror};

/// 消息发送者
#[async_trait]
pub trait Sender: Send + Sync {
    async fn send(&self, exchange: &str, route_key: &str, msg: &[u8]) -> Result<()>;
}

/// 基于 RabbitMQ 的发送者
pub struct RabbitSender {
    _connection: Connection,
    channel: Channel,
    content_type: String,
}

impl RabbitSender {
    pub async fn connect(conf: &RabbitConf) -> Result<Self> {
        let (connection, channel) = open_channel(conf, "sender_connect").await?;
        Ok(Self {
            _connection: connection,
            channel,
            content_type: conf.content_type.clone(),
        })
    }

    #[must_use]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }
}

#[async_trait]
impl Sender for RabbitSender {
    async fn send(&self, exchange: &str, route_key: &str, msg: &[u8]) -> Result<()> {
        let properties = BasicProperties::default().with_content_type(self.content_type.as_str().into());
        let confirm = self
            .channel
            .basic_publish(exchange, route_key, BasicPublishOptions::default(), msg, properties)
            .await;
        let result = match confirm {
            Ok(confirm) => confirm.await.map(|_| ()),
            Err(e) => Err(e),
        };

        result.map_err(|e| {
            lerror!(
                "system",
                LogStage::Messaging,
                LogComponent::Rabbit,
                "send",
                &format!("消息发布失败: exchange={exchange}, route_key={route_key}: {e}")
            );
            HtxpError::messaging_with_source("消息发布失败", e)
        })?;

        ldebug!(
            "system",
            LogStage::Messaging,
            LogComponent::Rabbit,
            "send",
            &format!("消息已发布: exchange={exchange}, route_key={route_key}, bytes={}", msg.len())
        );
        Ok(())
    }
}
