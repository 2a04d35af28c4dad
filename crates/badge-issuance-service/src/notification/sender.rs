//! 管理员消息发送器
//!
//! 默认实现只写结构化日志，接入宿主消息系统时实现同一 trait 即可。

use async_trait::async_trait;
use tracing::{info, warn};
use uuid::Uuid;

use super::{AdminMessage, Severity};
use crate::error::Result;

/// 发送回执
#[derive(Debug, Clone)]
pub struct SendReceipt {
    pub message_id: String,
    pub user_to: i64,
}

/// 管理员消息发送接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AdminNotifier: Send + Sync {
    async fn send(&self, message: &AdminMessage) -> Result<SendReceipt>;
}

/// 以日志形式投递管理员消息
pub struct TracingAdminNotifier;

#[async_trait]
impl AdminNotifier for TracingAdminNotifier {
    async fn send(&self, message: &AdminMessage) -> Result<SendReceipt> {
        let message_id = Uuid::now_v7().to_string();

        match message.severity {
            Severity::Error => warn!(
                message_id = %message_id,
                name = message.severity.message_name(),
                user_to = message.user_to,
                to_email = %message.to_email,
                subject = %message.subject,
                body = %message.full_message,
                "发送管理员告警"
            ),
            Severity::Notice => info!(
                message_id = %message_id,
                name = message.severity.message_name(),
                user_to = message.user_to,
                to_email = %message.to_email,
                subject = %message.subject,
                body = %message.full_message,
                "发送管理员通知"
            ),
        }

        Ok(SendReceipt {
            message_id,
            user_to: message.user_to,
        })
    }
}
