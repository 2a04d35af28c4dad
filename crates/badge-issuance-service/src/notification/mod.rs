//! 管理员通知
//!
//! 证书即将过期等运维告警通过 `AdminNotifier` 发送给每一位站点管理员。

mod sender;
pub mod templates;

pub use sender::{AdminNotifier, SendReceipt, TracingAdminNotifier};
#[cfg(test)]
pub use sender::MockAdminNotifier;

use serde::Serialize;

/// 告警严重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Notice,
    Error,
}

impl Severity {
    /// 宿主消息通道名称
    pub fn message_name(&self) -> &'static str {
        match self {
            Self::Notice => "notices",
            Self::Error => "errors",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Notice => "notice",
            Self::Error => "error",
        }
    }
}

/// 发给单个管理员的消息
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdminMessage {
    pub severity: Severity,
    pub user_from: i64,
    pub user_to: i64,
    /// 收件地址
    pub to_email: String,
    pub subject: String,
    pub full_message: String,
    pub full_message_html: String,
    pub small_message: String,
}
