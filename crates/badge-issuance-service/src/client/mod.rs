//! 外部徽章发放服务客户端
//!
//! 通过 trait 抽象外部服务，发放流程与证书监控只依赖该接口。

mod obf_client;

pub use obf_client::{OBF_API_CODE_CERT_ERROR, OBF_API_CODE_NO_CERT, ObfClient, classify_status};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::models::EmailTemplate;

/// 一次徽章发放请求
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssueBadgeRequest {
    pub badge_id: String,
    pub recipients: Vec<String>,
    pub issued_at: DateTime<Utc>,
    pub subject: String,
    pub body: String,
    pub footer: String,
}

impl IssueBadgeRequest {
    pub fn new(
        badge_id: impl Into<String>,
        recipients: Vec<String>,
        issued_at: DateTime<Utc>,
        email: EmailTemplate,
    ) -> Self {
        Self {
            badge_id: badge_id.into(),
            recipients,
            issued_at,
            subject: email.subject,
            body: email.body,
            footer: email.footer,
        }
    }
}

/// 外部徽章发放服务
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BadgeIssuingService: Send + Sync {
    /// 向收件人发放徽章
    ///
    /// 瞬时故障返回 `ServiceUnavailable`，证书问题返回 `CertificateError` 或 `NoCertificate`
    async fn issue_badge(&self, request: &IssueBadgeRequest) -> Result<()>;

    /// 客户端证书的过期时间
    async fn get_certificate_expiration_date(&self) -> Result<DateTime<Utc>>;
}
