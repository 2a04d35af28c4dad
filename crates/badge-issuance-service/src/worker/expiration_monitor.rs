//! 客户端证书过期监控
//!
//! 剩余天数恰好落在告警阈值上时，给每位管理员发送一条消息。
//! 剩余 5 天及以内为 error，其余为 notice。同一天重复调用会重复通知，
//! 调用频率由调度器保证。

use std::sync::Arc;

use chrono::{DateTime, Utc};
use obf_shared::observability::metrics;
use obf_shared::retry::{RetryPolicy, retry_with_policy};
use tracing::{debug, info, instrument, warn};

use crate::client::BadgeIssuingService;
use crate::error::{IssuanceError, Result};
use crate::host::UserDirectory;
use crate::notification::{AdminMessage, AdminNotifier, Severity, templates};

/// 触发告警的剩余天数
pub const ALERT_THRESHOLDS: [i64; 10] = [30, 25, 20, 15, 10, 5, 4, 3, 2, 1];

const SECONDS_PER_DAY: i64 = 60 * 60 * 24;

/// 剩余整天数，向下取整（已过期时为负数）
pub fn days_remaining(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (expires_at.timestamp() - now.timestamp()).div_euclid(SECONDS_PER_DAY)
}

/// 剩余天数对应的告警级别，不在阈值内返回 None
pub fn alert_severity(days: i64) -> Option<Severity> {
    if !ALERT_THRESHOLDS.contains(&days) {
        return None;
    }
    Some(if days <= 5 {
        Severity::Error
    } else {
        Severity::Notice
    })
}

/// 一次检查的结果
#[derive(Debug, Clone)]
pub struct ExpirationCheck {
    pub expires_at: DateTime<Utc>,
    pub days_remaining: i64,
    pub severity: Option<Severity>,
    /// 成功通知的管理员数
    pub notified: usize,
    /// 通知失败的管理员数
    pub failed: usize,
}

/// 证书过期监控
pub struct ExpirationMonitor {
    issuer: Arc<dyn BadgeIssuingService>,
    users: Arc<dyn UserDirectory>,
    notifier: Arc<dyn AdminNotifier>,
    obf_url: String,
    retry_policy: RetryPolicy,
}

impl ExpirationMonitor {
    pub fn new(
        issuer: Arc<dyn BadgeIssuingService>,
        users: Arc<dyn UserDirectory>,
        notifier: Arc<dyn AdminNotifier>,
        obf_url: impl Into<String>,
    ) -> Self {
        Self {
            issuer,
            users,
            notifier,
            obf_url: obf_url.into(),
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// 为单个管理员生成消息，发件人与收件人都是该管理员
    pub fn build_message(
        &self,
        admin_id: i64,
        admin_email: &str,
        days: i64,
        severity: Severity,
    ) -> AdminMessage {
        let subject = templates::expiring_certificate_subject();
        AdminMessage {
            severity,
            user_from: admin_id,
            user_to: admin_id,
            to_email: admin_email.to_string(),
            subject: subject.clone(),
            full_message: templates::expiring_certificate_text(days, &self.obf_url),
            full_message_html: templates::expiring_certificate_html(days, &self.obf_url),
            small_message: subject,
        }
    }

    /// 执行一次检查
    #[instrument(skip(self))]
    pub async fn check(&self, now: DateTime<Utc>) -> Result<ExpirationCheck> {
        let expires_at = retry_with_policy(
            &self.retry_policy,
            "get_certificate_expiration_date",
            IssuanceError::is_retryable,
            || self.issuer.get_certificate_expiration_date(),
        )
        .await?;

        let days = days_remaining(expires_at, now);
        let mut check = ExpirationCheck {
            expires_at,
            days_remaining: days,
            severity: alert_severity(days),
            notified: 0,
            failed: 0,
        };

        let Some(severity) = check.severity else {
            debug!(days, "证书剩余天数不在告警阈值内");
            return Ok(check);
        };

        let admins = self.users.list_admins().await?;
        for admin in &admins {
            let message = self.build_message(admin.id, &admin.email, days, severity);
            match self.notifier.send(&message).await {
                Ok(_) => check.notified += 1,
                Err(e) => {
                    warn!(admin_id = admin.id, error = %e, "证书过期告警发送失败");
                    check.failed += 1;
                }
            }
        }

        metrics::record_certificate_alert(severity.as_str(), check.notified as u64);
        match severity {
            Severity::Error => warn!(
                days,
                notified = check.notified,
                failed = check.failed,
                "客户端证书即将过期，已通知管理员"
            ),
            Severity::Notice => info!(
                days,
                notified = check.notified,
                failed = check.failed,
                "客户端证书即将过期，已通知管理员"
            ),
        }

        Ok(check)
    }
}
