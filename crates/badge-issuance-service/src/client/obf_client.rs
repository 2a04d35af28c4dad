//! Open Badge Factory HTTP 客户端

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use obf_shared::config::ObfConfig;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{BadgeIssuingService, IssueBadgeRequest};
use crate::error::{IssuanceError, Result};

/// OBF 返回的证书错误状态码
pub const OBF_API_CODE_CERT_ERROR: u16 = 495;
/// OBF 返回的未提供证书状态码
pub const OBF_API_CODE_NO_CERT: u16 = 496;

/// 将非成功状态码映射为错误
pub fn classify_status(status: u16, message: impl Into<String>) -> IssuanceError {
    let message = message.into();
    match status {
        OBF_API_CODE_CERT_ERROR => IssuanceError::CertificateError(message),
        OBF_API_CODE_NO_CERT => IssuanceError::NoCertificate,
        408 | 429 | 500..=599 => {
            IssuanceError::ServiceUnavailable(format!("HTTP {status}: {message}"))
        }
        _ => IssuanceError::ServiceRejected { status, message },
    }
}

#[derive(Serialize)]
struct IssuePayload<'a> {
    recipient: &'a [String],
    issued_on: i64,
    email_subject: &'a str,
    email_body: &'a str,
    email_footer: &'a str,
    api_consumer_id: &'a str,
}

#[derive(Deserialize)]
struct ClientInfo {
    /// 证书过期时间（Unix 秒）
    cert_expires: i64,
}

/// OBF REST 客户端
pub struct ObfClient {
    http: reqwest::Client,
    api_url: String,
    client_id: String,
    consumer_id: String,
}

impl ObfClient {
    pub fn new(config: &ObfConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| IssuanceError::Internal(format!("创建 HTTP 客户端失败: {e}")))?;

        let api_url = config.api_url().trim_end_matches('/').to_string();
        info!(api_url = %api_url, client_id = %config.client_id, "OBF 客户端已初始化");

        Ok(Self {
            http,
            api_url,
            client_id: config.client_id.clone(),
            consumer_id: config.consumer_id.clone(),
        })
    }

    fn transport_error(e: reqwest::Error) -> IssuanceError {
        IssuanceError::ServiceUnavailable(format!("请求 OBF 失败: {e}"))
    }

    async fn error_from_response(resp: reqwest::Response) -> IssuanceError {
        let status = resp.status();
        let message = resp
            .text()
            .await
            .unwrap_or_else(|_| status.canonical_reason().unwrap_or("").to_string());
        classify_status(status.as_u16(), message)
    }
}

#[async_trait]
impl BadgeIssuingService for ObfClient {
    async fn issue_badge(&self, request: &IssueBadgeRequest) -> Result<()> {
        let url = format!(
            "{}/badge/{}/{}",
            self.api_url, self.client_id, request.badge_id
        );
        let payload = IssuePayload {
            recipient: &request.recipients,
            issued_on: request.issued_at.timestamp(),
            email_subject: &request.subject,
            email_body: &request.body,
            email_footer: &request.footer,
            api_consumer_id: &self.consumer_id,
        };

        debug!(badge_id = %request.badge_id, recipients = request.recipients.len(), "调用 OBF 发放徽章");

        let resp = self
            .http
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(Self::transport_error)?;

        if resp.status().is_success() {
            return Ok(());
        }

        let err = Self::error_from_response(resp).await;
        warn!(badge_id = %request.badge_id, error = %err, "OBF 拒绝发放请求");
        Err(err)
    }

    async fn get_certificate_expiration_date(&self) -> Result<DateTime<Utc>> {
        let url = format!("{}/client/{}", self.api_url, self.client_id);

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(Self::transport_error)?;

        if resp.status() != StatusCode::OK {
            return Err(Self::error_from_response(resp).await);
        }

        let info: ClientInfo = resp
            .json()
            .await
            .map_err(|e| IssuanceError::Internal(format!("解析 OBF 客户端信息失败: {e}")))?;

        DateTime::<Utc>::from_timestamp(info.cert_expires, 0).ok_or_else(|| {
            IssuanceError::Internal(format!("无效的证书过期时间: {}", info.cert_expires))
        })
    }
}
