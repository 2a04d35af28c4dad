//! 徽章发放服务错误类型
//!
//! 区分良性结果（已满足、无权限）、可重试的瞬时故障、需要运维介入的证书问题
//! 以及外部发放成功但本地记录失败的对账风险。

use thiserror::Error;

/// 徽章发放服务错误类型
#[derive(Debug, Error)]
pub enum IssuanceError {
    // === 良性结果 ===
    #[error("用户已满足该发放条件: criterion_id={criterion_id}, user_id={user_id}")]
    AlreadySatisfied { criterion_id: i64, user_id: i64 },

    #[error("用户无权在课程中获得徽章: user_id={user_id}, course_id={course_id}")]
    Unauthorized { user_id: i64, course_id: i64 },

    // === 外部发放服务 ===
    #[error("徽章发放服务暂不可用: {0}")]
    ServiceUnavailable(String),

    #[error("徽章发放服务证书错误: {0}")]
    CertificateError(String),

    #[error("徽章发放服务未配置客户端证书")]
    NoCertificate,

    #[error("徽章发放服务拒绝请求: status={status}, {message}")]
    ServiceRejected { status: u16, message: String },

    // === 对账风险 ===
    #[error(
        "徽章已发放但满足记录写入失败: criterion_id={criterion_id}, user_id={user_id}, {reason}"
    )]
    StorageWriteFailure {
        criterion_id: i64,
        user_id: i64,
        reason: String,
    },

    // === 查找失败 ===
    #[error("发放条件不存在: {0}")]
    CriterionNotFound(i64),

    #[error("徽章不存在: {0}")]
    BadgeNotFound(String),

    #[error("用户不存在: {0}")]
    UserNotFound(i64),

    #[error("未注册的事件: {0}")]
    UnknownEvent(String),

    // === 系统错误 ===
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JSON 序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("参数校验失败: {0}")]
    Validation(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 徽章发放服务 Result 类型别名
pub type Result<T> = std::result::Result<T, IssuanceError>;

impl IssuanceError {
    /// 瞬时故障，调用方可按退避策略重试
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ServiceUnavailable(_) | Self::Database(_))
    }

    /// 需要通知运维人员处理的错误
    pub fn requires_operator_alert(&self) -> bool {
        matches!(
            self,
            Self::CertificateError(_) | Self::NoCertificate | Self::StorageWriteFailure { .. }
        )
    }

    /// 良性结果，不计入失败
    pub fn is_benign(&self) -> bool {
        matches!(self, Self::AlreadySatisfied { .. } | Self::Unauthorized { .. })
    }

    /// 获取错误码
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::AlreadySatisfied { .. } => "ALREADY_SATISFIED",
            Self::Unauthorized { .. } => "UNAUTHORIZED",
            Self::ServiceUnavailable(_) => "ISSUANCE_SERVICE_UNAVAILABLE",
            Self::CertificateError(_) => "ISSUANCE_SERVICE_CERTIFICATE_ERROR",
            Self::NoCertificate => "ISSUANCE_SERVICE_NO_CERTIFICATE",
            Self::ServiceRejected { .. } => "ISSUANCE_SERVICE_REJECTED",
            Self::StorageWriteFailure { .. } => "STORAGE_WRITE_FAILURE",
            Self::CriterionNotFound(_) => "CRITERION_NOT_FOUND",
            Self::BadgeNotFound(_) => "BADGE_NOT_FOUND",
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::UnknownEvent(_) => "UNKNOWN_EVENT",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}
