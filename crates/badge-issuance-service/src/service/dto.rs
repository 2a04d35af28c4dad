//! 服务层输入输出结构

use serde::{Deserialize, Serialize};

use crate::error::IssuanceError;
use crate::models::{Criterion, SatisfactionRecord};

/// 课程完成事件
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseCompletedEvent {
    pub user_id: i64,
    pub course_id: i64,
}

/// 课程删除事件
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseDeletedEvent {
    pub course_id: i64,
}

/// 评估结果
#[derive(Debug, Clone, Default)]
pub struct Evaluation {
    /// 用户是否有权在该课程获得徽章
    pub authorized: bool,
    /// 本次新满足的发放条件
    pub criteria: Vec<Criterion>,
}

/// 单个发放条件的处理结果
#[derive(Debug, Clone, PartialEq)]
pub enum IssuanceOutcome {
    /// 外部发放成功并已写入满足记录
    Issued(SatisfactionRecord),
    /// 已满足，未调用外部服务
    AlreadySatisfied,
    /// 同一 (条件, 用户) 正由本进程的另一请求处理
    InProgress,
}

/// 单个发放条件的失败信息
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CriterionFailure {
    pub criterion_id: i64,
    pub badge_id: String,
    pub error_code: String,
    pub message: String,
    pub retryable: bool,
    pub operator_alert: bool,
}

impl CriterionFailure {
    pub fn new(criterion: &Criterion, error: &IssuanceError) -> Self {
        Self {
            criterion_id: criterion.id,
            badge_id: criterion.badge_id.clone(),
            error_code: error.error_code().to_string(),
            message: error.to_string(),
            retryable: error.is_retryable(),
            operator_alert: error.requires_operator_alert(),
        }
    }
}

/// 课程完成事件的处理结果
///
/// 单个条件的失败只记录在 `failures` 中，不影响 `success`。
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionOutcome {
    pub user_id: i64,
    pub course_id: i64,
    pub success: bool,
    pub authorized: bool,
    /// 本次发放成功的条件
    pub issued: Vec<i64>,
    /// 已满足或正在处理而跳过的条件
    pub skipped: Vec<i64>,
    pub failures: Vec<CriterionFailure>,
    pub error: Option<String>,
    pub processing_time_ms: i64,
}

impl CompletionOutcome {
    pub fn new(event: CourseCompletedEvent) -> Self {
        Self {
            user_id: event.user_id,
            course_id: event.course_id,
            ..Self::default()
        }
    }

    /// 指标标签
    pub fn metric_label(&self) -> &'static str {
        if !self.success {
            "failed"
        } else if !self.authorized {
            "unauthorized"
        } else if !self.failures.is_empty() {
            "partial"
        } else {
            "success"
        }
    }
}
