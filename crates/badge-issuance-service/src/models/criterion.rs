//! 课程发放条件定义
//!
//! 一个发放条件属于唯一的课程，引用唯一的徽章，并携带一组基于课程完成情况的判定规则。
//! 规则判定是纯函数：相同的完成记录总是得到相同的结果。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::user::CourseCompletion;

/// 多个条件的组合方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionMethod {
    /// 所有条件都满足
    #[default]
    All,
    /// 任一条件满足
    Any,
}

/// 单个判定条件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleCondition {
    /// 已完成课程（完成时间已设置）
    Completed,
    /// 课程成绩不低于阈值
    MinGrade { grade: f64 },
    /// 在截止时间（含）之前完成课程
    CompletedBy { deadline: DateTime<Utc> },
}

impl RuleCondition {
    /// 判断条件是否成立
    pub fn holds(&self, completion: &CourseCompletion) -> bool {
        match self {
            Self::Completed => completion.completed_at.is_some(),
            Self::MinGrade { grade } => completion.grade.is_some_and(|g| g >= *grade),
            Self::CompletedBy { deadline } => {
                completion.completed_at.is_some_and(|t| t <= *deadline)
            }
        }
    }
}

/// 发放规则
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriterionRule {
    #[serde(default)]
    pub method: CompletionMethod,
    pub conditions: Vec<RuleCondition>,
}

impl CriterionRule {
    /// 所有条件都需满足
    pub fn all(conditions: Vec<RuleCondition>) -> Self {
        Self {
            method: CompletionMethod::All,
            conditions,
        }
    }

    /// 任一条件满足即可
    pub fn any(conditions: Vec<RuleCondition>) -> Self {
        Self {
            method: CompletionMethod::Any,
            conditions,
        }
    }

    /// 判断规则是否成立
    ///
    /// 没有完成记录时按"未完成、无成绩"判定；没有任何条件的规则永不成立。
    pub fn holds(&self, completion: Option<&CourseCompletion>) -> bool {
        if self.conditions.is_empty() {
            return false;
        }

        let empty;
        let completion = match completion {
            Some(c) => c,
            None => {
                empty = CourseCompletion {
                    user_id: 0,
                    course_id: 0,
                    completed_at: None,
                    grade: None,
                };
                &empty
            }
        };

        match self.method {
            CompletionMethod::All => self.conditions.iter().all(|c| c.holds(completion)),
            CompletionMethod::Any => self.conditions.iter().any(|c| c.holds(completion)),
        }
    }
}

/// 发放条件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Criterion {
    pub id: i64,
    pub course_id: i64,
    pub badge_id: String,
    pub rule: CriterionRule,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 新建发放条件请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCriterion {
    pub course_id: i64,
    pub badge_id: String,
    pub rule: CriterionRule,
}

impl NewCriterion {
    pub fn new(course_id: i64, badge_id: impl Into<String>, rule: CriterionRule) -> Self {
        Self {
            course_id,
            badge_id: badge_id.into(),
            rule,
        }
    }
}

/// 满足记录
///
/// 每个 (criterion_id, user_id) 至多一条，在外部发放成功后写入。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SatisfactionRecord {
    pub criterion_id: i64,
    pub user_id: i64,
    pub met_at: DateTime<Utc>,
}
