//! 用户、背包与课程完成记录
//!
//! 这些数据归宿主应用所有，本服务只读。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 宿主用户
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    /// 账号默认邮箱
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

impl User {
    pub fn new(id: i64, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
            first_name: String::new(),
            last_name: String::new(),
        }
    }
}

/// 用户背包配置
///
/// 由用户自行创建与更新，配置后徽章发往背包邮箱而非账号邮箱。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backpack {
    pub user_id: i64,
    pub email: String,
}

/// 用户在课程中的完成情况
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseCompletion {
    pub user_id: i64,
    pub course_id: i64,
    /// 课程完成时间，未完成时为空
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// 课程总成绩
    #[serde(default)]
    pub grade: Option<f64>,
}

/// 宿主权限点
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// 可以在课程中获得徽章
    EarnBadge,
    /// 可以管理和发放课程徽章
    IssueBadge,
    /// 可以查看课程参与者的徽章
    SeeParticipantBadges,
}

impl Capability {
    /// 宿主侧的权限点名称
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EarnBadge => "local/obf:earnbadge",
            Self::IssueBadge => "local/obf:issuebadge",
            Self::SeeParticipantBadges => "local/obf:seeparticipantbadges",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_names() {
        assert_eq!(Capability::EarnBadge.as_str(), "local/obf:earnbadge");
        assert_eq!(Capability::IssueBadge.as_str(), "local/obf:issuebadge");
    }

    #[test]
    fn test_completion_deserialize_defaults() {
        let completion: CourseCompletion =
            serde_json::from_str(r#"{"userId": 7, "courseId": 42}"#).unwrap();
        assert!(completion.completed_at.is_none());
        assert!(completion.grade.is_none());
    }
}
