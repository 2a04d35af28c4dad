//! 仓储 Trait 定义
//!
//! 服务层依赖抽象而非具体实现，便于替换存储后端与 mock 测试

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{Badge, Criterion, CriterionRule, NewCriterion, SatisfactionRecord};

/// 发放条件存储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CriterionStore: Send + Sync {
    /// 课程下的全部发放条件，没有时返回空列表
    async fn criteria_for_course(&self, course_id: i64) -> Result<Vec<Criterion>>;

    async fn get_criterion(&self, criterion_id: i64) -> Result<Option<Criterion>>;

    async fn create_criterion(&self, criterion: NewCriterion) -> Result<Criterion>;

    /// 显式编辑规则，这是创建后修改规则的唯一途径
    async fn update_rule(&self, criterion_id: i64, rule: CriterionRule) -> Result<Criterion>;

    async fn is_satisfied(&self, criterion_id: i64, user_id: i64) -> Result<bool>;

    /// 写入满足记录
    ///
    /// 记录已存在时返回 `IssuanceError::AlreadySatisfied`
    async fn mark_satisfied(
        &self,
        criterion_id: i64,
        user_id: i64,
        met_at: DateTime<Utc>,
    ) -> Result<SatisfactionRecord>;

    /// 级联删除课程的发放条件及其满足记录，返回删除的条件数
    async fn delete_criteria_for_course(&self, course_id: i64) -> Result<u64>;
}

/// 徽章邮件配置存储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BadgeCatalog: Send + Sync {
    async fn get_badge(&self, badge_id: &str) -> Result<Option<Badge>>;

    async fn save_badge(&self, badge: &Badge) -> Result<()>;
}
