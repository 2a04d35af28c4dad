//! 发放条件评估
//!
//! 权限检查在规则判定之前进行；没有获得徽章权限的用户直接得到空结果。

use std::sync::Arc;

use tracing::{debug, instrument};

use super::dto::Evaluation;
use crate::error::Result;
use crate::host::{CapabilityChecker, CompletionSource};
use crate::models::{Capability, Criterion, CourseCompletion};
use crate::repository::CriterionStore;

/// 从候选条件中挑出规则成立的条件
pub fn satisfied_criteria(
    candidates: Vec<Criterion>,
    completion: Option<&CourseCompletion>,
) -> Vec<Criterion> {
    candidates
        .into_iter()
        .filter(|c| c.rule.holds(completion))
        .collect()
}

/// 发放条件评估器
pub struct CriterionEvaluator {
    store: Arc<dyn CriterionStore>,
    completions: Arc<dyn CompletionSource>,
    capabilities: Arc<dyn CapabilityChecker>,
}

impl CriterionEvaluator {
    pub fn new(
        store: Arc<dyn CriterionStore>,
        completions: Arc<dyn CompletionSource>,
        capabilities: Arc<dyn CapabilityChecker>,
    ) -> Self {
        Self {
            store,
            completions,
            capabilities,
        }
    }

    /// 用户在课程中新满足的发放条件
    pub async fn evaluate(&self, user_id: i64, course_id: i64) -> Result<Vec<Criterion>> {
        Ok(self.evaluate_detailed(user_id, course_id).await?.criteria)
    }

    /// 同 `evaluate`，并返回权限检查结果
    #[instrument(skip(self))]
    pub async fn evaluate_detailed(&self, user_id: i64, course_id: i64) -> Result<Evaluation> {
        let authorized = self
            .capabilities
            .has_capability(user_id, course_id, Capability::EarnBadge)
            .await?;
        if !authorized {
            debug!("用户无获得徽章权限，跳过评估");
            return Ok(Evaluation::default());
        }

        let mut pending = Vec::new();
        for criterion in self.store.criteria_for_course(course_id).await? {
            if self.store.is_satisfied(criterion.id, user_id).await? {
                continue;
            }
            pending.push(criterion);
        }

        if pending.is_empty() {
            return Ok(Evaluation {
                authorized,
                criteria: pending,
            });
        }

        let completion = self.completions.get_completion(user_id, course_id).await?;
        let criteria = satisfied_criteria(pending, completion.as_ref());
        debug!(satisfied = criteria.len(), "发放条件评估完成");

        Ok(Evaluation {
            authorized,
            criteria,
        })
    }
}
