//! 课程事件处理
//!
//! 课程完成时评估并发放徽章；课程删除时级联删除发放条件。
//! 处理器总是返回确定的结果，单个条件的失败不会中断同一事件的其它条件。

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use obf_shared::observability::metrics;
use tracing::{error, info, instrument, warn};

use super::coordinator::IssuanceCoordinator;
use super::dto::{
    CompletionOutcome, CourseCompletedEvent, CourseDeletedEvent, CriterionFailure,
    IssuanceOutcome,
};
use super::evaluator::CriterionEvaluator;
use crate::repository::CriterionStore;

/// 课程事件处理器
pub struct CourseEventHandler {
    evaluator: CriterionEvaluator,
    coordinator: IssuanceCoordinator,
    store: Arc<dyn CriterionStore>,
}

impl CourseEventHandler {
    pub fn new(
        evaluator: CriterionEvaluator,
        coordinator: IssuanceCoordinator,
        store: Arc<dyn CriterionStore>,
    ) -> Self {
        Self {
            evaluator,
            coordinator,
            store,
        }
    }

    pub fn evaluator(&self) -> &CriterionEvaluator {
        &self.evaluator
    }

    pub fn coordinator(&self) -> &IssuanceCoordinator {
        &self.coordinator
    }

    /// 处理课程完成事件
    #[instrument(skip(self), fields(user_id = event.user_id, course_id = event.course_id))]
    pub async fn on_course_completed(&self, event: CourseCompletedEvent) -> CompletionOutcome {
        let start = Instant::now();
        let event_time = Utc::now();
        let mut outcome = CompletionOutcome::new(event);

        let evaluation = match self
            .evaluator
            .evaluate_detailed(event.user_id, event.course_id)
            .await
        {
            Ok(evaluation) => evaluation,
            Err(e) => {
                error!(error = %e, "发放条件评估失败");
                outcome.error = Some(e.to_string());
                outcome.processing_time_ms = start.elapsed().as_millis() as i64;
                metrics::record_completion_event(outcome.metric_label());
                return outcome;
            }
        };

        outcome.success = true;
        outcome.authorized = evaluation.authorized;

        for criterion in &evaluation.criteria {
            match self
                .coordinator
                .issue(criterion, event.user_id, event_time)
                .await
            {
                Ok(IssuanceOutcome::Issued(_)) => outcome.issued.push(criterion.id),
                Ok(IssuanceOutcome::AlreadySatisfied | IssuanceOutcome::InProgress) => {
                    outcome.skipped.push(criterion.id)
                }
                Err(e) if e.is_benign() => outcome.skipped.push(criterion.id),
                Err(e) => {
                    warn!(criterion_id = criterion.id, error = %e, "发放条件处理失败，继续处理其余条件");
                    outcome.failures.push(CriterionFailure::new(criterion, &e));
                }
            }
        }

        outcome.processing_time_ms = start.elapsed().as_millis() as i64;
        metrics::record_completion_event(outcome.metric_label());

        info!(
            authorized = outcome.authorized,
            issued = outcome.issued.len(),
            skipped = outcome.skipped.len(),
            failed = outcome.failures.len(),
            processing_time_ms = outcome.processing_time_ms,
            "课程完成事件处理完成"
        );

        outcome
    }

    /// 处理课程删除事件，删除成功返回 true
    #[instrument(skip(self), fields(course_id = event.course_id))]
    pub async fn on_course_deleted(&self, event: CourseDeletedEvent) -> bool {
        match self.store.delete_criteria_for_course(event.course_id).await {
            Ok(removed) => {
                info!(removed, "已删除课程的发放条件");
                true
            }
            Err(e) => {
                error!(error = %e, "删除课程发放条件失败");
                false
            }
        }
    }
}
