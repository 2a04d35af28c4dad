//! 徽章发放业务服务层
//!
//! - `CriterionEvaluator`: 权限检查与规则判定
//! - `IssuanceCoordinator`: 单个条件的外部发放与满足记录写入
//! - `CourseEventHandler`: 课程完成/删除事件入口

pub mod coordinator;
pub mod course_events;
pub mod dto;
pub mod evaluator;
pub mod inflight;

pub use coordinator::IssuanceCoordinator;
pub use course_events::CourseEventHandler;
pub use dto::{
    CompletionOutcome, CourseCompletedEvent, CourseDeletedEvent, CriterionFailure, Evaluation,
    IssuanceOutcome,
};
pub use evaluator::{CriterionEvaluator, satisfied_criteria};
pub use inflight::{ClaimGuard, InflightClaims};
