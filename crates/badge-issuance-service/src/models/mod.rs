//! 徽章发放领域模型
//!
//! 包含课程发放条件、徽章、用户与课程完成记录等核心实体定义

pub mod badge;
pub mod criterion;
pub mod user;

// 重新导出常用类型
pub use badge::{Badge, EmailTemplate};
pub use criterion::{
    CompletionMethod, Criterion, CriterionRule, NewCriterion, RuleCondition, SatisfactionRecord,
};
pub use user::{Backpack, Capability, CourseCompletion, User};
