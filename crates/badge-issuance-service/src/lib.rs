//! Open Badge Factory 徽章发放服务
//!
//! 学员完成课程时，按课程配置的发放条件向 Open Badge Factory 发放徽章，
//! 并定期检查 OBF 客户端证书的过期时间。
//!
//! ## 核心功能
//!
//! - **条件评估**：权限检查后按完成情况、成绩与截止时间判定发放条件
//! - **幂等发放**：每个 (条件, 用户) 至多记录一次满足，外部发放失败不写记录
//! - **级联删除**：课程删除时删除其发放条件与满足记录
//! - **证书监控**：证书剩余天数落在告警阈值时通知管理员
//! - **宿主集成**：事件注册表、导航链接、用户排序 SQL
//!
//! ## 模块结构
//!
//! - `models`: 领域模型定义
//! - `error`: 错误类型定义
//! - `repository`: 发放条件存储（内存 / PostgreSQL）
//! - `host`: 宿主用户、完成记录与权限接口
//! - `client`: 外部发放服务客户端
//! - `service`: 评估、发放与课程事件处理
//! - `notification`: 管理员通知
//! - `worker`: 证书过期监控与调度
//! - `hooks`: 宿主事件与导航集成
//! - `sql`: 用户排序 SQL
//! - `engine`: 组件装配

pub mod client;
pub mod engine;
pub mod error;
pub mod hooks;
pub mod host;
pub mod models;
pub mod notification;
pub mod repository;
pub mod service;
pub mod sql;
pub mod worker;

pub use client::{BadgeIssuingService, IssueBadgeRequest, ObfClient};
pub use engine::{EngineParts, IssuanceEngine};
pub use error::{IssuanceError, Result};
pub use hooks::{EventName, EventRegistry, HookOutcome, HostEvent};
pub use host::{CapabilityChecker, CompletionSource, HostSnapshot, UserDirectory};
pub use models::*;
pub use repository::{BadgeCatalog, CriterionStore, InMemoryCriterionStore, PgCriterionStore};
pub use service::{
    CompletionOutcome, CourseCompletedEvent, CourseDeletedEvent, CourseEventHandler,
    CriterionEvaluator, IssuanceCoordinator, IssuanceOutcome,
};
pub use worker::{ExpirationMonitor, ExpirationScheduler};
