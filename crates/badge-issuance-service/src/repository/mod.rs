//! 发放条件存储层
//!
//! 提供发放条件、满足记录与徽章邮件配置的数据访问接口。
//!
//! ## 设计原则
//!
//! - 仓储只负责数据持久化，不包含业务逻辑
//! - 满足记录的唯一性由存储层保证（内存实现在写锁内检查，PostgreSQL 依赖主键约束）
//! - 定义 trait 接口以支持 mock 测试

mod criterion_repo;
mod memory;
mod traits;

pub use criterion_repo::PgCriterionStore;
pub use memory::InMemoryCriterionStore;
pub use traits::*;
