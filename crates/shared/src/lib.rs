//! 共享库
//!
//! 包含徽章发放服务共用的配置、错误处理、数据库连接、可观测性与重试等基础设施代码。

pub mod config;
pub mod database;
pub mod error;
pub mod observability;
pub mod retry;
