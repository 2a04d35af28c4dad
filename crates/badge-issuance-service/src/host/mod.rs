//! 宿主应用数据访问
//!
//! 用户、背包、课程完成记录与权限由宿主应用管理，本服务只通过以下接口读取。

mod snapshot;

pub use snapshot::{CapabilityGrant, HostSnapshot};

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Backpack, Capability, CourseCompletion, User};

/// 用户目录
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get_user(&self, user_id: i64) -> Result<Option<User>>;

    /// 用户配置的背包，未配置时返回 None
    async fn get_backpack(&self, user_id: i64) -> Result<Option<Backpack>>;

    /// 站点管理员列表
    async fn list_admins(&self) -> Result<Vec<User>>;
}

/// 课程完成数据来源
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionSource: Send + Sync {
    async fn get_completion(
        &self,
        user_id: i64,
        course_id: i64,
    ) -> Result<Option<CourseCompletion>>;
}

/// 课程上下文中的权限检查
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CapabilityChecker: Send + Sync {
    async fn has_capability(
        &self,
        user_id: i64,
        course_id: i64,
        capability: Capability,
    ) -> Result<bool>;
}
