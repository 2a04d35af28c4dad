//! 宿主数据快照
//!
//! 独立运行时从 JSON 文件加载宿主数据，测试中通过构建方法组装。
//! 同一键存在多条记录时以最后一条为准。

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{CapabilityChecker, CompletionSource, UserDirectory};
use crate::error::{IssuanceError, Result};
use crate::models::{Backpack, Capability, CourseCompletion, User};

/// 课程内的一条权限授予
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityGrant {
    pub user_id: i64,
    pub course_id: i64,
    pub capability: Capability,
}

/// 宿主数据快照
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HostSnapshot {
    pub users: Vec<User>,
    pub backpacks: Vec<Backpack>,
    pub completions: Vec<CourseCompletion>,
    pub capabilities: Vec<CapabilityGrant>,
    /// 管理员用户 ID
    pub admins: Vec<i64>,
}

impl HostSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从 JSON 文件加载
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            IssuanceError::Internal(format!("读取宿主快照失败: {}: {}", path.display(), e))
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn with_user(mut self, user: User) -> Self {
        self.users.push(user);
        self
    }

    pub fn with_backpack(mut self, user_id: i64, email: impl Into<String>) -> Self {
        self.backpacks.push(Backpack {
            user_id,
            email: email.into(),
        });
        self
    }

    pub fn with_completion(mut self, completion: CourseCompletion) -> Self {
        self.completions.push(completion);
        self
    }

    pub fn with_capability(mut self, user_id: i64, course_id: i64, capability: Capability) -> Self {
        self.capabilities.push(CapabilityGrant {
            user_id,
            course_id,
            capability,
        });
        self
    }

    pub fn with_admin(mut self, user: User) -> Self {
        self.admins.push(user.id);
        self.users.push(user);
        self
    }

    fn find_user(&self, user_id: i64) -> Option<&User> {
        self.users.iter().rev().find(|u| u.id == user_id)
    }
}

#[async_trait]
impl UserDirectory for HostSnapshot {
    async fn get_user(&self, user_id: i64) -> Result<Option<User>> {
        Ok(self.find_user(user_id).cloned())
    }

    async fn get_backpack(&self, user_id: i64) -> Result<Option<Backpack>> {
        Ok(self
            .backpacks
            .iter()
            .rev()
            .find(|b| b.user_id == user_id)
            .cloned())
    }

    async fn list_admins(&self) -> Result<Vec<User>> {
        let mut seen = Vec::new();
        let mut admins = Vec::new();
        for id in &self.admins {
            if seen.contains(id) {
                continue;
            }
            seen.push(*id);
            if let Some(user) = self.find_user(*id) {
                admins.push(user.clone());
            }
        }
        Ok(admins)
    }
}

#[async_trait]
impl CompletionSource for HostSnapshot {
    async fn get_completion(
        &self,
        user_id: i64,
        course_id: i64,
    ) -> Result<Option<CourseCompletion>> {
        Ok(self
            .completions
            .iter()
            .rev()
            .find(|c| c.user_id == user_id && c.course_id == course_id)
            .cloned())
    }
}

#[async_trait]
impl CapabilityChecker for HostSnapshot {
    async fn has_capability(
        &self,
        user_id: i64,
        course_id: i64,
        capability: Capability,
    ) -> Result<bool> {
        Ok(self.capabilities.iter().any(|g| {
            g.user_id == user_id && g.course_id == course_id && g.capability == capability
        }))
    }
}
