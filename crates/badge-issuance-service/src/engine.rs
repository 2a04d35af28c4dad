//! 发放引擎装配
//!
//! 把存储、宿主数据与外部服务组装成课程事件处理器，并注册到事件表。

use std::sync::Arc;

use obf_shared::config::IssuanceConfig;

use crate::client::BadgeIssuingService;
use crate::error::Result;
use crate::hooks::{EventRegistry, HookOutcome, HostEvent, register_course_hooks};
use crate::host::{CapabilityChecker, CompletionSource, UserDirectory};
use crate::repository::{BadgeCatalog, CriterionStore};
use crate::service::{CourseEventHandler, CriterionEvaluator, IssuanceCoordinator};

/// 引擎依赖
pub struct EngineParts {
    pub store: Arc<dyn CriterionStore>,
    pub badges: Arc<dyn BadgeCatalog>,
    pub users: Arc<dyn UserDirectory>,
    pub completions: Arc<dyn CompletionSource>,
    pub capabilities: Arc<dyn CapabilityChecker>,
    pub issuer: Arc<dyn BadgeIssuingService>,
}

/// 徽章发放引擎
pub struct IssuanceEngine {
    handler: Arc<CourseEventHandler>,
    registry: EventRegistry,
}

impl IssuanceEngine {
    pub fn new(parts: EngineParts, config: &IssuanceConfig) -> Self {
        let evaluator = CriterionEvaluator::new(
            parts.store.clone(),
            parts.completions,
            parts.capabilities,
        );
        let coordinator = IssuanceCoordinator::new(
            parts.store.clone(),
            parts.badges,
            parts.users,
            parts.issuer,
            config.call_timeout(),
        );
        let handler = Arc::new(CourseEventHandler::new(evaluator, coordinator, parts.store));

        let mut registry = EventRegistry::new();
        register_course_hooks(&mut registry, handler.clone());

        Self { handler, registry }
    }

    pub fn handler(&self) -> &Arc<CourseEventHandler> {
        &self.handler
    }

    pub fn registry(&self) -> &EventRegistry {
        &self.registry
    }

    /// 分发一条宿主事件
    pub async fn handle(&self, event: HostEvent) -> Result<HookOutcome> {
        self.registry.dispatch(event).await
    }
}
