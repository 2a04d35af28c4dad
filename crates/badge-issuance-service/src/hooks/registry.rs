//! 宿主事件注册表
//!
//! 宿主按事件名分发事件，每个事件名对应一个显式注册的处理函数。

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{IssuanceError, Result};
use crate::service::{
    CompletionOutcome, CourseCompletedEvent, CourseDeletedEvent, CourseEventHandler,
};

/// 宿主事件名
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventName {
    CourseCompleted,
    CourseDeleted,
}

impl EventName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CourseCompleted => "course_completed",
            Self::CourseDeleted => "course_deleted",
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventName {
    type Err = IssuanceError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "course_completed" => Ok(Self::CourseCompleted),
            "course_deleted" => Ok(Self::CourseDeleted),
            other => Err(IssuanceError::UnknownEvent(other.to_string())),
        }
    }
}

/// 宿主事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HostEvent {
    CourseCompleted(CourseCompletedEvent),
    CourseDeleted(CourseDeletedEvent),
}

impl HostEvent {
    pub fn name(&self) -> EventName {
        match self {
            Self::CourseCompleted(_) => EventName::CourseCompleted,
            Self::CourseDeleted(_) => EventName::CourseDeleted,
        }
    }

    /// 解析一行 JSON 事件，事件名未知时返回 `UnknownEvent`
    pub fn from_json(line: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(line)?;
        let name = value
            .get("event")
            .and_then(|v| v.as_str())
            .ok_or_else(|| IssuanceError::Validation("事件缺少 event 字段".to_string()))?;
        EventName::from_str(name)?;
        Ok(serde_json::from_value(value)?)
    }
}

/// 事件处理结果
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum HookOutcome {
    CourseCompleted(CompletionOutcome),
    CourseDeleted { course_id: i64, success: bool },
    /// 处理函数收到了不属于它的事件
    Ignored { name: EventName },
}

impl HookOutcome {
    /// 返回给宿主的布尔结果
    pub fn success(&self) -> bool {
        match self {
            Self::CourseCompleted(outcome) => outcome.success,
            Self::CourseDeleted { success, .. } => *success,
            Self::Ignored { .. } => false,
        }
    }
}

/// 事件处理函数
pub type HookHandler = Box<dyn Fn(HostEvent) -> BoxFuture<'static, HookOutcome> + Send + Sync>;

/// 事件注册表
#[derive(Default)]
pub struct EventRegistry {
    handlers: HashMap<EventName, HookHandler>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册处理函数，同名事件的旧处理函数被替换
    pub fn register(&mut self, name: EventName, handler: HookHandler) {
        if self.handlers.insert(name, handler).is_some() {
            warn!(event = %name, "事件处理函数被覆盖");
        }
    }

    pub fn is_registered(&self, name: EventName) -> bool {
        self.handlers.contains_key(&name)
    }

    /// 分发事件，没有注册处理函数时返回 `UnknownEvent`
    pub async fn dispatch(&self, event: HostEvent) -> Result<HookOutcome> {
        let name = event.name();
        let handler = self
            .handlers
            .get(&name)
            .ok_or_else(|| IssuanceError::UnknownEvent(name.to_string()))?;
        Ok(handler(event).await)
    }
}

/// 注册课程完成与课程删除两个处理函数
pub fn register_course_hooks(registry: &mut EventRegistry, handler: Arc<CourseEventHandler>) {
    let completed = handler.clone();
    registry.register(
        EventName::CourseCompleted,
        Box::new(move |event: HostEvent| {
            let handler = completed.clone();
            async move {
                match event {
                    HostEvent::CourseCompleted(e) => {
                        HookOutcome::CourseCompleted(handler.on_course_completed(e).await)
                    }
                    other => HookOutcome::Ignored { name: other.name() },
                }
            }
            .boxed()
        }),
    );

    let deleted = handler;
    registry.register(
        EventName::CourseDeleted,
        Box::new(move |event: HostEvent| {
            let handler = deleted.clone();
            async move {
                match event {
                    HostEvent::CourseDeleted(e) => HookOutcome::CourseDeleted {
                        course_id: e.course_id,
                        success: handler.on_course_deleted(e).await,
                    },
                    other => HookOutcome::Ignored { name: other.name() },
                }
            }
            .boxed()
        }),
    );
}
