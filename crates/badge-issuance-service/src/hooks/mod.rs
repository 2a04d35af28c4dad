//! 宿主集成入口
//!
//! - `registry`: 事件名到处理函数的注册与分发
//! - `navigation`: 按权限向导航树追加链接

pub mod navigation;
pub mod registry;

pub use navigation::{
    NavNode, NavigationExtender, NodeKind, PageContext, SITE_COURSE_ID, add_backpack_settings_link,
};
pub use registry::{EventName, EventRegistry, HookHandler, HookOutcome, HostEvent, register_course_hooks};
