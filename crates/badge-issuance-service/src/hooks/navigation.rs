//! 导航树扩展
//!
//! 按权限向宿主导航树追加徽章相关链接。页面上下文通过 `PageContext` 显式传入。

use std::sync::Arc;

use serde::Serialize;

use crate::error::Result;
use crate::host::CapabilityChecker;
use crate::models::Capability;

/// 站点首页课程 ID，不属于真实课程
pub const SITE_COURSE_ID: i64 = 1;

/// 课程管理菜单中徽章链接插在该节点之前
pub const COURSE_ADMIN_BEFORE_KEY: &str = "backup";

/// 导航节点类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Root,
    Course,
    Container,
    Setting,
}

/// 导航节点
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavNode {
    pub key: String,
    pub kind: NodeKind,
    pub text: String,
    pub url: Option<String>,
    pub children: Vec<NavNode>,
}

impl NavNode {
    pub fn new(key: impl Into<String>, kind: NodeKind, text: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind,
            text: text.into(),
            url: None,
            children: Vec::new(),
        }
    }

    pub fn link(key: impl Into<String>, text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::new(key, NodeKind::Setting, text)
        }
    }

    pub fn with_child(mut self, child: NavNode) -> Self {
        self.children.push(child);
        self
    }

    /// 在整棵子树中按键和类型查找
    pub fn find(&mut self, key: &str, kind: NodeKind) -> Option<&mut NavNode> {
        if self.key == key && self.kind == kind {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find(key, kind))
    }

    /// 按键查找直接子节点
    pub fn get(&mut self, key: &str) -> Option<&mut NavNode> {
        self.children.iter_mut().find(|c| c.key == key)
    }

    /// 追加子节点；before 指定的兄弟节点存在时插在它之前
    pub fn add_node(&mut self, node: NavNode, before: Option<&str>) {
        let position = before.and_then(|key| self.children.iter().position(|c| c.key == key));
        match position {
            Some(index) => self.children.insert(index, node),
            None => self.children.push(node),
        }
    }

    pub fn child_keys(&self) -> Vec<&str> {
        self.children.iter().map(|c| c.key.as_str()).collect()
    }
}

/// 当前页面上下文
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageContext {
    pub course_id: i64,
    /// 当前访问者
    pub viewer_id: i64,
}

/// 导航扩展器
pub struct NavigationExtender {
    capabilities: Arc<dyn CapabilityChecker>,
}

impl NavigationExtender {
    pub fn new(capabilities: Arc<dyn CapabilityChecker>) -> Self {
        Self { capabilities }
    }

    async fn allowed(&self, ctx: PageContext, capability: Capability) -> Result<bool> {
        self.capabilities
            .has_capability(ctx.viewer_id, ctx.course_id, capability)
            .await
    }

    /// 全局导航：在当前课程节点下追加参与者徽章链接
    pub async fn extend_navigation(&self, navigation: &mut NavNode, ctx: PageContext) -> Result<()> {
        if ctx.course_id <= SITE_COURSE_ID {
            return Ok(());
        }
        if let Some(branch) = navigation.find(&ctx.course_id.to_string(), NodeKind::Course) {
            self.add_course_participant_badges_link(branch, ctx).await?;
        }
        Ok(())
    }

    /// 设置导航：课程管理与用户设置两处链接
    pub async fn extend_settings_navigation(
        &self,
        settings: &mut NavNode,
        ctx: PageContext,
    ) -> Result<()> {
        if let Some(branch) = settings.get("courseadmin") {
            self.add_course_admin_link(branch, ctx).await?;
        }
        if let Some(branch) = settings.get("usercurrentsettings") {
            add_backpack_settings_link(branch);
        }
        Ok(())
    }

    /// 旧版入口：同时处理全局导航和（存在时的）设置导航
    pub async fn extend_legacy_navigation(
        &self,
        navigation: &mut NavNode,
        settings: Option<&mut NavNode>,
        ctx: PageContext,
    ) -> Result<()> {
        self.extend_navigation(navigation, ctx).await?;
        if let Some(settings) = settings {
            self.extend_settings_navigation(settings, ctx).await?;
        }
        Ok(())
    }

    /// 课程参与者徽章链接，需要查看参与者徽章权限
    pub async fn add_course_participant_badges_link(
        &self,
        branch: &mut NavNode,
        ctx: PageContext,
    ) -> Result<bool> {
        if !self.allowed(ctx, Capability::SeeParticipantBadges).await? {
            return Ok(false);
        }
        branch.add_node(
            NavNode::link(
                "obf_courseuserbadges",
                "Course participants' badges",
                format!("/local/obf/courseuserbadges.php?courseid={}", ctx.course_id),
            ),
            None,
        );
        Ok(true)
    }

    /// 课程管理中的 OBF 链接，需要发放徽章权限
    pub async fn add_course_admin_link(&self, branch: &mut NavNode, ctx: PageContext) -> Result<bool> {
        if !self.allowed(ctx, Capability::IssueBadge).await? {
            return Ok(false);
        }
        branch.add_node(
            NavNode::link(
                "obf",
                "Open Badge Factory",
                format!("/local/obf/badge.php?action=list&courseid={}", ctx.course_id),
            ),
            Some(COURSE_ADMIN_BEFORE_KEY),
        );
        Ok(true)
    }
}

/// 背包设置链接，所有用户可见
pub fn add_backpack_settings_link(branch: &mut NavNode) {
    branch.add_node(
        NavNode::link(
            "obf_backpacksettings",
            "Backpack settings",
            "/local/obf/userconfig.php",
        ),
        None,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HostSnapshot;

    fn ctx(course_id: i64) -> PageContext {
        PageContext {
            course_id,
            viewer_id: 3,
        }
    }

    fn navigation(course_id: i64) -> NavNode {
        NavNode::new("root", NodeKind::Root, "Home").with_child(
            NavNode::new("courses", NodeKind::Container, "Courses").with_child(NavNode::new(
                course_id.to_string(),
                NodeKind::Course,
                "Course",
            )),
        )
    }

    fn settings() -> NavNode {
        NavNode::new("settings", NodeKind::Root, "Settings")
            .with_child(
                NavNode::new("courseadmin", NodeKind::Container, "Course administration")
                    .with_child(NavNode::link("edit", "Edit", "/course/edit.php"))
                    .with_child(NavNode::link("backup", "Backup", "/backup/backup.php"))
                    .with_child(NavNode::link("restore", "Restore", "/backup/restore.php")),
            )
            .with_child(NavNode::new(
                "usercurrentsettings",
                NodeKind::Container,
                "My profile settings",
            ))
    }

    #[tokio::test]
    async fn test_participant_link_requires_capability() {
        let denied = NavigationExtender::new(Arc::new(HostSnapshot::new()));
        let mut nav = navigation(42);
        denied.extend_navigation(&mut nav, ctx(42)).await.unwrap();
        assert!(nav.find("42", NodeKind::Course).unwrap().children.is_empty());

        let allowed = NavigationExtender::new(Arc::new(
            HostSnapshot::new().with_capability(3, 42, Capability::SeeParticipantBadges),
        ));
        allowed.extend_navigation(&mut nav, ctx(42)).await.unwrap();
        let course = nav.find("42", NodeKind::Course).unwrap();
        assert_eq!(course.child_keys(), vec!["obf_courseuserbadges"]);
        assert_eq!(
            course.children[0].url.as_deref(),
            Some("/local/obf/courseuserbadges.php?courseid=42")
        );
    }

    #[tokio::test]
    async fn test_site_course_is_skipped() {
        let extender = NavigationExtender::new(Arc::new(
            HostSnapshot::new().with_capability(3, 1, Capability::SeeParticipantBadges),
        ));
        let mut nav = navigation(1);
        extender.extend_navigation(&mut nav, ctx(1)).await.unwrap();
        assert!(nav.find("1", NodeKind::Course).unwrap().children.is_empty());
    }

    #[tokio::test]
    async fn test_course_admin_link_inserted_before_backup() {
        let extender = NavigationExtender::new(Arc::new(
            HostSnapshot::new().with_capability(3, 42, Capability::IssueBadge),
        ));
        let mut settings = settings();
        extender
            .extend_settings_navigation(&mut settings, ctx(42))
            .await
            .unwrap();

        let admin = settings.get("courseadmin").unwrap();
        assert_eq!(admin.child_keys(), vec!["edit", "obf", "backup", "restore"]);

        let user = settings.get("usercurrentsettings").unwrap();
        assert_eq!(user.child_keys(), vec!["obf_backpacksettings"]);
    }

    #[tokio::test]
    async fn test_backpack_link_without_capabilities() {
        let extender = NavigationExtender::new(Arc::new(HostSnapshot::new()));
        let mut settings = settings();
        extender
            .extend_settings_navigation(&mut settings, ctx(42))
            .await
            .unwrap();

        assert!(!settings.get("courseadmin").unwrap().child_keys().contains(&"obf"));
        assert_eq!(
            settings.get("usercurrentsettings").unwrap().child_keys(),
            vec!["obf_backpacksettings"]
        );
    }

    #[test]
    fn test_add_node_appends_when_anchor_missing() {
        let mut branch = NavNode::new("b", NodeKind::Container, "B");
        branch.add_node(NavNode::link("x", "X", "/x"), Some("missing"));
        assert_eq!(branch.child_keys(), vec!["x"]);
    }

    #[tokio::test]
    async fn test_legacy_entry_point_handles_both_trees() {
        let extender = NavigationExtender::new(Arc::new(
            HostSnapshot::new()
                .with_capability(3, 42, Capability::SeeParticipantBadges)
                .with_capability(3, 42, Capability::IssueBadge),
        ));
        let mut nav = navigation(42);
        let mut settings = settings();
        extender
            .extend_legacy_navigation(&mut nav, Some(&mut settings), ctx(42))
            .await
            .unwrap();

        assert_eq!(nav.find("42", NodeKind::Course).unwrap().children.len(), 1);
        assert!(settings.get("courseadmin").unwrap().child_keys().contains(&"obf"));
    }
}
