//! 徽章与通知邮件定义

use serde::{Deserialize, Serialize};

/// 徽章
///
/// 徽章定义托管在 Open Badge Factory，本地仅保存发放时使用的邮件配置。
/// 多个发放条件可以指向同一个徽章。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
    /// OBF 侧的徽章 ID
    pub id: String,
    pub name: String,
    /// 自定义发放邮件，为空时使用默认模板
    #[serde(default)]
    pub email: Option<EmailTemplate>,
}

impl Badge {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: None,
        }
    }

    pub fn with_email(mut self, email: EmailTemplate) -> Self {
        self.email = Some(email);
        self
    }

    /// 发放时实际使用的邮件内容
    pub fn effective_email(&self) -> EmailTemplate {
        self.email.clone().unwrap_or_default()
    }
}

/// 徽章发放邮件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailTemplate {
    pub subject: String,
    pub body: String,
    pub footer: String,
}

impl EmailTemplate {
    pub fn new(
        subject: impl Into<String>,
        body: impl Into<String>,
        footer: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
            footer: footer.into(),
        }
    }
}

impl Default for EmailTemplate {
    fn default() -> Self {
        Self {
            subject: "You have earned a badge".to_string(),
            body: "Congratulations! You have been awarded a badge. \
                   You can save it to your backpack using the link below."
                .to_string(),
            footer: String::new(),
        }
    }
}
