//! Notification kind classification
//!
//! 四种展示级别，与前端 toast 样式一一对应：
//! - success: 操作成功
//! - info: 普通提示（导入进度 feed 默认使用）
//! - warning: 需要注意
//! - error: 操作失败

use anyhow::{anyhow, Error};
use std::str::FromStr;

/// Notification kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    #[default]
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Success => "success",
            NotificationKind::Info => "info",
            NotificationKind::Warning => "warning",
            NotificationKind::Error => "error",
        }
    }
}

impl FromStr for NotificationKind {
    type Err = Error;

    /// 大小写不敏感，未知类型返回错误
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "success" => Ok(NotificationKind::Success),
            "info" => Ok(NotificationKind::Info),
            "warning" => Ok(NotificationKind::Warning),
            "error" => Ok(NotificationKind::Error),
            other => Err(anyhow!("unknown notification kind: {}", other)),
        }
    }
}
