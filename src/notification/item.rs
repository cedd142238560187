//! 通知数据模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::kind::NotificationKind;

/// 通知选项
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationOptions {
    /// 延迟展示（毫秒），<= 0 表示立即展示
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<i64>,
    /// 来源标记（如 "import"）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// 展示时直接标记为已读
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_read: Option<bool>,
}

impl NotificationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置延迟（毫秒）
    pub fn with_delay(mut self, delay_ms: i64) -> Self {
        self.delay = Some(delay_ms);
        self
    }

    /// 设置来源
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// 设置 autoRead
    pub fn with_auto_read(mut self, auto_read: bool) -> Self {
        self.auto_read = Some(auto_read);
        self
    }
}

/// 展示中的通知（消费方看到的结构）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationItem {
    /// 进程内唯一 ID；远端通知与 remote_id 相同
    pub id: String,
    pub message: String,
    pub kind: NotificationKind,
    /// 创建时间（ISO8601）
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub read: bool,
    /// 服务端通知 ID（用于已读回执）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
}

/// 待调度的通知（进入展示队列前的临时结构）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    pub kind: NotificationKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<NotificationOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
}

/// 持久化形式，字段与 `QueueItem` 相同
pub type StoredNotification = QueueItem;

impl QueueItem {
    pub fn new(kind: NotificationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            options: None,
            id: None,
            remote_id: None,
        }
    }

    pub fn with_options(mut self, options: Option<NotificationOptions>) -> Self {
        self.options = options;
        self
    }

    /// 预分配 ID（远端通知）
    pub fn with_ids(mut self, id: Option<String>, remote_id: Option<String>) -> Self {
        self.id = id;
        self.remote_id = remote_id;
        self
    }

    /// 实际延迟（毫秒），负数按 0 处理
    pub fn effective_delay(&self) -> u64 {
        self.options
            .as_ref()
            .and_then(|o| o.delay)
            .unwrap_or(0)
            .max(0) as u64
    }

    /// 转换为展示通知：id 优先取 remote_id，其次预分配 id，最后使用 fallback
    pub fn into_notification(self, fallback_id: impl FnOnce() -> String, now: DateTime<Utc>) -> NotificationItem {
        let id = self
            .remote_id
            .clone()
            .or(self.id)
            .unwrap_or_else(fallback_id);
        let (source, read) = match self.options {
            Some(options) => (options.source, options.auto_read.unwrap_or(false)),
            None => (None, false),
        };

        NotificationItem {
            id,
            message: self.message,
            kind: self.kind,
            timestamp: now,
            source,
            read,
            remote_id: self.remote_id,
        }
    }
}
