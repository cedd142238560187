//! 持久化队列 - 跨页面跳转保留通知
//!
//! 跳转前 `queue_persistent` 写入会话存储，新页面加载后 `flush_persistent`
//! 一次性读出并清空，按 `base + i * stagger` 错开延迟重新提交。
//! 存储不可用或写入失败时降级为立即展示。

use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, error};

use super::item::{NotificationOptions, QueueItem, StoredNotification};
use super::kind::NotificationKind;
use super::scheduler::DispatchScheduler;
use super::store::SessionStore;

/// 默认存储 key
pub const PERSIST_STORAGE_KEY: &str = "app:persistent-notifications";
/// flush 默认基础延迟（毫秒）
pub const DEFAULT_FLUSH_BASE_DELAY_MS: i64 = 400;
/// flush 相邻条目间隔（毫秒）
pub const DEFAULT_FLUSH_STAGGER_MS: i64 = 180;

/// 持久化队列
#[derive(Clone)]
pub struct PersistentQueue {
    /// None 表示当前环境没有会话存储
    store: Option<Arc<dyn SessionStore>>,
    scheduler: DispatchScheduler,
    key: String,
    base_delay_ms: i64,
    stagger_ms: i64,
}

impl PersistentQueue {
    pub fn new(store: Option<Arc<dyn SessionStore>>, scheduler: DispatchScheduler) -> Self {
        Self {
            store,
            scheduler,
            key: PERSIST_STORAGE_KEY.to_string(),
            base_delay_ms: DEFAULT_FLUSH_BASE_DELAY_MS,
            stagger_ms: DEFAULT_FLUSH_STAGGER_MS,
        }
    }

    /// 设置存储 key
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// 设置 flush 错开参数
    pub fn with_stagger(mut self, base_delay_ms: i64, stagger_ms: i64) -> Self {
        self.base_delay_ms = base_delay_ms;
        self.stagger_ms = stagger_ms;
        self
    }

    pub fn has_storage(&self) -> bool {
        self.store.is_some()
    }

    /// 写入持久化队列；失败时立即展示
    pub fn queue_persistent(&self, kind: NotificationKind, message: String, options: Option<NotificationOptions>) {
        let Some(store) = self.store.as_ref() else {
            self.scheduler
                .enqueue(QueueItem::new(kind, message).with_options(options));
            return;
        };

        let mut stored = self.read_stored();
        stored.push(StoredNotification::new(kind, message.clone()).with_options(options.clone()));

        if let Err(e) = Self::write_stored(store.as_ref(), &self.key, &stored) {
            error!(error = %e, "Unable to persist notification");
            self.scheduler
                .enqueue(QueueItem::new(kind, message).with_options(options));
        }
    }

    /// 读出并清空持久化队列，错开延迟后重新提交
    pub fn flush_persistent(&self) {
        let Some(store) = self.store.as_ref() else {
            return;
        };

        let stored = self.read_stored();
        if stored.is_empty() {
            return;
        }

        // 清空失败时不展示，避免下次 flush 重复展示
        if let Err(e) = store.remove(&self.key) {
            error!(error = %e, "Unable to clear persisted notifications");
            return;
        }

        debug!(count = stored.len(), "Flushing persisted notifications");
        for (index, entry) in stored.into_iter().enumerate() {
            let mut options = entry.options.unwrap_or_default();
            let base = options.delay.unwrap_or(self.base_delay_ms);
            let offset = i64::try_from(index)
                .unwrap_or(i64::MAX)
                .saturating_mul(self.stagger_ms);
            options.delay = Some(base.saturating_add(offset));

            self.scheduler
                .enqueue(QueueItem::new(entry.kind, entry.message).with_options(Some(options)));
        }
    }

    /// 读取已持久化的条目；格式错误的条目直接丢弃
    pub fn read_stored(&self) -> Vec<StoredNotification> {
        let Some(store) = self.store.as_ref() else {
            return Vec::new();
        };

        let raw = match store.get(&self.key) {
            Ok(Some(raw)) if !raw.is_empty() => raw,
            Ok(_) => return Vec::new(),
            Err(e) => {
                error!(error = %e, "Unable to read persisted notifications");
                return Vec::new();
            }
        };

        parse_stored(&raw)
    }

    fn write_stored(store: &dyn SessionStore, key: &str, stored: &[StoredNotification]) -> Result<()> {
        let json = serde_json::to_string(stored)?;
        store.set(key, &json)
    }
}

/// 解析存储内容：非数组返回空列表，逐条校验
pub fn parse_stored(raw: &str) -> Vec<StoredNotification> {
    let value: serde_json::Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            debug!(error = %e, "Persisted notifications are not valid JSON, ignoring");
            return Vec::new();
        }
    };

    let serde_json::Value::Array(entries) = value else {
        debug!("Persisted notifications are not an array, ignoring");
        return Vec::new();
    };

    entries
        .into_iter()
        .filter_map(|entry| {
            let has_fields = entry.get("kind").map_or(false, |k| k.is_string())
                && entry.get("message").map_or(false, |m| m.is_string());
            if !has_fields {
                debug!(entry = %entry, "Dropping malformed persisted notification");
                return None;
            }
            match serde_json::from_value::<StoredNotification>(entry) {
                Ok(stored) => Some(stored),
                Err(e) => {
                    debug!(error = %e, "Dropping malformed persisted notification");
                    None
                }
            }
        })
        .collect()
}
