//! 通知引擎 - 组合根持有的唯一实例，克隆即共享句柄
//!
//! 生产者调用 `success/info/warning/error/show` → 延迟调度器 → 展示队列；
//! 持久化通知经 `queue_persistent` / `flush_persistent` 跨页面重放；
//! 导入 feed 独立推送到同一调度入口。消费方通过 `notifications()` /
//! `unread_count()` 订阅。

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

use crate::config::EngineConfig;
use crate::feed::{ChannelState, FeedChannel, FeedTransport, WebSocketTransport};
use crate::notification::ack::{HttpReadAck, ReadAck, StaticTokenProvider};
use crate::notification::display::DisplayQueue;
use crate::notification::id::IdGenerator;
use crate::notification::item::{NotificationItem, NotificationOptions, QueueItem, StoredNotification};
use crate::notification::kind::NotificationKind;
use crate::notification::persist::PersistentQueue;
use crate::notification::scheduler::DispatchScheduler;
use crate::notification::store::{MemorySessionStore, SessionStore};

/// 运行环境能力
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// 是否有会话级持久存储
    pub durable_storage: bool,
    /// 是否可以建立实时连接
    pub live_transport: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            durable_storage: true,
            live_transport: true,
        }
    }
}

impl Capabilities {
    /// 非交互环境（无存储、无实时连接）
    pub fn none() -> Self {
        Self {
            durable_storage: false,
            live_transport: false,
        }
    }
}

/// 引擎构建器
pub struct EngineBuilder {
    config: EngineConfig,
    capabilities: Capabilities,
    session_store: Option<Arc<dyn SessionStore>>,
    ack: Option<Arc<dyn ReadAck>>,
    transport: Option<Arc<dyn FeedTransport>>,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            capabilities: Capabilities::default(),
            session_store: None,
            ack: None,
            transport: None,
        }
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// 设置会话存储（默认内存存储）
    pub fn session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.session_store = Some(store);
        self
    }

    /// 设置回执发送器（默认 HTTP）
    pub fn read_ack(mut self, ack: Arc<dyn ReadAck>) -> Self {
        self.ack = Some(ack);
        self
    }

    /// 设置 feed 传输（默认 WebSocket）
    pub fn transport(mut self, transport: Arc<dyn FeedTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> Result<NotificationEngine> {
        let config = self.config;

        let ack: Arc<dyn ReadAck> = match self.ack {
            Some(ack) => ack,
            None => {
                let token = Arc::new(StaticTokenProvider::new(config.auth_token.clone()));
                Arc::new(HttpReadAck::new(config.ack_config())?.with_token_provider(token))
            }
        };
        let transport: Arc<dyn FeedTransport> = self
            .transport
            .unwrap_or_else(|| Arc::new(WebSocketTransport::new()));
        let store: Option<Arc<dyn SessionStore>> = if self.capabilities.durable_storage {
            Some(
                self.session_store
                    .unwrap_or_else(|| Arc::new(MemorySessionStore::new())),
            )
        } else {
            None
        };

        let display = DisplayQueue::new(config.history_limit, ack);
        let scheduler = DispatchScheduler::new(display.clone(), IdGenerator::new());
        let persist = PersistentQueue::new(store, scheduler.clone())
            .with_key(config.storage_key.clone())
            .with_stagger(config.flush_base_delay_ms, config.flush_stagger_ms);
        let feed = FeedChannel::new(
            config.feed_config(),
            transport,
            scheduler.clone(),
            self.capabilities.live_transport,
        );

        info!(
            durable_storage = self.capabilities.durable_storage,
            live_transport = self.capabilities.live_transport,
            "Notification engine ready"
        );

        Ok(NotificationEngine {
            config: Arc::new(config),
            display,
            scheduler,
            persist,
            feed,
        })
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// 通知引擎
#[derive(Clone)]
pub struct NotificationEngine {
    config: Arc<EngineConfig>,
    display: DisplayQueue,
    scheduler: DispatchScheduler,
    persist: PersistentQueue,
    feed: FeedChannel,
}

impl NotificationEngine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn success(&self, message: impl Into<String>, options: Option<NotificationOptions>) {
        self.enqueue(NotificationKind::Success, message, options, None, None);
    }

    pub fn info(&self, message: impl Into<String>, options: Option<NotificationOptions>) {
        self.enqueue(NotificationKind::Info, message, options, None, None);
    }

    pub fn warning(&self, message: impl Into<String>, options: Option<NotificationOptions>) {
        self.enqueue(NotificationKind::Warning, message, options, None, None);
    }

    pub fn error(&self, message: impl Into<String>, options: Option<NotificationOptions>) {
        self.enqueue(NotificationKind::Error, message, options, None, None);
    }

    /// kind 缺省为 info
    pub fn show(
        &self,
        message: impl Into<String>,
        kind: Option<NotificationKind>,
        options: Option<NotificationOptions>,
    ) {
        self.enqueue(kind.unwrap_or_default(), message, options, None, None);
    }

    /// 提交到延迟调度器
    pub fn enqueue(
        &self,
        kind: NotificationKind,
        message: impl Into<String>,
        options: Option<NotificationOptions>,
        id: Option<String>,
        remote_id: Option<String>,
    ) {
        let item = QueueItem::new(kind, message)
            .with_options(options)
            .with_ids(id, remote_id);
        self.scheduler.enqueue(item);
    }

    pub fn mark_as_read(&self, id: &str) {
        self.display.mark_as_read(id);
    }

    pub fn mark_all_read(&self) {
        self.display.mark_all_read();
    }

    pub fn remove(&self, id: &str) {
        self.display.remove(id);
    }

    pub fn clear(&self) {
        self.display.clear();
    }

    pub fn queue_persistent(
        &self,
        kind: NotificationKind,
        message: impl Into<String>,
        options: Option<NotificationOptions>,
    ) {
        self.persist.queue_persistent(kind, message.into(), options);
    }

    pub fn flush_persistent(&self) {
        self.persist.flush_persistent();
    }

    /// 当前已持久化、尚未 flush 的条目
    pub fn stored_notifications(&self) -> Vec<StoredNotification> {
        self.persist.read_stored()
    }

    pub fn activate_import_feed(&self) {
        self.feed.activate();
    }

    pub fn deactivate_import_feed(&self) {
        self.feed.deactivate();
    }

    pub fn feed_state(&self) -> ChannelState {
        self.feed.state()
    }

    pub fn feed(&self) -> &FeedChannel {
        &self.feed
    }

    /// 通知列表流
    pub fn notifications(&self) -> watch::Receiver<Vec<NotificationItem>> {
        self.display.subscribe()
    }

    /// 未读数流
    pub fn unread_count(&self) -> watch::Receiver<usize> {
        self.display.unread_count()
    }

    pub fn snapshot(&self) -> Vec<NotificationItem> {
        self.display.snapshot()
    }

    /// 未触发的延迟定时器数量
    pub fn pending_timers(&self) -> usize {
        self.scheduler.pending_timers()
    }

    /// 拆除 feed 连接并取消所有定时器；可重复调用
    pub fn shutdown(&self) {
        self.feed.shutdown();
        self.scheduler.shutdown();
    }
}
