//! 导入 feed 通道管理 - 单连接、断线自动重连
//!
//! 状态流转：
//! `Inactive → Connecting → Open → Closed → ReconnectScheduled → Connecting → …`
//! 只有显式 `deactivate()` / `shutdown()` 才回到 `Inactive`。
//!
//! 每次建立连接递增 generation，已拆除连接的迟到事件按 generation 丢弃。

use futures_util::StreamExt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tracing::{debug, error, info, warn};

use super::frame::parse_frame;
use super::transport::{FeedEvent, FeedTransport};
use crate::notification::item::{NotificationOptions, QueueItem};
use crate::notification::kind::NotificationKind;
use crate::notification::lock::lock;
use crate::notification::scheduler::DispatchScheduler;

/// 通道状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Inactive,
    Connecting,
    Open,
    Closed,
    ReconnectScheduled,
}

/// Feed 配置
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// 已按页面协议解析好的 feed 地址
    pub url: String,
    /// 断线重连间隔
    pub reconnect_delay: Duration,
    /// 连接后第一条消息的展示延迟（毫秒）
    pub first_frame_delay_ms: i64,
    /// 后续消息的展示延迟（毫秒）
    pub frame_delay_ms: i64,
    /// 通知来源标记
    pub source: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:5144/ws/import".to_string(),
            reconnect_delay: Duration::from_millis(5000),
            first_frame_delay_ms: 700,
            frame_delay_ms: 150,
            source: "import".to_string(),
        }
    }
}

/// 导入 feed 通道
#[derive(Clone)]
pub struct FeedChannel {
    inner: Arc<FeedInner>,
}

struct FeedInner {
    config: FeedConfig,
    transport: Arc<dyn FeedTransport>,
    scheduler: DispatchScheduler,
    /// 当前环境是否支持实时传输
    enabled: bool,
    state: Mutex<FeedState>,
}

struct FeedState {
    active: bool,
    /// shutdown 之后不再接受激活
    closed: bool,
    first_message: bool,
    state: ChannelState,
    connection: Option<AbortHandle>,
    reconnect: Option<AbortHandle>,
    generation: u64,
    connect_attempts: u64,
}

impl FeedChannel {
    pub fn new(
        config: FeedConfig,
        transport: Arc<dyn FeedTransport>,
        scheduler: DispatchScheduler,
        enabled: bool,
    ) -> Self {
        Self {
            inner: Arc::new(FeedInner {
                config,
                transport,
                scheduler,
                enabled,
                state: Mutex::new(FeedState {
                    active: false,
                    closed: false,
                    first_message: true,
                    state: ChannelState::Inactive,
                    connection: None,
                    reconnect: None,
                    generation: 0,
                    connect_attempts: 0,
                }),
            }),
        }
    }

    pub fn state(&self) -> ChannelState {
        lock(&self.inner.state).state
    }

    pub fn is_active(&self) -> bool {
        lock(&self.inner.state).active
    }

    /// 累计连接尝试次数
    pub fn connect_attempts(&self) -> u64 {
        lock(&self.inner.state).connect_attempts
    }

    /// 是否有待触发的重连定时器
    pub fn reconnect_pending(&self) -> bool {
        lock(&self.inner.state).reconnect.is_some()
    }

    pub fn url(&self) -> &str {
        &self.inner.config.url
    }

    /// 激活 feed；已激活时为空操作
    pub fn activate(&self) {
        if !self.inner.enabled {
            debug!("Live transport unavailable, import feed not activated");
            return;
        }

        {
            let mut st = lock(&self.inner.state);
            if st.closed {
                debug!("Import feed shut down, activation ignored");
                return;
            }
            if st.active {
                return;
            }
            st.active = true;
            st.first_message = true;
        }

        info!(url = %self.inner.config.url, "Import feed activated");
        self.connect();
    }

    /// 停用 feed；未激活时为空操作
    pub fn deactivate(&self) {
        let mut st = lock(&self.inner.state);
        if !st.active {
            return;
        }
        st.active = false;
        Self::teardown(&mut st);
        info!("Import feed deactivated");
    }

    /// 进程退出时拆除连接和定时器，之后的 `activate()` 为空操作；可重复调用
    pub fn shutdown(&self) {
        let mut st = lock(&self.inner.state);
        st.closed = true;
        st.active = false;
        Self::teardown(&mut st);
    }

    fn teardown(st: &mut FeedState) {
        if let Some(reconnect) = st.reconnect.take() {
            reconnect.abort();
        }
        if let Some(connection) = st.connection.take() {
            // 中止任务即丢弃连接流，底层 socket 随之关闭
            connection.abort();
        }
        st.generation += 1;
        st.state = ChannelState::Inactive;
    }

    fn connect(&self) {
        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!("No async runtime, import feed not connected");
                return;
            }
        };

        let mut st = lock(&self.inner.state);
        if st.closed || !st.active {
            return;
        }
        if st.connection.is_some() && matches!(st.state, ChannelState::Open | ChannelState::Connecting) {
            return;
        }

        st.connection = None;
        st.generation += 1;
        st.connect_attempts += 1;
        st.state = ChannelState::Connecting;
        let generation = st.generation;

        let url = self.inner.config.url.clone();
        if !(url.starts_with("ws://") || url.starts_with("wss://")) {
            error!(url = %url, "Unable to open notification channel: invalid feed address");
            st.state = ChannelState::Closed;
            self.schedule_reconnect(&mut st, &handle);
            return;
        }

        debug!(url = %url, attempt = st.connect_attempts, "Connecting import feed");
        let channel = self.clone();
        let task = handle.spawn(async move {
            channel.run_connection(generation, url).await;
        });
        st.connection = Some(task.abort_handle());
    }

    async fn run_connection(&self, generation: u64, url: String) {
        let mut stream = match self.inner.transport.open(&url).await {
            Ok(stream) => stream,
            Err(e) => {
                error!(url = %url, error = %e, "Unable to open notification channel");
                self.on_closed(generation);
                return;
            }
        };

        if !self.on_open(generation) {
            return;
        }

        while let Some(event) = stream.next().await {
            match event {
                FeedEvent::Frame(text) => self.on_frame(generation, &text),
                FeedEvent::Error(e) => {
                    // 传输错误：强制关闭，由关闭处理触发重连
                    error!(error = %e, "Notification channel error");
                    break;
                }
            }
        }

        drop(stream);
        self.on_closed(generation);
    }

    fn on_open(&self, generation: u64) -> bool {
        let mut st = lock(&self.inner.state);
        if st.generation != generation || !st.active {
            return false;
        }
        st.state = ChannelState::Open;
        st.first_message = true;
        info!(url = %self.inner.config.url, "Import feed connected");
        true
    }

    fn on_frame(&self, generation: u64, text: &str) {
        let Some(payload) = parse_frame(text) else {
            debug!(len = text.len(), "Discarding unrecognized feed frame");
            return;
        };

        let delay = {
            let mut st = lock(&self.inner.state);
            if st.generation != generation {
                return;
            }
            let delay = if st.first_message {
                self.inner.config.first_frame_delay_ms
            } else {
                self.inner.config.frame_delay_ms
            };
            st.first_message = false;
            delay
        };

        let options = NotificationOptions::new()
            .with_delay(delay)
            .with_source(self.inner.config.source.clone());
        let item = QueueItem::new(NotificationKind::Info, payload.message)
            .with_options(Some(options))
            .with_ids(payload.notification_id.clone(), payload.notification_id);
        self.inner.scheduler.enqueue(item);
    }

    fn on_closed(&self, generation: u64) {
        let mut st = lock(&self.inner.state);
        if st.generation != generation {
            return;
        }
        st.connection = None;
        st.state = ChannelState::Closed;

        if st.active {
            warn!(
                delay_ms = self.inner.config.reconnect_delay.as_millis() as u64,
                "Import feed closed, scheduling reconnect"
            );
            if let Ok(handle) = Handle::try_current() {
                self.schedule_reconnect(&mut st, &handle);
            }
        }
    }

    /// 同一时间最多一个重连定时器
    fn schedule_reconnect(&self, st: &mut FeedState, handle: &Handle) {
        if st.closed || !st.active || st.reconnect.is_some() {
            return;
        }

        st.state = ChannelState::ReconnectScheduled;
        let delay = self.inner.config.reconnect_delay;
        let channel = self.clone();
        let task = handle.spawn(async move {
            tokio::time::sleep(delay).await;
            channel.clear_reconnect();
            channel.connect();
        });
        st.reconnect = Some(task.abort_handle());
    }

    fn clear_reconnect(&self) {
        lock(&self.inner.state).reconnect = None;
    }
}
