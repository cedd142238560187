//! Feed 传输层
//!
//! `FeedTransport::open` 建立连接并返回事件流，流结束即连接关闭，
//! 丢弃流即关闭连接。客户端不发送任何出站帧。

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use tokio_tungstenite::tungstenite::Message;
use tracing::debug;

/// 连接上的事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    /// UTF-8 文本帧
    Frame(String),
    /// 传输错误，调用方应关闭连接
    Error(String),
}

/// 事件流
pub type FeedStream = BoxStream<'static, FeedEvent>;

/// Feed 传输 trait
#[async_trait]
pub trait FeedTransport: Send + Sync {
    /// 打开到 url 的连接
    async fn open(&self, url: &str) -> Result<FeedStream>;
}

/// WebSocket 传输（tokio-tungstenite）
#[derive(Debug, Clone, Default)]
pub struct WebSocketTransport;

impl WebSocketTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FeedTransport for WebSocketTransport {
    async fn open(&self, url: &str) -> Result<FeedStream> {
        let (socket, response) = tokio_tungstenite::connect_async(url)
            .await
            .with_context(|| format!("Failed to connect to {}", url))?;
        debug!(url = %url, status = %response.status(), "Feed socket connected");

        let events = socket
            .take_while(|message| {
                let open = !matches!(message, Ok(Message::Close(_)));
                async move { open }
            })
            .filter_map(|message| async move {
                match message {
                    Ok(Message::Text(text)) => Some(FeedEvent::Frame(text)),
                    Ok(Message::Binary(bytes)) => {
                        Some(FeedEvent::Frame(String::from_utf8_lossy(&bytes).into_owned()))
                    }
                    Ok(_) => None,
                    Err(e) => Some(FeedEvent::Error(e.to_string())),
                }
            });

        Ok(events.boxed())
    }
}
