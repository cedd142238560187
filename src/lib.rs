//! Notify Center - 前端通知引擎：延迟展示、跨页面持久化、导入 feed 断线重连

pub mod config;
pub mod engine;
pub mod feed;
pub mod notification;

pub use config::EngineConfig;
pub use engine::{Capabilities, EngineBuilder, NotificationEngine};
pub use feed::{ChannelState, FeedChannel, FeedEvent, FeedStream, FeedTransport, WebSocketTransport};
pub use notification::{
    FileSessionStore, HttpReadAck, MemorySessionStore, NotificationItem, NotificationKind,
    NotificationOptions, ReadAck, SessionStore, StoredNotification, TokenProvider,
};
