//! 导入 feed - 实时导入状态推送
//!
//! - `frame`: 入站帧解析
//! - `transport`: 传输抽象与 WebSocket 实现
//! - `channel`: 连接生命周期与断线重连

pub mod channel;
pub mod frame;
pub mod transport;

pub use channel::{ChannelState, FeedChannel, FeedConfig};
pub use frame::{parse_frame, FeedPayload};
pub use transport::{FeedEvent, FeedStream, FeedTransport, WebSocketTransport};
