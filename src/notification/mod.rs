//! 通知核心 - 排队、延迟展示、跨页面持久化
//!
//! # 组成
//! 1. `display`: 展示队列（可订阅的通知列表 + 未读数）
//! 2. `scheduler`: 延迟调度器（定时器登记与统一取消）
//! 3. `persist` / `store`: 会话存储上的持久化队列
//! 4. `ack`: 远端通知已读回执
//!
//! # 使用示例
//! ```ignore
//! use notify_center::{NotificationEngine, NotificationOptions};
//!
//! let engine = NotificationEngine::builder().build()?;
//! engine.success("Saved", None);
//! engine.warning("Low disk", Some(NotificationOptions::new().with_delay(300)));
//! ```

pub mod ack;
pub mod display;
pub mod id;
pub mod item;
pub mod kind;
pub(crate) mod lock;
pub mod persist;
pub mod scheduler;
pub mod store;

pub use ack::{AckConfig, HttpReadAck, ReadAck, StaticTokenProvider, TokenProvider};
pub use display::{DisplayQueue, DEFAULT_HISTORY_LIMIT};
pub use id::IdGenerator;
pub use item::{NotificationItem, NotificationOptions, QueueItem, StoredNotification};
pub use kind::NotificationKind;
pub use persist::{parse_stored, PersistentQueue, PERSIST_STORAGE_KEY};
pub use scheduler::DispatchScheduler;
pub use store::{FileSessionStore, MemorySessionStore, SessionStore};
