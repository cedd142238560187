//! 引擎配置
//!
//! 从 `~/.config/notify-center/config.json` 读取，缺失字段使用默认值：
//! ```json
//! {
//!   "pageScheme": "https",
//!   "ackBaseUrl": "https://api.example.com/api/notifications",
//!   "authToken": "..."
//! }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::feed::FeedConfig;
use crate::notification::ack::AckConfig;
use crate::notification::display::DEFAULT_HISTORY_LIMIT;
use crate::notification::persist::{DEFAULT_FLUSH_BASE_DELAY_MS, DEFAULT_FLUSH_STAGGER_MS, PERSIST_STORAGE_KEY};

/// 引擎配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// 展示队列历史上限
    pub history_limit: usize,
    /// 已读回执 API 基础路径
    pub ack_base_url: String,
    /// 回执请求超时（秒）
    pub ack_timeout_secs: u64,
    /// https 页面使用的 feed 地址
    pub feed_url_secure: String,
    /// http 页面使用的 feed 地址
    pub feed_url_insecure: String,
    /// 页面协议: "http" | "https"
    pub page_scheme: String,
    /// 断线重连间隔（毫秒）
    pub reconnect_delay_ms: u64,
    /// feed 首条消息延迟（毫秒）
    pub first_frame_delay_ms: i64,
    /// feed 后续消息延迟（毫秒）
    pub frame_delay_ms: i64,
    /// flush 基础延迟（毫秒）
    pub flush_base_delay_ms: i64,
    /// flush 相邻条目间隔（毫秒）
    pub flush_stagger_ms: i64,
    /// 会话存储 key
    pub storage_key: String,
    /// 回执请求的 Bearer token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            ack_base_url: "http://localhost:5144/api/notifications".to_string(),
            ack_timeout_secs: 30,
            feed_url_secure: "wss://localhost:7247/ws/import".to_string(),
            feed_url_insecure: "ws://localhost:5144/ws/import".to_string(),
            page_scheme: "http".to_string(),
            reconnect_delay_ms: 5000,
            first_frame_delay_ms: 700,
            frame_delay_ms: 150,
            flush_base_delay_ms: DEFAULT_FLUSH_BASE_DELAY_MS,
            flush_stagger_ms: DEFAULT_FLUSH_STAGGER_MS,
            storage_key: PERSIST_STORAGE_KEY.to_string(),
            auth_token: None,
        }
    }
}

impl EngineConfig {
    /// 默认配置文件路径
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("notify-center")
            .join("config.json")
    }

    /// 从指定文件加载
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: EngineConfig = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        Ok(config)
    }

    /// 加载默认配置文件，不存在时使用默认值
    pub fn load_default() -> Result<Self> {
        let path = Self::default_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(&path)
    }

    /// 按页面协议选择 feed 地址
    pub fn feed_url(&self) -> &str {
        if self.page_scheme.trim_end_matches(':').eq_ignore_ascii_case("https") {
            &self.feed_url_secure
        } else {
            &self.feed_url_insecure
        }
    }

    pub fn feed_config(&self) -> FeedConfig {
        FeedConfig {
            url: self.feed_url().to_string(),
            reconnect_delay: Duration::from_millis(self.reconnect_delay_ms),
            first_frame_delay_ms: self.first_frame_delay_ms,
            frame_delay_ms: self.frame_delay_ms,
            ..FeedConfig::default()
        }
    }

    pub fn ack_config(&self) -> AckConfig {
        AckConfig {
            base_url: self.ack_base_url.clone(),
            timeout_secs: self.ack_timeout_secs,
        }
    }
}
