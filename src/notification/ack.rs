//! 已读回执模块
//!
//! 远端通知被标记为已读时，通知服务端 `POST {base_url}/{remoteId}/read`。
//! 回执是尽力而为的：不等待结果、不重试，失败只记录日志。

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// 认证 token 来源
pub trait TokenProvider: Send + Sync {
    fn get_token(&self) -> Option<String>;
}

/// 固定 token（来自配置）
#[derive(Debug, Clone, Default)]
pub struct StaticTokenProvider {
    token: Option<String>,
}

impl StaticTokenProvider {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token.filter(|t| !t.trim().is_empty()),
        }
    }
}

impl TokenProvider for StaticTokenProvider {
    fn get_token(&self) -> Option<String> {
        self.token.clone()
    }
}

/// 已读回执发送 trait
pub trait ReadAck: Send + Sync {
    /// 发送回执（spawn 后立即返回）
    fn send_read_ack(&self, remote_id: &str);
}

/// 回执客户端配置
#[derive(Debug, Clone)]
pub struct AckConfig {
    /// 通知 API 基础路径 (如 http://localhost:5144/api/notifications)
    pub base_url: String,
    /// 超时时间 (秒)
    pub timeout_secs: u64,
}

impl Default for AckConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5144/api/notifications".to_string(),
            timeout_secs: 30,
        }
    }
}

/// HTTP 回执发送器
#[derive(Clone)]
pub struct HttpReadAck {
    client: Client,
    config: AckConfig,
    token_provider: Option<Arc<dyn TokenProvider>>,
}

impl HttpReadAck {
    /// 创建新的回执发送器
    pub fn new(config: AckConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            config,
            token_provider: None,
        })
    }

    /// 设置 token 来源
    pub fn with_token_provider(mut self, provider: Arc<dyn TokenProvider>) -> Self {
        self.token_provider = Some(provider);
        self
    }

    /// 回执地址
    pub fn read_url(&self, remote_id: &str) -> String {
        format!("{}/{}/read", self.config.base_url.trim_end_matches('/'), remote_id)
    }

    /// 发送回执并等待结果，不读取响应体
    pub async fn post_read(&self, remote_id: &str) -> Result<()> {
        if remote_id.is_empty() {
            return Err(anyhow!("remote id is empty"));
        }

        let mut request = self.client.post(self.read_url(remote_id)).json(&serde_json::json!({}));
        if let Some(token) = self.token_provider.as_ref().and_then(|p| p.get_token()) {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let response = request.send().await.context("HTTP request failed")?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("server responded with {}", status));
        }

        debug!(remote_id = %remote_id, "Read acknowledgement delivered");
        Ok(())
    }
}

impl ReadAck for HttpReadAck {
    fn send_read_ack(&self, remote_id: &str) {
        if remote_id.is_empty() {
            return;
        }

        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!(remote_id = %remote_id, "No async runtime, read acknowledgement skipped");
                return;
            }
        };

        let sender = self.clone();
        let remote_id = remote_id.to_string();
        handle.spawn(async move {
            if let Err(e) = sender.post_read(&remote_id).await {
                warn!(remote_id = %remote_id, error = %e, "Failed to update notification read status");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ack_config_default() {
        let config = AckConfig::default();
        assert_eq!(config.base_url, "http://localhost:5144/api/notifications");
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn test_read_url_trims_trailing_slash() {
        let ack = HttpReadAck::new(AckConfig {
            base_url: "http://example.test/api/notifications/".to_string(),
            timeout_secs: 5,
        })
        .unwrap();
        assert_eq!(ack.read_url("abc"), "http://example.test/api/notifications/abc/read");
    }

    #[test]
    fn test_static_token_provider_ignores_blank() {
        assert_eq!(StaticTokenProvider::new(Some("  ".to_string())).get_token(), None);
        assert_eq!(
            StaticTokenProvider::new(Some("t0k".to_string())).get_token(),
            Some("t0k".to_string())
        );
    }

    #[test]
    fn test_send_without_runtime_does_not_panic() {
        let ack = HttpReadAck::new(AckConfig::default()).unwrap();
        ack.send_read_ack("abc");
        ack.send_read_ack("");
    }

    #[tokio::test]
    async fn test_post_read_rejects_empty_id() {
        let ack = HttpReadAck::new(AckConfig::default()).unwrap();
        assert!(ack.post_read("").await.is_err());
    }
}
