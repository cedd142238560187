//! Notify Center CLI
//!
//! 订阅导入 feed、管理会话中的持久化通知、手动发送已读回执

use anyhow::Result;
use clap::{Parser, Subcommand};
use notify_center::notification::ack::{HttpReadAck, StaticTokenProvider};
use notify_center::{
    EngineConfig, FileSessionStore, NotificationEngine, NotificationItem, NotificationKind,
    NotificationOptions,
};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "ncenter")]
#[command(about = "Notify Center - 通知排队、持久化与导入 feed")]
#[command(version)]
struct Cli {
    /// 配置文件路径 (默认: ~/.config/notify-center/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 订阅导入 feed 并实时输出通知（Ctrl+C 退出）
    Tail {
        /// 使用安全连接 (wss)
        #[arg(long)]
        secure: bool,
    },
    /// 写入持久化通知，下次 flush 时展示
    Queue {
        /// 类型: success | info | warning | error
        #[arg(long, short, default_value = "info")]
        kind: String,
        /// 消息内容
        #[arg(long, short)]
        message: String,
        /// 展示延迟（毫秒）
        #[arg(long)]
        delay: Option<i64>,
        /// 来源标记
        #[arg(long)]
        source: Option<String>,
    },
    /// 展示并清空持久化通知
    Flush,
    /// 发送已读回执
    Ack {
        /// 服务端通知 ID
        remote_id: String,
    },
    /// 列出尚未 flush 的持久化通知
    ListStored {
        /// 输出 JSON 格式
        #[arg(long)]
        json: bool,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::load(path),
        None => EngineConfig::load_default(),
    }
}

fn build_engine(config: EngineConfig) -> Result<NotificationEngine> {
    let store = Arc::new(FileSessionStore::new(FileSessionStore::default_dir()));
    NotificationEngine::builder()
        .config(config)
        .session_store(store)
        .build()
}

fn print_notification(item: &NotificationItem) {
    let source = item.source.as_deref().unwrap_or("-");
    println!(
        "[{}] {:<7} {} (source: {}, id: {})",
        item.timestamp.format("%H:%M:%S"),
        item.kind,
        item.message,
        source,
        item.id
    );
}

fn print_key(item: &NotificationItem) -> (String, i64) {
    (item.id.clone(), item.timestamp.timestamp_nanos_opt().unwrap_or_default())
}

/// 返回尚未输出过的通知；已移出快照的记录随之清理
fn unseen<'a>(
    printed: &mut HashSet<(String, i64)>,
    snapshot: &'a [NotificationItem],
) -> Vec<&'a NotificationItem> {
    let current: HashSet<(String, i64)> = snapshot.iter().map(print_key).collect();
    printed.retain(|key| current.contains(key));
    snapshot
        .iter()
        .filter(|item| printed.insert(print_key(item)))
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    // 通过 RUST_LOG 环境变量控制日志级别，默认为 info
    // 例如: RUST_LOG=debug ncenter tail
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("notify_center=info,ncenter=info"));

    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Tail { secure } => {
            if secure {
                config.page_scheme = "https".to_string();
            }
            let engine = build_engine(config)?;
            let mut notifications = engine.notifications();
            engine.activate_import_feed();
            info!(url = %engine.feed().url(), "Tailing import feed, Ctrl+C to stop");

            let mut printed: HashSet<(String, i64)> = HashSet::new();
            loop {
                tokio::select! {
                    changed = notifications.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let snapshot = notifications.borrow_and_update().clone();
                        for item in unseen(&mut printed, &snapshot) {
                            print_notification(item);
                        }
                    }
                    _ = tokio::signal::ctrl_c() => {
                        break;
                    }
                }
            }

            engine.deactivate_import_feed();
            engine.shutdown();
        }
        Commands::Queue {
            kind,
            message,
            delay,
            source,
        } => {
            let kind: NotificationKind = kind.parse()?;
            let mut options = NotificationOptions::new();
            options.delay = delay;
            options.source = source;

            let engine = build_engine(config)?;
            engine.queue_persistent(kind, message, Some(options));
            println!("已写入持久化通知，当前共 {} 条待展示", engine.stored_notifications().len());
            engine.shutdown();
        }
        Commands::Flush => {
            let engine = build_engine(config)?;
            let count = engine.stored_notifications().len();
            if count == 0 {
                println!("没有待展示的持久化通知");
                return Ok(());
            }

            engine.flush_persistent();
            while engine.pending_timers() > 0 {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }

            for item in engine.snapshot() {
                print_notification(&item);
            }
            engine.shutdown();
        }
        Commands::Ack { remote_id } => {
            let token = Arc::new(StaticTokenProvider::new(config.auth_token.clone()));
            let ack = HttpReadAck::new(config.ack_config())?.with_token_provider(token);
            match ack.post_read(&remote_id).await {
                Ok(()) => println!("✅ 已发送已读回执: {}", remote_id),
                Err(e) => {
                    error!(remote_id = %remote_id, error = %e, "Failed to send read acknowledgement");
                    eprintln!("❌ 回执发送失败: {}", e);
                }
            }
        }
        Commands::ListStored { json } => {
            let engine = build_engine(config)?;
            let stored = engine.stored_notifications();
            if json {
                println!("{}", serde_json::to_string_pretty(&stored)?);
            } else {
                println!("发现 {} 条持久化通知:\n", stored.len());
                for entry in stored {
                    let delay = entry.options.as_ref().and_then(|o| o.delay);
                    println!("  类型: {} | 消息: {} | 延迟: {:?}", entry.kind, entry.message, delay);
                }
            }
            engine.shutdown();
        }
    }

    Ok(())
}
