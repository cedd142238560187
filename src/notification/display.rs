//! 展示队列 - 当前可见通知列表及未读计数
//!
//! 基于 `tokio::sync::watch` 实现：单写者、保存最新快照，
//! 新订阅者立即看到当前值，之后接收每次更新。
//! 无变化的操作（如删除不存在的 ID）不会发布新快照。

use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

use super::ack::ReadAck;
use super::item::NotificationItem;

/// 默认历史上限
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// 展示队列
#[derive(Clone)]
pub struct DisplayQueue {
    inner: Arc<DisplayInner>,
}

struct DisplayInner {
    items: watch::Sender<Vec<NotificationItem>>,
    unread: watch::Sender<usize>,
    history_limit: usize,
    ack: Arc<dyn ReadAck>,
}

impl DisplayQueue {
    pub fn new(history_limit: usize, ack: Arc<dyn ReadAck>) -> Self {
        let (items, _) = watch::channel(Vec::new());
        let (unread, _) = watch::channel(0);
        Self {
            inner: Arc::new(DisplayInner {
                items,
                unread,
                history_limit: history_limit.max(1),
                ack,
            }),
        }
    }

    /// 订阅通知列表（立即可读当前快照）
    pub fn subscribe(&self) -> watch::Receiver<Vec<NotificationItem>> {
        self.inner.items.subscribe()
    }

    /// 订阅未读数
    pub fn unread_count(&self) -> watch::Receiver<usize> {
        self.inner.unread.subscribe()
    }

    /// 当前快照
    pub fn snapshot(&self) -> Vec<NotificationItem> {
        self.inner.items.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 追加到末尾，超出上限时丢弃最旧的
    pub fn append(&self, item: NotificationItem) {
        let limit = self.inner.history_limit;
        self.publish(|items| {
            items.push(item);
            if items.len() > limit {
                let overflow = items.len() - limit;
                items.drain(..overflow);
            }
            true
        });
    }

    /// 按 ID 删除；不存在时不发布
    pub fn remove(&self, id: &str) {
        self.publish(|items| {
            let before = items.len();
            items.retain(|item| item.id != id);
            items.len() != before
        });
    }

    /// 标记单条已读：远端未读通知先发送回执，然后从列表移除
    pub fn mark_as_read(&self, id: &str) {
        let target = self
            .inner
            .items
            .borrow()
            .iter()
            .find(|item| item.id == id)
            .map(|item| (item.read, item.remote_id.clone()));

        let Some((read, remote_id)) = target else {
            return;
        };

        if !read {
            if let Some(remote_id) = remote_id.filter(|r| !r.is_empty()) {
                self.inner.ack.send_read_ack(&remote_id);
            }
        }

        self.remove(id);
    }

    /// 全部已读：每个不同的 remote_id 发送一次回执，然后移除所有未读通知
    pub fn mark_all_read(&self) {
        let (unread_ids, remote_ids) = {
            let items = self.inner.items.borrow();
            let mut unread_ids = HashSet::new();
            let mut seen = HashSet::new();
            let mut remote_ids = Vec::new();
            for item in items.iter().filter(|item| !item.read) {
                unread_ids.insert(item.id.clone());
                if let Some(remote_id) = item.remote_id.as_ref().filter(|r| !r.is_empty()) {
                    if seen.insert(remote_id.clone()) {
                        remote_ids.push(remote_id.clone());
                    }
                }
            }
            (unread_ids, remote_ids)
        };

        if unread_ids.is_empty() {
            return;
        }

        debug!(unread = unread_ids.len(), acks = remote_ids.len(), "Marking all notifications read");
        for remote_id in &remote_ids {
            self.inner.ack.send_read_ack(remote_id);
        }

        self.publish(|items| {
            let before = items.len();
            items.retain(|item| !unread_ids.contains(&item.id));
            items.len() != before
        });
    }

    /// 清空（不发送回执）
    pub fn clear(&self) {
        self.publish(|items| {
            if items.is_empty() {
                return false;
            }
            items.clear();
            true
        });
    }

    /// 修改列表并发布；未读数在列表写锁内同步更新，
    /// 持有列表快照的读者看到的未读数总与之一致
    fn publish(&self, modify: impl FnOnce(&mut Vec<NotificationItem>) -> bool) {
        let unread = &self.inner.unread;
        self.inner.items.send_if_modified(|items| {
            if !modify(items) {
                return false;
            }
            let count = items.iter().filter(|item| !item.read).count();
            unread.send_if_modified(|current| {
                if *current == count {
                    return false;
                }
                *current = count;
                true
            });
            true
        });
    }
}
