//! 延迟调度器 - 按延迟把待展示通知放入展示队列
//!
//! - delay <= 0：立即进入待处理列表并同步排空
//! - delay > 0：启动一次性定时器，触发后进入待处理列表并排空
//!
//! 排空按提交顺序进行；延迟只决定何时进入待处理列表，不影响之后的顺序。
//! 定时器按 (到期时间, 序号) 登记，任一定时器触发时释放所有已到期条目，
//! 同一时刻到期的条目保持提交顺序。`shutdown()` 时统一取消。

use chrono::Utc;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::debug;

use super::display::DisplayQueue;
use super::id::IdGenerator;
use super::item::QueueItem;
use super::lock::lock;

/// 单条通知的最长延迟（一年），超出部分截断
pub const MAX_DISPATCH_DELAY_MS: u64 = 365 * 24 * 60 * 60 * 1000;

/// 延迟调度器
#[derive(Clone)]
pub struct DispatchScheduler {
    inner: Arc<SchedulerInner>,
}

struct SchedulerInner {
    display: DisplayQueue,
    ids: IdGenerator,
    /// 待排空的通知
    pending: Mutex<VecDeque<QueueItem>>,
    /// 未触发的定时器: (deadline, timer_id) -> (item, abort handle)
    timers: Mutex<BTreeMap<(Instant, u64), (QueueItem, AbortHandle)>>,
    next_timer_id: AtomicU64,
    closed: AtomicBool,
}

impl DispatchScheduler {
    pub fn new(display: DisplayQueue, ids: IdGenerator) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                display,
                ids,
                pending: Mutex::new(VecDeque::new()),
                timers: Mutex::new(BTreeMap::new()),
                next_timer_id: AtomicU64::new(1),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// 提交通知
    pub fn enqueue(&self, item: QueueItem) {
        if self.inner.closed.load(Ordering::SeqCst) {
            debug!(kind = %item.kind, "Scheduler closed, notification dropped");
            return;
        }

        let delay = item.effective_delay();
        if delay == 0 {
            self.push_and_drain(item);
            return;
        }

        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                // 无运行时（如一次性命令），直接展示
                debug!(delay_ms = delay, "No async runtime, dispatching immediately");
                self.push_and_drain(item);
                return;
            }
        };

        let timer_id = self.inner.next_timer_id.fetch_add(1, Ordering::SeqCst);
        let deadline = Instant::now() + Duration::from_millis(delay.min(MAX_DISPATCH_DELAY_MS));
        let scheduler = self.clone();

        // 持锁登记，保证定时器触发时一定能找到自己的条目
        let mut timers = lock(&self.inner.timers);
        let task = handle.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            scheduler.fire();
        });
        timers.insert((deadline, timer_id), (item, task.abort_handle()));
    }

    /// 未触发的定时器数量
    pub fn pending_timers(&self) -> usize {
        lock(&self.inner.timers).len()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// 取消所有定时器并拒绝后续提交；重复调用安全
    pub fn shutdown(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        let timers: Vec<AbortHandle> = std::mem::take(&mut *lock(&self.inner.timers))
            .into_values()
            .map(|(_, handle)| handle)
            .collect();
        if !timers.is_empty() {
            debug!(count = timers.len(), "Cancelling dispatch timers");
        }
        for timer in timers {
            timer.abort();
        }
        lock(&self.inner.pending).clear();
    }

    /// 定时器触发：取出所有已到期条目（可能已被其它定时器一并取走）
    fn fire(&self) {
        if self.is_closed() {
            return;
        }

        let due: Vec<QueueItem> = {
            let mut timers = lock(&self.inner.timers);
            let later = timers.split_off(&(Instant::now(), u64::MAX));
            std::mem::replace(&mut *timers, later)
                .into_values()
                .map(|(item, _)| item)
                .collect()
        };
        if due.is_empty() {
            return;
        }

        let mut pending = lock(&self.inner.pending);
        pending.extend(due);
        self.drain(&mut pending);
    }

    fn push_and_drain(&self, item: QueueItem) {
        let mut pending = lock(&self.inner.pending);
        pending.push_back(item);
        self.drain(&mut pending);
    }

    /// 排空：持有 pending 锁期间按 FIFO 逐条追加到展示队列
    fn drain(&self, pending: &mut VecDeque<QueueItem>) {
        while let Some(item) = pending.pop_front() {
            let ids = self.inner.ids;
            let notification = item.into_notification(|| ids.next_id(), Utc::now());
            self.inner.display.append(notification);
        }
    }
}
