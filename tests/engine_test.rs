//! 通知引擎集成测试：调度顺序、历史上限、已读回执、持久化往返

use notify_center::{
    Capabilities, FileSessionStore, MemorySessionStore, NotificationEngine, NotificationKind,
    NotificationOptions, ReadAck, SessionStore,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// 记录回执调用
#[derive(Default)]
struct RecordingAck {
    sent: Mutex<Vec<String>>,
}

impl RecordingAck {
    fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

impl ReadAck for RecordingAck {
    fn send_read_ack(&self, remote_id: &str) {
        self.sent.lock().unwrap().push(remote_id.to_string());
    }
}

fn engine_with(store: Arc<dyn SessionStore>) -> (NotificationEngine, Arc<RecordingAck>) {
    let ack = Arc::new(RecordingAck::default());
    let engine = NotificationEngine::builder()
        .session_store(store)
        .read_ack(ack.clone())
        .build()
        .unwrap();
    (engine, ack)
}

fn engine() -> (NotificationEngine, Arc<RecordingAck>) {
    engine_with(Arc::new(MemorySessionStore::new()))
}

fn messages(engine: &NotificationEngine) -> Vec<String> {
    engine.snapshot().into_iter().map(|n| n.message).collect()
}

fn delay(ms: i64) -> Option<NotificationOptions> {
    Some(NotificationOptions::new().with_delay(ms))
}

#[test]
fn test_immediate_notifications_visible_before_return() {
    let (engine, _) = engine();
    engine.success("saved", None);
    engine.info("synced", delay(0));
    engine.warning("careful", None);
    engine.error("failed", delay(-100));
    engine.show("default kind", None, None);

    let snapshot = engine.snapshot();
    assert_eq!(
        messages(&engine),
        vec!["saved", "synced", "careful", "failed", "default kind"]
    );
    assert_eq!(snapshot[0].kind, NotificationKind::Success);
    assert_eq!(snapshot[3].kind, NotificationKind::Error);
    assert_eq!(snapshot[4].kind, NotificationKind::Info);
    assert!(snapshot.iter().all(|n| !n.read));
    assert_eq!(*engine.unread_count().borrow(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_shorter_delay_appears_first_regardless_of_submission_order() {
    let (engine, _) = engine();
    engine.info("d2", delay(500));
    engine.info("d1", delay(200));

    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(messages(&engine), vec!["d1"]);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(messages(&engine), vec!["d1", "d2"]);
}

#[test]
fn test_history_capped_at_fifty() {
    let (engine, _) = engine();
    for i in 0..75 {
        engine.info(format!("n{}", i), None);
    }

    let snapshot = engine.snapshot();
    assert_eq!(snapshot.len(), 50);
    assert_eq!(snapshot[0].message, "n25");
    assert_eq!(snapshot[49].message, "n74");
}

#[test]
fn test_mark_all_read_acks_each_remote_id_once() {
    let (engine, ack) = engine();
    for _ in 0..3 {
        engine.enqueue(
            NotificationKind::Info,
            "import done",
            None,
            Some("shared".to_string()),
            Some("shared".to_string()),
        );
    }
    engine.enqueue(NotificationKind::Info, "other", None, None, Some("r2".to_string()));
    engine.info("local", None);
    engine.info("auto", Some(NotificationOptions::new().with_auto_read(true)));

    engine.mark_all_read();

    assert_eq!(ack.sent(), vec!["shared".to_string(), "r2".to_string()]);
    let remaining = engine.snapshot();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].message, "auto");
    assert_eq!(*engine.unread_count().borrow(), 0);
}

#[test]
fn test_remove_and_clear_send_no_acks() {
    let (engine, ack) = engine();
    engine.enqueue(NotificationKind::Info, "a", None, None, Some("r1".to_string()));
    engine.enqueue(NotificationKind::Info, "b", None, None, Some("r2".to_string()));

    engine.remove("r1");
    engine.remove("missing");
    assert_eq!(messages(&engine), vec!["b"]);

    engine.clear();
    assert!(engine.snapshot().is_empty());
    assert!(ack.sent().is_empty());
}

#[test]
fn test_mark_as_read_acks_and_removes() {
    let (engine, ack) = engine();
    engine.enqueue(NotificationKind::Info, "remote", None, None, Some("abc".to_string()));
    engine.mark_as_read("abc");
    assert_eq!(ack.sent(), vec!["abc".to_string()]);
    assert!(engine.snapshot().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_persistent_round_trip() {
    let store = Arc::new(MemorySessionStore::new());
    let (engine, _) = engine_with(store.clone());

    engine.queue_persistent(NotificationKind::Warning, "low disk", Some(NotificationOptions::new()));
    assert!(engine.snapshot().is_empty());
    assert_eq!(engine.stored_notifications().len(), 1);

    engine.flush_persistent();
    assert_eq!(store.get("app:persistent-notifications").unwrap(), None);

    tokio::time::sleep(Duration::from_millis(390)).await;
    assert!(engine.snapshot().is_empty());

    tokio::time::sleep(Duration::from_millis(20)).await;
    let snapshot = engine.snapshot();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].kind, NotificationKind::Warning);
    assert_eq!(snapshot[0].message, "low disk");
    assert!(engine.stored_notifications().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_flush_staggers_by_180ms_in_call_order() {
    let (engine, _) = engine();
    engine.queue_persistent(NotificationKind::Info, "first", None);
    engine.queue_persistent(NotificationKind::Success, "second", None);
    engine.flush_persistent();
    assert_eq!(engine.pending_timers(), 2);

    tokio::time::sleep(Duration::from_millis(401)).await;
    assert_eq!(messages(&engine), vec!["first"]);

    tokio::time::sleep(Duration::from_millis(170)).await;
    assert_eq!(messages(&engine), vec!["first"]);

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(messages(&engine), vec!["first", "second"]);
}

#[tokio::test(start_paused = true)]
async fn test_flush_survives_engine_reload_with_file_store() {
    let dir = tempfile::tempdir().unwrap();

    // 跳转前
    let (before, _) = engine_with(Arc::new(FileSessionStore::new(dir.path())));
    before.queue_persistent(NotificationKind::Success, "record created", None);
    before.shutdown();

    // 新页面加载
    let (after, _) = engine_with(Arc::new(FileSessionStore::new(dir.path())));
    after.flush_persistent();
    tokio::time::sleep(Duration::from_millis(450)).await;

    assert_eq!(messages(&after), vec!["record created"]);
    assert!(after.stored_notifications().is_empty());
}

#[test]
fn test_without_durable_storage_queue_persistent_is_immediate() {
    let ack = Arc::new(RecordingAck::default());
    let engine = NotificationEngine::builder()
        .capabilities(Capabilities::none())
        .read_ack(ack)
        .build()
        .unwrap();

    engine.queue_persistent(NotificationKind::Error, "not persisted", None);
    assert_eq!(messages(&engine), vec!["not persisted"]);

    engine.flush_persistent();
    assert_eq!(engine.snapshot().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_cancels_pending_dispatch() {
    let (engine, _) = engine();
    engine.info("pending", delay(1000));
    assert_eq!(engine.pending_timers(), 1);

    engine.shutdown();
    engine.shutdown();
    assert_eq!(engine.pending_timers(), 0);

    tokio::time::sleep(Duration::from_millis(2000)).await;
    assert!(engine.snapshot().is_empty());
}

#[test]
fn test_no_publish_for_noop_remove() {
    let (engine, _) = engine();
    engine.info("a", None);

    let mut rx = engine.notifications();
    rx.borrow_and_update();
    engine.remove("absent");
    engine.mark_all_read();
    assert!(rx.has_changed().unwrap());

    rx.borrow_and_update();
    engine.mark_all_read();
    engine.clear();
    assert!(!rx.has_changed().unwrap());
}
