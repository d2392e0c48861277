use crate::levels::{default_levels, initial_level, MAX_LEVEL};
use crate::manager::EscalationManager;
use async_trait::async_trait;
use chrono::Utc;
use nestwatch_common::types::{Alert, AlertNotice, ChannelKind, Severity};
use nestwatch_notify::{NotificationChannel, NotificationDispatcher, QuietHours};
use nestwatch_storage::memory::MemoryStore;
use nestwatch_storage::MonitorStore;
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct RecordingChannel {
    kind: ChannelKind,
    notices: Mutex<Vec<AlertNotice>>,
}

impl RecordingChannel {
    fn new(kind: ChannelKind) -> Arc<Self> {
        Arc::new(Self {
            kind,
            notices: Mutex::new(Vec::new()),
        })
    }

    fn notices(&self) -> Vec<AlertNotice> {
        self.notices.lock().unwrap().clone()
    }

    fn count(&self) -> usize {
        self.notices.lock().unwrap().len()
    }
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
    fn kind(&self) -> ChannelKind {
        self.kind
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn send(&self, notice: &AlertNotice) -> nestwatch_notify::error::Result<()> {
        self.notices.lock().unwrap().push(notice.clone());
        Ok(())
    }
}

struct Harness {
    manager: EscalationManager,
    store: Arc<MemoryStore>,
    push: Arc<RecordingChannel>,
    sms: Arc<RecordingChannel>,
    telegram: Arc<RecordingChannel>,
    webhook: Arc<RecordingChannel>,
}

fn harness() -> Harness {
    let push = RecordingChannel::new(ChannelKind::Push);
    let sms = RecordingChannel::new(ChannelKind::Sms);
    let telegram = RecordingChannel::new(ChannelKind::Telegram);
    let webhook = RecordingChannel::new(ChannelKind::Webhook);

    let mut dispatcher = NotificationDispatcher::new(QuietHours::default());
    dispatcher.register_channel(push.clone());
    dispatcher.register_channel(sms.clone());
    dispatcher.register_channel(telegram.clone());
    dispatcher.register_channel(webhook.clone());

    let store = Arc::new(MemoryStore::new());
    let manager = EscalationManager::new(Arc::new(dispatcher), store.clone());

    Harness {
        manager,
        store,
        push,
        sms,
        telegram,
        webhook,
    }
}

fn alert(id: &str, severity: Severity) -> Alert {
    Alert {
        id: id.to_string(),
        stream_id: "cam-nursery".to_string(),
        severity,
        message: "baby not visible in crib".to_string(),
        metadata: serde_json::Value::Null,
        acknowledged: false,
        acknowledged_at: None,
        created_at: Utc::now(),
    }
}

#[test]
fn initial_level_follows_severity() {
    assert_eq!(initial_level(Severity::Info), 0);
    assert_eq!(initial_level(Severity::Low), 0);
    assert_eq!(initial_level(Severity::Medium), 1);
    assert_eq!(initial_level(Severity::High), 2);
    assert_eq!(initial_level(Severity::Critical), 3);
}

#[test]
fn default_table_ramps_volume_and_channels() {
    let levels = default_levels();
    assert_eq!(levels.len(), usize::from(MAX_LEVEL) + 1);

    assert_eq!(levels[2].volume_percent, 70);
    assert_eq!(levels[2].escalate_after_ms, 120_000);
    assert_eq!(levels[2].channels, vec![ChannelKind::Push, ChannelKind::Sms]);

    assert_eq!(levels[3].volume_percent, 85);
    assert_eq!(levels[3].escalate_after_ms, 180_000);

    assert_eq!(levels[4].volume_percent, 100);
    assert_eq!(levels[4].channels.len(), 4);

    for pair in levels.windows(2) {
        assert!(pair[1].volume_percent >= pair[0].volume_percent);
        assert!(pair[1].channels.len() >= pair[0].channels.len());
    }
}

#[test]
fn custom_level_table_is_validated() {
    let dispatcher = Arc::new(NotificationDispatcher::new(QuietHours::default()));
    let store = Arc::new(MemoryStore::new());

    // An empty or truncated table must be rejected, not accepted and
    // panicked on at the first start_alert
    let err = EscalationManager::with_levels(dispatcher.clone(), store.clone(), Vec::new())
        .err()
        .unwrap();
    assert!(err.to_string().contains("entries"));

    let mut shuffled = default_levels();
    shuffled.swap(0, 4);
    assert!(EscalationManager::with_levels(dispatcher.clone(), store.clone(), shuffled).is_err());

    assert!(EscalationManager::with_levels(dispatcher, store, default_levels()).is_ok());
}

#[tokio::test(start_paused = true)]
async fn high_alert_starts_at_level_two() {
    let h = harness();
    let info = h.manager.start_alert(&alert("a-1", Severity::High));

    assert_eq!(info.current_level, 2);
    assert_eq!(info.volume_percent, 70);
    assert_eq!(info.sound_profile, "alarm");
    assert!(info.requires_acknowledge);
    assert_eq!(h.manager.current_level("a-1"), Some(2));
}

#[tokio::test(start_paused = true)]
async fn high_alert_climbs_on_schedule() {
    let h = harness();
    h.manager.start_alert(&alert("a-1", Severity::High));

    // Level 2 waits 120s before climbing
    tokio::time::sleep(Duration::from_secs(119)).await;
    assert_eq!(h.manager.current_level("a-1"), Some(2));

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(h.manager.current_level("a-1"), Some(3));
    assert_eq!(h.manager.volume("a-1"), Some(85));
    assert_eq!(h.manager.sound("a-1"), Some("siren".to_string()));

    // The level-3 fire reaches push, sms and telegram but not webhook
    let telegram_notices = h.telegram.notices();
    assert_eq!(telegram_notices.len(), 1);
    assert_eq!(telegram_notices[0].level, 3);
    assert_eq!(telegram_notices[0].volume_percent, 85);
    assert_eq!(h.webhook.count(), 0);

    // Level 3 waits 180s before climbing to the top
    tokio::time::sleep(Duration::from_secs(181)).await;
    assert_eq!(h.manager.current_level("a-1"), Some(4));
    assert_eq!(h.webhook.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn top_level_refires_until_acknowledged() {
    let h = harness();
    h.manager.start_alert(&alert("a-1", Severity::Critical));

    // Level 3 -> 4 after 180s, then the 300s level-4 interval repeats
    tokio::time::sleep(Duration::from_secs(181)).await;
    assert_eq!(h.manager.current_level("a-1"), Some(4));
    assert_eq!(h.webhook.count(), 1);

    tokio::time::sleep(Duration::from_secs(301)).await;
    assert_eq!(h.manager.current_level("a-1"), Some(4));
    assert_eq!(h.webhook.count(), 2);

    tokio::time::sleep(Duration::from_secs(301)).await;
    assert_eq!(h.webhook.count(), 3);

    assert!(h.manager.acknowledge_alert("a-1").await);
    tokio::time::sleep(Duration::from_secs(900)).await;
    assert_eq!(h.webhook.count(), 3);
}

#[tokio::test(start_paused = true)]
async fn acknowledge_freezes_the_ladder() {
    let h = harness();
    let a = alert("a-1", Severity::High);
    h.store.insert_alert(&a).await.unwrap();
    h.manager.start_alert(&a);

    tokio::time::sleep(Duration::from_secs(50)).await;
    assert!(h.manager.acknowledge_alert("a-1").await);

    // Well past the 120s escalation point, nothing fires
    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(h.manager.current_level("a-1"), None);
    assert_eq!(h.push.count(), 0);
    assert_eq!(h.sms.count(), 0);

    let stored = h.store.get_alert("a-1").unwrap();
    assert!(stored.acknowledged);
    assert!(stored.acknowledged_at.is_some());
}

#[tokio::test(start_paused = true)]
async fn acknowledge_is_idempotent() {
    let h = harness();
    let a = alert("a-1", Severity::Medium);
    h.store.insert_alert(&a).await.unwrap();
    h.manager.start_alert(&a);

    assert!(h.manager.acknowledge_alert("a-1").await);
    assert!(!h.manager.acknowledge_alert("a-1").await);
    assert!(!h.manager.acknowledge_alert("never-started").await);
}

#[tokio::test(start_paused = true)]
async fn start_alert_is_idempotent() {
    let h = harness();
    let a = alert("a-1", Severity::High);

    let first = h.manager.start_alert(&a);
    tokio::time::sleep(Duration::from_secs(121)).await;
    let second = h.manager.start_alert(&a);

    assert_eq!(h.manager.active_count(), 1);
    assert_eq!(first.current_level, 2);
    // The repeated call reports the climbed level, it does not reset
    assert_eq!(second.current_level, 3);
}

#[tokio::test(start_paused = true)]
async fn levels_never_decrease() {
    let h = harness();
    h.manager.start_alert(&alert("a-1", Severity::Low));

    let mut observed = vec![h.manager.current_level("a-1").unwrap()];
    // Cross every escalation boundary for a level-0 start
    for secs in [61, 91, 121, 181, 301, 301] {
        tokio::time::sleep(Duration::from_secs(secs)).await;
        observed.push(h.manager.current_level("a-1").unwrap());
    }

    for pair in observed.windows(2) {
        assert!(pair[1] >= pair[0]);
    }
    assert_eq!(*observed.last().unwrap(), MAX_LEVEL);
}

#[tokio::test(start_paused = true)]
async fn low_severity_does_not_require_acknowledge_at_start() {
    let h = harness();
    let info = h.manager.start_alert(&alert("a-1", Severity::Low));

    assert_eq!(info.current_level, 0);
    assert_eq!(info.sound_profile, "chime");
    assert!(!h.manager.requires_acknowledge("a-1"));

    // After two climbs it crosses the acknowledge threshold
    tokio::time::sleep(Duration::from_secs(61)).await;
    tokio::time::sleep(Duration::from_secs(91)).await;
    assert_eq!(h.manager.current_level("a-1"), Some(2));
    assert!(h.manager.requires_acknowledge("a-1"));
}

#[tokio::test(start_paused = true)]
async fn shutdown_cancels_all_timers() {
    let h = harness();
    h.manager.start_alert(&alert("a-1", Severity::High));
    h.manager.start_alert(&alert("a-2", Severity::Low));
    assert_eq!(h.manager.active_count(), 2);

    h.manager.shutdown();
    assert_eq!(h.manager.active_count(), 0);

    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(h.push.count(), 0);
}
