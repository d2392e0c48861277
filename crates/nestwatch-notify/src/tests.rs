use crate::dispatcher::{ChannelStatus, NotificationDispatcher, QuietHours};
use crate::error::Result;
use crate::plugin::ChannelRegistry;
use crate::NotificationChannel;
use async_trait::async_trait;
use chrono::{NaiveTime, Utc};
use nestwatch_common::types::{AlertNotice, ChannelKind, Severity};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

struct MockChannel {
    kind: ChannelKind,
    available: bool,
    fail: bool,
    sends: AtomicU32,
}

impl MockChannel {
    fn new(kind: ChannelKind) -> Arc<Self> {
        Arc::new(Self {
            kind,
            available: true,
            fail: false,
            sends: AtomicU32::new(0),
        })
    }

    fn failing(kind: ChannelKind) -> Arc<Self> {
        Arc::new(Self {
            kind,
            available: true,
            fail: true,
            sends: AtomicU32::new(0),
        })
    }

    fn unavailable(kind: ChannelKind) -> Arc<Self> {
        Arc::new(Self {
            kind,
            available: false,
            fail: false,
            sends: AtomicU32::new(0),
        })
    }

    fn send_count(&self) -> u32 {
        self.sends.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotificationChannel for MockChannel {
    fn kind(&self) -> ChannelKind {
        self.kind
    }

    fn is_available(&self) -> bool {
        self.available
    }

    async fn send(&self, _notice: &AlertNotice) -> Result<()> {
        self.sends.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(crate::NotifyError::Other("mock send failure".into()))
        } else {
            Ok(())
        }
    }
}

fn notice(severity: Severity) -> AlertNotice {
    AlertNotice {
        alert_id: "alert-1".to_string(),
        stream_id: "cam-nursery".to_string(),
        severity,
        message: "baby not visible in crib".to_string(),
        level: 1,
        volume_percent: 60,
        sound_profile: "alert".to_string(),
        created_at: Utc::now(),
    }
}

fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

#[test]
fn quiet_hours_same_day_window() {
    let quiet = QuietHours {
        enabled: true,
        start: time(13, 0),
        end: time(15, 0),
        allow_critical: true,
    };
    assert!(quiet.contains(time(14, 0)));
    assert!(!quiet.contains(time(12, 59)));
    assert!(!quiet.contains(time(15, 1)));
}

#[test]
fn quiet_hours_wraps_past_midnight() {
    let quiet = QuietHours {
        enabled: true,
        start: time(22, 0),
        end: time(7, 0),
        allow_critical: true,
    };
    assert!(quiet.contains(time(23, 30)));
    assert!(quiet.contains(time(2, 0)));
    assert!(quiet.contains(time(6, 59)));
    assert!(!quiet.contains(time(12, 0)));
    assert!(!quiet.contains(time(21, 59)));
}

#[test]
fn quiet_hours_disabled_never_contains() {
    let quiet = QuietHours {
        enabled: false,
        start: time(0, 0),
        end: time(23, 59),
        allow_critical: true,
    };
    assert!(!quiet.contains(time(12, 0)));
}

#[test]
fn critical_bypasses_quiet_hours() {
    let quiet = QuietHours {
        enabled: true,
        start: time(22, 0),
        end: time(7, 0),
        allow_critical: true,
    };
    assert!(quiet.suppresses(Severity::High, time(23, 0)));
    assert!(!quiet.suppresses(Severity::Critical, time(23, 0)));
}

#[test]
fn critical_suppressed_when_bypass_disabled() {
    let quiet = QuietHours {
        enabled: true,
        start: time(22, 0),
        end: time(7, 0),
        allow_critical: false,
    };
    assert!(quiet.suppresses(Severity::Critical, time(23, 0)));
}

#[tokio::test]
async fn dispatch_fans_out_to_requested_channels() {
    let push = MockChannel::new(ChannelKind::Push);
    let sms = MockChannel::new(ChannelKind::Sms);
    let webhook = MockChannel::new(ChannelKind::Webhook);

    let mut dispatcher = NotificationDispatcher::new(QuietHours::default());
    dispatcher.register_channel(push.clone());
    dispatcher.register_channel(sms.clone());
    dispatcher.register_channel(webhook.clone());

    let report = dispatcher
        .dispatch_at(
            &notice(Severity::High),
            &[ChannelKind::Push, ChannelKind::Sms],
            time(12, 0),
        )
        .await;

    assert!(!report.suppressed);
    assert_eq!(report.results.len(), 2);
    assert_eq!(report.sent_count(), 2);
    assert_eq!(push.send_count(), 1);
    assert_eq!(sms.send_count(), 1);
    assert_eq!(webhook.send_count(), 0);
}

#[tokio::test]
async fn one_channel_failing_does_not_block_others() {
    let push = MockChannel::failing(ChannelKind::Push);
    let sms = MockChannel::new(ChannelKind::Sms);

    let mut dispatcher = NotificationDispatcher::new(QuietHours::default());
    dispatcher.register_channel(push.clone());
    dispatcher.register_channel(sms.clone());

    let report = dispatcher
        .dispatch_at(
            &notice(Severity::High),
            &[ChannelKind::Push, ChannelKind::Sms],
            time(12, 0),
        )
        .await;

    assert_eq!(report.sent_count(), 1);
    assert_eq!(report.failed_count(), 1);
    assert_eq!(sms.send_count(), 1);

    let push_result = report
        .results
        .iter()
        .find(|r| r.kind == ChannelKind::Push)
        .unwrap();
    assert_eq!(push_result.status, ChannelStatus::Failed);
    assert!(push_result.error.is_some());
}

#[tokio::test]
async fn unavailable_channel_is_skipped_not_failed() {
    let push = MockChannel::unavailable(ChannelKind::Push);

    let mut dispatcher = NotificationDispatcher::new(QuietHours::default());
    dispatcher.register_channel(push.clone());

    let report = dispatcher
        .dispatch_at(&notice(Severity::Medium), &[ChannelKind::Push], time(12, 0))
        .await;

    assert_eq!(report.results[0].status, ChannelStatus::Skipped);
    assert_eq!(report.failed_count(), 0);
    assert_eq!(push.send_count(), 0);
}

#[tokio::test]
async fn unregistered_kind_is_skipped() {
    let dispatcher = NotificationDispatcher::new(QuietHours::default());

    let report = dispatcher
        .dispatch_at(&notice(Severity::Medium), &[ChannelKind::Telegram], time(12, 0))
        .await;

    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].status, ChannelStatus::Skipped);
}

#[tokio::test]
async fn quiet_hours_suppress_whole_fanout() {
    let push = MockChannel::new(ChannelKind::Push);

    let mut dispatcher = NotificationDispatcher::new(QuietHours {
        enabled: true,
        start: time(22, 0),
        end: time(7, 0),
        allow_critical: true,
    });
    dispatcher.register_channel(push.clone());

    let report = dispatcher
        .dispatch_at(&notice(Severity::High), &[ChannelKind::Push], time(23, 0))
        .await;

    assert!(report.suppressed);
    assert!(report.results.is_empty());
    assert_eq!(push.send_count(), 0);
}

#[tokio::test]
async fn critical_dispatches_during_quiet_hours() {
    let push = MockChannel::new(ChannelKind::Push);

    let mut dispatcher = NotificationDispatcher::new(QuietHours {
        enabled: true,
        start: time(22, 0),
        end: time(7, 0),
        allow_critical: true,
    });
    dispatcher.register_channel(push.clone());

    let report = dispatcher
        .dispatch_at(&notice(Severity::Critical), &[ChannelKind::Push], time(23, 0))
        .await;

    assert!(!report.suppressed);
    assert_eq!(report.sent_count(), 1);
}

#[tokio::test]
async fn counters_track_sent_and_failed() {
    let push = MockChannel::new(ChannelKind::Push);
    let sms = MockChannel::failing(ChannelKind::Sms);

    let mut dispatcher = NotificationDispatcher::new(QuietHours::default());
    dispatcher.register_channel(push.clone());
    dispatcher.register_channel(sms.clone());

    for _ in 0..3 {
        dispatcher
            .dispatch_at(
                &notice(Severity::High),
                &[ChannelKind::Push, ChannelKind::Sms],
                time(12, 0),
            )
            .await;
    }

    let counters = dispatcher.counters();
    assert_eq!(counters[&ChannelKind::Push].sent, 3);
    assert_eq!(counters[&ChannelKind::Push].failed, 0);
    assert_eq!(counters[&ChannelKind::Sms].sent, 0);
    assert_eq!(counters[&ChannelKind::Sms].failed, 3);
}

#[test]
fn registry_has_builtin_channel_types() {
    let registry = ChannelRegistry::with_builtins();
    assert_eq!(registry.names(), vec!["push", "sms", "telegram", "webhook"]);
}

#[test]
fn registry_rejects_unknown_channel_type() {
    let registry = ChannelRegistry::with_builtins();
    let err = registry
        .create_channel("pager", &serde_json::json!({}))
        .err()
        .unwrap();
    assert!(matches!(err, crate::NotifyError::UnknownChannelType(_)));
}

#[test]
fn registry_validates_channel_config() {
    let registry = ChannelRegistry::with_builtins();

    let valid = serde_json::json!({
        "bot_token": "123:abc",
        "chat_ids": ["42"],
    });
    assert!(registry.validate_config("telegram", &valid).is_ok());

    let missing_token = serde_json::json!({ "chat_ids": ["42"] });
    let err = registry
        .validate_config("telegram", &missing_token)
        .unwrap_err();
    assert!(matches!(err, crate::NotifyError::InvalidConfig(_)));
}

#[test]
fn registry_creates_channel_from_config() {
    let registry = ChannelRegistry::with_builtins();
    let config = serde_json::json!({
        "gateway_url": "https://push.example.com/send",
        "api_key": "key",
        "device_tokens": ["tok-1"],
    });
    let channel = registry.create_channel("push", &config).unwrap();
    assert_eq!(channel.kind(), ChannelKind::Push);
    assert!(channel.is_available());
}

#[test]
fn telegram_plugin_redacts_bot_token() {
    let registry = ChannelRegistry::with_builtins();
    let plugin = registry.get("telegram").unwrap();
    let redacted = plugin.redact_config(&serde_json::json!({
        "bot_token": "123:secret",
        "chat_ids": ["42"],
    }));
    assert_eq!(redacted["bot_token"], "***");
    assert_eq!(redacted["chat_ids"][0], "42");
}

#[test]
fn message_format_includes_severity_and_level() {
    let text = crate::channels::format_message(&notice(Severity::High));
    assert!(text.contains("[high]"));
    assert!(text.contains("cam-nursery"));
    assert!(text.contains("escalation level 1"));
}
