use crate::error::NotifyError;
use crate::NotificationChannel;
use chrono::{Local, NaiveTime};
use nestwatch_common::types::{AlertNotice, ChannelKind, Severity};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

/// Daily window during which non-critical notifications are suppressed.
/// A window whose start is after its end wraps past midnight, e.g.
/// 22:00 to 07:00.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuietHours {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_quiet_start")]
    pub start: NaiveTime,
    #[serde(default = "default_quiet_end")]
    pub end: NaiveTime,
    /// When true, critical alerts bypass the quiet window.
    #[serde(default = "default_true")]
    pub allow_critical: bool,
}

fn default_quiet_start() -> NaiveTime {
    NaiveTime::from_hms_opt(22, 0, 0).unwrap_or_default()
}

fn default_quiet_end() -> NaiveTime {
    NaiveTime::from_hms_opt(7, 0, 0).unwrap_or_default()
}

fn default_true() -> bool {
    true
}

impl Default for QuietHours {
    fn default() -> Self {
        Self {
            enabled: false,
            start: default_quiet_start(),
            end: default_quiet_end(),
            allow_critical: true,
        }
    }
}

impl QuietHours {
    /// Whether the given wall-clock time falls inside the window.
    pub fn contains(&self, current: NaiveTime) -> bool {
        if !self.enabled {
            return false;
        }
        if self.start <= self.end {
            current >= self.start && current <= self.end
        } else {
            // Wraps past midnight
            current >= self.start || current <= self.end
        }
    }

    /// Whether a notice of the given severity should be suppressed
    /// at the given time.
    pub fn suppresses(&self, severity: Severity, current: NaiveTime) -> bool {
        if !self.contains(current) {
            return false;
        }
        !(self.allow_critical && severity >= Severity::Critical)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    Sent,
    Failed,
    Skipped,
}

#[derive(Debug, Clone)]
pub struct ChannelResult {
    pub kind: ChannelKind,
    pub status: ChannelStatus,
    pub error: Option<String>,
}

/// Outcome of one fanout. `suppressed` means quiet hours swallowed the
/// whole notice and no channel was attempted.
#[derive(Debug, Clone, Default)]
pub struct DispatchReport {
    pub suppressed: bool,
    pub results: Vec<ChannelResult>,
}

impl DispatchReport {
    pub fn sent_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.status == ChannelStatus::Sent)
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.status == ChannelStatus::Failed)
            .count()
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ChannelCounters {
    pub sent: u64,
    pub failed: u64,
}

/// Fans an alert notice out to the requested channels. Delivery is
/// best effort per channel: one channel failing never blocks the
/// others, and failures come back in the report rather than as an Err.
pub struct NotificationDispatcher {
    channels: HashMap<ChannelKind, Arc<dyn NotificationChannel>>,
    quiet_hours: RwLock<QuietHours>,
    counters: Mutex<HashMap<ChannelKind, ChannelCounters>>,
}

impl NotificationDispatcher {
    pub fn new(quiet_hours: QuietHours) -> Self {
        Self {
            channels: HashMap::new(),
            quiet_hours: RwLock::new(quiet_hours),
            counters: Mutex::new(HashMap::new()),
        }
    }

    pub fn register_channel(&mut self, channel: Arc<dyn NotificationChannel>) {
        self.channels.insert(channel.kind(), channel);
    }

    pub fn registered_kinds(&self) -> Vec<ChannelKind> {
        self.channels.keys().copied().collect()
    }

    pub fn quiet_hours(&self) -> QuietHours {
        match self.quiet_hours.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn set_quiet_hours(&self, quiet_hours: QuietHours) {
        match self.quiet_hours.write() {
            Ok(mut guard) => *guard = quiet_hours,
            Err(poisoned) => *poisoned.into_inner() = quiet_hours,
        }
    }

    pub fn counters(&self) -> HashMap<ChannelKind, ChannelCounters> {
        match self.counters.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn record(&self, kind: ChannelKind, sent: bool) {
        let mut guard = match self.counters.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let entry = guard.entry(kind).or_default();
        if sent {
            entry.sent += 1;
        } else {
            entry.failed += 1;
        }
    }

    /// Dispatch using the current local time for the quiet-hours check.
    pub async fn dispatch(&self, notice: &AlertNotice, kinds: &[ChannelKind]) -> DispatchReport {
        self.dispatch_at(notice, kinds, Local::now().time()).await
    }

    /// Dispatch with an explicit wall-clock time. Split out so the
    /// quiet-hours behaviour is testable at any time of day.
    pub async fn dispatch_at(
        &self,
        notice: &AlertNotice,
        kinds: &[ChannelKind],
        current: NaiveTime,
    ) -> DispatchReport {
        let quiet = self.quiet_hours();
        if quiet.suppresses(notice.severity, current) {
            tracing::info!(
                alert_id = %notice.alert_id,
                severity = %notice.severity,
                "Notification suppressed by quiet hours"
            );
            return DispatchReport {
                suppressed: true,
                results: Vec::new(),
            };
        }

        let mut results = Vec::with_capacity(kinds.len());
        for kind in kinds {
            let result = match self.channels.get(kind) {
                Some(channel) if channel.is_available() => match channel.send(notice).await {
                    Ok(()) => {
                        tracing::info!(
                            alert_id = %notice.alert_id,
                            channel = %kind,
                            level = notice.level,
                            "Notification sent"
                        );
                        self.record(*kind, true);
                        ChannelResult {
                            kind: *kind,
                            status: ChannelStatus::Sent,
                            error: None,
                        }
                    }
                    Err(e) => {
                        tracing::error!(
                            alert_id = %notice.alert_id,
                            channel = %kind,
                            error = %e,
                            "Notification failed"
                        );
                        self.record(*kind, false);
                        ChannelResult {
                            kind: *kind,
                            status: ChannelStatus::Failed,
                            error: Some(e.to_string()),
                        }
                    }
                },
                Some(_) => {
                    tracing::warn!(
                        alert_id = %notice.alert_id,
                        channel = %kind,
                        "Channel not available, skipping"
                    );
                    ChannelResult {
                        kind: *kind,
                        status: ChannelStatus::Skipped,
                        error: Some(NotifyError::Other("channel not available".into()).to_string()),
                    }
                }
                None => {
                    tracing::warn!(
                        alert_id = %notice.alert_id,
                        channel = %kind,
                        "No channel registered for kind, skipping"
                    );
                    ChannelResult {
                        kind: *kind,
                        status: ChannelStatus::Skipped,
                        error: Some("channel not registered".to_string()),
                    }
                }
            };
            results.push(result);
        }

        DispatchReport {
            suppressed: false,
            results,
        }
    }
}
