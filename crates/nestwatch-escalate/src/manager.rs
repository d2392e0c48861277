use crate::levels::{default_levels, initial_level, EscalationLevel, MAX_LEVEL};
use chrono::{DateTime, Utc};
use nestwatch_common::types::{Alert, AlertNotice, ChannelKind, Severity};
use nestwatch_notify::NotificationDispatcher;
use nestwatch_storage::MonitorStore;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Snapshot of one alert's position on the escalation ladder.
#[derive(Debug, Clone)]
pub struct EscalationInfo {
    pub alert_id: String,
    pub severity: Severity,
    pub current_level: u8,
    pub volume_percent: u8,
    pub sound_profile: String,
    pub channels: Vec<ChannelKind>,
    pub requires_acknowledge: bool,
    pub started_at: DateTime<Utc>,
}

struct ActiveAlert {
    stream_id: String,
    severity: Severity,
    message: String,
    started_at: DateTime<Utc>,
    current_level: u8,
    handle: JoinHandle<()>,
}

struct Inner {
    levels: Vec<EscalationLevel>,
    dispatcher: Arc<NotificationDispatcher>,
    store: Arc<dyn MonitorStore>,
    active: Mutex<HashMap<String, ActiveAlert>>,
}

impl Inner {
    fn lock_active(&self) -> MutexGuard<'_, HashMap<String, ActiveAlert>> {
        match self.active.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn level(&self, level: u8) -> &EscalationLevel {
        // Table length is validated at construction
        &self.levels[usize::from(level.min(MAX_LEVEL))]
    }

    /// Advance one rung under the lock. Returns the notice to fan out
    /// and the wait before the next fire, or None if the alert was
    /// acknowledged while the timer slept.
    fn advance(&self, alert_id: &str) -> Option<(AlertNotice, Vec<ChannelKind>, u64)> {
        let mut active = self.lock_active();
        let entry = active.get_mut(alert_id)?;

        let new_level = entry.current_level.saturating_add(1).min(MAX_LEVEL);
        entry.current_level = new_level;
        let level = self.level(new_level);

        tracing::warn!(
            alert_id = %alert_id,
            level = new_level,
            volume = level.volume_percent,
            sound = %level.sound_profile,
            "Alert escalated"
        );

        let notice = AlertNotice {
            alert_id: alert_id.to_string(),
            stream_id: entry.stream_id.clone(),
            severity: entry.severity,
            message: entry.message.clone(),
            level: new_level,
            volume_percent: level.volume_percent,
            sound_profile: level.sound_profile.clone(),
            created_at: Utc::now(),
        };
        Some((notice, level.channels.clone(), level.escalate_after_ms))
    }
}

/// Per-alert timer state machine.
///
/// Each active alert owns one looping timer task. When the timer fires
/// and the alert is still unacknowledged, the alert climbs a level, the
/// new level's channels are notified, and the timer is rearmed. An alert
/// at the top level keeps re-firing on its interval until acknowledged.
///
/// Acknowledgement removes the alert's state and aborts its timer under
/// the state lock, so a fire racing an acknowledgement always loses.
pub struct EscalationManager {
    inner: Arc<Inner>,
}

impl EscalationManager {
    pub fn new(dispatcher: Arc<NotificationDispatcher>, store: Arc<dyn MonitorStore>) -> Self {
        Self::from_levels(dispatcher, store, default_levels())
    }

    /// Build a manager with a custom ladder, e.g. from the config-file
    /// override. The table must carry exactly one entry per level,
    /// ordered 0 through [`MAX_LEVEL`].
    ///
    /// # Errors
    ///
    /// Returns an error when the table has the wrong number of entries
    /// or an entry's `level` does not match its position.
    pub fn with_levels(
        dispatcher: Arc<NotificationDispatcher>,
        store: Arc<dyn MonitorStore>,
        levels: Vec<EscalationLevel>,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(
            levels.len() == usize::from(MAX_LEVEL) + 1,
            "escalation level table must have {} entries, got {}",
            MAX_LEVEL + 1,
            levels.len()
        );
        for (idx, entry) in levels.iter().enumerate() {
            anyhow::ensure!(
                usize::from(entry.level) == idx,
                "escalation level table entry {} carries level {}",
                idx,
                entry.level
            );
        }
        Ok(Self::from_levels(dispatcher, store, levels))
    }

    fn from_levels(
        dispatcher: Arc<NotificationDispatcher>,
        store: Arc<dyn MonitorStore>,
        levels: Vec<EscalationLevel>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                levels,
                dispatcher,
                store,
                active: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Register an alert and arm its first timer. Idempotent: calling
    /// again for an already-active alert returns its current position
    /// without touching the timer.
    ///
    /// Returns the starting level's info so the caller can send the
    /// immediate first notification through those channels.
    pub fn start_alert(&self, alert: &Alert) -> EscalationInfo {
        let mut active = self.inner.lock_active();
        if let Some(existing) = active.get(&alert.id) {
            return self.info_for(&alert.id, existing);
        }

        let start_level = initial_level(alert.severity);
        let level = self.inner.level(start_level);
        let wait_ms = level.escalate_after_ms;

        tracing::info!(
            alert_id = %alert.id,
            stream_id = %alert.stream_id,
            severity = %alert.severity,
            level = start_level,
            "Escalation started"
        );

        let inner = self.inner.clone();
        let alert_id = alert.id.clone();
        let handle = tokio::spawn(async move {
            let mut wait_ms = wait_ms;
            loop {
                tokio::time::sleep(Duration::from_millis(wait_ms)).await;
                match inner.advance(&alert_id) {
                    Some((notice, channels, next_wait)) => {
                        inner.dispatcher.dispatch(&notice, &channels).await;
                        wait_ms = next_wait;
                    }
                    // Acknowledged while sleeping
                    None => break,
                }
            }
        });

        let entry = ActiveAlert {
            stream_id: alert.stream_id.clone(),
            severity: alert.severity,
            message: alert.message.clone(),
            started_at: Utc::now(),
            current_level: start_level,
            handle,
        };
        let info = self.info_for(&alert.id, &entry);
        active.insert(alert.id.clone(), entry);
        info
    }

    /// Acknowledge an alert, cancelling its timer and freezing the
    /// ladder. Returns true the first time, false for unknown or
    /// already-acknowledged alerts.
    pub async fn acknowledge_alert(&self, alert_id: &str) -> bool {
        let removed = {
            let mut active = self.inner.lock_active();
            active.remove(alert_id)
        };

        let Some(entry) = removed else {
            return false;
        };
        entry.handle.abort();

        tracing::info!(
            alert_id = %alert_id,
            level = entry.current_level,
            "Alert acknowledged"
        );

        if let Err(e) = self.inner.store.acknowledge_alert(alert_id, Utc::now()).await {
            tracing::warn!(alert_id = %alert_id, error = %e, "Failed to persist acknowledgement");
        }
        true
    }

    pub fn current_level(&self, alert_id: &str) -> Option<u8> {
        self.inner.lock_active().get(alert_id).map(|a| a.current_level)
    }

    pub fn volume(&self, alert_id: &str) -> Option<u8> {
        self.current_level(alert_id)
            .map(|l| self.inner.level(l).volume_percent)
    }

    pub fn sound(&self, alert_id: &str) -> Option<String> {
        self.current_level(alert_id)
            .map(|l| self.inner.level(l).sound_profile.clone())
    }

    /// Whether the alert has climbed high enough that it can only be
    /// silenced by explicit acknowledgement.
    pub fn requires_acknowledge(&self, alert_id: &str) -> bool {
        self.current_level(alert_id).map_or(false, |l| l >= 2)
    }

    pub fn escalation_info(&self, alert_id: &str) -> Option<EscalationInfo> {
        let active = self.inner.lock_active();
        active.get(alert_id).map(|entry| self.info_for(alert_id, entry))
    }

    pub fn active_count(&self) -> usize {
        self.inner.lock_active().len()
    }

    /// Cancel every timer and drop all state. Pending alerts stay
    /// unacknowledged in the store.
    pub fn shutdown(&self) {
        let mut active = self.inner.lock_active();
        for (alert_id, entry) in active.drain() {
            entry.handle.abort();
            tracing::debug!(alert_id = %alert_id, "Escalation timer cancelled on shutdown");
        }
    }

    fn info_for(&self, alert_id: &str, entry: &ActiveAlert) -> EscalationInfo {
        let level = self.inner.level(entry.current_level);
        EscalationInfo {
            alert_id: alert_id.to_string(),
            severity: entry.severity,
            current_level: entry.current_level,
            volume_percent: level.volume_percent,
            sound_profile: level.sound_profile.clone(),
            channels: level.channels.clone(),
            requires_acknowledge: entry.current_level >= 2,
            started_at: entry.started_at,
        }
    }
}

impl Drop for EscalationManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}
