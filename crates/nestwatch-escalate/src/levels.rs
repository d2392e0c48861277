use nestwatch_common::types::{ChannelKind, Severity};
use serde::{Deserialize, Serialize};

/// Highest escalation level. Alerts at this level re-fire on the
/// level's interval until acknowledged.
pub const MAX_LEVEL: u8 = 4;

/// One rung of the escalation ladder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationLevel {
    pub level: u8,
    /// Alarm volume the companion app should play at, 0-100.
    pub volume_percent: u8,
    pub sound_profile: String,
    /// How long to wait at this level before climbing to the next.
    pub escalate_after_ms: u64,
    pub channels: Vec<ChannelKind>,
}

impl EscalationLevel {
    fn new(
        level: u8,
        volume_percent: u8,
        sound_profile: &str,
        escalate_after_ms: u64,
        channels: Vec<ChannelKind>,
    ) -> Self {
        Self {
            level,
            volume_percent,
            sound_profile: sound_profile.to_string(),
            escalate_after_ms,
            channels,
        }
    }
}

/// The built-in five-level ladder. Callers may supply their own table
/// as long as it stays five entries indexed by level.
pub fn default_levels() -> Vec<EscalationLevel> {
    vec![
        EscalationLevel::new(0, 50, "chime", 60_000, vec![ChannelKind::Push]),
        EscalationLevel::new(1, 60, "alert", 90_000, vec![ChannelKind::Push]),
        EscalationLevel::new(
            2,
            70,
            "alarm",
            120_000,
            vec![ChannelKind::Push, ChannelKind::Sms],
        ),
        EscalationLevel::new(
            3,
            85,
            "siren",
            180_000,
            vec![ChannelKind::Push, ChannelKind::Sms, ChannelKind::Telegram],
        ),
        EscalationLevel::new(
            4,
            100,
            "siren",
            300_000,
            vec![
                ChannelKind::Push,
                ChannelKind::Sms,
                ChannelKind::Telegram,
                ChannelKind::Webhook,
            ],
        ),
    ]
}

/// Starting rung for a fresh alert. More severe alerts skip the gentle
/// lower levels.
pub fn initial_level(severity: Severity) -> u8 {
    match severity {
        Severity::Info | Severity::Low => 0,
        Severity::Medium => 1,
        Severity::High => 2,
        Severity::Critical => 3,
    }
}
