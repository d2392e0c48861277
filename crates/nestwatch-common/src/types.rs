use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Monitoring scenario the stream is configured for.
///
/// The scenario drives both the vision prompts and the job priority
/// weight: baby streams outrank elderly streams, which outrank pet
/// streams.
///
/// # Examples
///
/// ```
/// use nestwatch_common::types::Scenario;
///
/// let s: Scenario = "baby".parse().unwrap();
/// assert_eq!(s, Scenario::Baby);
/// assert_eq!(s.priority_weight(), 3);
/// assert_eq!(s.to_string(), "baby");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scenario {
    Baby,
    Pet,
    Elderly,
}

impl Scenario {
    /// Base priority weight contributed by the scenario at enqueue time.
    pub fn priority_weight(&self) -> i32 {
        match self {
            Scenario::Baby => 3,
            Scenario::Elderly => 2,
            Scenario::Pet => 0,
        }
    }
}

impl std::fmt::Display for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scenario::Baby => write!(f, "baby"),
            Scenario::Pet => write!(f, "pet"),
            Scenario::Elderly => write!(f, "elderly"),
        }
    }
}

impl std::str::FromStr for Scenario {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "baby" => Ok(Scenario::Baby),
            "pet" => Ok(Scenario::Pet),
            "elderly" => Ok(Scenario::Elderly),
            _ => Err(format!("unknown scenario: {s}")),
        }
    }
}

/// Ordinal severity of a detected situation, ordered lowest to highest.
///
/// # Examples
///
/// ```
/// use nestwatch_common::types::ConcernLevel;
///
/// let level: ConcernLevel = "high".parse().unwrap();
/// assert_eq!(level, ConcernLevel::High);
/// assert!(ConcernLevel::Critical > ConcernLevel::Medium);
/// assert!(level.warrants_alert());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConcernLevel {
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl ConcernLevel {
    /// An alert is created only for medium concern and above.
    pub fn warrants_alert(&self) -> bool {
        *self >= ConcernLevel::Medium
    }

    /// Maps a concern level to the alert severity it produces.
    pub fn to_severity(&self) -> Severity {
        match self {
            ConcernLevel::None => Severity::Info,
            ConcernLevel::Low => Severity::Low,
            ConcernLevel::Medium => Severity::Medium,
            ConcernLevel::High => Severity::High,
            ConcernLevel::Critical => Severity::Critical,
        }
    }
}

impl std::fmt::Display for ConcernLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConcernLevel::None => write!(f, "none"),
            ConcernLevel::Low => write!(f, "low"),
            ConcernLevel::Medium => write!(f, "medium"),
            ConcernLevel::High => write!(f, "high"),
            ConcernLevel::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for ConcernLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(ConcernLevel::None),
            "low" => Ok(ConcernLevel::Low),
            "medium" => Ok(ConcernLevel::Medium),
            "high" => Ok(ConcernLevel::High),
            "critical" => Ok(ConcernLevel::Critical),
            _ => Err(format!("unknown concern level: {s}")),
        }
    }
}

/// Alert severity level, ordered from lowest to highest.
///
/// # Examples
///
/// ```
/// use nestwatch_common::types::Severity;
///
/// let sev: Severity = "critical".parse().unwrap();
/// assert_eq!(sev, Severity::Critical);
/// assert!(Severity::Critical > Severity::Info);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            _ => Err(format!("unknown severity: {s}")),
        }
    }
}

/// Lifecycle status of an analysis job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Processing => write!(f, "processing"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

/// A single frame analysis job, owned exclusively by the queue.
///
/// `priority` is computed once at enqueue and never recomputed; retries
/// re-enter the queue with the same id and priority.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisJob {
    pub id: String,
    pub stream_id: String,
    pub scenario: Scenario,
    /// Raw frame bytes (JPEG/PNG); opaque to everything but the providers.
    #[serde(with = "serde_bytes_base64")]
    pub frame: Vec<u8>,
    /// Motion score in 0-100.
    pub motion_score: u8,
    /// Audio level in 0-100.
    pub audio_level: u8,
    pub priority: i32,
    pub retries: u32,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
}

/// Outcome of a completed analysis job. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub id: String,
    pub stream_id: String,
    /// Id of the job whose frame produced this result.
    pub frame_id: String,
    pub concern_level: ConcernLevel,
    pub description: String,
    /// Ordered list of concrete issues the analyzer called out.
    pub issues: Vec<String>,
    pub processing_time_ms: u64,
    pub model_used: String,
    pub is_cloud_fallback: bool,
    pub created_at: DateTime<Utc>,
}

/// Review status of a content flag. Only the external human-review
/// action moves a flag out of its initial status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagStatus {
    Pending,
    Approved,
    Rejected,
    Escalated,
    Banned,
}

impl std::fmt::Display for FlagStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlagStatus::Pending => write!(f, "pending"),
            FlagStatus::Approved => write!(f, "approved"),
            FlagStatus::Rejected => write!(f, "rejected"),
            FlagStatus::Escalated => write!(f, "escalated"),
            FlagStatus::Banned => write!(f, "banned"),
        }
    }
}

/// Deterministic action derived from a moderation tier.
///
/// tier 0 → allow, 1 → allow-but-flag, 2 → blur, 3 → escalate,
/// 4 → block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationAction {
    Allow,
    Flag,
    Blur,
    Escalate,
    Block,
}

impl std::fmt::Display for ModerationAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModerationAction::Allow => write!(f, "allow"),
            ModerationAction::Flag => write!(f, "flag"),
            ModerationAction::Blur => write!(f, "blur"),
            ModerationAction::Escalate => write!(f, "escalate"),
            ModerationAction::Block => write!(f, "block"),
        }
    }
}

/// A moderation record created whenever a frame classifies above tier 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentFlag {
    pub id: String,
    pub stream_id: String,
    pub analysis_id: Option<String>,
    pub category: String,
    /// Moderation tier 0-4.
    pub tier: u8,
    pub reason: String,
    pub status: FlagStatus,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

/// A safety alert derived from an analysis result with medium or higher
/// concern. Acknowledged at most once by an external action; never
/// deleted by the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub stream_id: String,
    pub severity: Severity,
    pub message: String,
    pub metadata: serde_json::Value,
    pub acknowledged: bool,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// The payload fanned out to notification channels for one escalation
/// step of an alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertNotice {
    pub alert_id: String,
    pub stream_id: String,
    pub severity: Severity,
    pub message: String,
    /// Escalation level this notice was emitted at (0-4).
    pub level: u8,
    pub volume_percent: u8,
    pub sound_profile: String,
    pub created_at: DateTime<Utc>,
}

/// Kind of notification channel an escalation level fans out to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Push,
    Sms,
    Telegram,
    Webhook,
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelKind::Push => write!(f, "push"),
            ChannelKind::Sms => write!(f, "sms"),
            ChannelKind::Telegram => write!(f, "telegram"),
            ChannelKind::Webhook => write!(f, "webhook"),
        }
    }
}

impl std::str::FromStr for ChannelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "push" => Ok(ChannelKind::Push),
            "sms" => Ok(ChannelKind::Sms),
            "telegram" => Ok(ChannelKind::Telegram),
            "webhook" => Ok(ChannelKind::Webhook),
            _ => Err(format!("unknown channel kind: {s}")),
        }
    }
}

/// Serialize frame bytes as base64 so job rows stay printable when
/// persisted or logged as JSON.
mod serde_bytes_base64 {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], ser: S) -> Result<S::Ok, S::Error> {
        use base64::Engine;
        ser.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<u8>, D::Error> {
        use base64::Engine;
        let s = String::deserialize(de)?;
        base64::engine::general_purpose::STANDARD
            .decode(s)
            .map_err(serde::de::Error::custom)
    }
}
