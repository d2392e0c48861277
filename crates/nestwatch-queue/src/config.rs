use anyhow::{Context, Result};
use nestwatch_common::types::ConcernLevel;
use nestwatch_escalate::EscalationLevel;
use nestwatch_moderation::ModerationConfig;
use nestwatch_notify::QuietHours;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunables for the analysis queue and its per-job pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Number of jobs processed concurrently.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Retries granted to a job after transient failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Delay before a retried job re-enters the queue.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// How long `stop()` waits for in-flight jobs before abandoning them.
    #[serde(default = "default_processing_timeout_ms")]
    pub processing_timeout_ms: u64,
    /// Dispatch loop tick interval.
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    /// Triage concern at or above which detailed analysis always runs,
    /// even when triage itself did not ask for it.
    #[serde(default = "default_cloud_fallback_threshold")]
    pub cloud_fallback_threshold: ConcernLevel,
}

fn default_max_concurrency() -> usize {
    2
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_processing_timeout_ms() -> u64 {
    60_000
}

fn default_tick_ms() -> u64 {
    100
}

fn default_cloud_fallback_threshold() -> ConcernLevel {
    ConcernLevel::Medium
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            processing_timeout_ms: default_processing_timeout_ms(),
            tick_ms: default_tick_ms(),
            cloud_fallback_threshold: default_cloud_fallback_threshold(),
        }
    }
}

/// One configured notification channel: a registry type name plus the
/// plugin-specific JSON blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelSettings {
    pub channel_type: String,
    pub config: serde_json::Value,
}

/// Top-level configuration for the whole pipeline, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub moderation: ModerationConfig,
    #[serde(default)]
    pub quiet_hours: QuietHours,
    /// Overrides the built-in escalation ladder when present.
    #[serde(default)]
    pub escalation_levels: Option<Vec<EscalationLevel>>,
    #[serde(default)]
    pub channels: Vec<ChannelSettings>,
}

impl AppConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }
}
