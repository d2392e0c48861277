//! Content moderation gate for the frame pipeline.
//!
//! Every frame is classified into a tier 0-4 before analysis. The tier
//! maps to a deterministic action (allow, flag, blur, escalate, block),
//! any tier above 0 produces a [`ContentFlag`] row for human review,
//! and tier 4 can trigger an account-level ban cascade. When no AI
//! classifier is reachable the gate falls back to a deterministic
//! keyword rule set, so content is never passed through unscreened.

pub mod gate;
pub mod rules;


use async_trait::async_trait;
use nestwatch_common::types::Scenario;

pub use gate::{GateDecision, ModerationConfig, ModerationGate, ModerationStats};
pub use rules::KeywordRules;

/// Context accompanying a frame through moderation. `labels` carries
/// free-form hints from the session layer (stream title, user tags)
/// that the keyword fallback classifies on.
#[derive(Debug, Clone)]
pub struct FrameContext {
    pub stream_id: String,
    pub user_id: String,
    pub scenario: Scenario,
    pub labels: Vec<String>,
}

/// A tier classification with the category and reasoning behind it.
#[derive(Debug, Clone)]
pub struct TierVerdict {
    /// Moderation tier 0-4.
    pub tier: u8,
    pub category: String,
    pub reason: String,
}

impl TierVerdict {
    pub fn safe() -> Self {
        Self {
            tier: 0,
            category: "safe".to_string(),
            reason: "no rule matched".to_string(),
        }
    }
}

/// AI-backed frame classifier. Failures fall through to the keyword
/// rule set; they never fail the gate open.
#[async_trait]
pub trait ModerationProvider: Send + Sync {
    fn provider(&self) -> &str;

    async fn classify(&self, frame: &[u8], ctx: &FrameContext) -> anyhow::Result<TierVerdict>;
}

/// Hook into the session layer for the tier-4 ban cascade: bans the
/// account and ends all of its active streams.
#[async_trait]
pub trait SessionControl: Send + Sync {
    async fn ban_user(&self, user_id: &str, reason: &str) -> anyhow::Result<()>;
}
