use crate::rules::KeywordRules;
use crate::{FrameContext, ModerationProvider, SessionControl, TierVerdict};
use anyhow::{Context, Result};
use chrono::Utc;
use nestwatch_common::id;
use nestwatch_common::types::{ContentFlag, FlagStatus, ModerationAction};
use nestwatch_storage::MonitorStore;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationConfig {
    /// When true, a tier-4 classification also bans the account and
    /// ends all of its active streams.
    #[serde(default = "default_auto_block_tier4")]
    pub auto_block_tier4: bool,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            auto_block_tier4: default_auto_block_tier4(),
        }
    }
}

fn default_auto_block_tier4() -> bool {
    true
}

/// Counters exposed through the gate's stats surface.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ModerationStats {
    pub screened: u64,
    pub allowed: u64,
    pub flagged: u64,
    pub blurred: u64,
    pub escalated: u64,
    pub blocked: u64,
    /// Classifications served by the keyword fallback instead of the
    /// AI provider.
    pub fallback_classifications: u64,
}

#[derive(Default)]
struct StatCounters {
    screened: AtomicU64,
    allowed: AtomicU64,
    flagged: AtomicU64,
    blurred: AtomicU64,
    escalated: AtomicU64,
    blocked: AtomicU64,
    fallback_classifications: AtomicU64,
}

/// The gate's verdict for one frame.
#[derive(Debug, Clone)]
pub struct GateDecision {
    pub action: ModerationAction,
    pub tier: u8,
    pub category: String,
    /// Id of the ContentFlag row created for tier > 0.
    pub flag_id: Option<String>,
}

impl GateDecision {
    pub fn is_blocked(&self) -> bool {
        self.action == ModerationAction::Block
    }
}

/// Classifies frames into tiers and applies the tier's action.
///
/// The gate creates [`ContentFlag`] rows but never mutates their status
/// afterwards; review is an external concern.
pub struct ModerationGate {
    provider: Option<Arc<dyn ModerationProvider>>,
    rules: KeywordRules,
    store: Arc<dyn MonitorStore>,
    session_control: Option<Arc<dyn SessionControl>>,
    config: RwLock<ModerationConfig>,
    stats: StatCounters,
}

impl ModerationGate {
    pub fn new(
        provider: Option<Arc<dyn ModerationProvider>>,
        store: Arc<dyn MonitorStore>,
        session_control: Option<Arc<dyn SessionControl>>,
        config: ModerationConfig,
    ) -> Self {
        Self {
            provider,
            rules: KeywordRules::default(),
            store,
            session_control,
            config: RwLock::new(config),
            stats: StatCounters::default(),
        }
    }

    pub fn with_rules(mut self, rules: KeywordRules) -> Self {
        self.rules = rules;
        self
    }

    /// Screen a frame before analysis.
    ///
    /// Classifier failures fall back to the keyword rules; the only
    /// error path out of here is a store write failure, which the queue
    /// treats as retryable.
    pub async fn screen(&self, ctx: &FrameContext, frame: &[u8]) -> Result<GateDecision> {
        self.stats.screened.fetch_add(1, Ordering::Relaxed);

        let verdict = self.classify(ctx, frame).await;
        let auto_block = self.config().auto_block_tier4;
        let action = action_for_tier(verdict.tier);

        let flag_id = if verdict.tier > 0 {
            let flag = ContentFlag {
                id: id::next_id(),
                stream_id: ctx.stream_id.clone(),
                analysis_id: None,
                category: verdict.category.clone(),
                tier: verdict.tier,
                reason: verdict.reason.clone(),
                status: initial_flag_status(verdict.tier, auto_block),
                created_at: Utc::now(),
                reviewed_at: None,
            };
            self.store
                .insert_flag(&flag)
                .await
                .context("Failed to persist content flag")?;
            tracing::info!(
                stream_id = %ctx.stream_id,
                tier = verdict.tier,
                category = %verdict.category,
                flag_id = %flag.id,
                "Content flag created for review"
            );
            Some(flag.id)
        } else {
            None
        };

        match action {
            ModerationAction::Allow => {
                self.stats.allowed.fetch_add(1, Ordering::Relaxed);
            }
            ModerationAction::Flag => {
                self.stats.flagged.fetch_add(1, Ordering::Relaxed);
            }
            ModerationAction::Blur => {
                self.stats.blurred.fetch_add(1, Ordering::Relaxed);
            }
            ModerationAction::Escalate => {
                self.stats.escalated.fetch_add(1, Ordering::Relaxed);
            }
            ModerationAction::Block => {
                self.stats.blocked.fetch_add(1, Ordering::Relaxed);
                if auto_block {
                    self.ban_cascade(ctx, &verdict).await;
                }
            }
        }

        Ok(GateDecision {
            action,
            tier: verdict.tier,
            category: verdict.category,
            flag_id,
        })
    }

    async fn classify(&self, ctx: &FrameContext, frame: &[u8]) -> TierVerdict {
        if let Some(provider) = &self.provider {
            match provider.classify(frame, ctx).await {
                Ok(verdict) => return verdict,
                Err(e) => {
                    tracing::warn!(
                        provider = provider.provider(),
                        error = %e,
                        "Moderation provider failed, using keyword fallback"
                    );
                }
            }
        }
        self.stats
            .fallback_classifications
            .fetch_add(1, Ordering::Relaxed);
        self.rules.classify(&ctx.labels)
    }

    /// Tier-4 cascade: ban the account and end its streams. Best-effort;
    /// a cascade failure is logged, the frame stays blocked either way.
    async fn ban_cascade(&self, ctx: &FrameContext, verdict: &TierVerdict) {
        let Some(session_control) = &self.session_control else {
            tracing::warn!(
                user_id = %ctx.user_id,
                "Tier-4 content blocked but no session control is wired for the ban cascade"
            );
            return;
        };
        tracing::warn!(
            user_id = %ctx.user_id,
            stream_id = %ctx.stream_id,
            category = %verdict.category,
            "Tier-4 content: banning account and ending active streams"
        );
        if let Err(e) = session_control.ban_user(&ctx.user_id, &verdict.reason).await {
            tracing::error!(user_id = %ctx.user_id, error = %e, "Ban cascade failed");
        }
    }

    pub fn stats(&self) -> ModerationStats {
        ModerationStats {
            screened: self.stats.screened.load(Ordering::Relaxed),
            allowed: self.stats.allowed.load(Ordering::Relaxed),
            flagged: self.stats.flagged.load(Ordering::Relaxed),
            blurred: self.stats.blurred.load(Ordering::Relaxed),
            escalated: self.stats.escalated.load(Ordering::Relaxed),
            blocked: self.stats.blocked.load(Ordering::Relaxed),
            fallback_classifications: self
                .stats
                .fallback_classifications
                .load(Ordering::Relaxed),
        }
    }

    pub fn config(&self) -> ModerationConfig {
        match self.config.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn update_config(&self, config: ModerationConfig) {
        match self.config.write() {
            Ok(mut guard) => *guard = config,
            Err(poisoned) => *poisoned.into_inner() = config,
        }
    }
}

/// tier 0 → allow, 1 → flag, 2 → blur, 3 → escalate, 4+ → block.
pub fn action_for_tier(tier: u8) -> ModerationAction {
    match tier {
        0 => ModerationAction::Allow,
        1 => ModerationAction::Flag,
        2 => ModerationAction::Blur,
        3 => ModerationAction::Escalate,
        _ => ModerationAction::Block,
    }
}

fn initial_flag_status(tier: u8, auto_block: bool) -> FlagStatus {
    match tier {
        3 => FlagStatus::Escalated,
        4 if auto_block => FlagStatus::Banned,
        _ => FlagStatus::Pending,
    }
}
