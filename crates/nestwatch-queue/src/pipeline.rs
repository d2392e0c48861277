use anyhow::{Context, Result};
use chrono::Utc;
use nestwatch_common::id;
use nestwatch_common::types::{
    Alert, AlertNotice, AnalysisJob, AnalysisResult, ConcernLevel,
};
use nestwatch_escalate::EscalationManager;
use nestwatch_moderation::{FrameContext, ModerationGate};
use nestwatch_notify::NotificationDispatcher;
use nestwatch_storage::MonitorStore;
use nestwatch_vision::FallbackChain;
use std::sync::Arc;
use std::time::Instant;

/// How a job finished when no retryable error occurred.
#[derive(Debug, Clone)]
pub enum PipelineOutcome {
    /// Moderation blocked the frame. The job completes with no result
    /// and no alert.
    Blocked { tier: u8 },
    Completed {
        concern: ConcernLevel,
        /// An alert was created and escalation started.
        alerted: bool,
        /// The result could not be persisted; alerting was skipped.
        persist_failed: bool,
    },
}

/// The per-job path from frame to alert: moderation gate, triage,
/// optional detailed analysis, persist, then alert and escalation for
/// medium-or-higher concern.
pub struct FramePipeline {
    gate: Arc<ModerationGate>,
    chain: Arc<FallbackChain>,
    store: Arc<dyn MonitorStore>,
    escalation: Arc<EscalationManager>,
    dispatcher: Arc<NotificationDispatcher>,
}

impl FramePipeline {
    pub fn new(
        gate: Arc<ModerationGate>,
        chain: Arc<FallbackChain>,
        store: Arc<dyn MonitorStore>,
        escalation: Arc<EscalationManager>,
        dispatcher: Arc<NotificationDispatcher>,
    ) -> Self {
        Self {
            gate,
            chain,
            store,
            escalation,
            dispatcher,
        }
    }

    /// Run one job through the pipeline.
    ///
    /// An `Err` here means a transient failure (provider outage, gate
    /// store write) and the job is eligible for retry. Persist failures
    /// after analysis are absorbed: logged, reported in the outcome, and
    /// the alert step is skipped for that job.
    pub async fn process(
        &self,
        job: &AnalysisJob,
        detail_threshold: ConcernLevel,
    ) -> Result<PipelineOutcome> {
        let started = Instant::now();

        // The stream id doubles as the account key until a session layer
        // is wired in.
        let ctx = FrameContext {
            stream_id: job.stream_id.clone(),
            user_id: job.stream_id.clone(),
            scenario: job.scenario,
            labels: Vec::new(),
        };
        let decision = self
            .gate
            .screen(&ctx, &job.frame)
            .await
            .context("Moderation screening failed")?;
        if decision.is_blocked() {
            tracing::warn!(
                job_id = %job.id,
                stream_id = %job.stream_id,
                tier = decision.tier,
                category = %decision.category,
                "Frame blocked by moderation, skipping analysis"
            );
            return Ok(PipelineOutcome::Blocked {
                tier: decision.tier,
            });
        }

        let triage = self.chain.triage(&job.frame, job.scenario).await?;
        let needs_detail = triage.report.needs_detailed_analysis
            || triage.report.concern_level >= detail_threshold;

        let result = if needs_detail {
            let detail = self.chain.analyze(&job.frame, job.scenario).await?;
            self.build_result(
                job,
                started,
                detail.report.concern_level,
                detail.report.description,
                detail.report.issues,
                detail.model,
                detail.is_cloud_fallback,
            )
        } else {
            self.build_result(
                job,
                started,
                triage.report.concern_level,
                triage.report.summary,
                Vec::new(),
                triage.model,
                triage.is_cloud_fallback,
            )
        };

        if let Err(e) = self.store.insert_result(&result).await {
            tracing::error!(
                job_id = %job.id,
                result_id = %result.id,
                error = %e,
                "Failed to persist analysis result, skipping alert"
            );
            return Ok(PipelineOutcome::Completed {
                concern: result.concern_level,
                alerted: false,
                persist_failed: true,
            });
        }

        let alerted = if result.concern_level.warrants_alert() {
            self.raise_alert(&result).await
        } else {
            false
        };

        Ok(PipelineOutcome::Completed {
            concern: result.concern_level,
            alerted,
            persist_failed: false,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn build_result(
        &self,
        job: &AnalysisJob,
        started: Instant,
        concern_level: ConcernLevel,
        description: String,
        issues: Vec<String>,
        model: String,
        is_cloud_fallback: bool,
    ) -> AnalysisResult {
        AnalysisResult {
            id: id::next_id(),
            stream_id: job.stream_id.clone(),
            frame_id: job.id.clone(),
            concern_level,
            description,
            issues,
            processing_time_ms: started.elapsed().as_millis() as u64,
            model_used: model,
            is_cloud_fallback,
            created_at: Utc::now(),
        }
    }

    /// Create the alert, start its escalation, and send the immediate
    /// first notification at the starting level. Failures here are
    /// logged, never retried; the analysis result already stands.
    async fn raise_alert(&self, result: &AnalysisResult) -> bool {
        let alert = Alert {
            id: id::next_id(),
            stream_id: result.stream_id.clone(),
            severity: result.concern_level.to_severity(),
            message: result.description.clone(),
            metadata: serde_json::json!({
                "analysis_id": result.id,
                "issues": result.issues,
                "model_used": result.model_used,
                "is_cloud_fallback": result.is_cloud_fallback,
            }),
            acknowledged: false,
            acknowledged_at: None,
            created_at: Utc::now(),
        };

        if let Err(e) = self.store.insert_alert(&alert).await {
            tracing::error!(
                alert_id = %alert.id,
                stream_id = %alert.stream_id,
                error = %e,
                "Failed to persist alert"
            );
            return false;
        }

        let info = self.escalation.start_alert(&alert);
        tracing::info!(
            alert_id = %alert.id,
            stream_id = %alert.stream_id,
            severity = %alert.severity,
            level = info.current_level,
            "Alert created"
        );

        let notice = AlertNotice {
            alert_id: alert.id.clone(),
            stream_id: alert.stream_id.clone(),
            severity: alert.severity,
            message: alert.message.clone(),
            level: info.current_level,
            volume_percent: info.volume_percent,
            sound_profile: info.sound_profile.clone(),
            created_at: Utc::now(),
        };
        self.dispatcher.dispatch(&notice, &info.channels).await;
        true
    }
}
