use crate::config::QueueConfig;
use crate::error::{QueueError, Result};
use crate::pipeline::{FramePipeline, PipelineOutcome};
use chrono::Utc;
use nestwatch_common::id;
use nestwatch_common::types::{AnalysisJob, JobStatus, Scenario};
use nestwatch_storage::MonitorStore;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Snapshot of the queue's counters.
#[derive(Debug, Clone, Serialize)]
pub struct QueueStatus {
    pub pending: usize,
    pub processing: usize,
    pub completed: u64,
    pub failed: u64,
    /// Jobs completed by a moderation block, without analysis.
    pub moderation_blocked: u64,
    /// Results that could not be persisted (alert step skipped).
    pub persist_failures: u64,
    pub is_running: bool,
}

struct Inner {
    config: RwLock<QueueConfig>,
    pending: Mutex<VecDeque<AnalysisJob>>,
    in_flight: AtomicUsize,
    completed: AtomicU64,
    failed: AtomicU64,
    moderation_blocked: AtomicU64,
    persist_failures: AtomicU64,
    running: AtomicBool,
    pipeline: Arc<FramePipeline>,
    store: Arc<dyn MonitorStore>,
}

impl Inner {
    fn lock_pending(&self) -> MutexGuard<'_, VecDeque<AnalysisJob>> {
        match self.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn config_snapshot(&self) -> QueueConfig {
        match self.config.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Insert keeping the deque sorted by descending priority, behind
    /// every job of equal priority so ties stay FIFO.
    fn push(&self, job: AnalysisJob) {
        let mut pending = self.lock_pending();
        let pos = pending
            .iter()
            .position(|queued| queued.priority < job.priority)
            .unwrap_or(pending.len());
        pending.insert(pos, job);
    }

    fn pop(&self) -> Option<AnalysisJob> {
        self.lock_pending().pop_front()
    }

    async fn dispatch_loop(self: Arc<Self>) {
        loop {
            let config = self.config_snapshot();
            tokio::time::sleep(Duration::from_millis(config.tick_ms)).await;
            if !self.running.load(Ordering::SeqCst) {
                break;
            }

            while self.in_flight.load(Ordering::SeqCst) < config.max_concurrency {
                let Some(job) = self.pop() else {
                    break;
                };
                self.in_flight.fetch_add(1, Ordering::SeqCst);
                let inner = self.clone();
                tokio::spawn(async move {
                    inner.clone().run_job(job).await;
                    inner.in_flight.fetch_sub(1, Ordering::SeqCst);
                });
            }
        }
        tracing::debug!("Dispatch loop exited");
    }

    async fn run_job(self: Arc<Self>, job: AnalysisJob) {
        if let Err(e) = self
            .store
            .update_job_status(&job.id, JobStatus::Processing)
            .await
        {
            tracing::warn!(job_id = %job.id, error = %e, "Failed to mark job processing");
        }

        let config = self.config_snapshot();
        match self
            .pipeline
            .process(&job, config.cloud_fallback_threshold)
            .await
        {
            Ok(outcome) => {
                match outcome {
                    PipelineOutcome::Blocked { tier } => {
                        self.moderation_blocked.fetch_add(1, Ordering::Relaxed);
                        tracing::info!(job_id = %job.id, tier = tier, "Job completed: blocked");
                    }
                    PipelineOutcome::Completed {
                        concern,
                        alerted,
                        persist_failed,
                    } => {
                        if persist_failed {
                            self.persist_failures.fetch_add(1, Ordering::Relaxed);
                        }
                        tracing::info!(
                            job_id = %job.id,
                            concern = %concern,
                            alerted = alerted,
                            "Job completed"
                        );
                    }
                }
                self.finish(&job.id, JobStatus::Completed).await;
                self.completed.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => self.handle_failure(job, e).await,
        }
    }

    /// Retry with the same id and priority after the configured delay,
    /// or mark the job failed once retries are exhausted.
    async fn handle_failure(self: Arc<Self>, mut job: AnalysisJob, error: anyhow::Error) {
        let config = self.config_snapshot();
        if job.retries < config.max_retries {
            job.retries += 1;
            job.status = JobStatus::Pending;
            tracing::warn!(
                job_id = %job.id,
                retries = job.retries,
                max_retries = config.max_retries,
                error = %error,
                "Job failed, scheduling retry"
            );
            if let Err(e) = self
                .store
                .update_job_status(&job.id, JobStatus::Pending)
                .await
            {
                tracing::warn!(job_id = %job.id, error = %e, "Failed to mark job pending");
            }
            let inner = self.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(config.retry_delay_ms)).await;
                inner.push(job);
            });
        } else {
            tracing::error!(
                job_id = %job.id,
                retries = job.retries,
                error = %error,
                "Job failed after exhausting retries"
            );
            self.finish(&job.id, JobStatus::Failed).await;
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    async fn finish(&self, job_id: &str, status: JobStatus) {
        if let Err(e) = self.store.update_job_status(job_id, status).await {
            tracing::warn!(job_id = %job_id, status = %status, error = %e, "Failed to record terminal job status");
        }
    }
}

/// Priority-ordered job scheduler feeding the frame pipeline.
///
/// Producers enqueue frames from any task; a single dispatch loop pops
/// the highest-priority job whenever an execution slot is free and runs
/// it as its own task, so slow analyses never stall dispatch.
pub struct AnalysisQueue {
    inner: Arc<Inner>,
    dispatch_handle: Mutex<Option<JoinHandle<()>>>,
}

impl AnalysisQueue {
    pub fn new(
        config: QueueConfig,
        store: Arc<dyn MonitorStore>,
        pipeline: Arc<FramePipeline>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                config: RwLock::new(config),
                pending: Mutex::new(VecDeque::new()),
                in_flight: AtomicUsize::new(0),
                completed: AtomicU64::new(0),
                failed: AtomicU64::new(0),
                moderation_blocked: AtomicU64::new(0),
                persist_failures: AtomicU64::new(0),
                running: AtomicBool::new(false),
                pipeline,
                store,
            }),
            dispatch_handle: Mutex::new(None),
        }
    }

    /// Accept a frame for analysis. Returns the new job's id.
    ///
    /// # Errors
    ///
    /// `InvalidJob` if the frame is empty; `Storage` if the job row
    /// cannot be written.
    pub async fn enqueue(
        &self,
        stream_id: &str,
        scenario: Scenario,
        frame: Vec<u8>,
        motion_score: u8,
        audio_level: u8,
    ) -> Result<String> {
        if frame.is_empty() {
            return Err(QueueError::InvalidJob("frame data is empty".to_string()));
        }

        let priority = compute_priority(scenario, motion_score, audio_level);
        let job = AnalysisJob {
            id: id::next_id(),
            stream_id: stream_id.to_string(),
            scenario,
            frame,
            motion_score,
            audio_level,
            priority,
            retries: 0,
            status: JobStatus::Pending,
            created_at: Utc::now(),
        };
        self.inner.store.insert_job(&job).await?;

        tracing::debug!(
            job_id = %job.id,
            stream_id = %stream_id,
            scenario = %scenario,
            priority = priority,
            "Job enqueued"
        );
        let job_id = job.id.clone();
        self.inner.push(job);
        Ok(job_id)
    }

    /// Start the dispatch loop. Calling start on a running queue is a
    /// no-op.
    pub fn start(&self) {
        if self.inner.running.swap(true, Ordering::SeqCst) {
            return;
        }
        let inner = self.inner.clone();
        let handle = tokio::spawn(inner.dispatch_loop());
        match self.dispatch_handle.lock() {
            Ok(mut guard) => *guard = Some(handle),
            Err(poisoned) => *poisoned.into_inner() = Some(handle),
        }
        tracing::info!("Analysis queue started");
    }

    /// Stop dispatching and drain in-flight jobs, bounded by
    /// `processing_timeout_ms`. Stragglers are abandoned and logged;
    /// pending jobs stay queued for the next start.
    pub async fn stop(&self) {
        if !self.inner.running.swap(false, Ordering::SeqCst) {
            return;
        }

        let handle = match self.dispatch_handle.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Dispatch loop task ended abnormally");
            }
        }

        let timeout = Duration::from_millis(self.inner.config_snapshot().processing_timeout_ms);
        let deadline = tokio::time::Instant::now() + timeout;
        while self.inner.in_flight.load(Ordering::SeqCst) > 0
            && tokio::time::Instant::now() < deadline
        {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        let abandoned = self.inner.in_flight.load(Ordering::SeqCst);
        if abandoned > 0 {
            tracing::warn!(
                jobs = abandoned,
                "Drain timeout reached, abandoning in-flight jobs"
            );
        }
        tracing::info!("Analysis queue stopped");
    }

    pub fn status(&self) -> QueueStatus {
        QueueStatus {
            pending: self.inner.lock_pending().len(),
            processing: self.inner.in_flight.load(Ordering::SeqCst),
            completed: self.inner.completed.load(Ordering::Relaxed),
            failed: self.inner.failed.load(Ordering::Relaxed),
            moderation_blocked: self.inner.moderation_blocked.load(Ordering::Relaxed),
            persist_failures: self.inner.persist_failures.load(Ordering::Relaxed),
            is_running: self.inner.running.load(Ordering::SeqCst),
        }
    }

    pub fn config(&self) -> QueueConfig {
        self.inner.config_snapshot()
    }

    pub fn update_config(&self, config: QueueConfig) {
        match self.inner.config.write() {
            Ok(mut guard) => *guard = config,
            Err(poisoned) => *poisoned.into_inner() = config,
        }
    }

    #[cfg(test)]
    pub(crate) fn pending_ids(&self) -> Vec<String> {
        self.inner
            .lock_pending()
            .iter()
            .map(|j| j.id.clone())
            .collect()
    }
}

/// Priority = scenario weight, plus 5 for strong motion, plus 5 for
/// loud audio.
pub fn compute_priority(scenario: Scenario, motion_score: u8, audio_level: u8) -> i32 {
    let mut priority = scenario.priority_weight();
    if motion_score > 50 {
        priority += 5;
    }
    if audio_level > 50 {
        priority += 5;
    }
    priority
}
