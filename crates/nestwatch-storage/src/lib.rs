//! Opaque persistence contract for the monitoring pipeline.
//!
//! The core writes jobs, analysis results, alerts, and content flags
//! through [`MonitorStore`] and assumes nothing about the backing
//! schema beyond "each write is atomic individually". [`MemoryStore`]
//! is the reference implementation used in tests and single-process
//! deployments.

pub mod error;
pub mod memory;

#[cfg(test)]
mod tests;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use error::Result;
use nestwatch_common::types::{Alert, AnalysisJob, AnalysisResult, ContentFlag, JobStatus};

pub use memory::MemoryStore;

/// Persistence operations the pipeline core depends on.
///
/// Implementations must be safe to call concurrently from the queue's
/// worker tasks and the escalation manager.
#[async_trait]
pub trait MonitorStore: Send + Sync {
    /// Records a newly enqueued job.
    async fn insert_job(&self, job: &AnalysisJob) -> Result<()>;

    /// Updates a job's status. A terminal status (completed/failed) may
    /// be written at most once per job.
    async fn update_job_status(&self, job_id: &str, status: JobStatus) -> Result<()>;

    /// Persists an analysis result. Results are immutable once written.
    async fn insert_result(&self, result: &AnalysisResult) -> Result<()>;

    /// Persists a new alert.
    async fn insert_alert(&self, alert: &Alert) -> Result<()>;

    /// Marks an alert acknowledged. Returns `Conflict` if the alert was
    /// already acknowledged.
    async fn acknowledge_alert(&self, alert_id: &str, at: DateTime<Utc>) -> Result<()>;

    /// Persists a moderation flag for human review.
    async fn insert_flag(&self, flag: &ContentFlag) -> Result<()>;
}
