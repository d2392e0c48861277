use crate::error::{Result, StorageError};
use crate::MonitorStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nestwatch_common::types::{Alert, AnalysisJob, AnalysisResult, ContentFlag, JobStatus};
use std::collections::HashMap;
use std::sync::Mutex;

/// In-memory [`MonitorStore`] backed by mutexed maps.
///
/// Entity lifecycles match the data model: jobs are updated in place,
/// results and flags are append-only, alerts mutate only through
/// [`MonitorStore::acknowledge_alert`].
#[derive(Default)]
pub struct MemoryStore {
    jobs: Mutex<HashMap<String, AnalysisJob>>,
    results: Mutex<HashMap<String, AnalysisResult>>,
    alerts: Mutex<HashMap<String, Alert>>,
    flags: Mutex<HashMap<String, ContentFlag>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_job(&self, id: &str) -> Option<AnalysisJob> {
        self.jobs.lock().unwrap().get(id).cloned()
    }

    pub fn get_result(&self, id: &str) -> Option<AnalysisResult> {
        self.results.lock().unwrap().get(id).cloned()
    }

    /// Looks up the result produced for a given job id.
    pub fn result_for_job(&self, job_id: &str) -> Option<AnalysisResult> {
        self.results
            .lock()
            .unwrap()
            .values()
            .find(|r| r.frame_id == job_id)
            .cloned()
    }

    pub fn get_alert(&self, id: &str) -> Option<Alert> {
        self.alerts.lock().unwrap().get(id).cloned()
    }

    pub fn list_alerts(&self) -> Vec<Alert> {
        let mut alerts: Vec<Alert> = self.alerts.lock().unwrap().values().cloned().collect();
        alerts.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        alerts
    }

    pub fn list_flags(&self) -> Vec<ContentFlag> {
        let mut flags: Vec<ContentFlag> = self.flags.lock().unwrap().values().cloned().collect();
        flags.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        flags
    }

    pub fn result_count(&self) -> usize {
        self.results.lock().unwrap().len()
    }

    pub fn alert_count(&self) -> usize {
        self.alerts.lock().unwrap().len()
    }
}

#[async_trait]
impl MonitorStore for MemoryStore {
    async fn insert_job(&self, job: &AnalysisJob) -> Result<()> {
        let mut jobs = self.jobs.lock().unwrap();
        if jobs.contains_key(&job.id) {
            return Err(StorageError::DuplicateId {
                entity: "analysis_job",
                id: job.id.clone(),
            });
        }
        jobs.insert(job.id.clone(), job.clone());
        Ok(())
    }

    async fn update_job_status(&self, job_id: &str, status: JobStatus) -> Result<()> {
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs.get_mut(job_id).ok_or_else(|| StorageError::NotFound {
            entity: "analysis_job",
            id: job_id.to_string(),
        })?;
        if job.status.is_terminal() {
            return Err(StorageError::Conflict {
                entity: "analysis_job",
                id: job_id.to_string(),
                reason: format!("terminal status {} already set", job.status),
            });
        }
        job.status = status;
        Ok(())
    }

    async fn insert_result(&self, result: &AnalysisResult) -> Result<()> {
        let mut results = self.results.lock().unwrap();
        if results.contains_key(&result.id) {
            return Err(StorageError::DuplicateId {
                entity: "analysis_result",
                id: result.id.clone(),
            });
        }
        results.insert(result.id.clone(), result.clone());
        Ok(())
    }

    async fn insert_alert(&self, alert: &Alert) -> Result<()> {
        let mut alerts = self.alerts.lock().unwrap();
        if alerts.contains_key(&alert.id) {
            return Err(StorageError::DuplicateId {
                entity: "alert",
                id: alert.id.clone(),
            });
        }
        alerts.insert(alert.id.clone(), alert.clone());
        Ok(())
    }

    async fn acknowledge_alert(&self, alert_id: &str, at: DateTime<Utc>) -> Result<()> {
        let mut alerts = self.alerts.lock().unwrap();
        let alert = alerts
            .get_mut(alert_id)
            .ok_or_else(|| StorageError::NotFound {
                entity: "alert",
                id: alert_id.to_string(),
            })?;
        if alert.acknowledged {
            return Err(StorageError::Conflict {
                entity: "alert",
                id: alert_id.to_string(),
                reason: "already acknowledged".to_string(),
            });
        }
        alert.acknowledged = true;
        alert.acknowledged_at = Some(at);
        Ok(())
    }

    async fn insert_flag(&self, flag: &ContentFlag) -> Result<()> {
        let mut flags = self.flags.lock().unwrap();
        if flags.contains_key(&flag.id) {
            return Err(StorageError::DuplicateId {
                entity: "content_flag",
                id: flag.id.clone(),
            });
        }
        flags.insert(flag.id.clone(), flag.clone());
        Ok(())
    }
}
