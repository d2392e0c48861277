use crate::error::StorageError;
use crate::{MemoryStore, MonitorStore};
use chrono::Utc;
use nestwatch_common::types::{Alert, AnalysisJob, JobStatus, Scenario, Severity};

fn make_job(id: &str) -> AnalysisJob {
    AnalysisJob {
        id: id.to_string(),
        stream_id: "stream-1".to_string(),
        scenario: Scenario::Baby,
        frame: vec![0xFF, 0xD8],
        motion_score: 10,
        audio_level: 0,
        priority: 3,
        retries: 0,
        status: JobStatus::Pending,
        created_at: Utc::now(),
    }
}

fn make_alert(id: &str) -> Alert {
    Alert {
        id: id.to_string(),
        stream_id: "stream-1".to_string(),
        severity: Severity::High,
        message: "no movement detected".to_string(),
        metadata: serde_json::json!({}),
        acknowledged: false,
        acknowledged_at: None,
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn job_terminal_status_is_set_exactly_once() {
    let store = MemoryStore::new();
    store.insert_job(&make_job("j1")).await.unwrap();

    store
        .update_job_status("j1", JobStatus::Processing)
        .await
        .unwrap();
    store
        .update_job_status("j1", JobStatus::Completed)
        .await
        .unwrap();

    // Second terminal write must be rejected
    let err = store
        .update_job_status("j1", JobStatus::Failed)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Conflict { .. }));
    assert_eq!(store.get_job("j1").unwrap().status, JobStatus::Completed);
}

#[tokio::test]
async fn duplicate_job_insert_rejected() {
    let store = MemoryStore::new();
    store.insert_job(&make_job("j1")).await.unwrap();
    let err = store.insert_job(&make_job("j1")).await.unwrap_err();
    assert!(matches!(err, StorageError::DuplicateId { .. }));
}

#[tokio::test]
async fn alert_acknowledged_exactly_once() {
    let store = MemoryStore::new();
    store.insert_alert(&make_alert("a1")).await.unwrap();

    store.acknowledge_alert("a1", Utc::now()).await.unwrap();
    let alert = store.get_alert("a1").unwrap();
    assert!(alert.acknowledged);
    assert!(alert.acknowledged_at.is_some());

    let err = store.acknowledge_alert("a1", Utc::now()).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict { .. }));
}

#[tokio::test]
async fn acknowledge_unknown_alert_is_not_found() {
    let store = MemoryStore::new();
    let err = store
        .acknowledge_alert("missing", Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound { .. }));
}
