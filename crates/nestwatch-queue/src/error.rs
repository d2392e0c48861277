use nestwatch_storage::error::StorageError;

/// Errors surfaced to callers of the queue's public API.
///
/// Everything that happens after a job is accepted (provider outages,
/// moderation blocks, persist failures) is absorbed by the pipeline and
/// visible only through job status and stats, never as an error to the
/// frame producer.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// The job was rejected at enqueue time.
    #[error("Queue: invalid job: {0}")]
    InvalidJob(String),

    /// Persisting the job row at enqueue time failed.
    #[error("Queue: storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type Result<T> = std::result::Result<T, QueueError>;
