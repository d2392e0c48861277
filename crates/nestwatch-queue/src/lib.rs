//! Priority job scheduler and the frame-to-alert pipeline it drives.
//!
//! Frames enter through [`queue::AnalysisQueue::enqueue`], ordered by a
//! priority derived from the monitoring scenario and the frame's motion
//! and audio scores. A dispatch loop feeds jobs into the
//! [`pipeline::FramePipeline`], which runs moderation, vision triage,
//! detailed analysis when warranted, persistence, and finally alerting
//! with escalation. Transient failures are retried with the same job id
//! and priority.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod queue;


pub use config::{AppConfig, ChannelSettings, QueueConfig};
pub use error::QueueError;
pub use pipeline::{FramePipeline, PipelineOutcome};
pub use queue::{compute_priority, AnalysisQueue, QueueStatus};
