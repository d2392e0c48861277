//! Shared types for the nestwatch monitoring pipeline.
//!
//! Every crate in the workspace speaks in terms of the entities defined
//! here: analysis jobs and results, alerts, content flags, and the
//! ordinal scales (concern level, severity, moderation tier) that drive
//! the frame-to-alert pipeline.

pub mod id;
pub mod types;
