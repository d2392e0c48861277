//! Vision analysis contract with a local-first cloud-fallback chain.
//!
//! Frames go through a cheap [`VisionProvider::triage`] pass first; only
//! when triage asks for it does the more expensive
//! [`VisionProvider::analyze`] run. The [`chain::FallbackChain`] tries the
//! local provider, then an ordered list of cloud providers, and records
//! which one served the result.

pub mod chain;
pub mod error;
pub mod models;
pub mod parse;
pub mod prompt;
pub mod providers;

#[cfg(test)]
mod tests;

use async_trait::async_trait;
use error::Result;
use nestwatch_common::types::{ConcernLevel, Scenario};
use serde::{Deserialize, Serialize};

pub use chain::{ChainResult, FallbackChain};
pub use error::VisionError;
pub use providers::openai_compat::OpenAiCompatProvider;

/// Cheap first-pass verdict deciding whether deeper analysis is warranted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageReport {
    pub needs_detailed_analysis: bool,
    pub concern_level: ConcernLevel,
    pub summary: String,
}

/// Full analysis of a frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub concern_level: ConcernLevel,
    pub description: String,
    pub issues: Vec<String>,
}

/// A vision analysis backend (local model server or cloud API).
///
/// Both operations either return or fail within the provider's own
/// timeout; the chain does not cancel calls mid-flight.
#[async_trait]
pub trait VisionProvider: Send + Sync {
    /// Provider name (e.g., `"local"`, `"openai"`).
    fn provider(&self) -> &str;

    /// Model name the provider serves.
    fn model_name(&self) -> &str;

    /// Cheap triage pass over a frame.
    async fn triage(&self, frame: &[u8], scenario: Scenario) -> Result<TriageReport>;

    /// Detailed analysis of a frame.
    async fn analyze(&self, frame: &[u8], scenario: Scenario) -> Result<AnalysisReport>;
}
