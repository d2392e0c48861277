use crate::error::{Result, VisionError};
use crate::{AnalysisReport, TriageReport, VisionProvider};
use nestwatch_common::types::Scenario;
use std::sync::Arc;

/// A report together with which provider served it.
#[derive(Debug, Clone)]
pub struct ChainResult<T> {
    pub report: T,
    pub provider: String,
    pub model: String,
    pub is_cloud_fallback: bool,
}

/// Local-first provider chain with ordered cloud fallback.
///
/// Every call tries the local provider first; on failure the cloud
/// providers are attempted in their configured order (cheapest first by
/// convention) until one succeeds. The result records whether a cloud
/// provider had to step in.
pub struct FallbackChain {
    local: Arc<dyn VisionProvider>,
    cloud: Vec<Arc<dyn VisionProvider>>,
}

impl FallbackChain {
    pub fn new(local: Arc<dyn VisionProvider>, cloud: Vec<Arc<dyn VisionProvider>>) -> Self {
        Self { local, cloud }
    }

    pub async fn triage(&self, frame: &[u8], scenario: Scenario) -> Result<ChainResult<TriageReport>> {
        self.run(|p| {
            let frame = frame.to_vec();
            async move { p.triage(&frame, scenario).await }
        })
        .await
    }

    pub async fn analyze(
        &self,
        frame: &[u8],
        scenario: Scenario,
    ) -> Result<ChainResult<AnalysisReport>> {
        self.run(|p| {
            let frame = frame.to_vec();
            async move { p.analyze(&frame, scenario).await }
        })
        .await
    }

    async fn run<T, F, Fut>(&self, mut op: F) -> Result<ChainResult<T>>
    where
        F: FnMut(Arc<dyn VisionProvider>) -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut attempted = 0usize;

        let mut last_error = match op(self.local.clone()).await {
            Ok(report) => {
                return Ok(ChainResult {
                    report,
                    provider: self.local.provider().to_string(),
                    model: self.local.model_name().to_string(),
                    is_cloud_fallback: false,
                });
            }
            Err(e) => {
                attempted += 1;
                tracing::warn!(
                    provider = self.local.provider(),
                    error = %e,
                    "Local vision provider failed, trying cloud fallback"
                );
                e.to_string()
            }
        };

        for provider in &self.cloud {
            match op(provider.clone()).await {
                Ok(report) => {
                    tracing::info!(
                        provider = provider.provider(),
                        model = provider.model_name(),
                        "Cloud fallback provider served the request"
                    );
                    return Ok(ChainResult {
                        report,
                        provider: provider.provider().to_string(),
                        model: provider.model_name().to_string(),
                        is_cloud_fallback: true,
                    });
                }
                Err(e) => {
                    attempted += 1;
                    tracing::warn!(
                        provider = provider.provider(),
                        error = %e,
                        "Cloud vision provider failed"
                    );
                    last_error = e.to_string();
                }
            }
        }

        Err(VisionError::ChainExhausted {
            attempted,
            last_error,
        })
    }
}
