use crate::chain::FallbackChain;
use crate::error::{Result, VisionError};
use crate::{parse, AnalysisReport, TriageReport, VisionProvider};
use async_trait::async_trait;
use nestwatch_common::types::{ConcernLevel, Scenario};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Scripted provider: either always fails or always answers with a
/// fixed report, counting how many calls it received.
struct FakeProvider {
    name: &'static str,
    fail: bool,
    calls: AtomicU32,
}

impl FakeProvider {
    fn ok(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            fail: false,
            calls: AtomicU32::new(0),
        })
    }

    fn failing(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            fail: true,
            calls: AtomicU32::new(0),
        })
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VisionProvider for FakeProvider {
    fn provider(&self) -> &str {
        self.name
    }

    fn model_name(&self) -> &str {
        "fake-model"
    }

    async fn triage(&self, _frame: &[u8], _scenario: Scenario) -> Result<TriageReport> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(VisionError::unavailable(self.name, "connection refused"));
        }
        Ok(TriageReport {
            needs_detailed_analysis: false,
            concern_level: ConcernLevel::None,
            summary: format!("all quiet ({})", self.name),
        })
    }

    async fn analyze(&self, _frame: &[u8], _scenario: Scenario) -> Result<AnalysisReport> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(VisionError::unavailable(self.name, "connection refused"));
        }
        Ok(AnalysisReport {
            concern_level: ConcernLevel::Low,
            description: format!("detailed ({})", self.name),
            issues: vec![],
        })
    }
}

#[tokio::test]
async fn chain_prefers_local_provider() {
    let local = FakeProvider::ok("local");
    let cloud_a = FakeProvider::ok("cloud-a");
    let chain = FallbackChain::new(local.clone(), vec![cloud_a.clone() as Arc<dyn VisionProvider>]);

    let result = chain.triage(b"frame", Scenario::Baby).await.unwrap();
    assert_eq!(result.provider, "local");
    assert!(!result.is_cloud_fallback);
    assert_eq!(cloud_a.calls(), 0);
}

#[tokio::test]
async fn chain_falls_back_in_configured_order() {
    let local = FakeProvider::failing("local");
    let cloud_a = FakeProvider::ok("cloud-a");
    let cloud_b = FakeProvider::ok("cloud-b");
    let chain = FallbackChain::new(
        local.clone(),
        vec![
            cloud_a.clone() as Arc<dyn VisionProvider>,
            cloud_b.clone() as Arc<dyn VisionProvider>,
        ],
    );

    let result = chain.triage(b"frame", Scenario::Pet).await.unwrap();
    assert_eq!(result.provider, "cloud-a");
    assert!(result.is_cloud_fallback);
    // cloud-a succeeded, so cloud-b must never be called
    assert_eq!(cloud_a.calls(), 1);
    assert_eq!(cloud_b.calls(), 0);
}

#[tokio::test]
async fn chain_exhaustion_reports_all_attempts() {
    let local = FakeProvider::failing("local");
    let cloud_a = FakeProvider::failing("cloud-a");
    let chain = FallbackChain::new(local, vec![cloud_a as Arc<dyn VisionProvider>]);

    let err = chain.analyze(b"frame", Scenario::Elderly).await.unwrap_err();
    match err {
        VisionError::ChainExhausted { attempted, last_error } => {
            assert_eq!(attempted, 2);
            assert!(last_error.contains("cloud-a"));
        }
        other => panic!("expected ChainExhausted, got {other}"),
    }
}

#[tokio::test]
async fn chain_without_cloud_keeps_local_error() {
    let local = FakeProvider::failing("local");
    let chain = FallbackChain::new(local, Vec::new());

    let err = chain.triage(b"frame", Scenario::Baby).await.unwrap_err();
    match err {
        VisionError::ChainExhausted { attempted, last_error } => {
            assert_eq!(attempted, 1);
            assert!(last_error.contains("local"));
        }
        other => panic!("expected ChainExhausted, got {other}"),
    }
}

// Parsing strategy tests

#[test]
fn parse_triage_strict_json() {
    let content = r#"{"needs_detailed_analysis": true, "concern_level": "high", "summary": "baby face down"}"#;
    let report = parse::parse_triage("local", content).unwrap();
    assert!(report.needs_detailed_analysis);
    assert_eq!(report.concern_level, ConcernLevel::High);
    assert_eq!(report.summary, "baby face down");
}

#[test]
fn parse_triage_json_in_markdown_fence() {
    let content = "```json\n{\"needs_detailed_analysis\": false, \"concern_level\": \"none\", \"summary\": \"sleeping\"}\n```";
    let report = parse::parse_triage("local", content).unwrap();
    assert!(!report.needs_detailed_analysis);
    assert_eq!(report.concern_level, ConcernLevel::None);
}

#[test]
fn parse_triage_natural_language_fallback() {
    let content = "The scene looks dangerous. The child has climbed onto the crib rail.";
    let report = parse::parse_triage("local", content).unwrap();
    assert_eq!(report.concern_level, ConcernLevel::High);
    assert!(report.needs_detailed_analysis);
    assert_eq!(report.summary, "The scene looks dangerous");
}

#[test]
fn parse_analysis_extracts_bullet_issues() {
    let content = "Moderate concern in the nursery.\n- blanket near face\n- loose cord at crib edge\n";
    let report = parse::parse_analysis("local", content).unwrap();
    assert_eq!(report.concern_level, ConcernLevel::Medium);
    assert_eq!(
        report.issues,
        vec!["blanket near face".to_string(), "loose cord at crib edge".to_string()]
    );
}

#[test]
fn parse_analysis_empty_response_is_invalid() {
    let err = parse::parse_analysis("local", "   ").unwrap_err();
    assert!(matches!(err, VisionError::InvalidResponse { .. }));
}

#[test]
fn keyword_fallback_prefers_most_severe_term() {
    // "low" also appears, but critical must win
    let content = "Critical situation despite low lighting";
    let report = parse::parse_triage("local", content).unwrap();
    assert_eq!(report.concern_level, ConcernLevel::Critical);
}
