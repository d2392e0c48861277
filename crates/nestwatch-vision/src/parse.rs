//! Response parsing strategies.
//!
//! Providers are told to answer with a strict JSON object, but smaller
//! local models drift into prose. Each parser tries the JSON shape
//! first and falls back to a keyword extractor over the raw text, so
//! both paths yield the same report contract.

use crate::error::{Result, VisionError};
use crate::{AnalysisReport, TriageReport};
use nestwatch_common::types::ConcernLevel;
use serde::Deserialize;

#[derive(Deserialize)]
struct TriageJson {
    needs_detailed_analysis: bool,
    concern_level: String,
    summary: String,
}

#[derive(Deserialize)]
struct AnalysisJson {
    concern_level: String,
    description: String,
    #[serde(default)]
    issues: Vec<String>,
}

/// Parse a triage response, JSON first, keyword fallback second.
pub fn parse_triage(provider: &str, content: &str) -> Result<TriageReport> {
    if let Some(json) = extract_json_object(content) {
        if let Ok(parsed) = serde_json::from_str::<TriageJson>(&json) {
            return Ok(TriageReport {
                needs_detailed_analysis: parsed.needs_detailed_analysis,
                concern_level: parse_concern(&parsed.concern_level),
                summary: parsed.summary,
            });
        }
    }

    // Natural-language fallback: infer the level from keywords and let
    // anything above low trigger a detailed pass.
    let concern_level = extract_concern_level(content);
    let summary = first_sentence(content);
    if summary.is_empty() {
        return Err(VisionError::InvalidResponse {
            provider: provider.to_string(),
            reason: "empty triage response".to_string(),
        });
    }
    Ok(TriageReport {
        needs_detailed_analysis: concern_level > ConcernLevel::Low,
        concern_level,
        summary,
    })
}

/// Parse a detailed analysis response, JSON first, keyword fallback second.
pub fn parse_analysis(provider: &str, content: &str) -> Result<AnalysisReport> {
    if let Some(json) = extract_json_object(content) {
        if let Ok(parsed) = serde_json::from_str::<AnalysisJson>(&json) {
            return Ok(AnalysisReport {
                concern_level: parse_concern(&parsed.concern_level),
                description: parsed.description,
                issues: parsed.issues,
            });
        }
    }

    let description = first_sentence(content);
    if description.is_empty() {
        return Err(VisionError::InvalidResponse {
            provider: provider.to_string(),
            reason: "empty analysis response".to_string(),
        });
    }
    Ok(AnalysisReport {
        concern_level: extract_concern_level(content),
        description,
        issues: extract_bullet_issues(content),
    })
}

fn parse_concern(s: &str) -> ConcernLevel {
    s.trim().parse().unwrap_or(ConcernLevel::None)
}

/// Pull the first balanced `{...}` object out of a response that may be
/// wrapped in markdown fences or prose.
fn extract_json_object(content: &str) -> Option<String> {
    let start = content.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in content[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(content[start..start + i + 1].to_string());
                }
            }
            _ => {}
        }
    }
    None
}

/// Keyword extractor over free-form text. Checks the most severe terms
/// first so "critical" wins over an incidental "low".
fn extract_concern_level(content: &str) -> ConcernLevel {
    let lower = content.to_lowercase();
    if lower.contains("critical") || lower.contains("emergency") || lower.contains("immediate danger")
    {
        ConcernLevel::Critical
    } else if lower.contains("high concern")
        || lower.contains("high risk")
        || lower.contains("dangerous")
        || lower.contains("urgent")
    {
        ConcernLevel::High
    } else if lower.contains("medium") || lower.contains("moderate") || lower.contains("concerning")
    {
        ConcernLevel::Medium
    } else if lower.contains("low concern")
        || lower.contains("minor")
        || lower.contains("slight")
        || lower.contains("low risk")
    {
        ConcernLevel::Low
    } else {
        ConcernLevel::None
    }
}

/// Lines starting with a bullet become the issue list.
fn extract_bullet_issues(content: &str) -> Vec<String> {
    content
        .lines()
        .filter_map(|line| {
            let trimmed = line.trim();
            trimmed
                .strip_prefix("- ")
                .or_else(|| trimmed.strip_prefix("* "))
                .map(|s| s.trim().to_string())
        })
        .filter(|s| !s.is_empty())
        .collect()
}

fn first_sentence(content: &str) -> String {
    let trimmed = content.trim();
    match trimmed.find(['.', '\n']) {
        Some(idx) => trimmed[..idx].trim().to_string(),
        None => trimmed.to_string(),
    }
}
