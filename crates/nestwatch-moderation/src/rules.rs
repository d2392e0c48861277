use crate::TierVerdict;

/// One keyword rule: any keyword hit classifies the frame at `tier`.
#[derive(Debug, Clone)]
pub struct KeywordRule {
    pub tier: u8,
    pub category: String,
    pub keywords: Vec<String>,
}

/// Deterministic keyword rule set, the fallback classifier used when no
/// AI provider is reachable.
///
/// Rules are evaluated from the highest tier down, so the most severe
/// match wins. Matching is case-insensitive substring matching over the
/// frame context labels.
#[derive(Debug, Clone)]
pub struct KeywordRules {
    rules: Vec<KeywordRule>,
}

impl KeywordRules {
    pub fn new(mut rules: Vec<KeywordRule>) -> Self {
        rules.sort_by(|a, b| b.tier.cmp(&a.tier));
        Self { rules }
    }

    /// Classify free-form label text. Returns tier 0 when nothing matches.
    pub fn classify(&self, labels: &[String]) -> TierVerdict {
        let haystack = labels.join(" ").to_lowercase();
        for rule in &self.rules {
            for keyword in &rule.keywords {
                if haystack.contains(keyword.as_str()) {
                    return TierVerdict {
                        tier: rule.tier,
                        category: rule.category.clone(),
                        reason: format!("keyword rule matched '{keyword}'"),
                    };
                }
            }
        }
        TierVerdict::safe()
    }

    pub fn rules(&self) -> &[KeywordRule] {
        &self.rules
    }
}

impl Default for KeywordRules {
    fn default() -> Self {
        Self::new(vec![
            KeywordRule {
                tier: 4,
                category: "prohibited".to_string(),
                keywords: ["csam", "exploitation", "abuse material"]
                    .map(String::from)
                    .to_vec(),
            },
            KeywordRule {
                tier: 3,
                category: "violence".to_string(),
                keywords: ["weapon", "violence", "blood"].map(String::from).to_vec(),
            },
            KeywordRule {
                tier: 2,
                category: "adult".to_string(),
                keywords: ["nudity", "explicit", "nsfw"].map(String::from).to_vec(),
            },
            KeywordRule {
                tier: 1,
                category: "suggestive".to_string(),
                keywords: ["suggestive", "revealing"].map(String::from).to_vec(),
            },
        ])
    }
}
