//! Clause matchers
//!
//! A matcher scores how well one block of text satisfies one requirement, in
//! `[0, 1]`. The conformance checker applies the thresholds.

use crate::config::{MatchStrategy, PolicyConfig};
use crate::patterns::{contains_phrase, normalize, token_coverage, tokenize};
use corpus_core::RankedPassage;
use shared_types::Requirement;
use std::collections::BTreeMap;

/// Distance kept between the semantic score ceiling and the high threshold
pub const SEMANTIC_MARGIN: f32 = 0.01;

/// Expansion terms a block must contain for the full semantic bonus
const FULL_EXPANSION_HITS: f32 = 3.0;

/// Reference material gathered for one requirement
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequirementEvidence {
    pub passages: Vec<RankedPassage>,
    /// Terms that co-occur with the requirement in reference passages, strongest first
    pub expansion_terms: Vec<String>,
    /// Why no evidence is available, when retrieval degraded
    pub degraded: Option<String>,
}

impl RequirementEvidence {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn degraded(reason: impl Into<String>) -> Self {
        Self {
            degraded: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Derive expansion terms from passages retrieved for `requirement`
    pub fn from_passages(requirement: &Requirement, passages: Vec<RankedPassage>, max_terms: usize) -> Self {
        let own: Vec<String> = requirement.patterns().flat_map(tokenize).collect();
        let mut weights: BTreeMap<String, f32> = BTreeMap::new();
        for passage in &passages {
            let mut seen: Vec<String> = tokenize(&passage.text);
            seen.sort();
            seen.dedup();
            for token in seen {
                if token.len() >= 4 && !token.chars().all(char::is_numeric) && !own.contains(&token) {
                    *weights.entry(token).or_insert(0.0) += passage.score.max(0.0);
                }
            }
        }
        let mut ranked: Vec<(String, f32)> = weights.into_iter().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        Self {
            expansion_terms: ranked.into_iter().take(max_terms).map(|(t, _)| t).collect(),
            passages,
            degraded: None,
        }
    }

    pub fn top_source(&self) -> Option<&str> {
        self.passages.first().map(|p| p.source.as_str())
    }
}

/// Retrieval query used to gather evidence for a requirement
pub fn requirement_query(requirement: &Requirement) -> String {
    format!("{} {}", requirement.description, requirement.required_clause_pattern)
}

pub trait ClauseMatcher: Send + Sync {
    fn name(&self) -> &str;

    /// True if scores depend on reference evidence
    fn uses_evidence(&self) -> bool {
        false
    }

    /// Match strength of `text` for `requirement`, in `[0, 1]`
    fn score(&self, requirement: &Requirement, text: &str, evidence: &RequirementEvidence) -> f32;
}

/// Whole-phrase containment of the pattern or an alias
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactMatcher;

impl ClauseMatcher for ExactMatcher {
    fn name(&self) -> &str {
        "exact"
    }

    fn score(&self, requirement: &Requirement, text: &str, _evidence: &RequirementEvidence) -> f32 {
        let text = normalize(text);
        if requirement.patterns().any(|p| contains_phrase(&text, p)) {
            1.0
        } else {
            0.0
        }
    }
}

/// Best token coverage over the pattern and its aliases
#[derive(Debug, Clone, Copy, Default)]
pub struct FuzzyMatcher;

impl ClauseMatcher for FuzzyMatcher {
    fn name(&self) -> &str {
        "fuzzy"
    }

    fn score(&self, requirement: &Requirement, text: &str, _evidence: &RequirementEvidence) -> f32 {
        let normalized = normalize(text);
        if requirement.patterns().any(|p| contains_phrase(&normalized, p)) {
            return 1.0;
        }
        let tokens = tokenize(text);
        requirement
            .patterns()
            .map(|p| token_coverage(&tokenize(p), &tokens))
            .fold(0.0, f32::max)
    }
}

/// Fuzzy matching expanded with terms from reference passages
///
/// Expansion can lift a score toward the high threshold but never to it, so
/// reference material alone never satisfies a requirement.
#[derive(Debug, Clone, Copy)]
pub struct SemanticMatcher {
    high: f32,
    bonus: f32,
}

impl SemanticMatcher {
    pub fn new(high: f32, bonus: f32) -> Self {
        Self { high, bonus }
    }

    fn ceiling(&self) -> f32 {
        (self.high - SEMANTIC_MARGIN).max(0.0)
    }
}

impl ClauseMatcher for SemanticMatcher {
    fn name(&self) -> &str {
        "semantic"
    }

    fn uses_evidence(&self) -> bool {
        true
    }

    fn score(&self, requirement: &Requirement, text: &str, evidence: &RequirementEvidence) -> f32 {
        let base = FuzzyMatcher.score(requirement, text, evidence);
        if base >= self.high || evidence.expansion_terms.is_empty() {
            return base;
        }
        let tokens = tokenize(text);
        let hits = evidence
            .expansion_terms
            .iter()
            .filter(|t| tokens.iter().any(|tok| tok == *t))
            .count() as f32;
        let lift = self.bonus * (hits / FULL_EXPANSION_HITS).min(1.0);
        (base + lift).min(self.ceiling()).max(base)
    }
}

/// Matcher selected by the policy
pub fn matcher_for(policy: &PolicyConfig) -> Box<dyn ClauseMatcher> {
    match policy.matching.strategy {
        MatchStrategy::Exact => Box::new(ExactMatcher),
        MatchStrategy::Fuzzy => Box::new(FuzzyMatcher),
        MatchStrategy::Semantic => Box::new(SemanticMatcher::new(
            policy.thresholds.match_high,
            policy.matching.semantic_bonus,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{ProcessCategory, Severity};

    fn requirement(pattern: &str, aliases: &[&str]) -> Requirement {
        Requirement {
            id: "R1".to_string(),
            process_category: ProcessCategory::Incorporation,
            description: "Registered office".to_string(),
            required_clause_pattern: pattern.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            severity: Severity::High,
            document_type: None,
        }
    }

    #[test]
    fn test_exact_matcher() {
        let r = requirement("registered office", &["principal place of business"]);
        let none = RequirementEvidence::none();
        assert_eq!(ExactMatcher.score(&r, "The Registered Office is at Al Maryah Island", &none), 1.0);
        assert_eq!(ExactMatcher.score(&r, "Its principal place of business is ADGM", &none), 1.0);
        assert_eq!(ExactMatcher.score(&r, "The office is registered", &none), 0.0);
    }

    #[test]
    fn test_fuzzy_matcher_coverage() {
        let r = requirement("appointment of directors", &[]);
        let none = RequirementEvidence::none();
        assert_eq!(FuzzyMatcher.score(&r, "Directors: appointment and removal", &none), 1.0);
        assert_eq!(FuzzyMatcher.score(&r, "The directors may meet", &none), 0.5);
        assert_eq!(FuzzyMatcher.score(&r, "", &none), 0.0);
    }

    #[test]
    fn test_semantic_never_reaches_high_from_evidence() {
        let r = requirement("registered office", &[]);
        let evidence = RequirementEvidence {
            expansion_terms: vec!["address".into(), "maryah".into(), "island".into(), "tower".into()],
            ..Default::default()
        };
        let matcher = SemanticMatcher::new(0.85, 0.9);

        let lifted = matcher.score(&r, "Office address: Al Maryah Island tower", &evidence);
        assert!(lifted < 0.85);
        assert!(lifted >= 0.5);

        // a real match still scores fully
        assert_eq!(matcher.score(&r, "The registered office is in ADGM", &evidence), 1.0);
    }

    #[test]
    fn test_expansion_terms_from_passages() {
        let r = requirement("registered office", &[]);
        let passages = vec![
            RankedPassage::new("a#0", "Companies Regulations", "The registered office address must be in ADGM", 1.0),
            RankedPassage::new("a#1", "Companies Regulations", "Notify the Registrar of any change of address", 0.5),
        ];
        let evidence = RequirementEvidence::from_passages(&r, passages, 3);
        assert_eq!(evidence.expansion_terms[0], "address");
        assert!(!evidence.expansion_terms.contains(&"office".to_string()));
        assert_eq!(evidence.expansion_terms.len(), 3);
        assert_eq!(evidence.top_source(), Some("Companies Regulations"));
    }
}
