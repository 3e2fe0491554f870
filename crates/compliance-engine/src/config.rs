//! Review policy configuration
//!
//! Thresholds, category signatures, checklists and detector vocabularies are
//! policy data, loaded from TOML. The default ADGM policy is embedded and can
//! be replaced at runtime with [`PolicyConfig::from_file`].

use anyhow::Context;
use serde::{Deserialize, Serialize};
use shared_types::{Checklist, ProcessCategory, Requirement, Severity};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

const BUILTIN_POLICY: &str = include_str!("../policy/adgm.toml");

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("Failed to parse policy: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid policy: {0}")]
    Invalid(String),
}

/// Complete review policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Policy revision, recorded in logs
    pub version: String,
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub retrieval: RetrievalPolicy,
    #[serde(default)]
    pub matching: MatchingPolicy,
    #[serde(default)]
    pub annotation: AnnotationPolicy,
    /// Keyword signatures used to classify the process category
    pub categories: Vec<CategorySignature>,
    /// Keyword lists used to recognise individual document types
    #[serde(default)]
    pub document_types: Vec<DocumentTypeSignature>,
    #[serde(default)]
    pub checklists: Vec<ChecklistConfig>,
    pub rules: RulesConfig,
}

impl PolicyConfig {
    /// The embedded ADGM policy
    pub fn builtin() -> Result<Self, PolicyError> {
        Self::from_str(BUILTIN_POLICY)
    }

    /// Load and validate a policy from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read
    /// - The TOML is malformed or misses required fields
    /// - The policy fails validation
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read policy file: {}", path.display()))?;
        Self::from_str(&content)
            .with_context(|| format!("Failed to load policy file: {}", path.display()))
    }

    /// Parse and validate a policy from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, PolicyError> {
        let policy: PolicyConfig = toml::from_str(s)?;
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<(), PolicyError> {
        let invalid = |msg: String| Err(PolicyError::Invalid(msg));
        let t = &self.thresholds;

        if !(t.match_low > 0.0 && t.match_low <= 1.0)
            || !(0.0..=1.0).contains(&t.match_high)
            || t.match_low >= t.match_high
        {
            return invalid(format!(
                "match thresholds must satisfy 0 < low < high <= 1 (low {}, high {})",
                t.match_low, t.match_high
            ));
        }
        if !(0.0..=1.0).contains(&t.classification_min) || t.classification_epsilon < 0.0 {
            return invalid("classification_min must be in [0, 1] and epsilon non-negative".to_string());
        }
        if !(0.0..=1.0).contains(&t.evidence_weight) {
            return invalid(format!("evidence_weight {} outside [0, 1]", t.evidence_weight));
        }
        if t.keyword_saturation == 0 {
            return invalid("keyword_saturation must be at least 1".to_string());
        }
        if self.categories.is_empty() {
            return invalid("at least one category signature is required".to_string());
        }
        if let Some(sig) = self.categories.iter().find(|s| s.keywords.is_empty()) {
            return invalid(format!("category '{}' has no keywords", sig.category));
        }

        let mut checklist_keys = HashSet::new();
        let mut requirement_ids = HashSet::new();
        for checklist in &self.checklists {
            if !checklist_keys.insert((checklist.category, checklist.version.clone())) {
                return invalid(format!(
                    "duplicate checklist {} version {}",
                    checklist.category, checklist.version
                ));
            }
            for requirement in &checklist.requirements {
                if !requirement_ids.insert((checklist.version.clone(), requirement.id.clone())) {
                    return invalid(format!("duplicate requirement id '{}'", requirement.id));
                }
                if requirement.pattern.trim().is_empty() {
                    return invalid(format!("requirement '{}' has an empty pattern", requirement.id));
                }
            }
        }

        let mut rule_ids: HashSet<&str> = [
            crate::rules::jurisdiction::RULE_ID,
            crate::rules::obligation::RULE_ID,
            crate::rules::signatory::RULE_ID,
        ]
        .into_iter()
        .collect();
        for rule in &self.rules.custom {
            if !rule_ids.insert(rule.id.as_str()) {
                return invalid(format!("duplicate rule id '{}'", rule.id));
            }
            if rule.pattern.is_none() && rule.phrases.is_empty() {
                return invalid(format!("rule '{}' needs a pattern or phrases", rule.id));
            }
            if let Some(pattern) = &rule.pattern {
                if let Err(e) = regex::Regex::new(pattern) {
                    return invalid(format!("rule '{}' has an invalid pattern: {}", rule.id, e));
                }
            }
        }
        Ok(())
    }

    /// Checklists in the shared data model
    pub fn checklists(&self) -> Vec<Checklist> {
        self.checklists.iter().map(ChecklistConfig::to_checklist).collect()
    }
}

/// Score thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Minimum combined score for a category to be chosen
    pub classification_min: f32,
    /// Required lead of the best category over the runner-up
    pub classification_epsilon: f32,
    /// Keyword hits at which the keyword score saturates
    pub keyword_saturation: usize,
    /// Weight of retrieval evidence in the combined classification score
    pub evidence_weight: f32,
    /// Clause match score at or above which a requirement is satisfied
    pub match_high: f32,
    /// Clause match score below which a requirement is missing
    pub match_low: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            classification_min: 0.35,
            classification_epsilon: 0.05,
            keyword_saturation: 3,
            evidence_weight: 0.3,
            match_high: 0.85,
            match_low: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalPolicy {
    pub top_k: usize,
    pub timeout_ms: u64,
}

impl Default for RetrievalPolicy {
    fn default() -> Self {
        Self {
            top_k: 4,
            timeout_ms: 2_000,
        }
    }
}

impl RetrievalPolicy {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Clause matching strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// Phrase containment only
    Exact,
    /// Token coverage
    Fuzzy,
    /// Token coverage expanded with reference passages
    Semantic,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingPolicy {
    pub strategy: MatchStrategy,
    /// Largest score increase reference expansion can contribute
    pub semantic_bonus: f32,
    /// Expansion terms taken from reference passages per requirement
    pub expansion_terms: usize,
}

impl Default for MatchingPolicy {
    fn default() -> Self {
        Self {
            strategy: MatchStrategy::Semantic,
            semantic_bonus: 0.25,
            expansion_terms: 12,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationPolicy {
    pub author: String,
    pub initials: String,
    /// Also comment on satisfied requirements
    pub annotate_satisfied: bool,
}

impl Default for AnnotationPolicy {
    fn default() -> Self {
        Self {
            author: "ADGM Reviewer".to_string(),
            initials: "AR".to_string(),
            annotate_satisfied: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySignature {
    pub category: ProcessCategory,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentTypeSignature {
    pub name: String,
    pub category: ProcessCategory,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistConfig {
    pub category: ProcessCategory,
    pub version: String,
    #[serde(default)]
    pub required_documents: Vec<String>,
    #[serde(default)]
    pub requirements: Vec<RequirementConfig>,
}

impl ChecklistConfig {
    pub fn to_checklist(&self) -> Checklist {
        Checklist {
            category: self.category,
            version: self.version.clone(),
            required_documents: self.required_documents.clone(),
            requirements: self
                .requirements
                .iter()
                .map(|r| Requirement {
                    id: r.id.clone(),
                    process_category: self.category,
                    description: r.description.clone(),
                    required_clause_pattern: r.pattern.clone(),
                    aliases: r.aliases.clone(),
                    severity: r.severity,
                    document_type: r.document_type.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementConfig {
    pub id: String,
    pub description: String,
    pub pattern: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default = "default_requirement_severity")]
    pub severity: Severity,
    #[serde(default)]
    pub document_type: Option<String>,
}

fn default_requirement_severity() -> Severity {
    Severity::High
}

/// Query and fallback used to cite a source for a rule's findings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationPolicy {
    /// Retrieval query; `{document_type}` is replaced by the document's type
    pub query: String,
    /// Citation used when retrieval returns nothing or times out
    pub fallback: String,
}

impl CitationPolicy {
    pub fn query_for(&self, document_type: Option<&str>) -> String {
        self.query
            .replace("{document_type}", document_type.unwrap_or("document"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RulesConfig {
    pub jurisdiction: PhraseRuleConfig,
    pub obligation: PhraseRuleConfig,
    pub signatory: PhraseRuleConfig,
    #[serde(default)]
    pub custom: Vec<CustomRuleConfig>,
}

/// A built-in detector's vocabulary and wording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhraseRuleConfig {
    pub severity: Severity,
    pub phrases: Vec<String>,
    /// Finding explanation; `{phrase}` is replaced by the matched phrase
    pub explanation: String,
    pub suggestion: String,
    pub citation: CitationPolicy,
}

/// Category-specific rule defined entirely in policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomRuleConfig {
    pub id: String,
    /// Categories the rule is active for; empty means all
    #[serde(default)]
    pub categories: Vec<ProcessCategory>,
    /// Case-insensitive regular expression
    #[serde(default)]
    pub pattern: Option<String>,
    /// Case-insensitive phrases, matched on word boundaries
    #[serde(default)]
    pub phrases: Vec<String>,
    /// Flag blocks that match (`present`) or the document when nothing matches (`absent`)
    #[serde(default)]
    pub trigger: Trigger,
    pub severity: Severity,
    pub explanation: String,
    #[serde(default)]
    pub suggestion: Option<String>,
    #[serde(default)]
    pub citation: Option<CitationPolicy>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    #[default]
    Present,
    Absent,
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        version = "test"

        [[categories]]
        category = "Incorporation"
        keywords = ["articles of association"]

        [[checklists]]
        category = "Incorporation"
        version = "1"
        required_documents = ["Articles of Association"]

        [[checklists.requirements]]
        id = "R1"
        description = "UBO declaration"
        pattern = "UBO declaration"

        [rules.jurisdiction]
        severity = "high"
        phrases = ["dubai courts"]
        explanation = "Wrong forum"
        suggestion = "Use ADGM Courts"
        citation = { query = "jurisdiction", fallback = "ADGM Regulation" }

        [rules.obligation]
        severity = "medium"
        phrases = ["best efforts"]
        explanation = "Weak obligation: '{phrase}'"
        suggestion = "Use shall"
        citation = { query = "binding language {document_type}", fallback = "ADGM Guidance" }

        [rules.signatory]
        severity = "high"
        phrases = ["signature"]
        explanation = "Missing signatory section"
        suggestion = "Add a signature block"
        citation = { query = "signature block", fallback = "ADGM Template" }
    "#;

    #[test]
    fn test_builtin_policy_is_valid() {
        let policy = PolicyConfig::builtin().expect("builtin policy must load");
        assert_eq!(policy.thresholds, Thresholds::default());
        for category in ProcessCategory::ALL {
            assert!(
                policy.categories.iter().any(|s| s.category == category),
                "no signature for {}",
                category
            );
            assert!(
                policy.checklists.iter().any(|c| c.category == category),
                "no checklist for {}",
                category
            );
        }
    }

    #[test]
    fn test_minimal_policy_defaults() {
        let policy = PolicyConfig::from_str(MINIMAL).unwrap();
        assert_eq!(policy.retrieval, RetrievalPolicy::default());
        assert_eq!(policy.matching.strategy, MatchStrategy::Semantic);
        assert_eq!(policy.annotation.author, "ADGM Reviewer");

        let checklists = policy.checklists();
        assert_eq!(checklists[0].requirements[0].process_category, ProcessCategory::Incorporation);
        assert_eq!(checklists[0].requirements[0].severity, Severity::High);
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let toml = format!("{}\n[thresholds]\nmatch_high = 0.4\nmatch_low = 0.6\n", MINIMAL);
        assert!(matches!(PolicyConfig::from_str(&toml), Err(PolicyError::Invalid(_))));
    }

    #[test]
    fn test_zero_low_threshold_rejected() {
        let toml = format!("{}\n[thresholds]\nmatch_high = 0.8\nmatch_low = 0.0\n", MINIMAL);
        assert!(matches!(PolicyConfig::from_str(&toml), Err(PolicyError::Invalid(_))));
    }

    #[test]
    fn test_duplicate_requirement_rejected() {
        let toml = MINIMAL.replace(
            "[rules.jurisdiction]",
            "[[checklists.requirements]]\nid = \"R1\"\ndescription = \"dup\"\npattern = \"dup\"\n\n[rules.jurisdiction]",
        );
        let err = PolicyConfig::from_str(&toml).unwrap_err();
        assert!(err.to_string().contains("duplicate requirement id 'R1'"));
    }

    #[test]
    fn test_unknown_category_rejected() {
        let toml = MINIMAL.replacen("category = \"Incorporation\"", "category = \"Licensing\"", 1);
        assert!(matches!(PolicyConfig::from_str(&toml), Err(PolicyError::Parse(_))));
    }

    #[test]
    fn test_bad_custom_regex_rejected() {
        let toml = format!(
            "{}\n[[rules.custom]]\nid = \"x\"\npattern = \"(unclosed\"\nseverity = \"low\"\nexplanation = \"x\"\n",
            MINIMAL
        );
        let err = PolicyConfig::from_str(&toml).unwrap_err();
        assert!(err.to_string().contains("invalid pattern"));
    }

    #[test]
    fn test_from_file_reports_path() {
        let err = PolicyConfig::from_file("/nonexistent/policy.toml").unwrap_err();
        assert!(format!("{:#}", err).contains("/nonexistent/policy.toml"));
    }

    #[test]
    fn test_citation_query_substitution() {
        let citation = CitationPolicy {
            query: "{document_type} signature block".to_string(),
            fallback: "ADGM Template".to_string(),
        };
        assert_eq!(citation.query_for(Some("Board Resolution")), "Board Resolution signature block");
        assert_eq!(citation.query_for(None), "document signature block");
    }
}
