use super::{Detector, DetectorError, ScanContext};
use crate::config::{CitationPolicy, CustomRuleConfig, Trigger};
use crate::patterns::contains_phrase;
use regex::{Regex, RegexBuilder};
use shared_types::{ExtractedBlock, Finding, ProcessCategory};

/// Detector defined entirely by a policy rule
pub struct CustomDetector {
    config: CustomRuleConfig,
    pattern: Option<Regex>,
}

impl CustomDetector {
    pub fn new(config: CustomRuleConfig) -> Result<Self, DetectorError> {
        let pattern = config
            .pattern
            .as_deref()
            .map(|p| RegexBuilder::new(p).case_insensitive(true).build())
            .transpose()
            .map_err(|e| DetectorError::Config(format!("rule '{}': {}", config.id, e)))?;
        Ok(Self { config, pattern })
    }

    fn matches(&self, block: &ExtractedBlock, normalized: &str) -> bool {
        self.pattern.as_ref().is_some_and(|re| re.is_match(&block.text))
            || self.config.phrases.iter().any(|p| contains_phrase(normalized, p))
    }

    fn finding(&self) -> Finding {
        let mut finding = Finding::flagged(&self.config.id, self.config.severity, self.config.explanation.clone());
        if let Some(suggestion) = &self.config.suggestion {
            finding = finding.with_suggestion(suggestion.clone());
        }
        finding
    }
}

impl Detector for CustomDetector {
    fn id(&self) -> &str {
        &self.config.id
    }

    fn applies_to(&self, category: ProcessCategory) -> bool {
        self.config.categories.is_empty() || self.config.categories.contains(&category)
    }

    fn citation(&self) -> Option<&CitationPolicy> {
        self.config.citation.as_ref()
    }

    fn detect(&self, ctx: &ScanContext<'_>) -> Result<Vec<Finding>, DetectorError> {
        let matching = ctx.text_blocks().filter(|(block, text)| self.matches(block, text));
        match self.config.trigger {
            Trigger::Present => Ok(matching
                .map(|(block, _)| self.finding().with_anchor(block.anchor_id.clone()))
                .collect()),
            Trigger::Absent => {
                if matching.count() == 0 {
                    Ok(vec![self.finding()])
                } else {
                    Ok(Vec::new())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::test_support::blocks;
    use shared_types::Severity;

    fn rule(pattern: Option<&str>, phrases: &[&str], trigger: Trigger) -> CustomRuleConfig {
        CustomRuleConfig {
            id: "test-rule".to_string(),
            categories: vec![ProcessCategory::UboDeclaration],
            pattern: pattern.map(str::to_string),
            phrases: phrases.iter().map(|p| p.to_string()).collect(),
            trigger,
            severity: Severity::Medium,
            explanation: "Test rule".to_string(),
            suggestion: Some("Fix it".to_string()),
            citation: None,
        }
    }

    #[test]
    fn test_present_trigger_flags_each_block() {
        let detector = CustomDetector::new(rule(Some(r"\bnominee\b"), &[], Trigger::Present)).unwrap();
        let doc = blocks(&["Held by a NOMINEE", "Direct holding", "Nominee shareholder"]);
        let ctx = ScanContext::new(&doc, ProcessCategory::UboDeclaration, None);
        let anchors: Vec<_> = detector
            .detect(&ctx)
            .unwrap()
            .into_iter()
            .map(|f| f.evidence_anchor_ids[0].to_string())
            .collect();
        assert_eq!(anchors, vec!["body/p[0]", "body/p[2]"]);
    }

    #[test]
    fn test_absent_trigger() {
        let detector = CustomDetector::new(rule(None, &["chairperson"], Trigger::Absent)).unwrap();
        let without = blocks(&["Resolved to appoint auditors."]);
        let with = blocks(&["The Chairperson opened the meeting."]);

        let findings = detector
            .detect(&ScanContext::new(&without, ProcessCategory::Resolution, None))
            .unwrap();
        assert_eq!(findings.len(), 1);
        assert!(findings[0].evidence_anchor_ids.is_empty());
        assert_eq!(findings[0].suggestion.as_deref(), Some("Fix it"));

        assert!(detector
            .detect(&ScanContext::new(&with, ProcessCategory::Resolution, None))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_category_filter() {
        let detector = CustomDetector::new(rule(None, &["x"], Trigger::Present)).unwrap();
        assert!(detector.applies_to(ProcessCategory::UboDeclaration));
        assert!(!detector.applies_to(ProcessCategory::Employment));
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let err = CustomDetector::new(rule(Some("(unclosed"), &[], Trigger::Present))
            .err()
            .unwrap();
        assert!(matches!(err, DetectorError::Config(_)));
    }
}
