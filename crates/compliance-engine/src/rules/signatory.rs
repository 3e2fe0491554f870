use super::{Detector, DetectorError, ScanContext};
use crate::config::{CitationPolicy, PhraseRuleConfig};
use crate::patterns::contains_phrase;
use shared_types::Finding;

pub const RULE_ID: &str = "missing-signatory-block";

/// Flags documents with no signatory section anywhere
///
/// The finding is anchored at the last non-empty block, where a signature
/// block would normally sit.
pub struct SignatoryDetector {
    config: PhraseRuleConfig,
}

impl SignatoryDetector {
    pub fn new(config: PhraseRuleConfig) -> Self {
        Self { config }
    }
}

impl Detector for SignatoryDetector {
    fn id(&self) -> &str {
        RULE_ID
    }

    fn citation(&self) -> Option<&CitationPolicy> {
        Some(&self.config.citation)
    }

    fn detect(&self, ctx: &ScanContext<'_>) -> Result<Vec<Finding>, DetectorError> {
        let signed = ctx
            .text_blocks()
            .any(|(_, text)| self.config.phrases.iter().any(|p| contains_phrase(text, p)));
        if signed {
            return Ok(Vec::new());
        }

        let mut finding = Finding::flagged(RULE_ID, self.config.severity, self.config.explanation.clone())
            .with_suggestion(self.config.suggestion.clone());
        if let Some(block) = ctx.last_text_block() {
            finding = finding.with_anchor(block.anchor_id.clone());
        }
        Ok(vec![finding])
    }
}
