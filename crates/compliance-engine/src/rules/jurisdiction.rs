use super::{Detector, DetectorError, ScanContext};
use crate::config::{CitationPolicy, PhraseRuleConfig};
use crate::patterns::contains_phrase;
use shared_types::Finding;

pub const RULE_ID: &str = "jurisdiction-clause";

/// Flags blocks that send disputes or governing law to a non-ADGM forum
pub struct JurisdictionDetector {
    config: PhraseRuleConfig,
}

impl JurisdictionDetector {
    pub fn new(config: PhraseRuleConfig) -> Self {
        Self { config }
    }
}

impl Detector for JurisdictionDetector {
    fn id(&self) -> &str {
        RULE_ID
    }

    fn citation(&self) -> Option<&CitationPolicy> {
        Some(&self.config.citation)
    }

    fn detect(&self, ctx: &ScanContext<'_>) -> Result<Vec<Finding>, DetectorError> {
        let mut findings = Vec::new();
        for (block, text) in ctx.text_blocks() {
            // one finding per block, on the first forum named
            let Some(phrase) = self.config.phrases.iter().find(|p| contains_phrase(text, p)) else {
                continue;
            };
            findings.push(
                Finding::flagged(
                    RULE_ID,
                    self.config.severity,
                    self.config.explanation.replace("{phrase}", phrase),
                )
                .with_anchor(block.anchor_id.clone())
                .with_suggestion(self.config.suggestion.clone()),
            );
        }
        Ok(findings)
    }
}
