use super::{Detector, DetectorError, ScanContext};
use crate::config::{CitationPolicy, PhraseRuleConfig};
use crate::patterns::contains_phrase;
use shared_types::Finding;

pub const RULE_ID: &str = "ambiguous-obligation-language";

/// Flags weak or discretionary wording where a binding obligation is expected
pub struct ObligationDetector {
    config: PhraseRuleConfig,
}

impl ObligationDetector {
    pub fn new(config: PhraseRuleConfig) -> Self {
        Self { config }
    }
}

impl Detector for ObligationDetector {
    fn id(&self) -> &str {
        RULE_ID
    }

    fn citation(&self) -> Option<&CitationPolicy> {
        Some(&self.config.citation)
    }

    fn detect(&self, ctx: &ScanContext<'_>) -> Result<Vec<Finding>, DetectorError> {
        let findings = ctx
            .text_blocks()
            .flat_map(|(block, text)| {
                self.config
                    .phrases
                    .iter()
                    .filter(move |p| contains_phrase(text, p))
                    .map(move |phrase| {
                        Finding::flagged(
                            RULE_ID,
                            self.config.severity,
                            self.config.explanation.replace("{phrase}", phrase),
                        )
                        .with_anchor(block.anchor_id.clone())
                        .with_suggestion(self.config.suggestion.clone())
                    })
            })
            .collect();
        Ok(findings)
    }
}
