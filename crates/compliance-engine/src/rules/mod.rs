//! Red-flag detectors
//!
//! Each detector inspects the extracted blocks of one document and reports
//! findings. Detectors are independent: a detector that errors or panics is
//! recorded as a detector-error finding and the others still run.

pub mod custom;
pub mod jurisdiction;
pub mod obligation;
pub mod signatory;

use crate::config::{CitationPolicy, RulesConfig};
use crate::patterns::normalize;
use shared_types::{ExtractedBlock, Finding, ProcessCategory};
use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("Invalid detector configuration: {0}")]
    Config(String),

    #[error("{0}")]
    Failed(String),
}

/// One document as seen by the detectors
pub struct ScanContext<'a> {
    pub blocks: &'a [ExtractedBlock],
    pub category: ProcessCategory,
    pub document_type: Option<&'a str>,
    normalized: Vec<String>,
}

impl<'a> ScanContext<'a> {
    pub fn new(
        blocks: &'a [ExtractedBlock],
        category: ProcessCategory,
        document_type: Option<&'a str>,
    ) -> Self {
        Self {
            blocks,
            category,
            document_type,
            normalized: blocks.iter().map(|b| normalize(&b.text)).collect(),
        }
    }

    /// Non-blank blocks paired with their normalized text
    pub fn text_blocks(&self) -> impl Iterator<Item = (&ExtractedBlock, &str)> {
        self.blocks
            .iter()
            .zip(self.normalized.iter())
            .filter(|(b, _)| !b.is_blank())
            .map(|(b, n)| (b, n.as_str()))
    }

    pub fn last_text_block(&self) -> Option<&ExtractedBlock> {
        self.blocks.iter().rev().find(|b| !b.is_blank())
    }
}

pub trait Detector: Send + Sync {
    /// Rule id carried by this detector's findings
    fn id(&self) -> &str;

    fn applies_to(&self, _category: ProcessCategory) -> bool {
        true
    }

    /// How to cite a source for this detector's findings
    fn citation(&self) -> Option<&CitationPolicy> {
        None
    }

    fn detect(&self, ctx: &ScanContext<'_>) -> Result<Vec<Finding>, DetectorError>;
}

/// Built-in detectors followed by the policy's custom rules
pub fn builtin_detectors(rules: &RulesConfig) -> Result<Vec<Box<dyn Detector>>, DetectorError> {
    let mut detectors: Vec<Box<dyn Detector>> = vec![
        Box::new(jurisdiction::JurisdictionDetector::new(rules.jurisdiction.clone())),
        Box::new(obligation::ObligationDetector::new(rules.obligation.clone())),
        Box::new(signatory::SignatoryDetector::new(rules.signatory.clone())),
    ];
    for rule in &rules.custom {
        detectors.push(Box::new(custom::CustomDetector::new(rule.clone())?));
    }
    Ok(detectors)
}

/// Run every applicable detector, isolating failures
pub fn run_detectors(detectors: &[Box<dyn Detector>], ctx: &ScanContext<'_>) -> Vec<Finding> {
    let mut findings = Vec::new();
    for detector in detectors.iter().filter(|d| d.applies_to(ctx.category)) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| detector.detect(ctx)));
        match outcome {
            Ok(Ok(found)) => {
                tracing::debug!(detector = detector.id(), count = found.len(), "Detector finished");
                findings.extend(found);
            }
            Ok(Err(e)) => {
                tracing::warn!(detector = detector.id(), error = %e, "Detector failed");
                findings.push(Finding::detector_error(detector.id(), &e.to_string()));
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::warn!(detector = detector.id(), error = %message, "Detector panicked");
                findings.push(Finding::detector_error(detector.id(), &message));
            }
        }
    }
    findings
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use shared_types::{AnchorId, BlockKind, ExtractedBlock, SourceRange, StructuralPath};

    pub fn blocks(texts: &[&str]) -> Vec<ExtractedBlock> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| ExtractedBlock {
                anchor_id: AnchorId::new(format!("body/p[{}]", i)),
                structural_path: StructuralPath::body(),
                kind: BlockKind::Paragraph,
                text: t.to_string(),
                source_range: SourceRange { start: 0, end: 0 },
            })
            .collect()
    }

    /// Detector that fails or panics on demand
    pub struct Broken {
        pub panics: bool,
    }

    impl super::Detector for Broken {
        fn id(&self) -> &str {
            "broken"
        }

        fn detect(
            &self,
            _ctx: &super::ScanContext<'_>,
        ) -> Result<Vec<shared_types::Finding>, super::DetectorError> {
            if self.panics {
                panic!("index out of range");
            }
            Err(super::DetectorError::Failed("vocabulary unavailable".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{blocks, Broken};
    use super::*;
    use crate::config::PolicyConfig;
    use shared_types::FindingStatus;

    fn detectors() -> Vec<Box<dyn Detector>> {
        builtin_detectors(&PolicyConfig::builtin().unwrap().rules).unwrap()
    }

    #[test]
    fn test_failed_detectors_become_findings() {
        let doc = blocks(&["Disputes go to the Dubai Courts.", "Signed by the Director"]);
        let ctx = ScanContext::new(&doc, ProcessCategory::Incorporation, None);

        let mut all = detectors();
        all.insert(0, Box::new(Broken { panics: true }));
        all.push(Box::new(Broken { panics: false }));
        let findings = run_detectors(&all, &ctx);

        let errors: Vec<_> = findings.iter().filter(|f| f.is_detector_error()).collect();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].explanation.contains("panicked: index out of range"));
        assert!(errors[1].explanation.contains("vocabulary unavailable"));
        assert!(findings
            .iter()
            .any(|f| f.id() == jurisdiction::RULE_ID && f.status == FindingStatus::Flagged));
    }

    #[test]
    fn test_custom_rules_only_for_their_category() {
        let doc = blocks(&["The probationary period shall be 9 months.", "Signature"]);
        let hr = run_detectors(&detectors(), &ScanContext::new(&doc, ProcessCategory::Employment, None));
        let inc = run_detectors(&detectors(), &ScanContext::new(&doc, ProcessCategory::Incorporation, None));
        assert!(hr.iter().any(|f| f.id() == "employment-probation-length"));
        assert!(!inc.iter().any(|f| f.id() == "employment-probation-length"));
    }

    #[test]
    fn test_text_blocks_skip_blank() {
        let doc = blocks(&["", "  ", "Text"]);
        let ctx = ScanContext::new(&doc, ProcessCategory::Resolution, None);
        let texts: Vec<_> = ctx.text_blocks().map(|(_, t)| t).collect();
        assert_eq!(texts, vec!["text"]);
        assert_eq!(ctx.last_text_block().unwrap().anchor_id.as_str(), "body/p[2]");
    }
}
