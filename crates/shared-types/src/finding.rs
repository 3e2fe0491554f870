//! Findings produced by the conformance checker and the red-flag scanner

use crate::document::AnchorId;
use crate::types::Severity;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Rule id prefix used for findings that record a failed detector
pub const DETECTOR_ERROR_PREFIX: &str = "detector-error/";

/// What produced a finding
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum FindingSource {
    Requirement(String),
    Rule(String),
}

impl FindingSource {
    pub fn id(&self) -> &str {
        match self {
            FindingSource::Requirement(id) | FindingSource::Rule(id) => id,
        }
    }

    /// Requirements sort before rules, each by id
    fn rank(&self) -> (u8, &str) {
        match self {
            FindingSource::Requirement(id) => (0, id),
            FindingSource::Rule(id) => (1, id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingStatus {
    Satisfied,
    Missing,
    Ambiguous,
    Flagged,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    #[serde(flatten)]
    pub source: FindingSource,
    pub status: FindingStatus,
    pub severity: Severity,
    pub explanation: String,
    pub evidence_anchor_ids: Vec<AnchorId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl Finding {
    pub fn requirement(
        id: &str,
        status: FindingStatus,
        severity: Severity,
        explanation: String,
    ) -> Self {
        Self {
            source: FindingSource::Requirement(id.to_string()),
            status,
            severity,
            explanation,
            evidence_anchor_ids: Vec::new(),
            suggestion: None,
            citation: None,
            confidence: None,
        }
    }

    pub fn flagged(rule_id: &str, severity: Severity, explanation: String) -> Self {
        Self {
            source: FindingSource::Rule(rule_id.to_string()),
            status: FindingStatus::Flagged,
            severity,
            explanation,
            evidence_anchor_ids: Vec::new(),
            suggestion: None,
            citation: None,
            confidence: None,
        }
    }

    /// Finding recording that a detector failed to run to completion
    pub fn detector_error(detector_id: &str, error: &str) -> Self {
        Self::flagged(
            &format!("{}{}", DETECTOR_ERROR_PREFIX, detector_id),
            Severity::Low,
            format!("Detector '{}' failed and was skipped: {}", detector_id, error),
        )
    }

    pub fn with_anchor(mut self, anchor: AnchorId) -> Self {
        self.evidence_anchor_ids.push(anchor);
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_citation(mut self, citation: impl Into<String>) -> Self {
        self.citation = Some(citation.into());
        self
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn id(&self) -> &str {
        self.source.id()
    }

    pub fn is_detector_error(&self) -> bool {
        matches!(&self.source, FindingSource::Rule(id) if id.starts_with(DETECTOR_ERROR_PREFIX))
    }

    /// Anything other than a satisfied requirement needs a reviewer's attention
    pub fn needs_review(&self) -> bool {
        self.status != FindingStatus::Satisfied
    }

    /// Report order: requirement ids, then rule ids, then anchors and text
    ///
    /// Every serialized field takes part, so equal findings are the only ties.
    pub fn report_order(a: &Finding, b: &Finding) -> Ordering {
        a.source
            .rank()
            .cmp(&b.source.rank())
            .then_with(|| a.evidence_anchor_ids.cmp(&b.evidence_anchor_ids))
            .then_with(|| a.explanation.cmp(&b.explanation))
            .then_with(|| a.status.cmp(&b.status))
            .then_with(|| a.severity.cmp(&b.severity))
            .then_with(|| a.suggestion.cmp(&b.suggestion))
            .then_with(|| a.citation.cmp(&b.citation))
            .then_with(|| {
                let confidence = |f: &Finding| f.confidence.unwrap_or(-1.0);
                confidence(a).total_cmp(&confidence(b))
            })
    }
}
