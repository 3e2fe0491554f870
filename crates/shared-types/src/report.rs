use crate::finding::{Finding, FindingStatus};
use crate::types::ProcessCategory;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Review report for a single document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub process_category: ProcessCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checklist_version: Option<String>,
    pub summary: ReportSummary,
    pub findings: Vec<Finding>,
    pub generated_at: DateTime<Utc>,
}

/// Finding counts per status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub satisfied: usize,
    pub missing: usize,
    pub ambiguous: usize,
    pub flagged: usize,
}

impl ReportSummary {
    pub fn from_findings(findings: &[Finding]) -> Self {
        let mut summary = Self::default();
        for finding in findings {
            match finding.status {
                FindingStatus::Satisfied => summary.satisfied += 1,
                FindingStatus::Missing => summary.missing += 1,
                FindingStatus::Ambiguous => summary.ambiguous += 1,
                FindingStatus::Flagged => summary.flagged += 1,
            }
        }
        summary
    }

    pub fn issues(&self) -> usize {
        self.missing + self.ambiguous + self.flagged
    }
}

/// A document that could not be reviewed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentFailure {
    pub document_name: String,
    pub error: String,
}

/// Review of several documents submitted together for one process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionReport {
    pub process: ProcessCategory,
    pub documents_uploaded: usize,
    pub required_documents: usize,
    pub missing_documents: Vec<String>,
    pub documents: Vec<Report>,
    pub failures: Vec<DocumentFailure>,
    pub generated_at: DateTime<Utc>,
}
