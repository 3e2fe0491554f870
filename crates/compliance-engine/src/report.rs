//! Report assembly and serialization

use chrono::{DateTime, Utc};
use shared_types::{Finding, ProcessCategory, Report, ReportSummary, SubmissionReport};

/// Builds reports with findings in a stable order
#[derive(Debug, Clone, Default)]
pub struct ReportBuilder {
    document_name: Option<String>,
    document_type: Option<String>,
    checklist_version: Option<String>,
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn document_name(mut self, name: impl Into<String>) -> Self {
        self.document_name = Some(name.into());
        self
    }

    pub fn document_type(mut self, document_type: Option<String>) -> Self {
        self.document_type = document_type;
        self
    }

    pub fn checklist_version(mut self, version: Option<String>) -> Self {
        self.checklist_version = version;
        self
    }

    /// Sort `findings` into report order and count them
    ///
    /// Given the same findings and timestamp the output is identical, whatever
    /// order the findings arrive in.
    pub fn build(self, category: ProcessCategory, findings: &[Finding], generated_at: DateTime<Utc>) -> Report {
        let mut findings = findings.to_vec();
        findings.sort_by(Finding::report_order);
        Report {
            process_category: category,
            document_name: self.document_name,
            document_type: self.document_type,
            checklist_version: self.checklist_version,
            summary: ReportSummary::from_findings(&findings),
            findings,
            generated_at,
        }
    }
}

pub fn to_json(report: &Report) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}

pub fn from_json(json: &str) -> serde_json::Result<Report> {
    serde_json::from_str(json)
}

pub fn submission_to_json(report: &SubmissionReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use shared_types::{AnchorId, FindingStatus, Severity};

    fn timestamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 0).unwrap()
    }

    fn sample() -> Vec<Finding> {
        vec![
            Finding::flagged("jurisdiction-clause", Severity::High, "Dubai Courts".to_string())
                .with_anchor(AnchorId::from("body/p[4]"))
                .with_citation("ADGM Regulation"),
            Finding::requirement("R2", FindingStatus::Satisfied, Severity::High, "present".to_string())
                .with_anchor(AnchorId::from("body/p[0]"))
                .with_confidence(1.0),
            Finding::requirement("R1", FindingStatus::Missing, Severity::Critical, "missing".to_string())
                .with_suggestion("Add it"),
        ]
    }

    #[test]
    fn test_build_orders_and_counts() {
        let report = ReportBuilder::new()
            .document_name("aoa.docx")
            .build(ProcessCategory::Incorporation, &sample(), timestamp());

        let ids: Vec<_> = report.findings.iter().map(|f| f.id()).collect();
        assert_eq!(ids, vec!["R1", "R2", "jurisdiction-clause"]);
        assert_eq!(
            report.summary,
            ReportSummary {
                satisfied: 1,
                missing: 1,
                ambiguous: 0,
                flagged: 1
            }
        );
        assert_eq!(report.summary.issues(), 2);
    }

    #[test]
    fn test_json_shape() {
        let report = ReportBuilder::new().build(ProcessCategory::UboDeclaration, &sample(), timestamp());
        let value: serde_json::Value = serde_json::from_str(&to_json(&report).unwrap()).unwrap();
        assert_eq!(value["process_category"], "UBO Declaration");
        assert_eq!(value["generated_at"], "2025-03-01T09:30:00Z");
        assert_eq!(value["findings"][0]["kind"], "requirement");
        assert_eq!(value["findings"][2]["citation"], "ADGM Regulation");
        assert!(value.get("document_name").is_none());
    }

    fn finding_strategy() -> impl Strategy<Value = Finding> {
        (
            prop_oneof![Just("R1"), Just("R2"), Just("obligation")],
            0usize..4,
            "[a-z ]{0,12}",
            proptest::option::of(0usize..5),
            proptest::option::of(0.0f32..=1.0),
        )
            .prop_map(|(id, status, text, anchor, confidence)| {
                let status = [
                    FindingStatus::Satisfied,
                    FindingStatus::Missing,
                    FindingStatus::Ambiguous,
                    FindingStatus::Flagged,
                ][status];
                let mut f = if status == FindingStatus::Flagged {
                    Finding::flagged(id, Severity::Medium, text)
                } else {
                    Finding::requirement(id, status, Severity::High, text)
                };
                if let Some(a) = anchor {
                    f = f.with_anchor(AnchorId::new(format!("body/p[{}]", a)));
                }
                if let Some(c) = confidence {
                    f = f.with_confidence(c);
                }
                f
            })
    }

    proptest! {
        #[test]
        fn serialization_is_idempotent(findings in proptest::collection::vec(finding_strategy(), 0..8)) {
            let report = ReportBuilder::new().build(ProcessCategory::Resolution, &findings, timestamp());
            let json = to_json(&report).unwrap();
            let reparsed = from_json(&json).unwrap();
            prop_assert_eq!(to_json(&reparsed).unwrap(), json);
        }

        #[test]
        fn build_ignores_input_order(mut findings in proptest::collection::vec(finding_strategy(), 0..8)) {
            let a = ReportBuilder::new().build(ProcessCategory::Resolution, &findings, timestamp());
            findings.reverse();
            let b = ReportBuilder::new().build(ProcessCategory::Resolution, &findings, timestamp());
            prop_assert_eq!(a.summary, b.summary);
            prop_assert_eq!(a.findings.len(), b.findings.len());
            for (x, y) in a.findings.iter().zip(b.findings.iter()) {
                prop_assert_eq!(Finding::report_order(x, y), std::cmp::Ordering::Equal);
            }
        }
    }
}
