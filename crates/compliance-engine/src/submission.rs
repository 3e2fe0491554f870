//! Multi-document submissions
//!
//! A submission is a set of documents filed together for one process. Its
//! report adds the documents the process requires but nobody uploaded.

use chrono::{DateTime, Utc};
use shared_types::{Checklist, DocumentFailure, ProcessCategory, Report, SubmissionReport};
use std::collections::BTreeMap;

/// Process a submission belongs to
///
/// An explicit hint wins. Otherwise the most common category among the
/// classified documents is used, ties going to the earlier category. With
/// nothing classified the submission is treated as an incorporation.
pub fn determine_process(hint: Option<ProcessCategory>, classified: &[ProcessCategory]) -> ProcessCategory {
    if let Some(category) = hint {
        return category;
    }
    let mut counts: BTreeMap<ProcessCategory, usize> = BTreeMap::new();
    for &category in classified {
        *counts.entry(category).or_insert(0) += 1;
    }
    let majority = ProcessCategory::ALL
        .into_iter()
        .filter_map(|c| counts.get(&c).map(|&n| (c, n)))
        .fold(None, |best: Option<(ProcessCategory, usize)>, (c, n)| match best {
            Some((_, m)) if m >= n => best,
            _ => Some((c, n)),
        });
    match majority {
        Some((category, _)) => category,
        None => {
            tracing::warn!("No document could be classified; assuming {}", ProcessCategory::Incorporation);
            ProcessCategory::Incorporation
        }
    }
}

/// Required documents whose type was not found among the uploads, in checklist order
pub fn missing_documents<'a>(
    checklist: &Checklist,
    present: impl IntoIterator<Item = &'a str>,
) -> Vec<String> {
    let present: Vec<String> = present.into_iter().map(|t| t.to_lowercase()).collect();
    checklist
        .required_documents
        .iter()
        .filter(|required| !present.contains(&required.to_lowercase()))
        .cloned()
        .collect()
}

pub fn build_submission_report(
    process: ProcessCategory,
    checklist: Option<&Checklist>,
    documents: Vec<Report>,
    failures: Vec<DocumentFailure>,
    generated_at: DateTime<Utc>,
) -> SubmissionReport {
    let present = documents.iter().filter_map(|r| r.document_type.as_deref());
    let missing = checklist
        .map(|c| missing_documents(c, present))
        .unwrap_or_default();
    SubmissionReport {
        process,
        documents_uploaded: documents.len() + failures.len(),
        required_documents: checklist.map(|c| c.required_documents.len()).unwrap_or(0),
        missing_documents: missing,
        documents,
        failures,
        generated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use shared_types::ReportSummary;

    fn checklist() -> Checklist {
        Checklist {
            category: ProcessCategory::Incorporation,
            version: "test".to_string(),
            required_documents: vec![
                "Articles of Association".to_string(),
                "Memorandum of Association".to_string(),
                "UBO Declaration Form".to_string(),
            ],
            requirements: vec![],
        }
    }

    fn report(document_type: Option<&str>) -> Report {
        Report {
            process_category: ProcessCategory::Incorporation,
            document_name: Some("doc.docx".to_string()),
            document_type: document_type.map(str::to_string),
            checklist_version: None,
            summary: ReportSummary::default(),
            findings: vec![],
            generated_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_hint_overrides_majority() {
        let classified = [ProcessCategory::Employment, ProcessCategory::Employment];
        assert_eq!(
            determine_process(Some(ProcessCategory::Resolution), &classified),
            ProcessCategory::Resolution
        );
        assert_eq!(determine_process(None, &classified), ProcessCategory::Employment);
    }

    #[test]
    fn test_majority_tie_uses_category_order() {
        let classified = [ProcessCategory::Employment, ProcessCategory::UboDeclaration];
        assert_eq!(determine_process(None, &classified), ProcessCategory::UboDeclaration);
    }

    #[test]
    fn test_nothing_classified_defaults_to_incorporation() {
        assert_eq!(determine_process(None, &[]), ProcessCategory::Incorporation);
    }

    #[test]
    fn test_missing_documents_case_insensitive() {
        let missing = missing_documents(&checklist(), ["articles of association"]);
        assert_eq!(missing, vec!["Memorandum of Association", "UBO Declaration Form"]);
    }

    #[test]
    fn test_submission_report_counts() {
        let submission = build_submission_report(
            ProcessCategory::Incorporation,
            Some(&checklist()),
            vec![report(Some("Articles of Association")), report(None)],
            vec![DocumentFailure {
                document_name: "broken.docx".to_string(),
                error: "Unsupported structure".to_string(),
            }],
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        );
        assert_eq!(submission.documents_uploaded, 3);
        assert_eq!(submission.required_documents, 3);
        assert_eq!(submission.missing_documents.len(), 2);
    }
}
