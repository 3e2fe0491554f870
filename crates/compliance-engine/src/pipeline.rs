//! Document review pipeline
//!
//! One call reviews one document: extract, classify, look up the checklist,
//! run conformance and red-flag scanning concurrently, then build the report
//! and the annotated copy from the same findings.

use crate::checklist::{ChecklistStore, InMemoryChecklistStore};
use crate::classifier::{
    classify_document_type, Classification, ClassificationAmbiguous, ClassifierInput, DocumentClassifier,
};
use crate::config::{PolicyConfig, RetrievalPolicy};
use crate::conformance::check_conformance;
use crate::matching::{matcher_for, requirement_query, ClauseMatcher, RequirementEvidence};
use crate::report::ReportBuilder;
use crate::rules::{DetectorError, ScanContext};
use crate::scanner::RedFlagScanner;
use crate::submission::{build_submission_report, determine_process};
use chrono::{DateTime, Utc};
use corpus_core::{retrieve_with_timeout, NullRetriever, RetrievalOutcome, Retriever};
use futures::future::join_all;
use shared_docx::{AnnotatedDocument, Annotator, AnnotatorOptions, ClauseExtractor, DocxError, DocxPackage};
use shared_types::{
    DocumentFailure, ExtractedBlock, ProcessCategory, Report, Requirement, SubmissionReport,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Failures that abort the review of one document
#[derive(Debug, Error)]
pub enum ReviewError {
    #[error(transparent)]
    ClassificationAmbiguous(#[from] ClassificationAmbiguous),

    #[error("Unsupported document structure: {0}")]
    UnsupportedStructure(#[from] DocxError),
}

/// Everything produced for one document
#[derive(Debug, Clone)]
pub struct DocumentReview {
    pub report: Report,
    pub annotated: AnnotatedDocument,
    /// Absent when the caller supplied the category
    pub classification: Option<Classification>,
}

/// Everything produced for a submission
#[derive(Debug, Clone)]
pub struct SubmissionReview {
    pub report: SubmissionReport,
    /// Annotated copies keyed by document name, in upload order
    pub annotated: Vec<(String, AnnotatedDocument)>,
}

pub struct ReviewPipeline {
    policy: Arc<PolicyConfig>,
    checklists: Arc<dyn ChecklistStore>,
    classifier: DocumentClassifier,
    scanner: RedFlagScanner,
    matcher: Box<dyn ClauseMatcher>,
    retriever: Arc<dyn Retriever>,
    retrieval: RetrievalPolicy,
}

impl ReviewPipeline {
    /// Pipeline over the policy's own checklists, without a reference corpus
    pub fn new(policy: Arc<PolicyConfig>) -> Result<Self, DetectorError> {
        Ok(Self {
            checklists: Arc::new(InMemoryChecklistStore::from_policy(&policy)),
            classifier: DocumentClassifier::from_policy(&policy),
            scanner: RedFlagScanner::from_rules(&policy.rules)?,
            matcher: matcher_for(&policy),
            retriever: Arc::new(NullRetriever),
            retrieval: policy.retrieval,
            policy,
        })
    }

    pub fn with_retriever(mut self, retriever: Arc<dyn Retriever>) -> Self {
        self.retriever = retriever;
        self
    }

    pub fn with_checklists(mut self, checklists: Arc<dyn ChecklistStore>) -> Self {
        self.checklists = checklists;
        self
    }

    pub fn with_matcher(mut self, matcher: Box<dyn ClauseMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn with_retrieval(mut self, retrieval: RetrievalPolicy) -> Self {
        self.retrieval = retrieval;
        self
    }

    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }

    /// Review one document, stamping the report with the current time
    pub async fn review_document(
        &self,
        name: &str,
        bytes: &[u8],
        category: Option<ProcessCategory>,
    ) -> Result<DocumentReview, ReviewError> {
        self.review_document_at(name, bytes, category, Utc::now()).await
    }

    /// Review one document
    ///
    /// `category` bypasses classification. Output depends only on the inputs,
    /// the retriever's answers and `generated_at`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The bytes are not a readable `.docx` package
    /// - No category was supplied and classification is ambiguous
    pub async fn review_document_at(
        &self,
        name: &str,
        bytes: &[u8],
        category: Option<ProcessCategory>,
        generated_at: DateTime<Utc>,
    ) -> Result<DocumentReview, ReviewError> {
        let package = DocxPackage::open(bytes)?;
        let blocks = ClauseExtractor::extract(&package)?;
        tracing::info!(document = name, blocks = blocks.len(), "Extracted document");

        let (category, classification) = match category {
            Some(category) => (category, None),
            None => {
                let classification = self.classify(name, &blocks).await?;
                (classification.category, Some(classification))
            }
        };
        let document_type = self.document_type(name, category, &blocks);
        tracing::info!(
            document = name,
            category = %category,
            document_type = document_type.as_deref().unwrap_or("Unknown"),
            "Classified document"
        );

        let checklist = self.checklists.lookup(category);
        if checklist.is_none() {
            tracing::warn!(category = %category, "No checklist for category; only red-flag rules apply");
        }
        let requirements = checklist
            .map(|c| c.requirements_for(document_type.as_deref()))
            .unwrap_or_default();

        let conformance = async {
            let evidence = self.gather_evidence(&requirements).await;
            check_conformance(
                category,
                &requirements,
                &blocks,
                self.matcher.as_ref(),
                &evidence,
                &self.policy.thresholds,
            )
        };
        let ctx = ScanContext::new(&blocks, category, document_type.as_deref());
        let scan = self.scanner.scan(&ctx, self.retriever.as_ref(), self.retrieval);
        let (mut findings, flags) = tokio::join!(conformance, scan);
        findings.extend(flags);

        let report = ReportBuilder::new()
            .document_name(name)
            .document_type(document_type)
            .checklist_version(checklist.map(|c| c.version.clone()))
            .build(category, &findings, generated_at);
        tracing::info!(
            document = name,
            satisfied = report.summary.satisfied,
            issues = report.summary.issues(),
            "Built report"
        );

        let annotated = self.annotate(&package, &blocks, &report, generated_at);
        Ok(DocumentReview {
            report,
            annotated,
            classification,
        })
    }

    /// Review several documents filed together, one after another
    ///
    /// A document that cannot be reviewed is recorded as a failure and the
    /// rest still run. With a `hint`, every document is reviewed under it.
    pub async fn review_submission(
        &self,
        documents: &[(String, Vec<u8>)],
        hint: Option<ProcessCategory>,
    ) -> SubmissionReview {
        let generated_at = Utc::now();
        let mut reports = Vec::new();
        let mut annotated = Vec::new();
        let mut failures = Vec::new();

        for (name, bytes) in documents {
            match self.review_document_at(name, bytes, hint, generated_at).await {
                Ok(review) => {
                    annotated.push((name.clone(), review.annotated));
                    reports.push(review.report);
                }
                Err(e) => {
                    tracing::warn!(document = %name, error = %e, "Document review failed");
                    failures.push(DocumentFailure {
                        document_name: name.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        let classified: Vec<ProcessCategory> = reports.iter().map(|r| r.process_category).collect();
        let process = determine_process(hint, &classified);
        let report = build_submission_report(
            process,
            self.checklists.lookup(process),
            reports,
            failures,
            generated_at,
        );
        if !report.missing_documents.is_empty() {
            tracing::info!(
                process = %process,
                missing = report.missing_documents.len(),
                "Submission is missing required documents"
            );
        }
        SubmissionReview { report, annotated }
    }

    async fn classify(&self, name: &str, blocks: &[ExtractedBlock]) -> Result<Classification, ClassificationAmbiguous> {
        let query = DocumentClassifier::query(blocks);
        let evidence = if query.is_empty() {
            Vec::new()
        } else {
            retrieve_with_timeout(
                self.retriever.as_ref(),
                &query,
                self.retrieval.top_k,
                self.retrieval.timeout(),
            )
            .await
            .into_passages()
        };
        let input = ClassifierInput {
            blocks,
            file_name: Some(name),
            evidence: &evidence,
        };
        self.classifier.classify(&input)
    }

    /// Document type, preferring types of the document's own category
    fn document_type(&self, name: &str, category: ProcessCategory, blocks: &[ExtractedBlock]) -> Option<String> {
        let types = &self.policy.document_types;
        let own: Vec<_> = types.iter().filter(|t| t.category == category).cloned().collect();
        classify_document_type(&own, Some(name), blocks)
            .or_else(|| classify_document_type(types, Some(name), blocks))
            .map(|t| t.name.clone())
    }

    /// Reference evidence per requirement id, fetched concurrently
    async fn gather_evidence(&self, requirements: &[Requirement]) -> BTreeMap<String, RequirementEvidence> {
        let max_terms = self.policy.matching.expansion_terms;
        let lookups = requirements.iter().map(|requirement| async move {
            let query = requirement_query(requirement);
            let outcome = retrieve_with_timeout(
                self.retriever.as_ref(),
                &query,
                self.retrieval.top_k,
                self.retrieval.timeout(),
            )
            .await;
            let evidence = match outcome {
                RetrievalOutcome::Passages(passages) => {
                    RequirementEvidence::from_passages(requirement, passages, max_terms)
                }
                RetrievalOutcome::TimedOut => RequirementEvidence::degraded("retrieval timed out"),
                RetrievalOutcome::Failed(e) => RequirementEvidence::degraded(format!("retrieval failed: {}", e)),
            };
            (requirement.id.clone(), evidence)
        });
        join_all(lookups).await.into_iter().collect()
    }

    fn annotate(
        &self,
        package: &DocxPackage,
        blocks: &[ExtractedBlock],
        report: &Report,
        generated_at: DateTime<Utc>,
    ) -> AnnotatedDocument {
        let annotation = &self.policy.annotation;
        let findings: Vec<_> = report
            .findings
            .iter()
            .filter(|f| annotation.annotate_satisfied || f.needs_review())
            .cloned()
            .collect();
        let annotator = Annotator::new(AnnotatorOptions {
            author: annotation.author.clone(),
            initials: annotation.initials.clone(),
            timestamp: generated_at,
            document_anchor: blocks.iter().find(|b| !b.is_blank()).map(|b| b.anchor_id.clone()),
        });

        let annotated = annotator.annotate(package, &findings);
        let manifest = &annotated.manifest;
        if manifest.fallbacks() > 0 {
            tracing::warn!(
                fallbacks = manifest.fallbacks(),
                "Some findings could not be attached as comments"
            );
        }
        tracing::info!(comments = manifest.comments_placed(), "Annotated document");
        annotated
    }
}
