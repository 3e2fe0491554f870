//! Compliance Engine - ADGM filing review
//!
//! Classifies a `.docx` filing into a process category, checks it against
//! the category's checklist, scans it for red-flag language and produces a
//! JSON report plus an annotated copy of the document.
//!
//! Review policy (thresholds, checklists, detector vocabularies) is data;
//! see [`PolicyConfig`].

pub mod checklist;
pub mod classifier;
pub mod config;
pub mod conformance;
pub mod matching;
pub mod patterns;
pub mod pipeline;
pub mod report;
pub mod rules;
pub mod scanner;
pub mod submission;

pub use checklist::{ChecklistStore, InMemoryChecklistStore};
pub use classifier::{
    classify_document_type, CategoryScore, Classification, ClassificationAmbiguous, ClassifierInput,
    DocumentClassifier,
};
pub use config::{PolicyConfig, PolicyError, RetrievalPolicy, Thresholds};
pub use conformance::check_conformance;
pub use matching::{
    matcher_for, ClauseMatcher, ExactMatcher, FuzzyMatcher, RequirementEvidence, SemanticMatcher,
};
pub use pipeline::{DocumentReview, ReviewError, ReviewPipeline, SubmissionReview};
pub use report::ReportBuilder;
pub use rules::{Detector, DetectorError, ScanContext};
pub use scanner::RedFlagScanner;
