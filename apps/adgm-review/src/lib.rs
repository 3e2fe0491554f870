//! ADGM review command-line host
//!
//! Loads the policy and reference corpus, reviews the given `.docx` files as
//! one submission and writes the annotated copies and the JSON report.

use anyhow::{Context, Result};
use compliance_engine::{report, PolicyConfig, RetrievalPolicy, ReviewPipeline, SubmissionReview};
use corpus_core::{CorpusConfig, KeywordRetriever, NullRetriever, ReferenceCorpus, Retriever};
use shared_types::ProcessCategory;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const REVIEWED_DIR: &str = "reviewed";
pub const REPORTS_DIR: &str = "reports";
pub const REPORT_FILE: &str = "report.json";

/// Settings resolved from the command line and environment
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub files: Vec<PathBuf>,
    pub policy: Option<PathBuf>,
    pub process: Option<ProcessCategory>,
    pub out_dir: PathBuf,
    pub corpus: CorpusConfig,
}

/// Files written by a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub report: PathBuf,
    pub reviewed: Vec<PathBuf>,
}

/// `<stem>_REVIEWED.docx` for an uploaded file name
pub fn reviewed_file_name(name: &str) -> String {
    let stem = Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string());
    format!("{}_REVIEWED.docx", stem)
}

/// `reviewed_file_name`, suffixed `_2`, `_3`, ... when already taken
pub fn unique_reviewed_name(name: &str, taken: &mut HashSet<String>) -> String {
    let base = reviewed_file_name(name);
    let mut candidate = base.clone();
    let mut n = 1;
    while !taken.insert(candidate.clone()) {
        n += 1;
        candidate = format!("{}_{}.docx", base.trim_end_matches(".docx"), n);
    }
    candidate
}

pub fn load_policy(path: Option<&Path>) -> Result<PolicyConfig> {
    match path {
        Some(path) => PolicyConfig::from_file(path),
        None => PolicyConfig::builtin().context("Embedded policy is invalid"),
    }
}

/// Keyword retriever over the reference directory, or none without one
pub fn build_retriever(config: &CorpusConfig) -> Result<Arc<dyn Retriever>> {
    let Some(dir) = &config.reference_dir else {
        tracing::info!("No reference directory configured; reviewing without citations");
        return Ok(Arc::new(NullRetriever));
    };
    let corpus = ReferenceCorpus::from_dir(dir, config)
        .with_context(|| format!("Failed to load reference corpus: {}", dir.display()))?;
    if corpus.is_empty() {
        tracing::warn!(dir = %dir.display(), "Reference directory holds no usable documents");
        return Ok(Arc::new(NullRetriever));
    }
    let index = corpus.build_index().context("Failed to index reference corpus")?;
    Ok(Arc::new(KeywordRetriever::new(Arc::new(index))))
}

pub fn retrieval_policy(config: &CorpusConfig) -> RetrievalPolicy {
    RetrievalPolicy {
        top_k: config.top_k,
        timeout_ms: config.timeout.as_millis() as u64,
    }
}

/// Read every input file, keyed by its file name
pub fn read_documents(files: &[PathBuf]) -> Result<Vec<(String, Vec<u8>)>> {
    files
        .iter()
        .map(|path| {
            let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            Ok((name, bytes))
        })
        .collect()
}

pub fn write_outputs(out_dir: &Path, review: &SubmissionReview) -> Result<OutputPaths> {
    let reviewed_dir = out_dir.join(REVIEWED_DIR);
    let reports_dir = out_dir.join(REPORTS_DIR);
    fs::create_dir_all(&reviewed_dir)
        .with_context(|| format!("Failed to create {}", reviewed_dir.display()))?;
    fs::create_dir_all(&reports_dir)
        .with_context(|| format!("Failed to create {}", reports_dir.display()))?;

    let mut reviewed = Vec::new();
    let mut taken = HashSet::new();
    for (name, annotated) in &review.annotated {
        let file_name = unique_reviewed_name(name, &mut taken);
        if file_name != reviewed_file_name(name) {
            tracing::warn!(document = %name, output = %file_name, "Reviewed file name already used; renamed");
        }
        let path = reviewed_dir.join(file_name);
        fs::write(&path, &annotated.bytes).with_context(|| format!("Failed to write {}", path.display()))?;
        reviewed.push(path);
    }

    let report_path = reports_dir.join(REPORT_FILE);
    let json = report::submission_to_json(&review.report).context("Failed to serialize report")?;
    fs::write(&report_path, json).with_context(|| format!("Failed to write {}", report_path.display()))?;

    Ok(OutputPaths {
        report: report_path,
        reviewed,
    })
}

/// Review the configured files and write the outputs
pub async fn run(config: &RunConfig) -> Result<(SubmissionReview, OutputPaths)> {
    let policy = load_policy(config.policy.as_deref())?;
    tracing::info!(version = %policy.version, "Loaded review policy");

    let retriever = build_retriever(&config.corpus)?;
    let pipeline = ReviewPipeline::new(Arc::new(policy))
        .context("Failed to build red-flag detectors")?
        .with_retriever(retriever)
        .with_retrieval(retrieval_policy(&config.corpus));

    let documents = read_documents(&config.files)?;
    let review = pipeline.review_submission(&documents, config.process).await;
    let outputs = write_outputs(&config.out_dir, &review)?;
    Ok((review, outputs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reviewed_file_name() {
        assert_eq!(reviewed_file_name("Articles.docx"), "Articles_REVIEWED.docx");
        assert_eq!(reviewed_file_name("board.resolution.docx"), "board.resolution_REVIEWED.docx");
        assert_eq!(reviewed_file_name("notes"), "notes_REVIEWED.docx");
    }

    #[test]
    fn test_duplicate_names_get_distinct_outputs() {
        let mut taken = HashSet::new();
        assert_eq!(unique_reviewed_name("Articles.docx", &mut taken), "Articles_REVIEWED.docx");
        assert_eq!(unique_reviewed_name("Articles.docx", &mut taken), "Articles_REVIEWED_2.docx");
        assert_eq!(unique_reviewed_name("Articles.docx", &mut taken), "Articles_REVIEWED_3.docx");
        assert_eq!(unique_reviewed_name("Resolution.docx", &mut taken), "Resolution_REVIEWED.docx");
    }

    #[test]
    fn test_retrieval_policy_from_corpus_config() {
        let config = CorpusConfig::from_vars(|key| match key {
            "ADGM_RETRIEVAL_TIMEOUT_MS" => Some("750".to_string()),
            "ADGM_RETRIEVAL_TOP_K" => Some("2".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(
            retrieval_policy(&config),
            RetrievalPolicy {
                top_k: 2,
                timeout_ms: 750
            }
        );
    }

    #[test]
    fn test_missing_policy_file_names_path() {
        let err = load_policy(Some(Path::new("/nonexistent/adgm.toml"))).unwrap_err();
        assert!(format!("{:#}", err).contains("/nonexistent/adgm.toml"));
    }
}
