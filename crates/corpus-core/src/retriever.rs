//! The retrieval boundary
//!
//! Everything the review engine learns from reference material goes through
//! [`Retriever`]. Calls are always bounded by [`retrieve_with_timeout`], and a
//! slow or failing backend degrades to "no contextual evidence".

use crate::error::RetrievalError;
use crate::passage::RankedPassage;
use crate::search::keyword::KeywordIndex;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

#[async_trait]
pub trait Retriever: Send + Sync {
    /// Up to `top_k` passages for `query`, best first
    async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<RankedPassage>, RetrievalError>;

    /// Name used in logs
    fn name(&self) -> &str;
}

/// Result of a bounded retrieval call
#[derive(Debug, Clone, PartialEq)]
pub enum RetrievalOutcome {
    Passages(Vec<RankedPassage>),
    TimedOut,
    Failed(String),
}

impl RetrievalOutcome {
    /// Passages, empty when degraded
    pub fn passages(&self) -> &[RankedPassage] {
        match self {
            RetrievalOutcome::Passages(p) => p,
            _ => &[],
        }
    }

    pub fn into_passages(self) -> Vec<RankedPassage> {
        match self {
            RetrievalOutcome::Passages(p) => p,
            _ => Vec::new(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        !matches!(self, RetrievalOutcome::Passages(_))
    }
}

/// Run a retrieval call under `timeout`
///
/// Never fails: a timeout or backend error is logged and reported as a
/// degraded outcome.
pub async fn retrieve_with_timeout(
    retriever: &dyn Retriever,
    query: &str,
    top_k: usize,
    timeout: Duration,
) -> RetrievalOutcome {
    match tokio::time::timeout(timeout, retriever.retrieve(query, top_k)).await {
        Ok(Ok(passages)) => {
            tracing::debug!(
                retriever = retriever.name(),
                hits = passages.len(),
                "Retrieved reference passages"
            );
            RetrievalOutcome::Passages(passages)
        }
        Ok(Err(e)) => {
            tracing::warn!(retriever = retriever.name(), error = %e, "Retrieval failed; continuing without evidence");
            RetrievalOutcome::Failed(e.to_string())
        }
        Err(_) => {
            tracing::warn!(
                retriever = retriever.name(),
                timeout_ms = timeout.as_millis() as u64,
                "Retrieval timed out; continuing without evidence"
            );
            RetrievalOutcome::TimedOut
        }
    }
}

/// Retriever with no corpus behind it
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRetriever;

#[async_trait]
impl Retriever for NullRetriever {
    async fn retrieve(&self, _query: &str, _top_k: usize) -> Result<Vec<RankedPassage>, RetrievalError> {
        Ok(Vec::new())
    }

    fn name(&self) -> &str {
        "null"
    }
}

/// BM25 retrieval over a [`KeywordIndex`]
///
/// Index searches are synchronous, so they run on the blocking pool.
#[derive(Clone)]
pub struct KeywordRetriever {
    index: Arc<KeywordIndex>,
}

impl KeywordRetriever {
    pub fn new(index: Arc<KeywordIndex>) -> Self {
        Self { index }
    }
}

#[async_trait]
impl Retriever for KeywordRetriever {
    async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<RankedPassage>, RetrievalError> {
        let index = Arc::clone(&self.index);
        let query = query.to_string();
        tokio::task::spawn_blocking(move || index.search(&query, top_k))
            .await
            .map_err(|e| RetrievalError::Task(e.to_string()))?
    }

    fn name(&self) -> &str {
        "keyword"
    }
}

/// Canned responses keyed by query substring
///
/// The first rule whose needle occurs in the lowercased query answers;
/// otherwise the default passages are returned.
#[derive(Debug, Clone, Default)]
pub struct StaticRetriever {
    rules: Vec<(String, Vec<RankedPassage>)>,
    default: Vec<RankedPassage>,
}

impl StaticRetriever {
    pub fn new(default: Vec<RankedPassage>) -> Self {
        Self {
            rules: Vec::new(),
            default,
        }
    }

    pub fn with_response(mut self, needle: &str, passages: Vec<RankedPassage>) -> Self {
        self.rules.push((needle.to_lowercase(), passages));
        self
    }
}

#[async_trait]
impl Retriever for StaticRetriever {
    async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<RankedPassage>, RetrievalError> {
        let query = query.to_lowercase();
        let passages = self
            .rules
            .iter()
            .find(|(needle, _)| query.contains(needle.as_str()))
            .map(|(_, p)| p)
            .unwrap_or(&self.default);
        Ok(passages.iter().take(top_k).cloned().collect())
    }

    fn name(&self) -> &str {
        "static"
    }
}
