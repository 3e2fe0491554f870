//! Red-flag scanning with cited sources

use crate::config::{CitationPolicy, RetrievalPolicy, RulesConfig};
use crate::rules::{builtin_detectors, run_detectors, Detector, DetectorError, ScanContext};
use corpus_core::{retrieve_with_timeout, Retriever};
use futures::future::join_all;
use shared_types::Finding;
use std::collections::BTreeMap;

pub struct RedFlagScanner {
    detectors: Vec<Box<dyn Detector>>,
}

impl RedFlagScanner {
    pub fn new(detectors: Vec<Box<dyn Detector>>) -> Self {
        Self { detectors }
    }

    pub fn from_rules(rules: &RulesConfig) -> Result<Self, DetectorError> {
        Ok(Self::new(builtin_detectors(rules)?))
    }

    pub fn detectors(&self) -> &[Box<dyn Detector>] {
        &self.detectors
    }

    /// Run all detectors, then cite a source for every rule that fired
    ///
    /// One retrieval call is made per distinct rule, all concurrently. A rule
    /// whose retrieval times out or finds nothing gets its fallback citation.
    pub async fn scan(
        &self,
        ctx: &ScanContext<'_>,
        retriever: &dyn Retriever,
        retrieval: RetrievalPolicy,
    ) -> Vec<Finding> {
        let mut findings = run_detectors(&self.detectors, ctx);

        let mut policies: BTreeMap<&str, &CitationPolicy> = BTreeMap::new();
        for finding in findings.iter().filter(|f| !f.is_detector_error()) {
            if let Some(policy) = self.citation_policy(finding.id()) {
                policies.insert(finding.id(), policy);
            }
        }

        let lookups = policies.iter().map(|(&rule_id, policy)| {
            let query = policy.query_for(ctx.document_type);
            async move {
                let outcome =
                    retrieve_with_timeout(retriever, &query, retrieval.top_k, retrieval.timeout()).await;
                let citation = outcome
                    .passages()
                    .first()
                    .map(|p| p.source.clone())
                    .unwrap_or_else(|| policy.fallback.clone());
                (rule_id.to_string(), citation)
            }
        });
        let citations: BTreeMap<String, String> = join_all(lookups).await.into_iter().collect();

        for finding in &mut findings {
            if let Some(citation) = citations.get(finding.id()) {
                finding.citation = Some(citation.clone());
            }
        }
        findings
    }

    fn citation_policy(&self, rule_id: &str) -> Option<&CitationPolicy> {
        self.detectors
            .iter()
            .find(|d| d.id() == rule_id)
            .and_then(|d| d.citation())
    }
}
