//! Process category and document type classification
//!
//! Scoring is a pure function of the extracted blocks, the file name and the
//! retrieval evidence handed in by the caller.

use crate::config::{CategorySignature, DocumentTypeSignature, PolicyConfig, Thresholds};
use crate::patterns::{contains_phrase, normalize};
use corpus_core::RankedPassage;
use serde::{Deserialize, Serialize};
use shared_types::{BlockKind, ExtractedBlock, ProcessCategory};
use std::fmt;
use thiserror::Error;

/// Words of leading text used to build the retrieval query
const QUERY_WORDS: usize = 40;
const QUERY_HEADINGS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub category: ProcessCategory,
    pub keyword: f32,
    pub evidence: f32,
    pub combined: f32,
}

impl fmt::Display for CategoryScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:.2}", self.category, self.combined)
    }
}

/// A confident classification and the scores behind it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub category: ProcessCategory,
    pub scores: Vec<CategoryScore>,
}

/// No category is both above the minimum and clearly ahead of the rest
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Classification ambiguous; candidates: {}", format_candidates(.candidates))]
pub struct ClassificationAmbiguous {
    /// Every category, best first
    pub candidates: Vec<CategoryScore>,
}

fn format_candidates(candidates: &[CategoryScore]) -> String {
    candidates
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// What the classifier looks at
#[derive(Debug, Clone, Copy)]
pub struct ClassifierInput<'a> {
    pub blocks: &'a [ExtractedBlock],
    pub file_name: Option<&'a str>,
    pub evidence: &'a [RankedPassage],
}

pub struct DocumentClassifier {
    signatures: Vec<CategorySignature>,
    thresholds: Thresholds,
}

impl DocumentClassifier {
    pub fn new(signatures: Vec<CategorySignature>, thresholds: Thresholds) -> Self {
        Self {
            signatures,
            thresholds,
        }
    }

    pub fn from_policy(policy: &PolicyConfig) -> Self {
        Self::new(policy.categories.clone(), policy.thresholds)
    }

    /// Retrieval query for a document: its first headings, then leading text
    pub fn query(blocks: &[ExtractedBlock]) -> String {
        let headings = blocks
            .iter()
            .filter(|b| b.kind == BlockKind::Heading && !b.is_blank())
            .take(QUERY_HEADINGS)
            .map(|b| b.text.trim());
        let leading = blocks
            .iter()
            .filter(|b| b.kind != BlockKind::Heading)
            .flat_map(|b| b.text.split_whitespace());

        headings
            .flat_map(str::split_whitespace)
            .chain(leading)
            .take(QUERY_WORDS)
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn keywords(&self, category: ProcessCategory) -> impl Iterator<Item = &str> {
        self.signatures
            .iter()
            .filter(move |s| s.category == category)
            .flat_map(|s| s.keywords.iter().map(String::as_str))
    }

    /// Scores for every category, best first (ties in category order)
    pub fn score(&self, input: &ClassifierInput<'_>) -> Vec<CategoryScore> {
        let body = normalize(
            &input
                .blocks
                .iter()
                .map(|b| b.text.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
        );
        let headings: Vec<String> = input
            .blocks
            .iter()
            .filter(|b| b.kind == BlockKind::Heading)
            .map(|b| normalize(&b.text))
            .collect();
        let file_name = input.file_name.map(file_stem).map(normalize).unwrap_or_default();

        let saturation = self.thresholds.keyword_saturation.max(1);
        let keyword_scores: Vec<f32> = ProcessCategory::ALL
            .iter()
            .map(|&category| {
                let hits: usize = self
                    .keywords(category)
                    .map(|k| {
                        if contains_phrase(&file_name, k) || headings.iter().any(|h| contains_phrase(h, k)) {
                            2
                        } else if contains_phrase(&body, k) {
                            1
                        } else {
                            0
                        }
                    })
                    .sum();
                hits.min(saturation) as f32 / saturation as f32
            })
            .collect();

        let mut votes = [0.0f32; 4];
        for passage in input.evidence {
            let text = normalize(&format!("{} {}", passage.source, passage.text));
            for (i, &category) in ProcessCategory::ALL.iter().enumerate() {
                if self.keywords(category).any(|k| contains_phrase(&text, k)) {
                    votes[i] += passage.score.max(0.0);
                }
            }
        }
        let total: f32 = votes.iter().sum();
        let w = self.thresholds.evidence_weight;

        let mut scores: Vec<CategoryScore> = ProcessCategory::ALL
            .iter()
            .enumerate()
            .map(|(i, &category)| {
                let keyword = keyword_scores[i];
                let evidence = if total > 0.0 { votes[i] / total } else { 0.0 };
                let combined = if total > 0.0 {
                    (1.0 - w) * keyword + w * evidence
                } else {
                    keyword
                };
                CategoryScore {
                    category,
                    keyword,
                    evidence,
                    combined,
                }
            })
            .collect();
        scores.sort_by(|a, b| b.combined.total_cmp(&a.combined).then(a.category.cmp(&b.category)));
        scores
    }

    /// Pick a category, or report the candidates when no choice is clear
    pub fn classify(&self, input: &ClassifierInput<'_>) -> Result<Classification, ClassificationAmbiguous> {
        let scores = self.score(input);
        tracing::debug!(scores = %format_candidates(&scores), "Category scores");

        let best = scores[0];
        let runner_up = scores.get(1).map(|s| s.combined).unwrap_or(0.0);
        if best.combined >= self.thresholds.classification_min
            && best.combined - runner_up > self.thresholds.classification_epsilon
        {
            Ok(Classification {
                category: best.category,
                scores,
            })
        } else {
            Err(ClassificationAmbiguous { candidates: scores })
        }
    }
}

fn file_stem(name: &str) -> &str {
    let base = name.rsplit(&['/', '\\'][..]).next().unwrap_or(name);
    base.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(base)
}

/// First document type whose keywords appear in the file name or text
pub fn classify_document_type<'a>(
    types: &'a [DocumentTypeSignature],
    file_name: Option<&str>,
    blocks: &[ExtractedBlock],
) -> Option<&'a DocumentTypeSignature> {
    let haystack = normalize(&format!(
        "{} {}",
        file_name.map(file_stem).unwrap_or(""),
        blocks
            .iter()
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    ));
    types
        .iter()
        .find(|t| t.keywords.iter().any(|k| contains_phrase(&haystack, k)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{AnchorId, SourceRange, StructuralPath};

    fn block(i: usize, kind: BlockKind, text: &str) -> ExtractedBlock {
        ExtractedBlock {
            anchor_id: AnchorId::new(format!("body/p[{}]", i)),
            structural_path: StructuralPath::body(),
            kind,
            text: text.to_string(),
            source_range: SourceRange { start: 0, end: 0 },
        }
    }

    fn classifier() -> DocumentClassifier {
        DocumentClassifier::from_policy(&PolicyConfig::builtin().unwrap())
    }

    #[test]
    fn test_heading_keywords_classify() {
        let blocks = vec![
            block(0, BlockKind::Heading, "Articles of Association"),
            block(1, BlockKind::Paragraph, "The registered office of the Company is in ADGM."),
        ];
        let input = ClassifierInput {
            blocks: &blocks,
            file_name: None,
            evidence: &[],
        };
        let result = classifier().classify(&input).unwrap();
        assert_eq!(result.category, ProcessCategory::Incorporation);
        assert_eq!(result.scores[0].keyword, 1.0);
    }

    #[test]
    fn test_file_name_counts() {
        let blocks = vec![block(0, BlockKind::Paragraph, "Salary is paid monthly.")];
        let input = ClassifierInput {
            blocks: &blocks,
            file_name: Some("uploads/Employment_Contract-final.docx"),
            evidence: &[],
        };
        let result = classifier().classify(&input).unwrap();
        assert_eq!(result.category, ProcessCategory::Employment);
    }

    #[test]
    fn test_no_signal_is_ambiguous() {
        let blocks = vec![block(0, BlockKind::Paragraph, "Lorem ipsum dolor sit amet.")];
        let input = ClassifierInput {
            blocks: &blocks,
            file_name: None,
            evidence: &[],
        };
        let err = classifier().classify(&input).unwrap_err();
        assert_eq!(err.candidates.len(), 4);
        assert!(err.candidates.iter().all(|c| c.combined == 0.0));
        // ties keep category order
        assert_eq!(err.candidates[0].category, ProcessCategory::Incorporation);
    }

    #[test]
    fn test_close_scores_are_ambiguous() {
        let blocks = vec![block(
            0,
            BlockKind::Paragraph,
            "The board of directors resolved on the salary of each employee.",
        )];
        let input = ClassifierInput {
            blocks: &blocks,
            file_name: None,
            evidence: &[],
        };
        let err = classifier().classify(&input).unwrap_err();
        assert!(err.to_string().contains("Classification ambiguous"));
    }

    #[test]
    fn test_evidence_breaks_tie() {
        let blocks = vec![block(
            0,
            BlockKind::Paragraph,
            "The board of directors resolved on the salary of each employee.",
        )];
        let evidence = vec![
            RankedPassage::new("r#0", "Resolutions Guide", "A written resolution of the board", 1.0),
            RankedPassage::new("r#1", "Resolutions Guide", "Quorum requirements for a resolution", 0.8),
        ];
        let input = ClassifierInput {
            blocks: &blocks,
            file_name: None,
            evidence: &evidence,
        };
        let result = classifier().classify(&input).unwrap();
        assert_eq!(result.category, ProcessCategory::Resolution);
        assert!(result.scores[0].evidence > 0.9);
    }

    #[test]
    fn test_query_uses_headings_then_text() {
        let blocks = vec![
            block(0, BlockKind::Paragraph, "Dated 1 March 2025"),
            block(1, BlockKind::Heading, "Board Resolution"),
        ];
        assert_eq!(DocumentClassifier::query(&blocks), "Board Resolution Dated 1 March 2025");
    }

    #[test]
    fn test_document_type_detection() {
        let policy = PolicyConfig::builtin().unwrap();
        let blocks = vec![block(0, BlockKind::Heading, "Ultimate Beneficial Owner Declaration")];
        let found = classify_document_type(&policy.document_types, None, &blocks).unwrap();
        assert_eq!(found.name, "UBO Declaration Form");

        let found = classify_document_type(&policy.document_types, Some("AoA_v2.docx"), &[]).unwrap();
        assert_eq!(found.name, "Articles of Association");

        assert!(classify_document_type(&policy.document_types, Some("notes.docx"), &[]).is_none());
    }
}
