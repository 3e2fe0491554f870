//! Checklist conformance
//!
//! A pure function: identical requirements, blocks, matcher and evidence
//! always produce identical findings.

use crate::config::Thresholds;
use crate::matching::{ClauseMatcher, RequirementEvidence};
use shared_types::{ExtractedBlock, Finding, FindingStatus, ProcessCategory, Requirement};
use std::collections::BTreeMap;

/// Check every requirement of `category` against the document's blocks
///
/// Requirements are evaluated in id order. Each is scored against every
/// non-blank block; the best block wins and ties go to the earliest block.
pub fn check_conformance(
    category: ProcessCategory,
    requirements: &[Requirement],
    blocks: &[ExtractedBlock],
    matcher: &dyn ClauseMatcher,
    evidence: &BTreeMap<String, RequirementEvidence>,
    thresholds: &Thresholds,
) -> Vec<Finding> {
    let mut applicable: Vec<&Requirement> = requirements
        .iter()
        .filter(|r| r.process_category == category)
        .collect();
    applicable.sort_by(|a, b| a.id.cmp(&b.id));

    let no_evidence = RequirementEvidence::none();
    applicable
        .into_iter()
        .map(|requirement| {
            let evidence = evidence.get(&requirement.id).unwrap_or(&no_evidence);
            let best = best_block(requirement, blocks, matcher, evidence);
            let finding = evaluate(requirement, best, evidence, matcher, thresholds);
            tracing::debug!(
                requirement = %requirement.id,
                score = best.map(|(_, s)| s).unwrap_or(0.0),
                status = ?finding.status,
                "Evaluated requirement"
            );
            finding
        })
        .collect()
}

fn best_block<'a>(
    requirement: &Requirement,
    blocks: &'a [ExtractedBlock],
    matcher: &dyn ClauseMatcher,
    evidence: &RequirementEvidence,
) -> Option<(&'a ExtractedBlock, f32)> {
    let mut best: Option<(&ExtractedBlock, f32)> = None;
    for block in blocks.iter().filter(|b| !b.is_blank()) {
        let score = matcher.score(requirement, &block.text, evidence);
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((block, score));
        }
    }
    best
}

fn evaluate(
    requirement: &Requirement,
    best: Option<(&ExtractedBlock, f32)>,
    evidence: &RequirementEvidence,
    matcher: &dyn ClauseMatcher,
    thresholds: &Thresholds,
) -> Finding {
    let score = best.map(|(_, s)| s).unwrap_or(0.0);
    let id = requirement.id.as_str();

    let matched = best.is_some() && score > 0.0;

    let mut finding = if matched && score >= thresholds.match_high {
        Finding::requirement(
            id,
            FindingStatus::Satisfied,
            requirement.severity,
            format!("{} is present.", requirement.description),
        )
    } else if matched && score >= thresholds.match_low {
        Finding::requirement(
            id,
            FindingStatus::Ambiguous,
            requirement.severity,
            format!(
                "{} may be incomplete or worded unclearly (match {:.2}).",
                requirement.description, score
            ),
        )
        .with_suggestion(format!(
            "State the clause explicitly, e.g. '{}'.",
            requirement.required_clause_pattern
        ))
    } else {
        Finding::requirement(
            id,
            FindingStatus::Missing,
            requirement.severity,
            format!("Required clause not found: {}.", requirement.description),
        )
        .with_suggestion(format!(
            "Add a clause covering '{}'.",
            requirement.required_clause_pattern
        ))
    };

    if finding.status != FindingStatus::Missing {
        if let Some((block, _)) = best {
            finding = finding.with_anchor(block.anchor_id.clone());
        }
    }
    if finding.status != FindingStatus::Satisfied {
        if let Some(source) = evidence.top_source() {
            finding = finding.with_citation(source);
        }
        if let (true, Some(reason)) = (matcher.uses_evidence(), &evidence.degraded) {
            finding.explanation = format!(
                "{} Reference evidence unavailable ({}).",
                finding.explanation, reason
            );
        }
    }
    finding.with_confidence(score)
}
