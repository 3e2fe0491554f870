//! Search over reference passages

pub mod keyword;

/// Scale raw scores so the best hit is 1.0
///
/// BM25 scores are unbounded and not comparable across queries; the rest of
/// the engine weighs evidence by rank-relative strength.
pub fn normalize_scores(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().copied().fold(0.0f32, f32::max);
    if max <= 0.0 {
        return vec![0.0; scores.len()];
    }
    scores.iter().map(|s| (s / max).clamp(0.0, 1.0)).collect()
}

/// Reduce free text to lowercase terms, so no query operator survives
pub fn sanitize_query(query: &str) -> String {
    query
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .flat_map(char::to_lowercase)
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
