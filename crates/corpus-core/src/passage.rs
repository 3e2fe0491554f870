use serde::{Deserialize, Serialize};

/// A chunk of reference text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passage {
    /// `<source>#<chunk index>`
    pub id: String,
    /// Name of the reference document the chunk came from
    pub source: String,
    pub text: String,
}

/// A passage returned for a query, best first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedPassage {
    pub passage_id: String,
    pub source: String,
    pub text: String,
    /// Relevance normalized to `(0, 1]` against the best hit of the same query
    pub score: f32,
}

impl RankedPassage {
    pub fn new(passage_id: &str, source: &str, text: &str, score: f32) -> Self {
        Self {
            passage_id: passage_id.to_string(),
            source: source.to_string(),
            text: text.to_string(),
            score,
        }
    }
}
