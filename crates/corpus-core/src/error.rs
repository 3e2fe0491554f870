use thiserror::Error;

/// Failures at the retrieval boundary
///
/// None of these are fatal to a review: callers degrade to "no contextual
/// evidence" and carry on.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("Index error: {0}")]
    Index(#[from] tantivy::TantivyError),

    #[error("Retrieval task failed: {0}")]
    Task(String),

    #[error("Retrieval backend unavailable: {0}")]
    Unavailable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
