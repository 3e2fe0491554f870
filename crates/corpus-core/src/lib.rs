//! Corpus Core - the retrieval boundary of the review engine
//!
//! This crate provides:
//! - The `Retriever` trait and the ranked passages it returns
//! - A BM25 keyword index over reference passages (Tantivy)
//! - Reference corpus loading and chunking from a directory
//! - Timeout handling that degrades retrieval to "no evidence"
//! - Configuration from environment variables

pub mod config;
pub mod corpus;
pub mod error;
pub mod passage;
pub mod retriever;
pub mod search;

pub use config::CorpusConfig;
pub use corpus::{split_text, ReferenceCorpus};
pub use error::RetrievalError;
pub use passage::{Passage, RankedPassage};
pub use retriever::{
    retrieve_with_timeout, KeywordRetriever, NullRetriever, RetrievalOutcome, Retriever,
    StaticRetriever,
};
pub use search::keyword::KeywordIndex;
