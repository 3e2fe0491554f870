use crate::error::RetrievalError;
use crate::passage::{Passage, RankedPassage};
use crate::search::{normalize_scores, sanitize_query};
use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::*;
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument};

/// Keyword search index using Tantivy for BM25 matching
///
/// Holds reference passages in RAM. The source name is indexed alongside the
/// passage text so a query naming a regulation also hits passages from it.
///
/// # Schema
///
/// - `id`: Passage identifier (STRING | STORED)
/// - `source`: Reference document name (TEXT | STORED)
/// - `content`: Passage text (TEXT | STORED)
pub struct KeywordIndex {
    index: Index,
    id_field: Field,
    source_field: Field,
    content_field: Field,
    len: usize,
}

impl KeywordIndex {
    /// Create an empty in-memory index
    pub fn in_memory() -> Result<Self, RetrievalError> {
        let mut schema_builder = Schema::builder();

        let id_field = schema_builder.add_text_field("id", STRING | STORED);
        let source_field = schema_builder.add_text_field("source", TEXT | STORED);
        let content_field = schema_builder.add_text_field("content", TEXT | STORED);

        let index = Index::create_in_ram(schema_builder.build());

        Ok(Self {
            index,
            id_field,
            source_field,
            content_field,
            len: 0,
        })
    }

    /// Build an index holding `passages`
    pub fn from_passages(passages: &[Passage]) -> Result<Self, RetrievalError> {
        let mut index = Self::in_memory()?;
        index.add_passages(passages)?;
        Ok(index)
    }

    /// Add passages in a single commit
    ///
    /// # Errors
    ///
    /// Returns an error if the index writer cannot be created (50MB heap
    /// allocation) or the commit fails.
    pub fn add_passages(&mut self, passages: &[Passage]) -> Result<(), RetrievalError> {
        if passages.is_empty() {
            return Ok(());
        }
        let mut index_writer: IndexWriter = self.index.writer(50_000_000)?;

        for passage in passages {
            let mut doc = TantivyDocument::new();
            doc.add_text(self.id_field, &passage.id);
            doc.add_text(self.source_field, &passage.source);
            doc.add_text(self.content_field, &passage.text);
            index_writer.add_document(doc)?;
        }
        index_writer.commit()?;
        self.len += passages.len();

        tracing::debug!(added = passages.len(), total = self.len, "Indexed reference passages");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Search for passages matching free text
    ///
    /// The query is reduced to plain terms and parsed leniently, so arbitrary
    /// document text never produces a syntax error. Results are sorted by
    /// descending score, normalized against the best hit.
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<RankedPassage>, RetrievalError> {
        let query = sanitize_query(query);
        if limit == 0 || query.is_empty() || self.is_empty() {
            return Ok(Vec::new());
        }

        let reader: IndexReader = self
            .index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        let searcher = reader.searcher();

        let query_parser =
            QueryParser::for_index(&self.index, vec![self.content_field, self.source_field]);
        let (query, _ignored) = query_parser.parse_query_lenient(&query);
        let top_docs = searcher.search(&query, &TopDocs::with_limit(limit))?;

        let scores: Vec<f32> = top_docs.iter().map(|(score, _)| *score).collect();
        let normalized = normalize_scores(&scores);

        let mut results = Vec::with_capacity(top_docs.len());
        for ((_, address), score) in top_docs.into_iter().zip(normalized) {
            let doc: TantivyDocument = searcher.doc(address)?;
            let field = |f: Field| {
                doc.get_first(f)
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string()
            };
            results.push(RankedPassage {
                passage_id: field(self.id_field),
                source: field(self.source_field),
                text: field(self.content_field),
                score,
            });
        }

        Ok(results)
    }
}
