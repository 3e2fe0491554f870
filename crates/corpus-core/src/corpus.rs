//! Reference corpus loading and chunking

use crate::config::CorpusConfig;
use crate::error::RetrievalError;
use crate::passage::Passage;
use crate::search::keyword::KeywordIndex;
use shared_docx::ClauseExtractor;
use std::path::{Path, PathBuf};

/// Reference passages loaded from a directory
#[derive(Debug, Clone, Default)]
pub struct ReferenceCorpus {
    passages: Vec<Passage>,
    sources: Vec<String>,
}

impl ReferenceCorpus {
    /// Load every `.txt`, `.md` and `.docx` file under `dir`, recursively
    ///
    /// Files are visited in path order. A file that cannot be read is logged
    /// and skipped; only an unreadable directory is an error.
    pub fn from_dir(dir: &Path, config: &CorpusConfig) -> Result<Self, RetrievalError> {
        let mut files = Vec::new();
        collect_files(dir, &mut files)?;
        files.sort();

        let mut corpus = Self::default();
        for path in files {
            let source = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            match read_reference(&path) {
                Ok(Some(text)) => corpus.add_text(&source, &text, config),
                Ok(None) => {}
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable reference"),
            }
        }

        tracing::info!(
            dir = %dir.display(),
            sources = corpus.sources.len(),
            passages = corpus.passages.len(),
            "Loaded reference corpus"
        );
        Ok(corpus)
    }

    /// Chunk `text` and add it under `source`
    pub fn add_text(&mut self, source: &str, text: &str, config: &CorpusConfig) {
        let chunks = split_text(text, config.chunk_size, config.chunk_overlap);
        if chunks.is_empty() {
            return;
        }
        self.sources.push(source.to_string());
        self.passages.extend(chunks.into_iter().enumerate().map(|(i, chunk)| Passage {
            id: format!("{}#{}", source, i),
            source: source.to_string(),
            text: chunk,
        }));
    }

    pub fn passages(&self) -> &[Passage] {
        &self.passages
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    /// Build a BM25 index over the passages
    pub fn build_index(&self) -> Result<KeywordIndex, RetrievalError> {
        KeywordIndex::from_passages(&self.passages)
    }
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), RetrievalError> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}

/// Text of a reference file, or `None` for unsupported extensions
fn read_reference(path: &Path) -> Result<Option<String>, RetrievalError> {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "txt" | "md" => {
            let bytes = std::fs::read(path)?;
            Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
        }
        "docx" => {
            let bytes = std::fs::read(path)?;
            ClauseExtractor::extract_text(&bytes)
                .map(Some)
                .map_err(|e| RetrievalError::Unavailable(e.to_string()))
        }
        _ => Ok(None),
    }
}

/// Split text into chunks of at most `size` characters
///
/// Consecutive chunks share up to `overlap` characters. A chunk ends at the
/// last paragraph break in its second half if there is one, otherwise the last
/// line break, otherwise the last space, otherwise exactly at `size`.
/// Whitespace-only chunks are dropped.
pub fn split_text(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if size == 0 || chars.is_empty() {
        return Vec::new();
    }
    let overlap = overlap.min(size.saturating_sub(1));

    let mut chunks = Vec::new();
    let mut start = 0usize;
    while start < chars.len() {
        let hard_end = (start + size).min(chars.len());
        let end = if hard_end == chars.len() {
            hard_end
        } else {
            break_point(&chars, start + size / 2, hard_end).unwrap_or(hard_end)
        };

        let chunk: String = chars[start..end].iter().collect();
        let trimmed = chunk.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }
        if end >= chars.len() {
            break;
        }
        let next = end.saturating_sub(overlap);
        start = if next > start { next } else { end };
    }
    chunks
}

/// Position just after the preferred separator in `chars[from..to]`
fn break_point(chars: &[char], from: usize, to: usize) -> Option<usize> {
    let window = &chars[from..to];
    let paragraph = window
        .windows(2)
        .rposition(|w| w[0] == '\n' && w[1] == '\n')
        .map(|i| from + i + 2);
    paragraph
        .or_else(|| window.iter().rposition(|&c| c == '\n').map(|i| from + i + 1))
        .or_else(|| window.iter().rposition(|&c| c == ' ').map(|i| from + i + 1))
}
