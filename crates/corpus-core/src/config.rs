//! Configuration for reference retrieval
//!
//! Loaded from environment variables; every value has a default so an empty
//! environment yields a working (corpus-less) configuration.

use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_TOP_K: usize = 4;
pub const DEFAULT_TIMEOUT_MS: u64 = 2_000;
pub const DEFAULT_CHUNK_SIZE: usize = 1_200;
pub const DEFAULT_CHUNK_OVERLAP: usize = 150;

/// Retrieval configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusConfig {
    /// Directory of reference documents; `None` disables retrieval
    pub reference_dir: Option<PathBuf>,
    /// Passages returned per query
    pub top_k: usize,
    /// Upper bound on a single retrieval call
    pub timeout: Duration,
    /// Chunk length in characters
    pub chunk_size: usize,
    /// Characters shared by consecutive chunks
    pub chunk_overlap: usize,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            reference_dir: None,
            top_k: DEFAULT_TOP_K,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl CorpusConfig {
    /// Configuration reading reference documents from `dir`
    pub fn with_reference_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            reference_dir: Some(dir.into()),
            ..Self::default()
        }
    }

    /// Load configuration from environment variables
    ///
    /// Expected variables:
    /// - ADGM_REFERENCE_DIR: Directory of `.txt`, `.md` and `.docx` references
    /// - ADGM_RETRIEVAL_TOP_K: Passages per query (default: 4)
    /// - ADGM_RETRIEVAL_TIMEOUT_MS: Per-call timeout (default: 2000)
    /// - ADGM_CHUNK_SIZE: Chunk length in characters (default: 1200)
    /// - ADGM_CHUNK_OVERLAP: Chunk overlap in characters (default: 150)
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Same as [`CorpusConfig::from_env`] with an injectable variable source
    pub fn from_vars<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let number = |key: &str, default: u64| -> Result<u64> {
            match var(key) {
                Some(raw) => raw
                    .trim()
                    .parse::<u64>()
                    .with_context(|| format!("{} must be a non-negative integer, got '{}'", key, raw)),
                None => Ok(default),
            }
        };

        let config = Self {
            reference_dir: var("ADGM_REFERENCE_DIR")
                .filter(|d| !d.trim().is_empty())
                .map(PathBuf::from),
            top_k: number("ADGM_RETRIEVAL_TOP_K", defaults.top_k as u64)? as usize,
            timeout: Duration::from_millis(number("ADGM_RETRIEVAL_TIMEOUT_MS", DEFAULT_TIMEOUT_MS)?),
            chunk_size: number("ADGM_CHUNK_SIZE", defaults.chunk_size as u64)? as usize,
            chunk_overlap: number("ADGM_CHUNK_OVERLAP", defaults.chunk_overlap as u64)? as usize,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(anyhow!("Chunk size must be positive"));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(anyhow!(
                "Chunk overlap ({}) must be smaller than chunk size ({})",
                self.chunk_overlap,
                self.chunk_size
            ));
        }
        Ok(())
    }
}
