use crate::error::DocxError;
use crate::package::DocxPackage;
use crate::structure::scan_paragraphs;
use shared_types::ExtractedBlock;

/// Turns a package's main document into an ordered sequence of blocks
pub struct ClauseExtractor;

impl ClauseExtractor {
    /// Extract every block-level paragraph in document order
    ///
    /// Anchors are derived from structural position, so the annotator can
    /// find the same paragraph again later from the unmodified package.
    pub fn extract(package: &DocxPackage) -> Result<Vec<ExtractedBlock>, DocxError> {
        let spans = scan_paragraphs(package.document_xml(), package.document_part())?;
        let blocks = spans
            .into_iter()
            .map(|span| ExtractedBlock {
                anchor_id: span.path.anchor(),
                structural_path: span.path,
                kind: span.kind,
                text: span.text,
                source_range: span.range,
            })
            .collect::<Vec<_>>();
        tracing::debug!(
            part = package.document_part(),
            blocks = blocks.len(),
            "Extracted document blocks"
        );
        Ok(blocks)
    }

    /// Open and extract in one step
    pub fn extract_bytes(bytes: &[u8]) -> Result<Vec<ExtractedBlock>, DocxError> {
        let package = DocxPackage::open(bytes)?;
        Self::extract(&package)
    }

    /// Plain text of a document, one block per line
    pub fn extract_text(bytes: &[u8]) -> Result<String, DocxError> {
        let blocks = Self::extract_bytes(bytes)?;
        Ok(blocks
            .iter()
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join("\n"))
    }
}
