use thiserror::Error;

/// Failures reading or rewriting a `.docx` package
///
/// Every variant means the input cannot be treated as a valid structural
/// tree; callers reject the document rather than recover per block.
#[derive(Error, Debug)]
pub enum DocxError {
    #[error("Not a valid OOXML container: {0}")]
    Container(String),

    #[error("Missing package part: {0}")]
    MissingPart(String),

    #[error("Malformed XML in {part} at byte {position}: {message}")]
    MalformedXml {
        part: String,
        position: usize,
        message: String,
    },

    #[error("Document part {0} has no w:body element")]
    MissingBody(String),

    #[error("Failed to write package: {0}")]
    Write(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<zip::result::ZipError> for DocxError {
    fn from(e: zip::result::ZipError) -> Self {
        DocxError::Container(e.to_string())
    }
}
