//! DOCX handling for the review pipeline
//!
//! - [`DocxPackage`] opens a `.docx` container and locates its main document
//! - [`ClauseExtractor`] turns the document into ordered, anchored blocks
//! - [`Annotator`] splices review comments in without disturbing anything else
//! - [`DocxBuilder`] writes small packages for fixtures and synthetic filings

pub mod annotate;
pub mod builder;
pub mod error;
pub mod extract;
pub mod opc;
pub mod package;
pub mod structure;

pub use annotate::{
    comment_text, strip_annotations, AnnotatedDocument, AnnotationManifest, AnnotationOutcome,
    Annotator, AnnotatorOptions, Insertion, Placement,
};
pub use builder::DocxBuilder;
pub use error::DocxError;
pub use extract::ClauseExtractor;
pub use package::{read_all_parts, DocxPackage};
pub use structure::{scan_paragraphs, ParagraphSpan};
