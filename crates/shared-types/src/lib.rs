pub mod checklist;
pub mod document;
pub mod finding;
pub mod report;
pub mod types;

pub use checklist::{Checklist, Requirement};
pub use document::{AnchorId, BlockKind, ExtractedBlock, PathSegment, SegmentKind, SourceRange, StructuralPath};
pub use finding::{Finding, FindingSource, FindingStatus, DETECTOR_ERROR_PREFIX};
pub use report::{DocumentFailure, Report, ReportSummary, SubmissionReport};
pub use types::{ProcessCategory, Severity};
