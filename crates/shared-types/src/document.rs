//! Structural view of a reviewed document
//!
//! Blocks are identified by their position in the document tree, never by
//! their content, so two paragraphs with identical text keep distinct anchors.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a structural position, e.g. `body/tbl[0]/tr[1]/tc[0]/p[0]`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnchorId(String);

impl AnchorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The enclosing container, or `None` at the document root
    pub fn parent(&self) -> Option<AnchorId> {
        self.0
            .rsplit_once('/')
            .map(|(parent, _)| AnchorId(parent.to_string()))
    }

    /// True if `self` lies strictly inside `container`
    pub fn is_within(&self, container: &AnchorId) -> bool {
        self.0.len() > container.0.len()
            && self.0.starts_with(&container.0)
            && self.0.as_bytes()[container.0.len()] == b'/'
    }
}

impl fmt::Display for AnchorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AnchorId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    Body,
    Table,
    Row,
    Cell,
    Paragraph,
}

impl SegmentKind {
    fn tag(&self) -> &'static str {
        match self {
            SegmentKind::Body => "body",
            SegmentKind::Table => "tbl",
            SegmentKind::Row => "tr",
            SegmentKind::Cell => "tc",
            SegmentKind::Paragraph => "p",
        }
    }
}

/// One step of a structural path: element kind plus index among its siblings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathSegment {
    pub kind: SegmentKind,
    pub index: usize,
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            SegmentKind::Body => f.write_str("body"),
            kind => write!(f, "{}[{}]", kind.tag(), self.index),
        }
    }
}

/// Path from the document body down to a block
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StructuralPath(pub Vec<PathSegment>);

impl StructuralPath {
    pub fn body() -> Self {
        Self(vec![PathSegment {
            kind: SegmentKind::Body,
            index: 0,
        }])
    }

    pub fn child(&self, kind: SegmentKind, index: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment { kind, index });
        Self(segments)
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    /// True if any segment is a table cell
    pub fn in_table(&self) -> bool {
        self.0.iter().any(|s| s.kind == SegmentKind::Cell)
    }

    pub fn anchor(&self) -> AnchorId {
        AnchorId(self.to_string())
    }
}

impl fmt::Display for StructuralPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Paragraph,
    Heading,
    TableCell,
}

/// Byte range of the block's element within its package part
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRange {
    pub start: usize,
    pub end: usize,
}

/// A labeled unit of document text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedBlock {
    pub anchor_id: AnchorId,
    pub structural_path: StructuralPath,
    pub kind: BlockKind,
    pub text: String,
    pub source_range: SourceRange,
}

impl ExtractedBlock {
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}
