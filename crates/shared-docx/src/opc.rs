//! Small readers for Open Packaging Convention parts
//!
//! These only locate things (relationships, insertion points, ids); the
//! annotator never re-serializes a part, it splices bytes into it.

use crate::error::DocxError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

pub const COMMENTS_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/comments";
pub const COMMENTS_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.comments+xml";
pub const WORDML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
}

/// Where new children can be spliced into a part's root element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootInsertion {
    /// Byte offset of the root's closing tag
    BeforeClose(usize),
    /// Root is written as `<root/>` and cannot take children without rewriting it
    SelfClosing,
}

pub(crate) fn malformed(part: &str, position: usize, e: impl ToString) -> DocxError {
    DocxError::MalformedXml {
        part: part.to_string(),
        position,
        message: e.to_string(),
    }
}

/// Value of an attribute by qualified name
pub(crate) fn attribute(element: &BytesStart<'_>, name: &str) -> Option<String> {
    element
        .try_get_attribute(name)
        .ok()
        .flatten()
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// Parse a `.rels` part
pub fn relationships(xml: &[u8], part: &str) -> Result<Vec<Relationship>, DocxError> {
    let mut reader = Reader::from_reader(xml);
    let mut rels = Vec::new();
    loop {
        match reader
            .read_event()
            .map_err(|e| malformed(part, reader.buffer_position(), e))?
        {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                if let (Some(id), Some(rel_type), Some(target)) = (
                    attribute(&e, "Id"),
                    attribute(&e, "Type"),
                    attribute(&e, "Target"),
                ) {
                    rels.push(Relationship {
                        id,
                        rel_type,
                        target,
                    });
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(rels)
}

/// Locate the insertion point before the root element's closing tag
pub fn root_insertion(xml: &[u8], part: &str) -> Result<RootInsertion, DocxError> {
    let mut reader = Reader::from_reader(xml);
    let mut depth = 0usize;
    loop {
        let before = reader.buffer_position();
        match reader
            .read_event()
            .map_err(|e| malformed(part, reader.buffer_position(), e))?
        {
            Event::Start(_) => depth += 1,
            Event::Empty(_) if depth == 0 => return Ok(RootInsertion::SelfClosing),
            Event::End(_) => {
                if depth == 1 {
                    return Ok(RootInsertion::BeforeClose(before));
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => return Err(malformed(part, before, "no root element")),
            _ => {}
        }
    }
}

/// Highest `w:id` among existing `w:comment` elements
pub fn max_comment_id(xml: &[u8], part: &str) -> Result<Option<u32>, DocxError> {
    let mut reader = Reader::from_reader(xml);
    let mut max: Option<u32> = None;
    loop {
        match reader
            .read_event()
            .map_err(|e| malformed(part, reader.buffer_position(), e))?
        {
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"w:comment" => {
                if let Some(id) = attribute(&e, "w:id").and_then(|v| v.parse::<u32>().ok()) {
                    max = Some(max.map_or(id, |m| m.max(id)));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(max)
}

/// True if `[Content_Types].xml` declares an override for `part_name` (`/word/comments.xml`)
pub fn has_override(xml: &[u8], part: &str, part_name: &str) -> Result<bool, DocxError> {
    let mut reader = Reader::from_reader(xml);
    loop {
        match reader
            .read_event()
            .map_err(|e| malformed(part, reader.buffer_position(), e))?
        {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Override" => {
                if attribute(&e, "PartName").as_deref() == Some(part_name) {
                    return Ok(true);
                }
            }
            Event::Eof => return Ok(false),
            _ => {}
        }
    }
}

/// Next free `rIdN` not used by any existing relationship
pub fn next_relationship_id(rels: &[Relationship]) -> String {
    let max = rels
        .iter()
        .filter_map(|r| r.id.strip_prefix("rId").and_then(|n| n.parse::<u32>().ok()))
        .max()
        .unwrap_or(0);
    let mut candidate = max + 1;
    while rels.iter().any(|r| r.id == format!("rId{}", candidate)) {
        candidate += 1;
    }
    format!("rId{}", candidate)
}

/// Resolve a relationship target relative to the source part's folder
pub fn resolve_target(source_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = source_dir.split('/').filter(|s| !s.is_empty()).collect();
    for piece in target.split('/') {
        match piece {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}
