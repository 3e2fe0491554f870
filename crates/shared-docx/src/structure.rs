//! Structural scan of a WordprocessingML document part
//!
//! Walks `w:body` once and records, for every block-level paragraph, its
//! structural path, its text and the byte offsets an annotator needs to
//! splice content into it.

use crate::error::DocxError;
use crate::opc::{attribute, malformed};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use shared_types::{BlockKind, SegmentKind, SourceRange, StructuralPath};

/// A block-level paragraph located in the document part
#[derive(Debug, Clone, PartialEq)]
pub struct ParagraphSpan {
    pub path: StructuralPath,
    pub kind: BlockKind,
    pub text: String,
    /// Whole `<w:p>...</w:p>` element
    pub range: SourceRange,
    /// Splice point for leading content: after `<w:pPr>` if present, else after `<w:p>`
    pub content_start: Option<usize>,
    /// Splice point for trailing content: the start of `</w:p>`
    pub content_end: Option<usize>,
}

impl ParagraphSpan {
    /// `<w:p/>` has no interior to splice into
    pub fn is_open(&self) -> bool {
        self.content_start.is_some() && self.content_end.is_some()
    }
}

#[derive(Debug)]
struct Frame {
    kind: SegmentKind,
    path: StructuralPath,
    depth: usize,
    tables: usize,
    rows: usize,
    cells: usize,
    paragraphs: usize,
}

impl Frame {
    fn new(kind: SegmentKind, path: StructuralPath, depth: usize) -> Self {
        Self {
            kind,
            path,
            depth,
            tables: 0,
            rows: 0,
            cells: 0,
            paragraphs: 0,
        }
    }

    fn holds_paragraphs(&self) -> bool {
        matches!(self.kind, SegmentKind::Body | SegmentKind::Cell)
    }
}

#[derive(Debug)]
struct OpenParagraph {
    path: StructuralPath,
    depth: usize,
    start: usize,
    content_start: usize,
    heading: bool,
    in_table: bool,
    ppr_depth: Option<usize>,
    in_text: bool,
    text: String,
}

impl OpenParagraph {
    fn finish(self, content_end: Option<usize>, end: usize) -> ParagraphSpan {
        let kind = if self.heading {
            BlockKind::Heading
        } else if self.in_table {
            BlockKind::TableCell
        } else {
            BlockKind::Paragraph
        };
        ParagraphSpan {
            path: self.path,
            kind,
            text: self.text,
            range: SourceRange {
                start: self.start,
                end,
            },
            content_start: content_end.map(|_| self.content_start),
            content_end,
        }
    }
}

fn is_heading_style(style: &str) -> bool {
    let style = style.to_lowercase();
    style.starts_with("heading") || style == "title" || style == "subtitle"
}

fn child_path(frames: &mut [Frame], kind: SegmentKind) -> Option<StructuralPath> {
    let top = frames.last_mut()?;
    let index = match (top.kind, kind) {
        (SegmentKind::Body | SegmentKind::Cell, SegmentKind::Table) => {
            top.tables += 1;
            top.tables - 1
        }
        (SegmentKind::Table, SegmentKind::Row) => {
            top.rows += 1;
            top.rows - 1
        }
        (SegmentKind::Row, SegmentKind::Cell) => {
            top.cells += 1;
            top.cells - 1
        }
        (_, SegmentKind::Paragraph) if top.holds_paragraphs() => {
            top.paragraphs += 1;
            top.paragraphs - 1
        }
        _ => return None,
    };
    Some(top.path.child(kind, index))
}

fn container_kind(name: &[u8]) -> Option<SegmentKind> {
    match name {
        b"w:tbl" => Some(SegmentKind::Table),
        b"w:tr" => Some(SegmentKind::Row),
        b"w:tc" => Some(SegmentKind::Cell),
        _ => None,
    }
}

/// Scan a document part into paragraph spans, in document order
///
/// # Errors
/// - `DocxError::MalformedXml` - the part is not well-formed
/// - `DocxError::MissingBody` - there is no `w:body`
pub fn scan_paragraphs(xml: &[u8], part: &str) -> Result<Vec<ParagraphSpan>, DocxError> {
    let mut reader = Reader::from_reader(xml);
    let mut frames: Vec<Frame> = Vec::new();
    let mut spans = Vec::new();
    let mut current: Option<OpenParagraph> = None;
    let mut depth = 0usize;
    let mut saw_body = false;

    loop {
        let before = reader.buffer_position();
        let event = reader
            .read_event()
            .map_err(|e| malformed(part, reader.buffer_position(), e))?;
        let after = reader.buffer_position();

        match event {
            Event::Start(e) => {
                depth += 1;
                let name = e.name();
                let name = name.as_ref();
                if let Some(p) = current.as_mut() {
                    on_paragraph_child(p, &e, name, depth, false, after);
                } else if name == b"w:body" && frames.is_empty() {
                    saw_body = true;
                    frames.push(Frame::new(SegmentKind::Body, StructuralPath::body(), depth));
                } else if let Some(kind) = container_kind(name) {
                    if let Some(path) = child_path(&mut frames, kind) {
                        frames.push(Frame::new(kind, path, depth));
                    }
                } else if name == b"w:p" {
                    if let Some(path) = child_path(&mut frames, SegmentKind::Paragraph) {
                        let in_table = path.in_table();
                        current = Some(OpenParagraph {
                            path,
                            depth,
                            start: before,
                            content_start: after,
                            heading: false,
                            in_table,
                            ppr_depth: None,
                            in_text: false,
                            text: String::new(),
                        });
                    }
                }
            }
            Event::Empty(e) => {
                let name = e.name();
                let name = name.as_ref();
                if let Some(p) = current.as_mut() {
                    on_paragraph_child(p, &e, name, depth + 1, true, after);
                } else if name == b"w:p" {
                    if let Some(path) = child_path(&mut frames, SegmentKind::Paragraph) {
                        let in_table = path.in_table();
                        let paragraph = OpenParagraph {
                            path,
                            depth: depth + 1,
                            start: before,
                            content_start: after,
                            heading: false,
                            in_table,
                            ppr_depth: None,
                            in_text: false,
                            text: String::new(),
                        };
                        spans.push(paragraph.finish(None, after));
                    }
                }
            }
            Event::End(e) => {
                let name = e.name();
                let name = name.as_ref();
                let closes_paragraph = current
                    .as_ref()
                    .map(|p| p.depth == depth && name == b"w:p")
                    .unwrap_or(false);

                if closes_paragraph {
                    if let Some(p) = current.take() {
                        spans.push(p.finish(Some(before), after));
                    }
                } else if let Some(p) = current.as_mut() {
                    if name == b"w:t" {
                        p.in_text = false;
                    }
                    if p.ppr_depth == Some(depth) && name == b"w:pPr" {
                        p.ppr_depth = None;
                        p.content_start = after;
                    }
                } else if frames.last().map(|f| f.depth == depth).unwrap_or(false) {
                    frames.pop();
                }
                depth = depth.saturating_sub(1);
            }
            Event::Text(t) => {
                if let Some(p) = current.as_mut().filter(|p| p.in_text) {
                    let text = t
                        .unescape()
                        .map_err(|e| malformed(part, before, e))?;
                    p.text.push_str(&text);
                }
            }
            Event::CData(t) => {
                if let Some(p) = current.as_mut().filter(|p| p.in_text) {
                    p.text.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Event::Eof => {
                if current.is_some() || depth != 0 || !frames.is_empty() {
                    return Err(malformed(part, before, "unexpected end of document"));
                }
                break;
            }
            _ => {}
        }
    }

    if !saw_body {
        return Err(DocxError::MissingBody(part.to_string()));
    }
    Ok(spans)
}

fn on_paragraph_child(
    p: &mut OpenParagraph,
    e: &BytesStart<'_>,
    name: &[u8],
    depth: usize,
    empty: bool,
    after: usize,
) {
    let in_properties = p.ppr_depth.is_some();
    match name {
        b"w:pPr" if depth == p.depth + 1 => {
            if empty {
                p.content_start = after;
            } else {
                p.ppr_depth = Some(depth);
            }
        }
        b"w:pStyle" if in_properties => {
            if let Some(style) = attribute(e, "w:val") {
                p.heading |= is_heading_style(&style);
            }
        }
        b"w:outlineLvl" if in_properties => p.heading = true,
        b"w:t" if !empty && !in_properties => p.in_text = true,
        b"w:tab" if !in_properties => p.text.push('\t'),
        b"w:br" | b"w:cr" if !in_properties => p.text.push('\n'),
        _ => {}
    }
}
