//! Review-comment injection
//!
//! Annotation is pure insertion: every change to an existing part is a byte
//! span spliced in at a recorded offset, and every new part is listed. The
//! manifest therefore allows the original parts to be recovered exactly with
//! [`strip_annotations`]. Parts that are not touched are copied into the new
//! container without being decompressed.

use crate::error::DocxError;
use crate::opc::{self, RootInsertion, COMMENTS_CONTENT_TYPE, COMMENTS_REL_TYPE, WORDML_NS};
use crate::package::{read_all_parts, DocxPackage, CONTENT_TYPES_PART};
use crate::structure::{scan_paragraphs, ParagraphSpan};
use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::escape::escape;
use serde::{Deserialize, Serialize};
use shared_types::{AnchorId, Finding};
use std::collections::{BTreeMap, HashMap};
use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Comment author and timestamp settings
#[derive(Debug, Clone)]
pub struct AnnotatorOptions {
    pub author: String,
    pub initials: String,
    /// Written into every comment's `w:date`
    pub timestamp: DateTime<Utc>,
    /// Used for findings that carry no evidence anchor
    pub document_anchor: Option<AnchorId>,
}

impl Default for AnnotatorOptions {
    fn default() -> Self {
        Self {
            author: "ADGM Reviewer".to_string(),
            initials: "AR".to_string(),
            timestamp: Utc::now(),
            document_anchor: None,
        }
    }
}

/// A span of bytes added to an existing part
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insertion {
    pub part: String,
    /// Offset of the span in the annotated part
    pub offset: usize,
    /// Offset in the original part the span was inserted at
    pub original_offset: usize,
    pub length: usize,
}

/// Where an annotation request ended up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Placement {
    Comment { comment_id: u32, anchor: AnchorId },
    /// Highlighted review run, used when a comment could not be placed
    Highlight { anchor: AnchorId, reason: String },
    Unplaced { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationOutcome {
    pub finding_id: String,
    pub requested_anchor: Option<AnchorId>,
    pub placement: Placement,
}

impl AnnotationOutcome {
    pub fn is_fallback(&self) -> bool {
        !matches!(self.placement, Placement::Comment { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationManifest {
    pub insertions: Vec<Insertion>,
    pub added_parts: Vec<String>,
    pub outcomes: Vec<AnnotationOutcome>,
}

impl AnnotationManifest {
    pub fn comments_placed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.placement, Placement::Comment { .. }))
            .count()
    }

    pub fn fallbacks(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_fallback()).count()
    }
}

/// A new container plus the record of what was inserted into it
#[derive(Debug, Clone)]
pub struct AnnotatedDocument {
    pub bytes: Vec<u8>,
    pub manifest: AnnotationManifest,
}

/// Parts of the package that hold comments
struct CommentsTarget {
    part: String,
    existing: Option<Vec<u8>>,
    insert_at: Option<usize>,
    /// `None` once `u32::MAX` has been used
    next_id: Option<u32>,
    rels_part: String,
    rels_existing: Option<Vec<u8>>,
    rels_insert_at: Option<usize>,
    rel_id: String,
    content_types: Vec<u8>,
    content_types_insert_at: Option<usize>,
}

#[derive(Debug)]
struct Splice {
    offset: usize,
    seq: usize,
    bytes: Vec<u8>,
}

pub struct Annotator {
    options: AnnotatorOptions,
}

impl Annotator {
    pub fn new(options: AnnotatorOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &AnnotatorOptions {
        &self.options
    }

    /// Insert one review comment per evidence anchor of every finding
    ///
    /// Never fails: anchors that cannot take a comment fall back to a
    /// highlighted run at the nearest valid ancestor, and if the container
    /// cannot be rewritten at all the original bytes are returned with
    /// every request marked unplaced.
    pub fn annotate(&self, package: &DocxPackage, findings: &[Finding]) -> AnnotatedDocument {
        match self.try_annotate(package, findings) {
            Ok(annotated) => annotated,
            Err(e) => {
                tracing::warn!(error = %e, "Annotation failed; returning original document");
                let outcomes = self
                    .requests(findings)
                    .into_iter()
                    .map(|(finding_id, anchor, _)| AnnotationOutcome {
                        finding_id,
                        requested_anchor: anchor,
                        placement: Placement::Unplaced {
                            reason: e.to_string(),
                        },
                    })
                    .collect();
                AnnotatedDocument {
                    bytes: package.bytes().to_vec(),
                    manifest: AnnotationManifest {
                        outcomes,
                        ..Default::default()
                    },
                }
            }
        }
    }

    fn requests(&self, findings: &[Finding]) -> Vec<(String, Option<AnchorId>, String)> {
        let mut requests = Vec::new();
        for finding in findings {
            let text = comment_text(finding);
            if finding.evidence_anchor_ids.is_empty() {
                requests.push((
                    finding.id().to_string(),
                    self.options.document_anchor.clone(),
                    text,
                ));
            } else {
                for anchor in &finding.evidence_anchor_ids {
                    requests.push((finding.id().to_string(), Some(anchor.clone()), text.clone()));
                }
            }
        }
        requests
    }

    fn try_annotate(
        &self,
        package: &DocxPackage,
        findings: &[Finding],
    ) -> Result<AnnotatedDocument, DocxError> {
        let document_part = package.document_part().to_string();
        let spans = scan_paragraphs(package.document_xml(), &document_part)?;
        let by_anchor: HashMap<AnchorId, usize> = spans
            .iter()
            .enumerate()
            .map(|(i, s)| (s.path.anchor(), i))
            .collect();

        let mut comments = match self.comments_target(package) {
            Ok(target) => Some(target),
            Err(reason) => {
                tracing::warn!(%reason, "Comments part unavailable; using highlights");
                None
            }
        };
        let comments_unavailable = "comments part cannot be extended";

        let mut body_splices: Vec<Splice> = Vec::new();
        let mut comment_xml = String::new();
        let mut outcomes = Vec::new();
        let mut seq = 0usize;

        for (finding_id, anchor, text) in self.requests(findings) {
            let Some(anchor) = anchor else {
                outcomes.push(AnnotationOutcome {
                    finding_id,
                    requested_anchor: None,
                    placement: Placement::Unplaced {
                        reason: "finding has no evidence anchor".to_string(),
                    },
                });
                continue;
            };

            let exact = by_anchor
                .get(&anchor)
                .map(|&i| &spans[i])
                .filter(|s| s.is_open());

            let comment_id = comments.as_ref().and_then(|t| t.next_id);
            let placement = match (exact, comment_id) {
                (Some(span), Some(id)) => {
                    if let Some(target) = comments.as_mut() {
                        target.next_id = id.checked_add(1);
                    }
                    self.push_comment_splices(&mut body_splices, &mut seq, span, id);
                    comment_xml.push_str(&self.comment_element(id, &text));
                    Placement::Comment {
                        comment_id: id,
                        anchor: anchor.clone(),
                    }
                }
                (Some(span), None) => {
                    push_highlight(&mut body_splices, &mut seq, span, &text);
                    let reason = if comments.is_some() {
                        "comment ids exhausted"
                    } else {
                        comments_unavailable
                    };
                    Placement::Highlight {
                        anchor: anchor.clone(),
                        reason: reason.to_string(),
                    }
                }
                (None, _) => match nearest_open_ancestor(&spans, &anchor) {
                    Some(span) => {
                        push_highlight(&mut body_splices, &mut seq, span, &text);
                        let reason = if by_anchor.contains_key(&anchor) {
                            "anchor paragraph has no content to annotate"
                        } else {
                            "anchor not found in document"
                        };
                        Placement::Highlight {
                            anchor: span.path.anchor(),
                            reason: reason.to_string(),
                        }
                    }
                    None => Placement::Unplaced {
                        reason: "no annotatable paragraph in document".to_string(),
                    },
                },
            };

            if !matches!(placement, Placement::Comment { .. }) {
                tracing::warn!(
                    finding = %finding_id,
                    anchor = %anchor,
                    placement = ?placement,
                    "Annotation fell back"
                );
            }
            outcomes.push(AnnotationOutcome {
                finding_id,
                requested_anchor: Some(anchor),
                placement,
            });
        }

        let mut replaced: BTreeMap<String, Vec<u8>> = BTreeMap::new();
        let mut added: Vec<(String, Vec<u8>)> = Vec::new();
        let mut insertions = Vec::new();

        if !body_splices.is_empty() {
            let (bytes, spans) = apply_splices(&document_part, package.document_xml(), body_splices);
            replaced.insert(document_part.clone(), bytes);
            insertions.extend(spans);
        }

        if let Some(target) = comments.filter(|_| !comment_xml.is_empty()) {
            self.wire_comments(target, comment_xml, &mut replaced, &mut added, &mut insertions);
        }

        let bytes = if replaced.is_empty() && added.is_empty() {
            package.bytes().to_vec()
        } else {
            rewrite_container(package.bytes(), &replaced, &added)?
        };

        let manifest = AnnotationManifest {
            insertions,
            added_parts: added.iter().map(|(name, _)| name.clone()).collect(),
            outcomes,
        };
        tracing::info!(
            comments = manifest.comments_placed(),
            fallbacks = manifest.fallbacks(),
            "Annotated document"
        );
        Ok(AnnotatedDocument { bytes, manifest })
    }

    /// Locate or plan the comments part and the parts that reference it
    fn comments_target(&self, package: &DocxPackage) -> Result<CommentsTarget, String> {
        let rels_part = package.document_rels_part();
        let rels_existing = package.read_part(&rels_part).map_err(|e| e.to_string())?;
        let rels = match &rels_existing {
            Some(xml) => opc::relationships(xml, &rels_part).map_err(|e| e.to_string())?,
            None => Vec::new(),
        };

        let content_types = package
            .read_part(CONTENT_TYPES_PART)
            .map_err(|e| e.to_string())?
            .ok_or_else(|| "package has no content types part".to_string())?;

        let existing_rel = rels.iter().find(|r| r.rel_type == COMMENTS_REL_TYPE);
        let part = match existing_rel {
            Some(rel) => opc::resolve_target(package.document_dir(), &rel.target),
            None => {
                let dir = package.document_dir();
                if dir.is_empty() {
                    "comments.xml".to_string()
                } else {
                    format!("{}/comments.xml", dir)
                }
            }
        };

        let (existing, insert_at, next_id) = match (existing_rel, package.read_part(&part)) {
            (Some(_), Ok(Some(xml))) => {
                let insert_at = match opc::root_insertion(&xml, &part).map_err(|e| e.to_string())? {
                    RootInsertion::BeforeClose(pos) => pos,
                    RootInsertion::SelfClosing => {
                        return Err(format!("{} is an empty self-closing element", part))
                    }
                };
                let next_id = opc::max_comment_id(&xml, &part)
                    .map_err(|e| e.to_string())?
                    .map_or(Some(0), |id| id.checked_add(1));
                (Some(xml), Some(insert_at), next_id)
            }
            (Some(_), _) => return Err(format!("relationship points at missing part {}", part)),
            (None, _) if package.has_part(&part) => {
                return Err(format!("{} exists without a relationship", part))
            }
            (None, _) => (None, None, Some(0)),
        };

        let rels_insert_at = match (&rels_existing, existing_rel) {
            (Some(xml), None) => match opc::root_insertion(xml, &rels_part).map_err(|e| e.to_string())? {
                RootInsertion::BeforeClose(pos) => Some(pos),
                RootInsertion::SelfClosing => {
                    return Err(format!("{} is an empty self-closing element", rels_part))
                }
            },
            _ => None,
        };

        let override_name = format!("/{}", part);
        let has_override = opc::has_override(&content_types, CONTENT_TYPES_PART, &override_name)
            .map_err(|e| e.to_string())?;
        let content_types_insert_at = if has_override {
            None
        } else {
            match opc::root_insertion(&content_types, CONTENT_TYPES_PART)
                .map_err(|e| e.to_string())?
            {
                RootInsertion::BeforeClose(pos) => Some(pos),
                RootInsertion::SelfClosing => {
                    return Err("content types part is an empty self-closing element".to_string())
                }
            }
        };

        Ok(CommentsTarget {
            part,
            existing,
            insert_at,
            next_id,
            rel_id: opc::next_relationship_id(&rels),
            rels_part,
            rels_existing,
            rels_insert_at,
            content_types,
            content_types_insert_at,
        })
    }

    fn push_comment_splices(
        &self,
        splices: &mut Vec<Splice>,
        seq: &mut usize,
        span: &ParagraphSpan,
        id: u32,
    ) {
        let (Some(start), Some(end)) = (span.content_start, span.content_end) else {
            return;
        };
        splices.push(Splice {
            offset: start,
            seq: next_seq(seq),
            bytes: format!("<w:commentRangeStart w:id=\"{}\"/>", id).into_bytes(),
        });
        splices.push(Splice {
            offset: end,
            seq: next_seq(seq),
            bytes: format!(
                "<w:commentRangeEnd w:id=\"{id}\"/><w:r><w:rPr><w:rStyle w:val=\"CommentReference\"/></w:rPr><w:commentReference w:id=\"{id}\"/></w:r>",
                id = id
            )
            .into_bytes(),
        });
    }

    fn comment_element(&self, id: u32, text: &str) -> String {
        format!(
            "<w:comment w:id=\"{}\" w:author=\"{}\" w:date=\"{}\" w:initials=\"{}\"><w:p><w:r><w:t xml:space=\"preserve\">{}</w:t></w:r></w:p></w:comment>",
            id,
            escape(self.options.author.as_str()),
            self.options.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            escape(self.options.initials.as_str()),
            escape(text)
        )
    }

    fn wire_comments(
        &self,
        target: CommentsTarget,
        comment_xml: String,
        replaced: &mut BTreeMap<String, Vec<u8>>,
        added: &mut Vec<(String, Vec<u8>)>,
        insertions: &mut Vec<Insertion>,
    ) {
        match (target.existing, target.insert_at) {
            (Some(xml), Some(pos)) => {
                let (bytes, spans) = apply_splices(
                    &target.part,
                    &xml,
                    vec![Splice {
                        offset: pos,
                        seq: 0,
                        bytes: comment_xml.into_bytes(),
                    }],
                );
                replaced.insert(target.part.clone(), bytes);
                insertions.extend(spans);
            }
            _ => {
                let xml = format!(
                    "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n<w:comments xmlns:w=\"{}\">{}</w:comments>",
                    WORDML_NS, comment_xml
                );
                added.push((target.part.clone(), xml.into_bytes()));

                let file_name = target
                    .part
                    .rsplit_once('/')
                    .map(|(_, f)| f)
                    .unwrap_or(&target.part);
                let relationship = format!(
                    "<Relationship Id=\"{}\" Type=\"{}\" Target=\"{}\"/>",
                    target.rel_id, COMMENTS_REL_TYPE, file_name
                );
                match (target.rels_existing, target.rels_insert_at) {
                    (Some(rels), Some(pos)) => {
                        let (bytes, spans) = apply_splices(
                            &target.rels_part,
                            &rels,
                            vec![Splice {
                                offset: pos,
                                seq: 0,
                                bytes: relationship.into_bytes(),
                            }],
                        );
                        replaced.insert(target.rels_part.clone(), bytes);
                        insertions.extend(spans);
                    }
                    _ => {
                        let rels = format!(
                            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">{}</Relationships>",
                            relationship
                        );
                        added.push((target.rels_part.clone(), rels.into_bytes()));
                    }
                }
            }
        }

        if let Some(pos) = target.content_types_insert_at {
            let override_xml = format!(
                "<Override PartName=\"/{}\" ContentType=\"{}\"/>",
                target.part, COMMENTS_CONTENT_TYPE
            );
            let (bytes, spans) = apply_splices(
                CONTENT_TYPES_PART,
                &target.content_types,
                vec![Splice {
                    offset: pos,
                    seq: 0,
                    bytes: override_xml.into_bytes(),
                }],
            );
            replaced.insert(CONTENT_TYPES_PART.to_string(), bytes);
            insertions.extend(spans);
        }
    }
}

impl Default for Annotator {
    fn default() -> Self {
        Self::new(AnnotatorOptions::default())
    }
}

fn next_seq(seq: &mut usize) -> usize {
    *seq += 1;
    *seq
}

/// `<explanation> | Suggestion: <suggestion> | Source: <citation>`
pub fn comment_text(finding: &Finding) -> String {
    let mut text = finding.explanation.clone();
    if let Some(suggestion) = &finding.suggestion {
        text.push_str(" | Suggestion: ");
        text.push_str(suggestion);
    }
    if let Some(citation) = &finding.citation {
        text.push_str(" | Source: ");
        text.push_str(citation);
    }
    text
}

fn push_highlight(splices: &mut Vec<Splice>, seq: &mut usize, span: &ParagraphSpan, text: &str) {
    let Some(end) = span.content_end else {
        return;
    };
    splices.push(Splice {
        offset: end,
        seq: next_seq(seq),
        bytes: format!(
            "<w:r><w:rPr><w:highlight w:val=\"yellow\"/></w:rPr><w:t xml:space=\"preserve\"> [REVIEW] {}</w:t></w:r>",
            escape(text)
        )
        .into_bytes(),
    });
}

/// First open paragraph inside the closest enclosing container of `anchor`
fn nearest_open_ancestor<'a>(spans: &'a [ParagraphSpan], anchor: &AnchorId) -> Option<&'a ParagraphSpan> {
    let mut container = anchor.parent();
    while let Some(current) = container {
        if let Some(span) = spans
            .iter()
            .find(|s| s.is_open() && s.path.anchor().is_within(&current))
        {
            return Some(span);
        }
        container = current.parent();
    }
    None
}

/// Splice byte spans into `original`, returning the new bytes and the manifest entries
fn apply_splices(part: &str, original: &[u8], mut splices: Vec<Splice>) -> (Vec<u8>, Vec<Insertion>) {
    splices.sort_by_key(|s| (s.offset, s.seq));
    let added: usize = splices.iter().map(|s| s.bytes.len()).sum();
    let mut out = Vec::with_capacity(original.len() + added);
    let mut insertions = Vec::with_capacity(splices.len());
    let mut cursor = 0usize;
    for splice in splices {
        out.extend_from_slice(&original[cursor..splice.offset]);
        cursor = splice.offset;
        insertions.push(Insertion {
            part: part.to_string(),
            offset: out.len(),
            original_offset: splice.offset,
            length: splice.bytes.len(),
        });
        out.extend_from_slice(&splice.bytes);
    }
    out.extend_from_slice(&original[cursor..]);
    (out, insertions)
}

/// Write a new container: replaced parts re-encoded, every other entry copied raw
fn rewrite_container(
    original: &[u8],
    replaced: &BTreeMap<String, Vec<u8>>,
    added: &[(String, Vec<u8>)],
) -> Result<Vec<u8>, DocxError> {
    let mut archive = ZipArchive::new(Cursor::new(original))?;
    let mut writer = ZipWriter::new(Cursor::new(Vec::with_capacity(original.len() + 4096)));

    for i in 0..archive.len() {
        let (name, method, modified) = {
            let file = archive.by_index_raw(i)?;
            (file.name().to_string(), file.compression(), file.last_modified())
        };
        match replaced.get(&name) {
            Some(data) => {
                let method = match method {
                    CompressionMethod::Stored => CompressionMethod::Stored,
                    _ => CompressionMethod::Deflated,
                };
                let options = FileOptions::default()
                    .compression_method(method)
                    .last_modified_time(modified);
                writer.start_file(name, options)?;
                writer.write_all(data)?;
            }
            None => {
                let file = archive.by_index_raw(i)?;
                writer.raw_copy_file(file)?;
            }
        }
    }

    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, data) in added {
        writer.start_file(name.as_str(), options)?;
        writer.write_all(data)?;
    }

    let cursor = writer
        .finish()
        .map_err(|e| DocxError::Write(e.to_string()))?;
    Ok(cursor.into_inner())
}

/// Remove everything recorded in `manifest` from an annotated container
///
/// Returns the decompressed parts, which equal the original package's parts
/// byte for byte.
pub fn strip_annotations(
    annotated: &[u8],
    manifest: &AnnotationManifest,
) -> Result<BTreeMap<String, Vec<u8>>, DocxError> {
    let mut parts = read_all_parts(annotated)?;
    for name in &manifest.added_parts {
        parts.remove(name);
    }

    let mut by_part: BTreeMap<&str, Vec<&Insertion>> = BTreeMap::new();
    for insertion in &manifest.insertions {
        by_part.entry(insertion.part.as_str()).or_default().push(insertion);
    }
    for (part, mut insertions) in by_part {
        let data = parts
            .get_mut(part)
            .ok_or_else(|| DocxError::MissingPart(part.to_string()))?;
        insertions.sort_by_key(|i| std::cmp::Reverse(i.offset));
        for insertion in insertions {
            let end = insertion.offset + insertion.length;
            if end > data.len() {
                return Err(DocxError::Write(format!(
                    "insertion at {} overruns part {}",
                    insertion.offset, part
                )));
            }
            data.drain(insertion.offset..end);
        }
    }
    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::DocxBuilder;
    use crate::extract::ClauseExtractor;
    use shared_types::{FindingStatus, Severity};

    fn options() -> AnnotatorOptions {
        AnnotatorOptions {
            timestamp: "2026-01-01T00:00:00Z".parse().unwrap(),
            ..Default::default()
        }
    }

    fn flagged(anchor: &str, text: &str) -> Finding {
        Finding::flagged("jurisdiction-clause", Severity::High, text.to_string())
            .with_anchor(AnchorId::from(anchor))
    }

    fn part_text(bytes: &[u8], part: &str) -> String {
        let parts = read_all_parts(bytes).unwrap();
        String::from_utf8(parts[part].clone()).unwrap()
    }

    #[test]
    fn test_comment_inserted_at_anchor() {
        let bytes = DocxBuilder::new()
            .paragraph("Intro")
            .paragraph("Disputes go to the Dubai Courts.")
            .build()
            .unwrap();
        let package = DocxPackage::open(&bytes).unwrap();
        let annotated = Annotator::new(options()).annotate(&package, &[flagged("body/p[1]", "Wrong forum")]);

        let doc = part_text(&annotated.bytes, "word/document.xml");
        assert!(doc.contains("<w:commentRangeStart w:id=\"0\"/><w:r><w:t xml:space=\"preserve\">Disputes"));
        assert!(doc.contains("<w:commentReference w:id=\"0\"/></w:r></w:p>"));

        let comments = part_text(&annotated.bytes, "word/comments.xml");
        assert!(comments.contains("Wrong forum"));
        assert!(comments.contains("w:date=\"2026-01-01T00:00:00Z\""));

        let rels = part_text(&annotated.bytes, "word/_rels/document.xml.rels");
        assert!(rels.contains(COMMENTS_REL_TYPE));
        let types = part_text(&annotated.bytes, CONTENT_TYPES_PART);
        assert!(types.contains("/word/comments.xml"));

        assert_eq!(annotated.manifest.comments_placed(), 1);
        assert_eq!(annotated.manifest.added_parts, vec!["word/comments.xml"]);

        // annotated output still parses with the same anchors
        let blocks = ClauseExtractor::extract_bytes(&annotated.bytes).unwrap();
        assert_eq!(blocks[1].anchor_id.as_str(), "body/p[1]");
        assert_eq!(blocks[1].text, "Disputes go to the Dubai Courts.");
    }

    #[test]
    fn test_strip_restores_original_parts() {
        let bytes = DocxBuilder::new()
            .heading("Employment Contract")
            .paragraph("The employee shall use best efforts.")
            .table(&[&["Signed by", ""]])
            .build()
            .unwrap();
        let package = DocxPackage::open(&bytes).unwrap();
        let findings = vec![
            flagged("body/p[1]", "Weak obligation"),
            flagged("body/tbl[0]/tr[0]/tc[1]/p[0]", "Blank signature"),
            flagged("body/p[1]", "Second note on same paragraph"),
        ];
        let annotated = Annotator::new(options()).annotate(&package, &findings);
        assert_eq!(annotated.manifest.comments_placed(), 3);

        let stripped = strip_annotations(&annotated.bytes, &annotated.manifest).unwrap();
        assert_eq!(stripped, package.read_all_parts().unwrap());
    }

    #[test]
    fn test_existing_comments_are_extended() {
        let bytes = DocxBuilder::new()
            .paragraph("Text")
            .existing_comment(6, "Counsel", "Earlier note")
            .build()
            .unwrap();
        let package = DocxPackage::open(&bytes).unwrap();
        let annotated = Annotator::new(options()).annotate(&package, &[flagged("body/p[0]", "New note")]);

        let comments = part_text(&annotated.bytes, "word/comments.xml");
        assert!(comments.contains("Earlier note"));
        assert!(comments.contains("w:id=\"7\""));
        assert!(annotated.manifest.added_parts.is_empty());

        let stripped = strip_annotations(&annotated.bytes, &annotated.manifest).unwrap();
        assert_eq!(stripped, package.read_all_parts().unwrap());
    }

    #[test]
    fn test_exhausted_comment_ids_fall_back_to_highlight() {
        let bytes = DocxBuilder::new()
            .paragraph("Text")
            .existing_comment(u32::MAX, "Counsel", "Earlier note")
            .build()
            .unwrap();
        let package = DocxPackage::open(&bytes).unwrap();
        let annotated = Annotator::new(options()).annotate(&package, &[flagged("body/p[0]", "New note")]);

        assert!(matches!(
            &annotated.manifest.outcomes[0].placement,
            Placement::Highlight { anchor, reason } if anchor.as_str() == "body/p[0]" && reason == "comment ids exhausted"
        ));
        let comments = part_text(&annotated.bytes, "word/comments.xml");
        assert!(!comments.contains("New note"));

        let stripped = strip_annotations(&annotated.bytes, &annotated.manifest).unwrap();
        assert_eq!(stripped, package.read_all_parts().unwrap());
    }

    #[test]
    fn test_missing_anchor_falls_back_to_highlight() {
        let bytes = DocxBuilder::new()
            .table(&[&["Only cell"]])
            .paragraph("Body text")
            .build()
            .unwrap();
        let package = DocxPackage::open(&bytes).unwrap();
        let annotated = Annotator::new(options())
            .annotate(&package, &[flagged("body/tbl[0]/tr[0]/tc[0]/p[4]", "Gone")]);

        let outcome = &annotated.manifest.outcomes[0];
        match &outcome.placement {
            Placement::Highlight { anchor, .. } => {
                assert_eq!(anchor.as_str(), "body/tbl[0]/tr[0]/tc[0]/p[0]");
            }
            other => panic!("Expected highlight, got {:?}", other),
        }
        let doc = part_text(&annotated.bytes, "word/document.xml");
        assert!(doc.contains("<w:highlight w:val=\"yellow\"/>"));
        assert!(doc.contains("[REVIEW] Gone"));
    }

    #[test]
    fn test_self_closing_paragraph_falls_back_to_sibling() {
        let bytes = DocxBuilder::new()
            .empty_paragraph()
            .paragraph("Next")
            .build()
            .unwrap();
        let package = DocxPackage::open(&bytes).unwrap();
        let annotated = Annotator::new(options()).annotate(&package, &[flagged("body/p[0]", "Empty")]);
        assert!(matches!(
            &annotated.manifest.outcomes[0].placement,
            Placement::Highlight { anchor, .. } if anchor.as_str() == "body/p[1]"
        ));

        let stripped = strip_annotations(&annotated.bytes, &annotated.manifest).unwrap();
        assert_eq!(stripped, package.read_all_parts().unwrap());
    }

    #[test]
    fn test_unextendable_comments_part_uses_highlights() {
        let bytes = DocxBuilder::new()
            .paragraph("Text")
            .self_closing_comments_part()
            .build()
            .unwrap();
        let package = DocxPackage::open(&bytes).unwrap();
        let annotated = Annotator::new(options()).annotate(&package, &[flagged("body/p[0]", "Note")]);
        assert!(matches!(
            &annotated.manifest.outcomes[0].placement,
            Placement::Highlight { anchor, .. } if anchor.as_str() == "body/p[0]"
        ));
    }

    #[test]
    fn test_finding_without_anchor_uses_document_anchor() {
        let bytes = DocxBuilder::new().paragraph("Heading text").build().unwrap();
        let package = DocxPackage::open(&bytes).unwrap();
        let finding = Finding::requirement(
            "INC-001",
            FindingStatus::Missing,
            Severity::High,
            "Registered office clause not found".to_string(),
        );

        let annotated = Annotator::new(options()).annotate(&package, &[finding.clone()]);
        assert!(matches!(annotated.manifest.outcomes[0].placement, Placement::Unplaced { .. }));
        assert_eq!(annotated.bytes, bytes);

        let with_anchor = Annotator::new(AnnotatorOptions {
            document_anchor: Some(AnchorId::from("body/p[0]")),
            ..options()
        })
        .annotate(&package, &[finding]);
        assert_eq!(with_anchor.manifest.comments_placed(), 1);
    }

    #[test]
    fn test_untouched_parts_are_copied_raw() {
        let image = vec![0x89u8, b'P', b'N', b'G', 1, 2, 3, 4, 5, 6, 7, 8];
        let bytes = DocxBuilder::new()
            .paragraph("Text")
            .extra_part("word/media/image1.png", &image)
            .build()
            .unwrap();
        let package = DocxPackage::open(&bytes).unwrap();
        let annotated = Annotator::new(options()).annotate(&package, &[flagged("body/p[0]", "Note")]);

        let raw = |bytes: &[u8]| {
            let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
            let mut file = archive.by_name("word/media/image1.png").unwrap();
            let crc = file.crc32();
            let mut data = Vec::new();
            std::io::Read::read_to_end(&mut file, &mut data).unwrap();
            (crc, data)
        };
        assert_eq!(raw(&bytes), raw(&annotated.bytes));
    }

    #[test]
    fn test_comment_text_joins_parts() {
        let finding = Finding::flagged("r", Severity::High, "Issue".to_string())
            .with_suggestion("Fix it")
            .with_citation("ADGM Template");
        assert_eq!(comment_text(&finding), "Issue | Suggestion: Fix it | Source: ADGM Template");
    }
}
