//! Minimal `.docx` writer
//!
//! Produces the smallest package Word opens: content types, package
//! relationships, the main document and its relationships. Used to build
//! fixtures and synthetic filings.

use crate::error::DocxError;
use crate::opc::{COMMENTS_CONTENT_TYPE, COMMENTS_REL_TYPE, WORDML_NS};
use quick_xml::escape::escape;
use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

#[derive(Debug, Clone)]
enum Block {
    Heading(String),
    Paragraph(String),
    EmptyParagraph,
    Table(Vec<Vec<String>>),
}

#[derive(Debug, Clone)]
struct ExistingComment {
    id: u32,
    author: String,
    text: String,
}

#[derive(Debug, Clone, Default)]
pub struct DocxBuilder {
    blocks: Vec<Block>,
    comments: Vec<ExistingComment>,
    self_closing_comments: bool,
    raw_document: Option<String>,
    extra_parts: Vec<(String, Vec<u8>)>,
}

impl DocxBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn heading(mut self, text: &str) -> Self {
        self.blocks.push(Block::Heading(text.to_string()));
        self
    }

    pub fn paragraph(mut self, text: &str) -> Self {
        self.blocks.push(Block::Paragraph(text.to_string()));
        self
    }

    /// A `<w:p/>` with no runs
    pub fn empty_paragraph(mut self) -> Self {
        self.blocks.push(Block::EmptyParagraph);
        self
    }

    pub fn table(mut self, rows: &[&[&str]]) -> Self {
        let rows = rows
            .iter()
            .map(|row| row.iter().map(|c| c.to_string()).collect())
            .collect();
        self.blocks.push(Block::Table(rows));
        self
    }

    /// Include a comments part that already holds a reviewer comment
    pub fn existing_comment(mut self, id: u32, author: &str, text: &str) -> Self {
        self.comments.push(ExistingComment {
            id,
            author: author.to_string(),
            text: text.to_string(),
        });
        self
    }

    /// Include a comments part written as `<w:comments/>`
    pub fn self_closing_comments_part(mut self) -> Self {
        self.self_closing_comments = true;
        self
    }

    /// Use this XML verbatim as the main document part
    pub fn raw_document(mut self, xml: &str) -> Self {
        self.raw_document = Some(xml.to_string());
        self
    }

    /// Add an arbitrary part (e.g. an embedded image) stored as-is
    pub fn extra_part(mut self, name: &str, data: &[u8]) -> Self {
        self.extra_parts.push((name.to_string(), data.to_vec()));
        self
    }

    pub fn build(self) -> Result<Vec<u8>, DocxError> {
        let has_comments = !self.comments.is_empty() || self.self_closing_comments;
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let deflated = FileOptions::default().compression_method(CompressionMethod::Deflated);

        let mut entries: Vec<(String, Vec<u8>)> = vec![
            (
                "[Content_Types].xml".to_string(),
                self.content_types(has_comments).into_bytes(),
            ),
            ("_rels/.rels".to_string(), package_rels().into_bytes()),
            (
                "word/document.xml".to_string(),
                self.document_xml().into_bytes(),
            ),
            (
                "word/_rels/document.xml.rels".to_string(),
                document_rels(has_comments).into_bytes(),
            ),
        ];
        if has_comments {
            entries.push(("word/comments.xml".to_string(), self.comments_xml().into_bytes()));
        }
        entries.extend(self.extra_parts.iter().cloned());

        for (name, data) in entries {
            writer.start_file(name, deflated)?;
            writer.write_all(&data)?;
        }
        let cursor = writer
            .finish()
            .map_err(|e| DocxError::Write(e.to_string()))?;
        Ok(cursor.into_inner())
    }

    fn content_types(&self, has_comments: bool) -> String {
        let mut xml = format!(
            "{}<Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
             <Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
             <Default Extension=\"xml\" ContentType=\"application/xml\"/>\
             <Override PartName=\"/word/document.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml\"/>",
            XML_DECL
        );
        if has_comments {
            xml.push_str(&format!(
                "<Override PartName=\"/word/comments.xml\" ContentType=\"{}\"/>",
                COMMENTS_CONTENT_TYPE
            ));
        }
        xml.push_str("</Types>");
        xml
    }

    fn document_xml(&self) -> String {
        if let Some(raw) = &self.raw_document {
            return raw.clone();
        }
        let mut body = String::new();
        for block in &self.blocks {
            match block {
                Block::Heading(text) => body.push_str(&format!(
                    "<w:p><w:pPr><w:pStyle w:val=\"Heading1\"/></w:pPr>{}</w:p>",
                    run(text)
                )),
                Block::Paragraph(text) => body.push_str(&format!("<w:p>{}</w:p>", run(text))),
                Block::EmptyParagraph => body.push_str("<w:p/>"),
                Block::Table(rows) => {
                    body.push_str("<w:tbl><w:tblPr/>");
                    for row in rows {
                        body.push_str("<w:tr>");
                        for cell in row {
                            body.push_str(&format!("<w:tc><w:p>{}</w:p></w:tc>", run(cell)));
                        }
                        body.push_str("</w:tr>");
                    }
                    body.push_str("</w:tbl>");
                }
            }
        }
        format!(
            "{}<w:document xmlns:w=\"{}\"><w:body>{}<w:sectPr/></w:body></w:document>",
            XML_DECL, WORDML_NS, body
        )
    }

    fn comments_xml(&self) -> String {
        if self.self_closing_comments {
            return format!("{}<w:comments xmlns:w=\"{}\"/>", XML_DECL, WORDML_NS);
        }
        let mut xml = format!("{}<w:comments xmlns:w=\"{}\">", XML_DECL, WORDML_NS);
        for comment in &self.comments {
            xml.push_str(&format!(
                "<w:comment w:id=\"{}\" w:author=\"{}\"><w:p>{}</w:p></w:comment>",
                comment.id,
                escape(comment.author.as_str()),
                run(&comment.text)
            ));
        }
        xml.push_str("</w:comments>");
        xml
    }
}

fn run(text: &str) -> String {
    format!(
        "<w:r><w:t xml:space=\"preserve\">{}</w:t></w:r>",
        escape(text)
    )
}

fn package_rels() -> String {
    format!(
        "{}<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
         <Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument\" Target=\"word/document.xml\"/>\
         </Relationships>",
        XML_DECL
    )
}

fn document_rels(has_comments: bool) -> String {
    let mut xml = format!(
        "{}<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">",
        XML_DECL
    );
    if has_comments {
        xml.push_str(&format!(
            "<Relationship Id=\"rId1\" Type=\"{}\" Target=\"comments.xml\"/>",
            COMMENTS_REL_TYPE
        ));
    }
    xml.push_str("</Relationships>");
    xml
}
