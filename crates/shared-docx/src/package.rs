//! Read-only view of an OOXML package (a zip archive of XML parts)

use crate::error::DocxError;
use crate::opc;
use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use zip::ZipArchive;

/// Package-level relationships part
pub const PACKAGE_RELS_PART: &str = "_rels/.rels";
/// Content types part
pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
/// Used when the package relationships do not name a main document
pub const DEFAULT_DOCUMENT_PART: &str = "word/document.xml";

const OFFICE_DOCUMENT_REL: &str = "/officeDocument";

/// An opened `.docx` file
///
/// The original bytes are kept untouched; parts are decompressed on demand.
#[derive(Debug, Clone)]
pub struct DocxPackage {
    bytes: Vec<u8>,
    part_names: Vec<String>,
    document_part: String,
    document_xml: Vec<u8>,
}

impl DocxPackage {
    /// Open a package and load its main document part
    ///
    /// # Errors
    /// - `DocxError::Container` - the bytes are not a zip archive
    /// - `DocxError::MissingPart` - no main document part
    pub fn open(bytes: &[u8]) -> Result<Self, DocxError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let part_names: Vec<String> = archive.file_names().map(str::to_string).collect();

        let document_part = match read_entry(&mut archive, PACKAGE_RELS_PART)? {
            Some(rels) => opc::relationships(&rels, PACKAGE_RELS_PART)?
                .into_iter()
                .find(|r| r.rel_type.ends_with(OFFICE_DOCUMENT_REL))
                .map(|r| r.target.trim_start_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_DOCUMENT_PART.to_string()),
            None => DEFAULT_DOCUMENT_PART.to_string(),
        };

        let document_xml = read_entry(&mut archive, &document_part)?
            .ok_or_else(|| DocxError::MissingPart(document_part.clone()))?;

        Ok(Self {
            bytes: bytes.to_vec(),
            part_names,
            document_part,
            document_xml,
        })
    }

    /// The original container bytes
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Part names in archive order
    pub fn part_names(&self) -> &[String] {
        &self.part_names
    }

    pub fn has_part(&self, name: &str) -> bool {
        self.part_names.iter().any(|n| n == name)
    }

    /// Name of the main document part, usually `word/document.xml`
    pub fn document_part(&self) -> &str {
        &self.document_part
    }

    pub fn document_xml(&self) -> &[u8] {
        &self.document_xml
    }

    /// Folder holding the main document part (`word`)
    pub fn document_dir(&self) -> &str {
        self.document_part
            .rsplit_once('/')
            .map(|(dir, _)| dir)
            .unwrap_or("")
    }

    /// Relationships part of the main document (`word/_rels/document.xml.rels`)
    pub fn document_rels_part(&self) -> String {
        rels_part_for(&self.document_part)
    }

    /// Decompress a part by name
    pub fn read_part(&self, name: &str) -> Result<Option<Vec<u8>>, DocxError> {
        if name == self.document_part {
            return Ok(Some(self.document_xml.clone()));
        }
        let mut archive = ZipArchive::new(Cursor::new(self.bytes.as_slice()))?;
        read_entry(&mut archive, name)
    }

    /// Every file part, decompressed, keyed by name
    pub fn read_all_parts(&self) -> Result<BTreeMap<String, Vec<u8>>, DocxError> {
        read_all_parts(&self.bytes)
    }
}

/// Decompress every file entry of a zip container
pub fn read_all_parts(bytes: &[u8]) -> Result<BTreeMap<String, Vec<u8>>, DocxError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut parts = BTreeMap::new();
    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        if file.is_dir() {
            continue;
        }
        let mut data = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut data)?;
        parts.insert(file.name().to_string(), data);
    }
    Ok(parts)
}

/// `word/document.xml` -> `word/_rels/document.xml.rels`
pub fn rels_part_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part),
    }
}

fn read_entry(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    name: &str,
) -> Result<Option<Vec<u8>>, DocxError> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut data = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut data)?;
    Ok(Some(data))
}
