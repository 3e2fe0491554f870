use crate::types::{ProcessCategory, Severity};
use serde::{Deserialize, Serialize};

/// A clause a filing of some category must contain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requirement {
    pub id: String,
    pub process_category: ProcessCategory,
    pub description: String,
    pub required_clause_pattern: String,
    /// Alternative phrasings accepted as the same clause
    #[serde(default)]
    pub aliases: Vec<String>,
    pub severity: Severity,
    /// Restricts the requirement to one document type
    #[serde(default)]
    pub document_type: Option<String>,
}

impl Requirement {
    /// Pattern followed by its aliases
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.required_clause_pattern.as_str())
            .chain(self.aliases.iter().map(String::as_str))
    }

    pub fn applies_to(&self, document_type: Option<&str>) -> bool {
        match (&self.document_type, document_type) {
            (None, _) => true,
            (Some(wanted), Some(actual)) => wanted.eq_ignore_ascii_case(actual),
            (Some(_), None) => false,
        }
    }
}

/// Versioned checklist for one process category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checklist {
    pub category: ProcessCategory,
    pub version: String,
    #[serde(default)]
    pub required_documents: Vec<String>,
    #[serde(default)]
    pub requirements: Vec<Requirement>,
}

impl Checklist {
    /// Requirements applicable to a document type, sorted by id
    pub fn requirements_for(&self, document_type: Option<&str>) -> Vec<Requirement> {
        let mut requirements: Vec<Requirement> = self
            .requirements
            .iter()
            .filter(|r| r.applies_to(document_type))
            .cloned()
            .collect();
        requirements.sort_by(|a, b| a.id.cmp(&b.id));
        requirements
    }
}
