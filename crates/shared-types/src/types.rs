use std::fmt;
use std::str::FromStr;

/// Legal process categories a filing can belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub enum ProcessCategory {
    #[serde(rename = "Incorporation", alias = "incorporation", alias = "Company Incorporation")]
    Incorporation,
    #[serde(rename = "UBO Declaration", alias = "ubo_declaration")]
    UboDeclaration,
    #[serde(rename = "Resolution", alias = "resolution")]
    Resolution,
    #[serde(rename = "Employment & HR", alias = "employment")]
    Employment,
}

impl ProcessCategory {
    /// Every category, in scoring order
    pub const ALL: [ProcessCategory; 4] = [
        ProcessCategory::Incorporation,
        ProcessCategory::UboDeclaration,
        ProcessCategory::Resolution,
        ProcessCategory::Employment,
    ];

    /// Human-readable name, identical to the serialized form
    pub fn name(&self) -> &'static str {
        match self {
            ProcessCategory::Incorporation => "Incorporation",
            ProcessCategory::UboDeclaration => "UBO Declaration",
            ProcessCategory::Resolution => "Resolution",
            ProcessCategory::Employment => "Employment & HR",
        }
    }

    /// Short machine identifier used in file names and CLI flags
    pub fn slug(&self) -> &'static str {
        match self {
            ProcessCategory::Incorporation => "incorporation",
            ProcessCategory::UboDeclaration => "ubo_declaration",
            ProcessCategory::Resolution => "resolution",
            ProcessCategory::Employment => "employment",
        }
    }
}

impl fmt::Display for ProcessCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProcessCategory {
    type Err = String;

    /// Parse from slug or display name (case-insensitive)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ProcessCategory::ALL
            .into_iter()
            .find(|c| c.slug() == wanted || c.name().to_lowercase() == wanted)
            .or_else(|| match wanted.as_str() {
                "company incorporation" | "inc" => Some(ProcessCategory::Incorporation),
                "ubo" => Some(ProcessCategory::UboDeclaration),
                "employment" | "hr" => Some(ProcessCategory::Employment),
                _ => None,
            })
            .ok_or_else(|| format!("Unknown process category: {}", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Filing will be rejected
    Critical,
    /// Regulatory non-conformance
    High,
    /// Drafting weakness
    Medium,
    /// Informational
    Low,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Critical => "Critical",
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parses_slug_and_name() {
        assert_eq!("incorporation".parse::<ProcessCategory>(), Ok(ProcessCategory::Incorporation));
        assert_eq!("UBO Declaration".parse::<ProcessCategory>(), Ok(ProcessCategory::UboDeclaration));
        assert_eq!("Employment & HR".parse::<ProcessCategory>(), Ok(ProcessCategory::Employment));
        assert!("shipping".parse::<ProcessCategory>().is_err());
    }

    #[test]
    fn test_category_serializes_display_name() {
        let json = serde_json::to_string(&ProcessCategory::UboDeclaration).unwrap();
        assert_eq!(json, "\"UBO Declaration\"");
        let back: ProcessCategory = serde_json::from_str("\"ubo_declaration\"").unwrap();
        assert_eq!(back, ProcessCategory::UboDeclaration);
    }

    #[test]
    fn test_severity_orders_most_severe_first() {
        let mut severities = vec![Severity::Low, Severity::Critical, Severity::Medium];
        severities.sort();
        assert_eq!(severities, vec![Severity::Critical, Severity::Medium, Severity::Low]);
    }
}
