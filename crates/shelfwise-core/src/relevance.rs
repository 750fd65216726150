use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Match vocabulary for one product type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductTypeMatch {
    pub key: String,
    pub synonyms: BTreeSet<String>,
}

/// Term sets a relevance filter invocation runs against.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelevanceContext {
    #[serde(default)]
    pub product_types: Vec<ProductTypeMatch>,
    #[serde(default)]
    pub occasion_terms: Vec<String>,
    #[serde(default)]
    pub exclude_terms: Vec<String>,
}

/// A product type entry as curated by an admin, before normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductTypeEntry {
    pub key: String,
    #[serde(default)]
    pub synonyms: Vec<String>,
}

/// The raw relevance vocabulary, loaded from YAML or the settings tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelevanceVocabulary {
    #[serde(default)]
    pub product_types: Vec<ProductTypeEntry>,
    #[serde(default)]
    pub occasion_terms: Vec<String>,
    #[serde(default)]
    pub exclude_terms: Vec<String>,
}

/// Load and validate the relevance vocabulary from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_relevance_vocabulary(path: &Path) -> Result<RelevanceVocabulary, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::RelevanceFileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_relevance_vocabulary(&content)
}

/// Parse and validate a YAML relevance vocabulary.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML is malformed or fails validation.
pub fn parse_relevance_vocabulary(content: &str) -> Result<RelevanceVocabulary, ConfigError> {
    let vocabulary: RelevanceVocabulary = serde_yaml::from_str(content)?;
    validate_vocabulary(&vocabulary)?;
    Ok(vocabulary)
}

fn validate_vocabulary(vocabulary: &RelevanceVocabulary) -> Result<(), ConfigError> {
    let mut seen_keys = HashSet::new();

    for entry in &vocabulary.product_types {
        let key = entry.key.trim().to_lowercase();
        if key.is_empty() {
            return Err(ConfigError::Validation(
                "product type key must be non-empty".to_string(),
            ));
        }
        if !seen_keys.insert(key) {
            return Err(ConfigError::Validation(format!(
                "duplicate product type key: '{}'",
                entry.key
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r"
productTypes:
  - key: pinata
    synonyms: [piñata, pinatas]
  - key: party favors
occasionTerms: [birthday, baby shower]
excludeTerms: [diy, free]
";

    #[test]
    fn parses_sample_vocabulary() {
        let vocabulary = parse_relevance_vocabulary(SAMPLE).expect("valid vocabulary");
        assert_eq!(vocabulary.product_types.len(), 2);
        assert_eq!(vocabulary.product_types[0].synonyms, vec!["piñata", "pinatas"]);
        assert!(vocabulary.product_types[1].synonyms.is_empty());
        assert_eq!(vocabulary.occasion_terms, vec!["birthday", "baby shower"]);
        assert_eq!(vocabulary.exclude_terms, vec!["diy", "free"]);
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let vocabulary = parse_relevance_vocabulary("excludeTerms: [cheap]").unwrap();
        assert!(vocabulary.product_types.is_empty());
        assert!(vocabulary.occasion_terms.is_empty());
    }

    #[test]
    fn rejects_duplicate_keys_case_insensitively() {
        let yaml = "productTypes:\n  - key: Pinata\n  - key: pinata\n";
        let err = parse_relevance_vocabulary(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref msg) if msg.contains("duplicate")));
    }

    #[test]
    fn rejects_blank_key() {
        let yaml = "productTypes:\n  - key: '  '\n";
        let err = parse_relevance_vocabulary(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_relevance_vocabulary(Path::new("/nonexistent/relevance.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::RelevanceFileIo { .. }));
    }
}
