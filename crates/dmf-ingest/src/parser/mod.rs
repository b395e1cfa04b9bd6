//! # Property Parsers
//!
//! Extract type-specific document properties from file content. One
//! parser per [`MetadataType`]; a type without a parser gets only the
//! common properties.
//!
//! The engine calls parsers synchronously on both the create and the
//! check-in path. A parser error aborts that upload.

use std::collections::HashMap;
use std::sync::Arc;

use dmf_core::{MetadataType, ParseError, PropertyMap};

pub mod config;
pub mod output;
pub mod results;

pub use config::ConfigParser;
pub use output::OutputParser;
pub use results::ResultsParser;

/// Extracts properties from raw file content.
pub trait PropertyParser: Send + Sync {
    /// Parse `content` into a property map.
    fn parse(&self, content: &[u8]) -> Result<PropertyMap, ParseError>;
}

impl<F> PropertyParser for F
where
    F: Fn(&[u8]) -> Result<PropertyMap, ParseError> + Send + Sync,
{
    fn parse(&self, content: &[u8]) -> Result<PropertyMap, ParseError> {
        self(content)
    }
}

/// Spreadsheets are accepted without extracting properties.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExcelParser;

impl PropertyParser for ExcelParser {
    fn parse(&self, _content: &[u8]) -> Result<PropertyMap, ParseError> {
        Ok(PropertyMap::new())
    }
}

/// Parser lookup by metadata type.
#[derive(Clone)]
pub struct ParserRegistry {
    parsers: HashMap<MetadataType, Arc<dyn PropertyParser>>,
}

impl ParserRegistry {
    /// A registry with no parsers at all.
    pub fn empty() -> Self {
        Self {
            parsers: HashMap::new(),
        }
    }

    /// The standard parsers: config, results, Excel and output.
    pub fn standard() -> Self {
        Self::empty()
            .with_parser(MetadataType::Config, ConfigParser)
            .with_parser(MetadataType::ResultsData, ResultsParser)
            .with_parser(MetadataType::ExcelData, ExcelParser)
            .with_parser(MetadataType::Output, OutputParser)
    }

    /// Register `parser` for `metadata_type`, replacing any previous one.
    pub fn with_parser(
        mut self,
        metadata_type: MetadataType,
        parser: impl PropertyParser + 'static,
    ) -> Self {
        self.parsers.insert(metadata_type, Arc::new(parser));
        self
    }

    /// The parser for `metadata_type`, if one is registered.
    pub fn get(&self, metadata_type: MetadataType) -> Option<&dyn PropertyParser> {
        self.parsers.get(&metadata_type).map(|p| p.as_ref())
    }

    /// Parse `content` with the parser for `metadata_type`. Types without
    /// a parser yield an empty map.
    pub fn parse(
        &self,
        metadata_type: MetadataType,
        content: &[u8],
    ) -> Result<PropertyMap, ParseError> {
        match self.get(metadata_type) {
            Some(parser) => parser.parse(content),
            None => Ok(PropertyMap::new()),
        }
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl std::fmt::Debug for ParserRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<MetadataType> = self.parsers.keys().copied().collect();
        types.sort();
        f.debug_struct("ParserRegistry").field("types", &types).finish()
    }
}

// ── Shared helpers ──────────────────────────────────────────────────

pub(crate) fn text(content: &[u8]) -> Result<&str, ParseError> {
    std::str::from_utf8(content).map_err(|_| ParseError::NotText)
}

/// Index of the first line at or after `from` containing `needle`,
/// ignoring ASCII case.
pub(crate) fn find_line(lines: &[&str], from: usize, needle: &str) -> Option<usize> {
    let needle = needle.to_ascii_lowercase();
    lines
        .iter()
        .enumerate()
        .skip(from)
        .find(|(_, line)| line.to_ascii_lowercase().contains(&needle))
        .map(|(i, _)| i)
}

/// `lines[index]`, or a `Missing` error naming what was expected there.
pub(crate) fn line_at<'a>(lines: &[&'a str], index: usize, what: &str) -> Result<&'a str, ParseError> {
    lines.get(index).copied().ok_or_else(|| ParseError::Missing {
        what: format!("{what} (line {})", index + 1),
    })
}

/// `index` is 0-based; errors report 1-based lines.
pub(crate) fn parse_f64(index: usize, token: &str) -> Result<f64, ParseError> {
    token.trim().parse().map_err(|_| ParseError::InvalidNumber {
        line: index + 1,
        value: token.to_string(),
    })
}

pub(crate) fn parse_i64(index: usize, token: &str) -> Result<i64, ParseError> {
    token.trim().parse().map_err(|_| ParseError::InvalidNumber {
        line: index + 1,
        value: token.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dmf_core::PropertyValue;

    #[test]
    fn test_standard_registry_has_no_input_parser() {
        let registry = ParserRegistry::standard();
        assert!(registry.get(MetadataType::InputData).is_none());
        assert!(registry.parse(MetadataType::InputData, b"\xff\xfe").unwrap().is_empty());
        assert!(registry.get(MetadataType::Config).is_some());
    }

    #[test]
    fn test_excel_yields_empty_map() {
        let props = ParserRegistry::standard()
            .parse(MetadataType::ExcelData, b"PK\x03\x04 binary")
            .unwrap();
        assert!(props.is_empty());
    }

    #[test]
    fn test_override_with_closure() {
        let registry = ParserRegistry::standard().with_parser(
            MetadataType::InputData,
            |content: &[u8]| -> Result<PropertyMap, ParseError> {
                let mut props = PropertyMap::new();
                props.insert("test:len".into(), PropertyValue::Integer(content.len() as i64));
                Ok(props)
            },
        );
        let props = registry.parse(MetadataType::InputData, b"abc").unwrap();
        assert_eq!(props.get("test:len"), Some(&PropertyValue::Integer(3)));
    }

    #[test]
    fn test_find_line_ignores_case() {
        let lines = ["# Header", "# DRY case bounds", "1 2"];
        assert_eq!(find_line(&lines, 0, "# dry case bounds"), Some(1));
        assert_eq!(find_line(&lines, 2, "# dry case bounds"), None);
    }

    #[test]
    fn test_invalid_number_reports_one_based_line() {
        assert_eq!(
            parse_f64(4, "abc"),
            Err(ParseError::InvalidNumber {
                line: 5,
                value: "abc".into()
            })
        );
    }
}
