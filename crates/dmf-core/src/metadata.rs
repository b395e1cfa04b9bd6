//! # Document Property Model
//!
//! Metadata types, repository object-type ids, and the property
//! vocabulary written on every uploaded document.
//!
//! The property names and type ids are fixed by the repository's content
//! model. They are collected in [`props`] so no engine spells them inline.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Content stream MIME type for everything but spreadsheets.
pub const PLAIN_TEXT_MIME_TYPE: &str = "text/plain";

/// Content stream MIME type for spreadsheet data.
pub const EXCEL_MIME_TYPE: &str = "application/vnd.ms-excel";

/// Aspects applied when a document is first created.
const CREATE_ASPECTS: &str = "P:cm:titled,P:ccsi:uploadOrigin,P:ccsi:documentAspect";

/// Aspect applied on check-in; the others are already on the series.
const CHECK_IN_ASPECTS: &str = "P:cm:titled";

/// Object type of folders created by the ingestion engine.
pub const FOLDER_OBJECT_TYPE: &str = "F:ccsi:folder,P:cm:titled";

/// Property names of the repository content model.
pub mod props {
    /// Object name within its parent folder.
    pub const NAME: &str = "cmis:name";
    /// Object type id plus aspects.
    pub const OBJECT_TYPE_ID: &str = "cmis:objectTypeId";
    /// The real MIME type of the uploaded file.
    pub const MIME_TYPE: &str = "ccsi:mimetype";
    /// Caller-supplied confidence degree.
    pub const CONFIDENCE: &str = "ccsi:confidenceDegree";
    /// Hex content checksum.
    pub const CHECKSUM: &str = "ccsi:checksum";
    /// Object ids this document was derived from.
    pub const PARENTS: &str = "ccsi:parents";
    /// External link to the data source.
    pub const EXTERNAL_LINK: &str = "ccsi:link";
    /// Flowsheet node names, for simulation files.
    pub const SIMULATIONS: &str = "ccsi:simulations";
    /// Principal holding the checkout.
    pub const LOCK_OWNER: &str = "cm:lockOwner";
    /// Human title.
    pub const TITLE: &str = "cm:title";
    /// Human description.
    pub const DESCRIPTION: &str = "cm:description";
    /// Folder may not be restructured.
    pub const FIXED_FORM: &str = "ccsi:fixedForm";
}

/// A single property value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// Text.
    String(String),
    /// Integer.
    Integer(i64),
    /// Floating-point number.
    Decimal(f64),
    /// Flag.
    Boolean(bool),
    /// Multi-valued text.
    StringList(Vec<String>),
}

impl PropertyValue {
    /// The value as text, for single-valued string properties.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// The value as a number, for integer or decimal properties.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Decimal(d) => Some(*d),
            Self::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// The values of a multi-valued text property.
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::StringList(v) => Some(v),
            _ => None,
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        Self::Decimal(v)
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<Vec<String>> for PropertyValue {
    fn from(v: Vec<String>) -> Self {
        Self::StringList(v)
    }
}

/// Property name to value, ordered by name.
pub type PropertyMap = BTreeMap<String, PropertyValue>;

/// The kind of file being uploaded.
///
/// Selects the repository object type and the property parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MetadataType {
    /// Fitting configuration.
    Config,
    /// Raw input data, versioned without extracted properties.
    InputData,
    /// Per-input results data table.
    ResultsData,
    /// Spreadsheet data.
    ExcelData,
    /// Optimisation output summary.
    Output,
}

impl MetadataType {
    /// All metadata types.
    pub const ALL: [MetadataType; 5] = [
        MetadataType::Config,
        MetadataType::InputData,
        MetadataType::ResultsData,
        MetadataType::ExcelData,
        MetadataType::Output,
    ];

    /// The content-model document type, without the `D:` prefix.
    pub fn document_type(&self) -> &'static str {
        match self {
            Self::Config => "sbf_c:meta",
            Self::InputData => "ccsi:documentv",
            Self::ResultsData => "sbf_d:meta",
            Self::ExcelData => "sbf_e:meta",
            Self::Output => "sbf_o:meta",
        }
    }

    /// `cmis:objectTypeId` for a new document.
    pub fn create_object_type(&self) -> String {
        format!("D:{},{CREATE_ASPECTS}", self.document_type())
    }

    /// `cmis:objectTypeId` for a check-in.
    pub fn check_in_object_type(&self) -> String {
        format!("D:{},{CHECK_IN_ASPECTS}", self.document_type())
    }

    /// MIME type of the content stream.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::ExcelData => EXCEL_MIME_TYPE,
            _ => PLAIN_TEXT_MIME_TYPE,
        }
    }
}

impl std::fmt::Display for MetadataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Config => "config",
            Self::InputData => "input-data",
            Self::ResultsData => "results-data",
            Self::ExcelData => "excel-data",
            Self::Output => "output",
        };
        f.write_str(s)
    }
}
