//! Common document properties written on every create and check-in.

use dmf_core::metadata::props;
use dmf_core::{Checksum, ObjectId, PropertyMap, PropertyValue};
use serde_json::Value;

use crate::artifact::FileDescriptor;
use crate::options::UploadOptions;

/// Which object type id to record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePath {
    /// A new document.
    Create,
    /// A new version of an existing document.
    CheckIn,
}

/// Merge the common properties over the parser's output.
///
/// Common properties win on a name clash.
pub fn document_properties(
    file: &FileDescriptor,
    content: &[u8],
    checksum: &Checksum,
    options: &UploadOptions,
    write_path: WritePath,
    parsed: PropertyMap,
) -> PropertyMap {
    let mut properties = parsed;
    let object_type = match write_path {
        WritePath::Create => file.metadata_type.create_object_type(),
        WritePath::CheckIn => file.metadata_type.check_in_object_type(),
    };
    properties.insert(props::NAME.into(), file.display_name.as_str().into());
    properties.insert(props::OBJECT_TYPE_ID.into(), object_type.into());
    properties.insert(props::MIME_TYPE.into(), file.metadata_type.mime_type().into());
    properties.insert(props::CONFIDENCE.into(), options.confidence.as_str().into());
    properties.insert(props::CHECKSUM.into(), checksum.to_hex().into());
    // Written even when empty: a check-in starts from the previous version's properties.
    let parents = file.dependency_ids.iter().map(ObjectId::to_string).collect::<Vec<_>>();
    properties.insert(props::PARENTS.into(), PropertyValue::StringList(parents));
    if let Some(link) = &options.external_link {
        properties.insert(props::EXTERNAL_LINK.into(), link.as_str().into());
    }
    if let Some(nodes) = flowsheet_nodes(content) {
        properties.insert(props::SIMULATIONS.into(), nodes.into());
    }
    properties
}

/// Node names of a JSON flowsheet, rendered as `[a, b]`.
///
/// Returns `None` for anything that is not a JSON object with a
/// `flowsheet` object holding a `nodes` object. The `nodes` key matches
/// case-insensitively.
pub fn flowsheet_nodes(content: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(content).ok()?;
    let flowsheet = value.get("flowsheet")?.as_object()?;
    let nodes = flowsheet
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case("nodes"))
        .and_then(|(_, v)| v.as_object())?;
    let names: Vec<&str> = nodes.keys().map(String::as_str).collect();
    Some(format!("[{}]", names.join(", ")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dmf_core::{ChecksumService, MetadataType};

    fn descriptor(deps: Vec<ObjectId>) -> FileDescriptor {
        FileDescriptor::from_bytes("config1.txt", MetadataType::Config, b"x".to_vec())
            .with_dependencies(deps)
    }

    #[test]
    fn test_common_properties_override_parsed() {
        let mut parsed = PropertyMap::new();
        parsed.insert(props::NAME.into(), "spoofed".into());
        parsed.insert("sbf_c:Timestep".into(), PropertyValue::Decimal(0.5));
        let checksum = ChecksumService::default().digest_bytes(b"x");

        let props_out = document_properties(
            &descriptor(Vec::new()),
            b"x",
            &checksum,
            &UploadOptions::default(),
            WritePath::Create,
            parsed,
        );
        assert_eq!(props_out[props::NAME], PropertyValue::from("config1.txt"));
        assert_eq!(props_out["sbf_c:Timestep"], PropertyValue::Decimal(0.5));
        assert_eq!(
            props_out[props::OBJECT_TYPE_ID],
            PropertyValue::from(MetadataType::Config.create_object_type())
        );
        assert_eq!(props_out[props::CHECKSUM], PropertyValue::from(checksum.to_hex()));
        assert_eq!(props_out[props::CONFIDENCE], PropertyValue::from("experimental"));
        assert_eq!(props_out[props::PARENTS], PropertyValue::StringList(Vec::new()));
        assert!(!props_out.contains_key(props::EXTERNAL_LINK));
    }

    #[test]
    fn test_parents_and_link() {
        let deps = vec![ObjectId::new("a").unwrap(), ObjectId::new("b").unwrap()];
        let options = UploadOptions {
            external_link: Some("https://example.org/run/7".into()),
            ..UploadOptions::default()
        };
        let checksum = ChecksumService::default().digest_bytes(b"x");
        let props_out = document_properties(
            &descriptor(deps),
            b"x",
            &checksum,
            &options,
            WritePath::CheckIn,
            PropertyMap::new(),
        );
        assert_eq!(
            props_out[props::PARENTS],
            PropertyValue::StringList(vec!["a".into(), "b".into()])
        );
        assert_eq!(props_out[props::EXTERNAL_LINK], PropertyValue::from("https://example.org/run/7"));
        assert_eq!(
            props_out[props::OBJECT_TYPE_ID],
            PropertyValue::from(MetadataType::Config.check_in_object_type())
        );
    }

    // ── Flowsheets ──────────────────────────────────────────────────

    #[test]
    fn test_flowsheet_nodes() {
        let json = br#"{"flowsheet": {"Nodes": {"absorber": {}, "stripper": {}}}}"#;
        assert_eq!(flowsheet_nodes(json).as_deref(), Some("[absorber, stripper]"));
    }

    #[test]
    fn test_non_flowsheet_content() {
        assert_eq!(flowsheet_nodes(b"plain text"), None);
        assert_eq!(flowsheet_nodes(br#"{"flowsheet": []}"#), None);
        assert_eq!(flowsheet_nodes(br#"{"other": {"nodes": {}}}"#), None);
    }
}
