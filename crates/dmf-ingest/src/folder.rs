//! Target folder lookup and creation.

use dmf_core::metadata::{props, FOLDER_OBJECT_TYPE};
use dmf_core::{PropertyMap, PropertyValue, RepositoryError};
use dmf_repository::{object_exists, Folder, Repository};

use crate::error::IngestError;

/// Properties of a folder to create.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderProperties {
    /// Name within the parent.
    pub name: String,
    /// Recorded as `cm:description`.
    pub description: Option<String>,
    /// Recorded as `ccsi:fixedForm`.
    pub fixed_form: Option<bool>,
}

impl FolderProperties {
    /// A plain folder called `name`.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    fn to_property_map(&self) -> PropertyMap {
        let mut properties = PropertyMap::new();
        properties.insert(props::NAME.into(), self.name.as_str().into());
        properties.insert(props::OBJECT_TYPE_ID.into(), FOLDER_OBJECT_TYPE.into());
        if let Some(description) = &self.description {
            properties.insert(props::DESCRIPTION.into(), description.as_str().into());
        }
        if let Some(fixed) = self.fixed_form {
            properties.insert(props::FIXED_FORM.into(), PropertyValue::Boolean(fixed));
        }
        properties
    }
}

/// Create a folder inside `parent`.
pub fn create_folder<R: Repository + ?Sized>(
    repository: &R,
    parent: &Folder,
    folder: &FolderProperties,
) -> Result<Folder, RepositoryError> {
    tracing::debug!(parent = %parent.path, name = %folder.name, "creating folder");
    let created = repository.create_folder(&parent.id, folder.to_property_map())?;
    tracing::info!(object_id = %created.id, path = %created.path, "folder created");
    Ok(created)
}

/// The folder at `path`, creating it and any missing ancestors when
/// `create_missing` is set.
pub fn resolve_folder<R: Repository + ?Sized>(
    repository: &R,
    path: &str,
    create_missing: bool,
) -> Result<Folder, IngestError> {
    if object_exists(repository, path)? {
        return Ok(repository.get_object_by_path(path)?.into_folder()?);
    }
    if !create_missing {
        return Err(RepositoryError::not_found(path).into());
    }
    let (parent_path, name) = split_parent(path).ok_or_else(|| RepositoryError::not_found(path))?;
    let parent = resolve_folder(repository, parent_path, true)?;
    Ok(create_folder(repository, &parent, &FolderProperties::named(name))?)
}

/// Split an absolute path into its parent path and last component.
fn split_parent(path: &str) -> Option<(&str, &str)> {
    let path = path.trim_end_matches('/');
    let (parent, name) = path.rsplit_once('/')?;
    if name.is_empty() {
        return None;
    }
    Some((if parent.is_empty() { "/" } else { parent }, name))
}
