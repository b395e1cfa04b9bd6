//! # In-Memory Repository
//!
//! A complete in-process implementation of [`Repository`]. Every engine
//! test in the workspace runs against it.
//!
//! ## Model
//!
//! - Folders and document version series live in one node table keyed by
//!   bare object id, with a path index beside it.
//! - A document id is `<series>;<label>`. The private working copy of a
//!   checked-out series is `<series>;pwc`. A bare series id resolves to
//!   the latest version.
//! - ACLs hold direct entries per node. Inherited entries are computed on
//!   read from the ancestor folders, nearest first, after the direct ones.
//!
//! ## Repository Side Effects
//!
//! The real repository re-injects boilerplate tokens into entries that an
//! ACL write changes. With [`set_boilerplate_injection()`](InMemoryRepository::set_boilerplate_injection)
//! enabled, this store does the same: every changed entry gains
//! `base.Read`, entries carrying `cmis:write` gain `base.Write`, and
//! entries carrying `cmis:all` gain `All.All`. A write that only removes
//! boilerplate is not a change and triggers no injection.
//!
//! ## Fault Injection
//!
//! [`fail_next_check_ins()`](InMemoryRepository::fail_next_check_ins) and
//! [`fail_next_acl_writes()`](InMemoryRepository::fail_next_acl_writes)
//! make the next N calls of that kind fail with [`RepositoryError::Other`]
//! before touching any state.
//!
//! Cheaply cloneable via `Arc`. All clones share the same data, and
//! [`as_user()`](InMemoryRepository::as_user) yields a handle acting as
//! another principal over the same store.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;

use dmf_core::metadata::props;
use dmf_core::role::BOILERPLATE_TOKENS;
use dmf_core::{
    AccessControlEntry, AccessControlList, BasicPermission, ObjectId, Principal, PropertyMap,
    PropertyValue, RepositoryError, VersionTag,
};

use crate::client::{
    join_path, AclPropagation, ContentStream, Document, Folder, Repository, RepositoryObject,
    VersioningState,
};

/// Path of the root folder.
pub const ROOT_PATH: &str = "/";

/// A state-changing call received by the store, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryCall {
    /// `set_acl` on a node.
    SetAcl(ObjectId),
    /// `add_acl` on a node.
    AddAcl(ObjectId),
    /// `create_document` at a path.
    CreateDocument(String),
    /// `create_folder` at a path.
    CreateFolder(String),
    /// `check_out` of a series.
    CheckOut(ObjectId),
    /// `check_in` of a working copy.
    CheckIn(ObjectId),
    /// `cancel_check_out` of a working copy.
    CancelCheckOut(ObjectId),
}

impl RepositoryCall {
    /// Whether this call wrote an ACL.
    pub fn is_acl_write(&self) -> bool {
        matches!(self, Self::SetAcl(_) | Self::AddAcl(_))
    }
}

struct StoredVersion {
    label: VersionTag,
    properties: PropertyMap,
    content: Vec<u8>,
}

struct Series {
    versions: Vec<StoredVersion>,
    checked_out_by: Option<Principal>,
}

impl Series {
    fn latest(&self) -> Result<&StoredVersion, RepositoryError> {
        self.versions
            .last()
            .ok_or_else(|| RepositoryError::Other("version series has no versions".into()))
    }
}

enum NodeKind {
    Folder,
    Document(Series),
}

struct Node {
    id: ObjectId,
    name: String,
    path: String,
    parent: Option<ObjectId>,
    acl: Vec<AccessControlEntry>,
    kind: NodeKind,
}

#[derive(Default)]
struct Faults {
    check_ins: usize,
    acl_writes: usize,
}

struct Store {
    nodes: HashMap<ObjectId, Node>,
    paths: HashMap<String, ObjectId>,
    root: ObjectId,
    journal: Vec<RepositoryCall>,
    faults: Faults,
    boilerplate_injection: bool,
}

impl Store {
    fn new() -> Self {
        let root = ObjectId::generate();
        let mut nodes = HashMap::new();
        nodes.insert(
            root.clone(),
            Node {
                id: root.clone(),
                name: String::new(),
                path: ROOT_PATH.to_string(),
                parent: None,
                acl: Vec::new(),
                kind: NodeKind::Folder,
            },
        );
        let paths = HashMap::from([(ROOT_PATH.to_string(), root.clone())]);
        Self {
            nodes,
            paths,
            root,
            journal: Vec::new(),
            faults: Faults::default(),
            boilerplate_injection: false,
        }
    }

    fn node(&self, id: &ObjectId) -> Result<&Node, RepositoryError> {
        self.nodes
            .get(&id.bare())
            .ok_or_else(|| RepositoryError::not_found(id.as_str()))
    }

    fn node_mut(&mut self, id: &ObjectId) -> Result<&mut Node, RepositoryError> {
        self.nodes
            .get_mut(&id.bare())
            .ok_or_else(|| RepositoryError::not_found(id.as_str()))
    }

    fn folder(&self, id: &ObjectId) -> Result<&Node, RepositoryError> {
        let node = self.node(id)?;
        match node.kind {
            NodeKind::Folder => Ok(node),
            NodeKind::Document(_) => Err(RepositoryError::ContentConflict {
                target: node.path.clone(),
                reason: "not a folder".into(),
            }),
        }
    }

    fn series_mut(&mut self, id: &ObjectId) -> Result<(&str, &mut Series), RepositoryError> {
        let node = self.node_mut(id)?;
        match &mut node.kind {
            NodeKind::Document(series) => Ok((node.path.as_str(), series)),
            NodeKind::Folder => Err(RepositoryError::ContentConflict {
                target: node.path.clone(),
                reason: "not a document".into(),
            }),
        }
    }

    fn view(node: &Node, requested: Option<&VersionTag>) -> Result<RepositoryObject, RepositoryError> {
        let series = match &node.kind {
            NodeKind::Folder => {
                return Ok(RepositoryObject::Folder(Folder {
                    id: node.id.clone(),
                    name: node.name.clone(),
                    path: node.path.clone(),
                }))
            }
            NodeKind::Document(series) => series,
        };

        let working_copy_id = series
            .checked_out_by
            .as_ref()
            .map(|_| ObjectId::versioned(&node.id, &VersionTag::working_copy()));

        let (id, version) = match requested {
            Some(label) if label.is_working_copy() => {
                let pwc = working_copy_id
                    .clone()
                    .ok_or_else(|| RepositoryError::not_found(format!("{};{label}", node.id)))?;
                (pwc, series.latest()?)
            }
            Some(label) => {
                let version = series
                    .versions
                    .iter()
                    .find(|v| &v.label == label)
                    .ok_or_else(|| RepositoryError::not_found(format!("{};{label}", node.id)))?;
                (ObjectId::versioned(&node.id, label), version)
            }
            None => {
                let latest = series.latest()?;
                (ObjectId::versioned(&node.id, &latest.label), latest)
            }
        };

        let mut properties = version.properties.clone();
        if let Some(owner) = &series.checked_out_by {
            properties.insert(props::LOCK_OWNER.to_string(), owner.as_str().into());
        }

        Ok(RepositoryObject::Document(Document {
            id,
            name: node.name.clone(),
            path: node.path.clone(),
            properties,
            version_label: version.label.clone(),
            checked_out_by: series.checked_out_by.clone(),
            working_copy_id,
        }))
    }

    fn insert_child(
        &mut self,
        parent: &ObjectId,
        properties: &PropertyMap,
        kind: NodeKind,
    ) -> Result<&Node, RepositoryError> {
        let parent = self.folder(parent)?;
        let parent_id = parent.id.clone();
        let name = properties
            .get(props::NAME)
            .and_then(PropertyValue::as_str)
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| RepositoryError::Other(format!("{} is required", props::NAME)))?
            .to_string();
        let path = join_path(&parent.path, &name);
        if self.paths.contains_key(&path) {
            return Err(RepositoryError::ContentConflict {
                target: path,
                reason: "an object with this name already exists".into(),
            });
        }

        let id = ObjectId::generate();
        self.paths.insert(path.clone(), id.clone());
        let node = self.nodes.entry(id.clone()).or_insert(Node {
            id,
            name,
            path,
            parent: Some(parent_id),
            acl: Vec::new(),
            kind,
        });
        Ok(node)
    }

    fn effective_acl(&self, id: &ObjectId, include_inherited: bool) -> Result<AccessControlList, RepositoryError> {
        let node = self.node(id)?;
        let mut entries = node.acl.clone();
        if include_inherited {
            let mut parent = node.parent.clone();
            while let Some(pid) = parent {
                let ancestor = self.node(&pid)?;
                entries.extend(ancestor.acl.iter().map(|e| AccessControlEntry {
                    is_direct: false,
                    ..e.clone()
                }));
                parent = ancestor.parent.clone();
            }
        }
        Ok(AccessControlList::new(entries))
    }

    fn take_acl_fault(&mut self, id: &ObjectId) -> Result<(), RepositoryError> {
        if self.faults.acl_writes > 0 {
            self.faults.acl_writes -= 1;
            return Err(RepositoryError::Other(format!("injected ACL write failure on {id}")));
        }
        Ok(())
    }

    fn write_acl(&mut self, id: &ObjectId, mut entries: Vec<AccessControlEntry>) -> Result<(), RepositoryError> {
        let inject = self.boilerplate_injection;
        let node = self.node_mut(id)?;
        if inject {
            let before = stripped(&node.acl);
            if stripped(&entries) != before {
                for entry in &mut entries {
                    let tokens = stripped_tokens(entry);
                    if before.get(&entry.principal) != Some(&tokens) && !tokens.is_empty() {
                        inject_boilerplate(entry);
                    }
                }
            }
        }
        node.acl = entries;
        Ok(())
    }
}

fn reject_inherited(id: &ObjectId, entries: &[AccessControlEntry]) -> Result<(), RepositoryError> {
    match entries.iter().find(|e| !e.is_direct) {
        Some(e) => Err(RepositoryError::ContentConflict {
            target: id.to_string(),
            reason: format!("inherited entry for {} cannot be written", e.principal),
        }),
        None => Ok(()),
    }
}

fn stripped_tokens(entry: &AccessControlEntry) -> BTreeSet<String> {
    entry
        .permissions
        .iter()
        .filter(|t| !BOILERPLATE_TOKENS.contains(&t.as_str()))
        .cloned()
        .collect()
}

fn stripped(entries: &[AccessControlEntry]) -> BTreeMap<Principal, BTreeSet<String>> {
    let mut map: BTreeMap<Principal, BTreeSet<String>> = BTreeMap::new();
    for entry in entries {
        let tokens = stripped_tokens(entry);
        if !tokens.is_empty() {
            map.entry(entry.principal.clone()).or_default().extend(tokens);
        }
    }
    map
}

fn inject_boilerplate(entry: &mut AccessControlEntry) {
    let [all, read, write] = BOILERPLATE_TOKENS;
    entry.permissions.insert(read.to_string());
    if entry.has_token(BasicPermission::Write.token()) {
        entry.permissions.insert(write.to_string());
    }
    if entry.has_token(BasicPermission::All.token()) {
        entry.permissions.insert(all.to_string());
    }
}

/// Repository held entirely in process memory.
#[derive(Clone)]
pub struct InMemoryRepository {
    store: Arc<Mutex<Store>>,
    user: Principal,
    admin: Principal,
}

impl std::fmt::Debug for InMemoryRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryRepository")
            .field("user", &self.user)
            .field("admin", &self.admin)
            .finish_non_exhaustive()
    }
}

impl InMemoryRepository {
    /// An empty repository, holding only the root folder, acting as `user`.
    ///
    /// The administrator is `admin`.
    pub fn new(user: Principal) -> Result<Self, RepositoryError> {
        let admin = Principal::new(crate::config::DEFAULT_ADMIN_PRINCIPAL)
            .map_err(|e| RepositoryError::Other(e.to_string()))?;
        Ok(Self::with_admin(user, admin))
    }

    /// An empty repository with an explicit administrator.
    pub fn with_admin(user: Principal, admin: Principal) -> Self {
        Self {
            store: Arc::new(Mutex::new(Store::new())),
            user,
            admin,
        }
    }

    /// A handle acting as `user` over the same store.
    pub fn as_user(&self, user: Principal) -> Self {
        Self {
            store: Arc::clone(&self.store),
            user,
            admin: self.admin.clone(),
        }
    }

    /// The principal this handle acts as.
    pub fn user(&self) -> &Principal {
        &self.user
    }

    fn may_override(&self, owner: &Principal) -> bool {
        owner == &self.user || self.user == self.admin
    }

    // ─── Test Support ────────────────────────────────────────────────

    /// The root folder.
    pub fn root(&self) -> Folder {
        let store = self.store.lock();
        Folder {
            id: store.root.clone(),
            name: String::new(),
            path: ROOT_PATH.to_string(),
        }
    }

    /// Create every missing folder along `path` without journaling.
    pub fn seed_folder(&self, path: &str) -> Result<Folder, RepositoryError> {
        let mut store = self.store.lock();
        let mut current = store.root.clone();
        for name in path.split('/').filter(|s| !s.is_empty()) {
            let child_path = join_path(&store.node(&current)?.path, name);
            let existing = store.paths.get(&child_path).cloned();
            current = match existing {
                Some(id) => store.folder(&id)?.id.clone(),
                None => {
                    let properties = PropertyMap::from([(props::NAME.to_string(), name.into())]);
                    store.insert_child(&current, &properties, NodeKind::Folder)?.id.clone()
                }
            };
        }
        Store::view(store.node(&current)?, None)?.into_folder()
    }

    /// Replace a node's direct entries without journaling or side effects.
    pub fn seed_acl(&self, id: &ObjectId, entries: Vec<AccessControlEntry>) -> Result<(), RepositoryError> {
        let mut store = self.store.lock();
        store.node_mut(id)?.acl = entries;
        Ok(())
    }

    /// Enable or disable the boilerplate-token side effect of ACL writes.
    pub fn set_boilerplate_injection(&self, enabled: bool) {
        self.store.lock().boilerplate_injection = enabled;
    }

    /// Fail the next `n` check-ins.
    pub fn fail_next_check_ins(&self, n: usize) {
        self.store.lock().faults.check_ins = n;
    }

    /// Fail the next `n` ACL writes.
    pub fn fail_next_acl_writes(&self, n: usize) {
        self.store.lock().faults.acl_writes = n;
    }

    /// Every state-changing call received so far.
    pub fn calls(&self) -> Vec<RepositoryCall> {
        self.store.lock().journal.clone()
    }

    /// Forget the journal.
    pub fn clear_calls(&self) {
        self.store.lock().journal.clear();
    }

    /// Paths of created documents, in creation order.
    pub fn created_documents(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                RepositoryCall::CreateDocument(path) => Some(path),
                _ => None,
            })
            .collect()
    }

    /// Content of a version. A bare id reads the latest version.
    pub fn content_of(&self, id: &ObjectId) -> Result<Vec<u8>, RepositoryError> {
        let store = self.store.lock();
        let node = store.node(id)?;
        let NodeKind::Document(series) = &node.kind else {
            return Err(RepositoryError::ContentConflict {
                target: node.path.clone(),
                reason: "not a document".into(),
            });
        };
        let version = match id.version() {
            Some(label) => series
                .versions
                .iter()
                .find(|v| v.label == label)
                .ok_or_else(|| RepositoryError::not_found(id.as_str()))?,
            None => series.latest()?,
        };
        Ok(version.content.clone())
    }
}

impl Repository for InMemoryRepository {
    fn get_object(&self, id: &ObjectId) -> Result<RepositoryObject, RepositoryError> {
        let store = self.store.lock();
        let node = store.node(id)?;
        Store::view(node, id.version().as_ref())
    }

    fn get_object_by_path(&self, path: &str) -> Result<RepositoryObject, RepositoryError> {
        let store = self.store.lock();
        let id = store
            .paths
            .get(path)
            .ok_or_else(|| RepositoryError::not_found(path))?;
        Store::view(store.node(id)?, None)
    }

    fn get_acl(
        &self,
        id: &ObjectId,
        include_inherited: bool,
    ) -> Result<AccessControlList, RepositoryError> {
        self.store.lock().effective_acl(id, include_inherited)
    }

    fn set_acl(&self, id: &ObjectId, entries: &[AccessControlEntry]) -> Result<(), RepositoryError> {
        reject_inherited(id, entries)?;
        let mut store = self.store.lock();
        store.node(id)?;
        store.take_acl_fault(id)?;
        store.write_acl(id, entries.to_vec())?;
        store.journal.push(RepositoryCall::SetAcl(id.bare()));
        Ok(())
    }

    fn add_acl(
        &self,
        id: &ObjectId,
        entries: &[AccessControlEntry],
        _propagation: AclPropagation,
    ) -> Result<(), RepositoryError> {
        reject_inherited(id, entries)?;
        let mut store = self.store.lock();
        let mut merged = store.node(id)?.acl.clone();
        store.take_acl_fault(id)?;
        for entry in entries {
            match merged.iter_mut().find(|e| e.principal == entry.principal) {
                Some(existing) => existing.permissions.extend(entry.permissions.iter().cloned()),
                None => merged.push(entry.clone()),
            }
        }
        store.write_acl(id, merged)?;
        store.journal.push(RepositoryCall::AddAcl(id.bare()));
        Ok(())
    }

    fn create_document(
        &self,
        folder: &ObjectId,
        properties: PropertyMap,
        content: ContentStream,
        versioning: VersioningState,
    ) -> Result<Document, RepositoryError> {
        let mut store = self.store.lock();
        let series = Series {
            versions: vec![StoredVersion {
                label: VersionTag::initial(versioning.is_major()),
                properties: properties.clone(),
                content: content.into_data(),
            }],
            checked_out_by: None,
        };
        let node = store.insert_child(folder, &properties, NodeKind::Document(series))?;
        let path = node.path.clone();
        let id = node.id.clone();
        store.journal.push(RepositoryCall::CreateDocument(path));
        Store::view(store.node(&id)?, None)?.into_document()
    }

    fn check_out(&self, document: &ObjectId) -> Result<ObjectId, RepositoryError> {
        let mut store = self.store.lock();
        let (path, series) = store.series_mut(document)?;
        if let Some(owner) = &series.checked_out_by {
            return Err(RepositoryError::ContentConflict {
                target: path.to_string(),
                reason: format!("already checked out by {owner}"),
            });
        }
        series.checked_out_by = Some(self.user.clone());
        let bare = document.bare();
        store.journal.push(RepositoryCall::CheckOut(bare.clone()));
        Ok(ObjectId::versioned(&bare, &VersionTag::working_copy()))
    }

    fn check_in(
        &self,
        working_copy: &ObjectId,
        major: bool,
        properties: PropertyMap,
        content: ContentStream,
        _comment: &str,
    ) -> Result<ObjectId, RepositoryError> {
        let mut store = self.store.lock();
        let check_in_fault = store.faults.check_ins > 0;
        let (path, series) = store.series_mut(working_copy)?;
        let owner = match (&series.checked_out_by, working_copy.is_working_copy()) {
            (Some(owner), true) => owner.clone(),
            _ => {
                return Err(RepositoryError::ContentConflict {
                    target: working_copy.to_string(),
                    reason: "not a private working copy".into(),
                })
            }
        };
        if !self.may_override(&owner) {
            return Err(RepositoryError::PermissionDenied {
                target: path.to_string(),
                reason: format!("checked out by {owner}"),
            });
        }
        if check_in_fault {
            store.faults.check_ins -= 1;
            return Err(RepositoryError::Other(format!(
                "injected check-in failure on {working_copy}"
            )));
        }

        let (_, series) = store.series_mut(working_copy)?;
        let latest = series.latest()?;
        let label = latest.label.next(major).ok_or_else(|| RepositoryError::ContentConflict {
            target: working_copy.to_string(),
            reason: format!("cannot version past label {}", latest.label),
        })?;
        let mut merged = latest.properties.clone();
        merged.extend(properties);
        series.versions.push(StoredVersion {
            label: label.clone(),
            properties: merged,
            content: content.into_data(),
        });
        series.checked_out_by = None;

        let bare = working_copy.bare();
        store.journal.push(RepositoryCall::CheckIn(working_copy.clone()));
        Ok(ObjectId::versioned(&bare, &label))
    }

    fn cancel_check_out(&self, working_copy: &ObjectId) -> Result<(), RepositoryError> {
        let mut store = self.store.lock();
        let (path, series) = store.series_mut(working_copy)?;
        let owner = match (&series.checked_out_by, working_copy.is_working_copy()) {
            (Some(owner), true) => owner.clone(),
            _ => {
                return Err(RepositoryError::ContentConflict {
                    target: working_copy.to_string(),
                    reason: "not a private working copy".into(),
                })
            }
        };
        if !self.may_override(&owner) {
            return Err(RepositoryError::PermissionDenied {
                target: path.to_string(),
                reason: format!("checked out by {owner}"),
            });
        }
        series.checked_out_by = None;
        store.journal.push(RepositoryCall::CancelCheckOut(working_copy.clone()));
        Ok(())
    }

    fn create_folder(
        &self,
        parent: &ObjectId,
        properties: PropertyMap,
    ) -> Result<Folder, RepositoryError> {
        let mut store = self.store.lock();
        let node = store.insert_child(parent, &properties, NodeKind::Folder)?;
        let folder = Folder {
            id: node.id.clone(),
            name: node.name.clone(),
            path: node.path.clone(),
        };
        store.journal.push(RepositoryCall::CreateFolder(folder.path.clone()));
        Ok(folder)
    }

    fn get_all_versions(&self, document: &ObjectId) -> Result<Vec<VersionTag>, RepositoryError> {
        let mut store = self.store.lock();
        let (_, series) = store.series_mut(document)?;
        Ok(series.versions.iter().rev().map(|v| v.label.clone()).collect())
    }

    fn repository_name(&self) -> &str {
        "in-memory"
    }
}
