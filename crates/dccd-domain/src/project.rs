//! The archived project aggregate.
//!
//! A `Project` owns a TRiDaS document, its flattened entity index, the
//! binary files deposited with it, and its permission metadata. It is
//! created by parsing an uploaded TRiDaS document, mutated by the import
//! value-merge, and persisted through the data store.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::entities::EntityTree;
use crate::error::{DomainError, DomainResult};
use crate::permission::{ProjectPermissionLevel, ProjectPermissionMetadata};
use crate::tridas::{self, TridasProject};
use crate::user::DccdUser;

/// Generic-field name marking an external raw-data file reference on a
/// series; its value is the file name to look up in the bundle.
pub const DATAFILE_INDICATOR: &str = "dccd.treeRingDataFile";

/// Name the indicator field is rewritten to once its file has been
/// imported, so the series is not matched again on a later pass.
pub const DATAFILE_INDICATOR_UPLOADED: &str = "dccd.treeRingDataFileUploaded";

/// Whether a generic-field name marks a tree-ring raw-data file reference.
pub fn is_tree_ring_data_file_indicator(name: &str) -> bool {
    name == DATAFILE_INDICATOR
}

/// Administrative state of an archived project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DatasetState {
    Draft,
    Published,
}

impl DatasetState {
    pub fn as_str(self) -> &'static str {
        match self {
            DatasetState::Draft => "DRAFT",
            DatasetState::Published => "PUBLISHED",
        }
    }
}

/// A binary file deposited with a project, addressed by its unit id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUnit {
    pub file_name: String,
    pub unit_id: String,
    pub content: Vec<u8>,
}

/// The project aggregate.
#[derive(Debug, Clone)]
pub struct Project {
    /// Store identifier (`dccd:<n>`), empty until persisted.
    pub sid: String,
    pub title: String,
    pub owner_id: String,
    /// Main language of the TRiDaS text content.
    pub language: String,
    /// Name of the uploaded TRiDaS file.
    pub file_name: String,
    pub state: DatasetState,
    pub tridas: TridasProject,
    pub entity_tree: EntityTree,
    pub original_files: Vec<FileUnit>,
    pub associated_files: Vec<FileUnit>,
    pub permission: ProjectPermissionMetadata,
}

impl Project {
    /// Creates a project from a parsed TRiDaS document.
    pub fn from_tridas(tridas: TridasProject, owner_id: impl Into<String>) -> Self {
        let entity_tree = EntityTree::build(&tridas);
        Self {
            sid: String::new(),
            title: tridas.title.clone(),
            owner_id: owner_id.into(),
            language: "en".to_string(),
            file_name: String::new(),
            state: DatasetState::Draft,
            tridas,
            entity_tree,
            original_files: Vec::new(),
            associated_files: Vec::new(),
            permission: ProjectPermissionMetadata::default(),
        }
    }

    /// Parses TRiDaS XML text into a new project.
    pub fn from_tridas_xml(xml: &str, owner_id: &str) -> DomainResult<Self> {
        let tridas = tridas::parse_project(xml)?;
        if tridas.title.is_empty() {
            return Err(DomainError::MissingField {
                field: "project/title".to_string(),
            });
        }
        Ok(Self::from_tridas(tridas, owner_id))
    }

    /// Recreates the entity index from the (possibly changed) document.
    pub fn rebuild_entity_tree(&mut self) {
        self.entity_tree.rebuild(&self.tridas);
    }

    /// Registers a raw source file (TRiDaS or value file) as an original
    /// file of this project, reading its bytes from disk.
    pub fn add_original_file(&mut self, path: &Path) -> DomainResult<()> {
        let unit = self.read_file_unit(path, "OF", self.original_files.len())?;
        self.original_files.push(unit);
        Ok(())
    }

    /// Registers an associated file (documentation, photos) with this
    /// project, reading its bytes from disk.
    pub fn add_associated_file(&mut self, path: &Path) -> DomainResult<()> {
        let unit = self.read_file_unit(path, "AF", self.associated_files.len())?;
        self.associated_files.push(unit);
        Ok(())
    }

    fn read_file_unit(&self, path: &Path, prefix: &str, index: usize) -> DomainResult<FileUnit> {
        let content = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(FileUnit {
            file_name,
            unit_id: format!("{prefix}{}", index + 1),
            content,
        })
    }

    /// File names the TRiDaS document expects to find in the bundle's
    /// `associated/` folder: every plain (non-URL) file reference on the
    /// project or any of its objects.
    pub fn expected_associated_file_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        collect_plain_file_refs(&self.tridas, &mut names);
        names
    }

    /// Whether `user` may see this project at all.
    pub fn is_viewing_allowed(&self, user: &DccdUser) -> bool {
        user.is_admin() || user.id == self.owner_id || self.state == DatasetState::Published
    }

    /// Whether `user` may download the full project data. Anyone granted
    /// the finest permission level sees everything anyway.
    pub fn is_download_allowed(&self, user: &DccdUser) -> bool {
        self.effective_permission_level(user) == ProjectPermissionLevel::Values
    }

    /// The permission level effectively granted to `user` on this project.
    pub fn effective_permission_level(&self, user: &DccdUser) -> ProjectPermissionLevel {
        if user.is_admin() || user.id == self.owner_id {
            ProjectPermissionLevel::Values
        } else {
            self.permission.effective_level(&user.id)
        }
    }
}

fn collect_plain_file_refs(tridas: &TridasProject, names: &mut Vec<String>) {
    for file in &tridas.files {
        push_plain_ref(&file.href, names);
    }
    fn walk_object(object: &crate::tridas::TridasObject, names: &mut Vec<String>) {
        for file in &object.files {
            push_plain_ref(&file.href, names);
        }
        for sub in &object.objects {
            walk_object(sub, names);
        }
    }
    for object in &tridas.objects {
        walk_object(object, names);
    }
}

fn push_plain_ref(href: &str, names: &mut Vec<String>) {
    // absolute URLs point outside the bundle and are not deposited
    if !href.contains("://") && !href.is_empty() {
        names.push(href.to_string());
    }
}
