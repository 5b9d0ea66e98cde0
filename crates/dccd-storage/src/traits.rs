//! Service boundary trait definitions.
//!
//! The production archive delegates persistence, search indexing, and
//! account management to external services. The core talks to them only
//! through these traits; implementations must be thread-safe and support
//! async operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use dccd_domain::tridas::TridasObject;
use dccd_domain::{DatasetState, DccdUser, Project, ProjectPermissionLevel};

use crate::error::StorageResult;

/// Sort key for search results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    /// Store identifier, ascending (stable listing order).
    Sid,
    /// Last administrative state change, newest first (harvesting order).
    StateChanged,
}

/// A project as seen through the search index.
#[derive(Debug, Clone)]
pub struct ProjectHit {
    pub sid: String,
    pub title: String,
    pub owner_id: String,
    pub state: DatasetState,
    pub state_changed: DateTime<Utc>,
    pub language: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub object_types: Vec<String>,
    pub element_taxons: Vec<String>,
    pub permission_default_level: ProjectPermissionLevel,
}

impl ProjectHit {
    /// Derives the indexable summary from a project aggregate.
    pub fn from_project(project: &Project, state_changed: DateTime<Utc>) -> Self {
        let mut object_types = Vec::new();
        let mut element_taxons = Vec::new();
        fn walk(object: &TridasObject, types: &mut Vec<String>, taxons: &mut Vec<String>) {
            if let Some(t) = &object.object_type {
                if !types.contains(t) {
                    types.push(t.clone());
                }
            }
            for element in &object.elements {
                if let Some(taxon) = &element.taxon {
                    if !taxons.contains(taxon) {
                        taxons.push(taxon.clone());
                    }
                }
            }
            for sub in &object.objects {
                walk(sub, types, taxons);
            }
        }
        for object in &project.tridas.objects {
            walk(object, &mut object_types, &mut element_taxons);
        }

        Self {
            sid: project.sid.clone(),
            title: project.title.clone(),
            owner_id: project.owner_id.clone(),
            state: project.state,
            state_changed,
            language: project.language.clone(),
            category: project.tridas.category.clone(),
            description: project.tridas.description.clone(),
            object_types,
            element_taxons,
            permission_default_level: project.permission.default_level,
        }
    }
}

/// A search query against the project index.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    /// Free-text query over title and description.
    pub query: Option<String>,
    pub offset: usize,
    pub limit: usize,
    /// Restrict results to this owner.
    pub owner_id: Option<String>,
    /// Restrict results to one store identifier.
    pub sid: Option<String>,
    /// Restrict results to these administrative states (empty = all).
    pub states: Vec<DatasetState>,
    pub modified_from: Option<DateTime<Utc>>,
    pub modified_until: Option<DateTime<Utc>>,
    pub category: Option<String>,
    pub object_type: Option<String>,
    pub element_taxon: Option<String>,
    pub sort: SortField,
}

impl SearchRequest {
    pub fn new() -> Self {
        Self {
            query: None,
            offset: 0,
            limit: 10,
            owner_id: None,
            sid: None,
            states: Vec::new(),
            modified_from: None,
            modified_until: None,
            category: None,
            object_type: None,
            element_taxon: None,
            sort: SortField::Sid,
        }
    }
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self::new()
    }
}

/// A page of search results.
#[derive(Debug, Clone)]
pub struct SearchResult<T> {
    pub hits: Vec<T>,
    pub total_hits: usize,
    pub offset: usize,
}

/// An organisation registered with the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Organisation {
    pub id: String,
    pub city: Option<String>,
    pub country: Option<String>,
}

/// Archival persistence for projects and their deposited files.
#[async_trait]
pub trait DataStore: Send + Sync + 'static {
    /// Persists a project, assigning its store identifier when new.
    /// Returns the identifier.
    async fn store_project(&self, project: &mut Project) -> StorageResult<String>;

    /// Fetches a project by store identifier.
    async fn get_project(&self, sid: &str) -> StorageResult<Project>;

    /// Deletes a project on behalf of `acting_user` (owner or admin).
    async fn delete_project(&self, sid: &str, acting_user: &DccdUser) -> StorageResult<()>;

    /// Resolves the URL under which a deposited file unit can be fetched.
    async fn get_file_url(&self, sid: &str, unit_id: &str) -> StorageResult<String>;
}

/// Query access to the project search index.
#[async_trait]
pub trait SearchStore: Send + Sync + 'static {
    async fn search(&self, request: &SearchRequest) -> StorageResult<SearchResult<ProjectHit>>;
}

/// Account lookup and credential verification.
#[async_trait]
pub trait UserStore: Send + Sync + 'static {
    /// Verifies credentials; `None` means authentication failed.
    async fn authenticate(&self, username: &str, password: &str)
        -> StorageResult<Option<DccdUser>>;

    async fn get_user(&self, user_id: &str) -> StorageResult<DccdUser>;

    async fn list_users(&self) -> StorageResult<Vec<DccdUser>>;

    async fn list_organisations(&self) -> StorageResult<Vec<Organisation>>;
}
