//! In-memory service backends for testing and single-node deployments.
//!
//! `MemoryArchiveStore` covers both the data store and the search index:
//! storing a project also (re)indexes its summary, the way the production
//! archive's indexer follows the repository. Deposited file bytes are
//! spooled to a temporary directory so `get_file_url` can hand out real
//! `file://` URLs.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tracing::{debug, instrument};

use dccd_domain::{DccdUser, Project};

use crate::error::{StorageError, StorageResult};
use crate::traits::{
    DataStore, Organisation, ProjectHit, SearchRequest, SearchResult, SearchStore, SortField,
    UserStore,
};

/// In-memory implementation of [`DataStore`] and [`SearchStore`].
#[derive(Debug)]
pub struct MemoryArchiveStore {
    projects: DashMap<String, Project>,
    hits: DashMap<String, ProjectHit>,
    next_id: AtomicU64,
    /// Spool directory for deposited file bytes; removed on drop.
    files_root: tempfile::TempDir,
}

impl MemoryArchiveStore {
    /// Creates a new in-memory archive store.
    pub fn new() -> StorageResult<Self> {
        let files_root = tempfile::Builder::new()
            .prefix("dccd-store-files")
            .tempdir()
            .map_err(|e| StorageError::InternalError {
                message: format!("cannot create file spool dir: {e}"),
            })?;
        Ok(Self {
            projects: DashMap::new(),
            hits: DashMap::new(),
            next_id: AtomicU64::new(1),
            files_root,
        })
    }

    fn sid_dir_name(sid: &str) -> String {
        sid.replace(':', "_")
    }

    fn spool_files(&self, project: &Project) -> StorageResult<()> {
        let base = self.files_root.path().join(Self::sid_dir_name(&project.sid));
        for unit in project
            .original_files
            .iter()
            .chain(project.associated_files.iter())
        {
            let dir = base.join(&unit.unit_id);
            std::fs::create_dir_all(&dir).map_err(spool_error)?;
            std::fs::write(dir.join(&unit.file_name), &unit.content).map_err(spool_error)?;
        }
        Ok(())
    }

    /// Numeric suffix of a `dccd:<n>` identifier, for stable sid ordering.
    fn sid_ordinal(sid: &str) -> u64 {
        sid.rsplit(':').next().and_then(|n| n.parse().ok()).unwrap_or(u64::MAX)
    }
}

fn spool_error(e: std::io::Error) -> StorageError {
    StorageError::InternalError {
        message: format!("file spool error: {e}"),
    }
}

#[async_trait]
impl DataStore for MemoryArchiveStore {
    #[instrument(skip(self, project), fields(title = %project.title))]
    async fn store_project(&self, project: &mut Project) -> StorageResult<String> {
        if project.sid.is_empty() {
            let n = self.next_id.fetch_add(1, Ordering::SeqCst);
            project.sid = format!("dccd:{n}");
        }
        self.spool_files(project)?;

        let hit = ProjectHit::from_project(project, Utc::now());
        debug!(sid = %project.sid, "indexing stored project");
        self.hits.insert(project.sid.clone(), hit);
        self.projects.insert(project.sid.clone(), project.clone());
        Ok(project.sid.clone())
    }

    async fn get_project(&self, sid: &str) -> StorageResult<Project> {
        self.projects
            .get(sid)
            .map(|p| p.value().clone())
            .ok_or_else(|| StorageError::ProjectNotFound {
                sid: sid.to_string(),
            })
    }

    async fn delete_project(&self, sid: &str, acting_user: &DccdUser) -> StorageResult<()> {
        let project = self.get_project(sid).await?;
        if !(acting_user.is_admin() || acting_user.id == project.owner_id) {
            return Err(StorageError::NotAllowed {
                message: format!("user {} may not delete {sid}", acting_user.id),
            });
        }
        self.projects.remove(sid);
        self.hits.remove(sid);
        // spooled bytes are disposable; removal failure is harmless
        let _ = std::fs::remove_dir_all(self.files_root.path().join(Self::sid_dir_name(sid)));
        Ok(())
    }

    async fn get_file_url(&self, sid: &str, unit_id: &str) -> StorageResult<String> {
        let project = self.get_project(sid).await?;
        let unit = project
            .original_files
            .iter()
            .chain(project.associated_files.iter())
            .find(|u| u.unit_id == unit_id)
            .ok_or_else(|| StorageError::FileUnitNotFound {
                sid: sid.to_string(),
                unit_id: unit_id.to_string(),
            })?;
        let path = self
            .files_root
            .path()
            .join(Self::sid_dir_name(sid))
            .join(&unit.unit_id)
            .join(&unit.file_name);
        Ok(format!("file://{}", path.display()))
    }
}

#[async_trait]
impl SearchStore for MemoryArchiveStore {
    async fn search(&self, request: &SearchRequest) -> StorageResult<SearchResult<ProjectHit>> {
        let mut matches: Vec<ProjectHit> = self
            .hits
            .iter()
            .map(|h| h.value().clone())
            .filter(|hit| matches_request(hit, request))
            .collect();

        match request.sort {
            SortField::Sid => {
                matches.sort_by_key(|h| Self::sid_ordinal(&h.sid));
            }
            SortField::StateChanged => {
                matches.sort_by(|a, b| b.state_changed.cmp(&a.state_changed));
            }
        }

        let total_hits = matches.len();
        let hits = matches
            .into_iter()
            .skip(request.offset)
            .take(request.limit)
            .collect();
        Ok(SearchResult {
            hits,
            total_hits,
            offset: request.offset,
        })
    }
}

fn matches_request(hit: &ProjectHit, request: &SearchRequest) -> bool {
    if let Some(sid) = &request.sid {
        if &hit.sid != sid {
            return false;
        }
    }
    if let Some(owner) = &request.owner_id {
        if &hit.owner_id != owner {
            return false;
        }
    }
    if !request.states.is_empty() && !request.states.contains(&hit.state) {
        return false;
    }
    if let Some(from) = request.modified_from {
        if hit.state_changed < from {
            return false;
        }
    }
    if let Some(until) = request.modified_until {
        if hit.state_changed > until {
            return false;
        }
    }
    if let Some(category) = &request.category {
        if hit.category.as_deref() != Some(category.as_str()) {
            return false;
        }
    }
    if let Some(object_type) = &request.object_type {
        if !hit.object_types.iter().any(|t| t == object_type) {
            return false;
        }
    }
    if let Some(taxon) = &request.element_taxon {
        if !hit.element_taxons.iter().any(|t| t == taxon) {
            return false;
        }
    }
    if let Some(query) = request.query.as_deref().filter(|q| !q.is_empty()) {
        let query = query.to_lowercase();
        let in_title = hit.title.to_lowercase().contains(&query);
        let in_description = hit
            .description
            .as_deref()
            .map(|d| d.to_lowercase().contains(&query))
            .unwrap_or(false);
        if !in_title && !in_description {
            return false;
        }
    }
    true
}

#[derive(Debug, Clone)]
struct MemoryAccount {
    user: DccdUser,
    password: String,
}

/// In-memory implementation of [`UserStore`].
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    accounts: DashMap<String, MemoryAccount>,
    organisations: DashMap<String, Organisation>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an account with a plain-text test credential.
    pub fn add_user(&self, user: DccdUser, password: impl Into<String>) {
        self.accounts.insert(
            user.id.clone(),
            MemoryAccount {
                user,
                password: password.into(),
            },
        );
    }

    pub fn add_organisation(&self, organisation: Organisation) {
        self.organisations
            .insert(organisation.id.clone(), organisation);
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> StorageResult<Option<DccdUser>> {
        Ok(self
            .accounts
            .get(username)
            .filter(|a| a.password == password)
            .map(|a| a.user.clone()))
    }

    async fn get_user(&self, user_id: &str) -> StorageResult<DccdUser> {
        self.accounts
            .get(user_id)
            .map(|a| a.user.clone())
            .ok_or_else(|| StorageError::UserNotFound {
                user_id: user_id.to_string(),
            })
    }

    async fn list_users(&self) -> StorageResult<Vec<DccdUser>> {
        let mut users: Vec<DccdUser> = self.accounts.iter().map(|a| a.user.clone()).collect();
        users.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(users)
    }

    async fn list_organisations(&self) -> StorageResult<Vec<Organisation>> {
        let mut organisations: Vec<Organisation> =
            self.organisations.iter().map(|o| o.value().clone()).collect();
        organisations.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(organisations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dccd_domain::tridas::TridasProject;
    use dccd_domain::{DatasetState, FileUnit};

    fn project(title: &str, owner: &str) -> Project {
        let tridas = TridasProject {
            title: title.into(),
            ..Default::default()
        };
        Project::from_tridas(tridas, owner)
    }

    #[tokio::test]
    async fn test_store_assigns_sequential_sids() {
        let store = MemoryArchiveStore::new().unwrap();
        let mut a = project("A", "alice");
        let mut b = project("B", "alice");

        assert_eq!(store.store_project(&mut a).await.unwrap(), "dccd:1");
        assert_eq!(store.store_project(&mut b).await.unwrap(), "dccd:2");

        // re-storing keeps the assigned sid
        assert_eq!(store.store_project(&mut a).await.unwrap(), "dccd:1");
    }

    #[tokio::test]
    async fn test_get_file_url_serves_spooled_bytes() {
        let store = MemoryArchiveStore::new().unwrap();
        let mut p = project("A", "alice");
        p.original_files.push(FileUnit {
            file_name: "tridas.xml".into(),
            unit_id: "OF1".into(),
            content: b"<project/>".to_vec(),
        });
        let sid = store.store_project(&mut p).await.unwrap();

        let url = store.get_file_url(&sid, "OF1").await.unwrap();
        let path = url.strip_prefix("file://").unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"<project/>");

        let missing = store.get_file_url(&sid, "OF9").await;
        assert!(matches!(
            missing,
            Err(StorageError::FileUnitNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_delete_requires_owner_or_admin() {
        let store = MemoryArchiveStore::new().unwrap();
        let mut p = project("A", "alice");
        let sid = store.store_project(&mut p).await.unwrap();

        let bob = DccdUser::new("bob", "Bob");
        assert!(matches!(
            store.delete_project(&sid, &bob).await,
            Err(StorageError::NotAllowed { .. })
        ));

        let alice = DccdUser::new("alice", "Alice");
        store.delete_project(&sid, &alice).await.unwrap();
        assert!(matches!(
            store.get_project(&sid).await,
            Err(StorageError::ProjectNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_search_filters_owner_and_state() {
        let store = MemoryArchiveStore::new().unwrap();
        let mut a = project("Roman fort", "alice");
        a.state = DatasetState::Published;
        let mut b = project("Medieval barn", "bob");
        b.state = DatasetState::Draft;
        store.store_project(&mut a).await.unwrap();
        store.store_project(&mut b).await.unwrap();

        let mut request = SearchRequest::new();
        request.states = vec![DatasetState::Published];
        let result = store.search(&request).await.unwrap();
        assert_eq!(result.total_hits, 1);
        assert_eq!(result.hits[0].title, "Roman fort");

        let mut request = SearchRequest::new();
        request.owner_id = Some("bob".into());
        let result = store.search(&request).await.unwrap();
        assert_eq!(result.total_hits, 1);
        assert_eq!(result.hits[0].title, "Medieval barn");
    }

    #[tokio::test]
    async fn test_search_free_text_and_paging() {
        let store = MemoryArchiveStore::new().unwrap();
        for i in 0..5 {
            let mut p = project(&format!("Fort {i}"), "alice");
            store.store_project(&mut p).await.unwrap();
        }

        let mut request = SearchRequest::new();
        request.query = Some("fort".into());
        request.offset = 2;
        request.limit = 2;
        let result = store.search(&request).await.unwrap();
        assert_eq!(result.total_hits, 5);
        assert_eq!(result.hits.len(), 2);
        assert_eq!(result.hits[0].sid, "dccd:3");
    }

    #[tokio::test]
    async fn test_user_store_authentication() {
        let users = MemoryUserStore::new();
        users.add_user(DccdUser::new("alice", "Alice"), "secret");

        assert!(users
            .authenticate("alice", "secret")
            .await
            .unwrap()
            .is_some());
        assert!(users.authenticate("alice", "wrong").await.unwrap().is_none());
        assert!(users.authenticate("carol", "secret").await.unwrap().is_none());
    }
}
