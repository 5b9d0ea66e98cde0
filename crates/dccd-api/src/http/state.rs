//! Application state for HTTP handlers.

use std::sync::Arc;

use dccd_server::{ProjectImporter, ServerConfig};
use dccd_storage::{DataStore, SearchStore, UserStore};

/// Application state shared across all HTTP handlers.
///
/// # Type Parameters
///
/// * `D` - The archival data store
/// * `S` - The project search index
/// * `U` - The user service
#[derive(Clone)]
pub struct AppState<D: DataStore, S: SearchStore, U: UserStore> {
    /// The archival data store.
    pub data: Arc<D>,
    /// The project search index.
    pub search: Arc<S>,
    /// The user service.
    pub users: Arc<U>,
    /// The import pipeline, bound to the data store.
    pub importer: Arc<ProjectImporter<D>>,
    /// Service configuration.
    pub config: ServerConfig,
}

impl<D: DataStore, S: SearchStore, U: UserStore> AppState<D, S, U> {
    /// Creates a new application state over the given service backends.
    pub fn new(data: Arc<D>, search: Arc<S>, users: Arc<U>, config: ServerConfig) -> Self {
        let importer = Arc::new(ProjectImporter::new(
            Arc::clone(&data),
            config.import.clone(),
        ));
        Self {
            data,
            search,
            users,
            importer,
            config,
        }
    }
}
