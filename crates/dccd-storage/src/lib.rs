//! dccd-storage: service boundary of the DCCD archive
//!
//! Persistence, search indexing, and account management live in external
//! services; this crate defines the traits the core talks through and
//! ships in-memory reference backends.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{StorageError, StorageResult};
pub use memory::{MemoryArchiveStore, MemoryUserStore};
pub use traits::{
    DataStore, Organisation, ProjectHit, SearchRequest, SearchResult, SearchStore, SortField,
    UserStore,
};
