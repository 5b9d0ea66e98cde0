//! dccd-server: configuration and import pipeline of the DCCD archive.

pub mod config;
pub mod handlers;

pub use config::{ImportSettings, LoggingSettings, ServerConfig, ServerSettings};
pub use handlers::import::{ImportError, ProjectImporter};
