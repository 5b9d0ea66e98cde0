//! dccd-api: HTTP REST surface of the DCCD archive.
//!
//! Resource handlers over the service boundary traits, with XML/JSON
//! content negotiation and HTTP Basic authentication.

pub mod auth;
pub mod http;
pub mod json;
pub mod url;
pub mod xml;
