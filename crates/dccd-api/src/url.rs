//! Fetching deposited file bytes from data-service URLs.
//!
//! The data store hands out URLs for deposited file units; downloads read
//! the whole unit into memory before answering. Only `file://` URLs are
//! resolved here, which is what the backends produce.

use std::io;

/// Reads all bytes behind a data-service file URL.
pub fn to_byte_array(url: &str) -> io::Result<Vec<u8>> {
    let Some(path) = url.strip_prefix("file://") else {
        return Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("unsupported file url scheme: {url}"),
        ));
    };
    std::fs::read(path)
}
