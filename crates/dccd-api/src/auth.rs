//! HTTP Basic authentication against the user service.

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use base64::engine::general_purpose;
use base64::Engine;

use dccd_domain::DccdUser;
use dccd_storage::{StorageResult, UserStore};

const AUTHENTICATION_TYPE: &str = "Basic ";
const AUTHENTICATION_SEPARATOR: char = ':';

/// Uses the credentials in the request headers to authenticate the user.
///
/// Returns `None` when no usable `Authorization` header is present or the
/// credentials do not verify; service failures propagate.
pub async fn authenticate<U: UserStore>(
    headers: &HeaderMap,
    users: &U,
) -> StorageResult<Option<DccdUser>> {
    let Some((username, password)) = decode_basic_credentials(headers) else {
        return Ok(None);
    };
    users.authenticate(&username, &password).await
}

fn decode_basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let header = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let encoded = header.strip_prefix(AUTHENTICATION_TYPE)?;
    let decoded = general_purpose::STANDARD.decode(encoded).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(AUTHENTICATION_SEPARATOR)?;
    Some((username.to_string(), password.to_string()))
}
