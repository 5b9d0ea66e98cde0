//! Shared test utilities for DCCD API tests.

// Constants/helpers are used across different test files, but each test
// binary is analyzed independently.
#![allow(dead_code)]

use std::io::Write;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use base64::engine::general_purpose;
use base64::Engine;
use tower::ServiceExt;

use dccd_api::http::{create_router, AppState};
use dccd_domain::{DccdUser, Role};
use dccd_server::ServerConfig;
use dccd_storage::{MemoryArchiveStore, MemoryUserStore};

pub type TestAppState = AppState<MemoryArchiveStore, MemoryArchiveStore, MemoryUserStore>;

/// Seeded owner account.
pub const OWNER: (&str, &str) = ("normaltestuser", "testtest");
/// Seeded admin account.
pub const ADMIN: (&str, &str) = ("admin", "adminpass");
/// Seeded unrelated member account.
pub const STRANGER: (&str, &str) = ("stranger", "pass");

/// Creates the shared backends with the standard test accounts.
pub fn create_test_backends() -> (Arc<MemoryArchiveStore>, Arc<MemoryUserStore>) {
    let archive = Arc::new(MemoryArchiveStore::new().unwrap());
    let users = Arc::new(MemoryUserStore::new());
    users.add_user(DccdUser::new(OWNER.0, "Normal Test User"), OWNER.1);
    let mut admin = DccdUser::new(ADMIN.0, "Admin");
    admin.roles.push(Role::Admin);
    users.add_user(admin, ADMIN.1);
    users.add_user(DccdUser::new(STRANGER.0, "Stranger"), STRANGER.1);
    (archive, users)
}

/// Creates a test app over the shared backends.
///
/// Each call creates a fresh router wrapping the shared stores, which is
/// the correct pattern for Axum's `oneshot` testing.
pub fn create_test_app(
    archive: &Arc<MemoryArchiveStore>,
    users: &Arc<MemoryUserStore>,
) -> axum::Router {
    let state = TestAppState::new(
        Arc::clone(archive),
        Arc::clone(archive),
        Arc::clone(users),
        ServerConfig::default(),
    );
    create_router(state)
}

/// `Authorization: Basic …` header value for a `(user, password)` pair.
pub fn basic_auth(credentials: (&str, &str)) -> String {
    let token =
        general_purpose::STANDARD.encode(format!("{}:{}", credentials.0, credentials.1));
    format!("Basic {token}")
}

/// Makes a GET request, optionally authenticated, and returns status and
/// body text.
pub async fn get(
    app: axum::Router,
    uri: &str,
    auth: Option<(&str, &str)>,
) -> (StatusCode, String) {
    get_with_accept(app, uri, auth, None).await
}

/// GET with an explicit `Accept` header.
pub async fn get_with_accept(
    app: axum::Router,
    uri: &str,
    auth: Option<(&str, &str)>,
    accept: Option<&str>,
) -> (StatusCode, String) {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(credentials) = auth {
        builder = builder.header(header::AUTHORIZATION, basic_auth(credentials));
    }
    if let Some(accept) = accept {
        builder = builder.header(header::ACCEPT, accept);
    }
    let response = app
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8_lossy(&bytes).into_owned())
}

/// Makes a DELETE request and returns status and body text.
pub async fn delete(
    app: axum::Router,
    uri: &str,
    auth: Option<(&str, &str)>,
) -> (StatusCode, String) {
    let mut builder = Request::builder().method("DELETE").uri(uri);
    if let Some(credentials) = auth {
        builder = builder.header(header::AUTHORIZATION, basic_auth(credentials));
    }
    let response = app
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8_lossy(&bytes).into_owned())
}

/// Posts a multipart upload with a single `file` part.
pub async fn post_upload(
    app: axum::Router,
    uri: &str,
    auth: Option<(&str, &str)>,
    file_bytes: &[u8],
) -> (StatusCode, String) {
    const BOUNDARY: &str = "dccd-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        b"Content-Disposition: form-data; name=\"file\"; filename=\"bundle.zip\"\r\n",
    );
    body.extend_from_slice(b"Content-Type: application/zip\r\n\r\n");
    body.extend_from_slice(file_bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some(credentials) = auth {
        builder = builder.header(header::AUTHORIZATION, basic_auth(credentials));
    }
    let response = app
        .oneshot(builder.body(Body::from(body)).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8_lossy(&bytes).into_owned())
}

/// Builds a zip archive from `(entry name, content)` pairs.
pub fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut buffer = std::io::Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut buffer);
        let options = zip::write::FileOptions::default();
        for (name, content) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(content).unwrap();
        }
        writer.finish().unwrap();
    }
    buffer.into_inner()
}

/// TRiDaS document with two measurement series, one referencing a raw
/// Heidelberg file.
pub const TRIDAS_TWO_SERIES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project>
  <title>Test survey</title>
  <category>archaeology</category>
  <object>
    <title>Barn</title>
    <type>building</type>
    <element>
      <title>Beam</title>
      <taxon>Quercus</taxon>
      <sample>
        <radius>
          <measurementSeries>
            <title>With data file</title>
            <genericField name="dccd.treeRingDataFile">beam1.fh</genericField>
            <values>
              <variable>ring width</variable>
              <unit>1/100 mm</unit>
            </values>
          </measurementSeries>
          <measurementSeries>
            <title>Without data file</title>
          </measurementSeries>
        </radius>
      </sample>
    </element>
  </object>
</project>
"#;

/// Heidelberg raw file with one value group of three readings.
pub const HEIDELBERG_ONE_GROUP: &str =
    "HEADER:\nKeyCode=BEAM1\nDataFormat=Tree\nUnit=1/100 mm\nDATA:Single\n 53 60 71 0\n";

/// A complete, importable bundle zip.
pub fn standard_bundle_zip() -> Vec<u8> {
    build_zip(&[
        ("proj/metadata.xml", b"<dccdmetadata/>".as_slice()),
        ("proj/data/tridas.xml", TRIDAS_TWO_SERIES.as_bytes()),
        ("proj/data/values/beam1.fh", HEIDELBERG_ONE_GROUP.as_bytes()),
    ])
}
