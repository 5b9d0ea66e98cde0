//! HTTP route definitions and handlers.
//!
//! | Endpoint | Method | Description |
//! |----------|--------|-------------|
//! | `/projects` | GET | List published projects |
//! | `/projects/{sid}` | GET | Open-access project summary |
//! | `/projects/{sid}/tridas` | GET | Full TRiDaS download (restricted) |
//! | `/projects/{sid}/tridas/{level}` | GET | TRiDaS download at requested level |
//! | `/projects/{sid}/associated` | GET | List associated files |
//! | `/projects/{sid}/associated/{filename}` | GET | Download associated file |
//! | `/projects/{sid}/originalvalues` | GET | List original files |
//! | `/projects/{sid}/originalvalues/{filename}` | GET | Download original file |
//! | `/projects/{sid}/permission` | GET | Permission metadata (owner/admin) |
//! | `/myprojects` | GET | List own projects (incl. drafts) |
//! | `/myprojects` | POST | Import an uploaded bundle |
//! | `/myprojects/query` | GET | Search own projects |
//! | `/myprojects/{sid}` | GET | Own project summary |
//! | `/myprojects/{sid}` | DELETE | Delete own project |
//! | `/users` | GET | List members (admin) |
//! | `/users/{id}` | GET | Member details (admin or self) |
//! | `/organisations` | GET | List organisations |
//! | `/health` | GET | Liveness check |

use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::TempDir;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info};

use dccd_domain::tridas::restrict::{PermissionRestrictor, RequestedLevelRestrictor};
use dccd_domain::{tridas, DatasetState, DccdUser, FileUnit, ProjectPermissionLevel};
use dccd_server::handlers::bundle::{self, BundleError};
use dccd_server::ImportError;
use dccd_storage::{
    DataStore, Organisation, SearchRequest, SearchStore, SortField, StorageError, UserStore,
};

use super::state::AppState;
use crate::json::xml_to_json;
use crate::{auth, url, xml};

/// Default page size for listings.
pub const DEFAULT_LIST_LIMIT: usize = 10;

/// Creates the HTTP router with all archive endpoints.
pub fn create_router<D, S, U>(state: AppState<D, S, U>) -> Router
where
    D: DataStore,
    S: SearchStore,
    U: UserStore,
{
    let body_limit = state.config.server.body_limit_bytes;
    let shared_state = Arc::new(state);
    Router::new()
        .route("/projects", get(list_projects::<D, S, U>))
        .route("/projects/:sid", get(get_project::<D, S, U>))
        .route("/projects/:sid/tridas", get(get_project_tridas::<D, S, U>))
        .route(
            "/projects/:sid/tridas/:level",
            get(get_project_tridas_at_level::<D, S, U>),
        )
        .route(
            "/projects/:sid/associated",
            get(list_associated_files::<D, S, U>),
        )
        .route(
            "/projects/:sid/associated/:filename",
            get(get_associated_file::<D, S, U>),
        )
        .route(
            "/projects/:sid/originalvalues",
            get(list_original_files::<D, S, U>),
        )
        .route(
            "/projects/:sid/originalvalues/:filename",
            get(get_original_file::<D, S, U>),
        )
        .route("/projects/:sid/permission", get(get_permission::<D, S, U>))
        .route(
            "/myprojects",
            get(list_my_projects::<D, S, U>).post(upload_project::<D, S, U>),
        )
        .route("/myprojects/query", get(query_my_projects::<D, S, U>))
        .route(
            "/myprojects/:sid",
            get(get_my_project::<D, S, U>).delete(delete_my_project::<D, S, U>),
        )
        .route("/users", get(list_users::<D, S, U>))
        .route("/users/:id", get(get_user::<D, S, U>))
        .route("/organisations", get(list_organisations::<D, S, U>))
        .route("/health", get(health_check))
        .with_state(shared_state)
        // raise axum's extractor default as well, or uploads would still
        // be cut off at 2MB before this layer sees them
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
        .layer(RequestBodyLimitLayer::new(body_limit))
}

// ============================================================
// Error Handling
// ============================================================

/// Archive error codes; each maps to an HTTP status via
/// [`ApiError::into_response`].
pub mod error_codes {
    // 404 Not Found
    pub const PROJECT_NOT_FOUND: &str = "project_not_found";
    pub const FILE_NOT_FOUND: &str = "file_not_found";
    pub const USER_NOT_FOUND: &str = "user_not_found";
    pub const LEVEL_NOT_FOUND: &str = "level_not_found";

    // 401 Unauthorized / 403 Forbidden
    pub const UNAUTHORIZED: &str = "unauthorized";
    pub const NOT_ALLOWED: &str = "not_allowed";

    // 400 Bad Request
    pub const VALIDATION_ERROR: &str = "validation_error";
    pub const IMPORT_FAILED: &str = "import_failed";

    // 5xx
    pub const SERVICE_UNAVAILABLE: &str = "service_unavailable";
    pub const INTERNAL_ERROR: &str = "internal_error";
}

/// API error response format.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn project_not_found(message: impl Into<String>) -> Self {
        Self::new(error_codes::PROJECT_NOT_FOUND, message)
    }

    pub fn file_not_found(message: impl Into<String>) -> Self {
        Self::new(error_codes::FILE_NOT_FOUND, message)
    }

    pub fn user_not_found(message: impl Into<String>) -> Self {
        Self::new(error_codes::USER_NOT_FOUND, message)
    }

    pub fn level_not_found(message: impl Into<String>) -> Self {
        Self::new(error_codes::LEVEL_NOT_FOUND, message)
    }

    pub fn unauthorized() -> Self {
        Self::new(error_codes::UNAUTHORIZED, "authentication required")
    }

    pub fn not_allowed(message: impl Into<String>) -> Self {
        Self::new(error_codes::NOT_ALLOWED, message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new(error_codes::VALIDATION_ERROR, message)
    }

    pub fn import_failed(message: impl Into<String>) -> Self {
        Self::new(error_codes::IMPORT_FAILED, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(error_codes::SERVICE_UNAVAILABLE, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(error_codes::INTERNAL_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        use error_codes::*;

        let status = match self.code.as_str() {
            PROJECT_NOT_FOUND | FILE_NOT_FOUND | USER_NOT_FOUND | LEVEL_NOT_FOUND => {
                StatusCode::NOT_FOUND
            }
            UNAUTHORIZED => StatusCode::UNAUTHORIZED,
            NOT_ALLOWED => StatusCode::FORBIDDEN,
            VALIDATION_ERROR | IMPORT_FAILED => StatusCode::BAD_REQUEST,
            SERVICE_UNAVAILABLE => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match &err {
            StorageError::ProjectNotFound { .. } => ApiError::project_not_found("project not found"),
            StorageError::FileUnitNotFound { .. } => ApiError::file_not_found("file not found"),
            StorageError::UserNotFound { .. } => ApiError::user_not_found("user not found"),
            StorageError::NotAllowed { message } => ApiError::not_allowed(message.clone()),
            StorageError::InvalidInput { message } => ApiError::validation_error(message.clone()),
            StorageError::ConnectionError { .. } => {
                error!("Service unavailable: {}", err);
                ApiError::service_unavailable("archive backend unavailable")
            }
            StorageError::InternalError { .. } => {
                error!("Storage error: {}", err);
                ApiError::internal_error("internal archive error")
            }
        }
    }
}

impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::Store(storage) => ApiError::from(storage),
            ImportError::AuditLog { message } => {
                // the project is already stored at this point
                error!("Import audit log failure: {}", message);
                ApiError::internal_error("failed to log project import")
            }
            ImportError::Io(e) => {
                error!("Import I/O failure: {}", e);
                ApiError::internal_error("import failed on file access")
            }
            other => ApiError::import_failed(other.to_string()),
        }
    }
}

impl From<BundleError> for ApiError {
    fn from(err: BundleError) -> Self {
        match err {
            BundleError::Io(e) => {
                error!("Bundle I/O failure: {}", e);
                ApiError::internal_error("upload handling failed")
            }
            other => ApiError::import_failed(other.to_string()),
        }
    }
}

type ApiResult<T> = Result<T, ApiError>;

// ============================================================
// Authentication and content negotiation
// ============================================================

async fn authenticated_user<D, S, U>(
    headers: &HeaderMap,
    state: &AppState<D, S, U>,
) -> ApiResult<Option<DccdUser>>
where
    D: DataStore,
    S: SearchStore,
    U: UserStore,
{
    auth::authenticate(headers, state.users.as_ref())
        .await
        .map_err(ApiError::from)
}

async fn require_user<D, S, U>(
    headers: &HeaderMap,
    state: &AppState<D, S, U>,
) -> ApiResult<DccdUser>
where
    D: DataStore,
    S: SearchStore,
    U: UserStore,
{
    authenticated_user(headers, state)
        .await?
        .ok_or_else(ApiError::unauthorized)
}

fn accept_header(headers: &HeaderMap) -> &str {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

fn wants_xml(headers: &HeaderMap) -> bool {
    let accept = accept_header(headers);
    accept.is_empty()
        || accept.contains("text/xml")
        || accept.contains("application/xml")
        || accept.contains("application/xhtml+xml")
        || accept.contains("text/html")
        || accept.contains("*/*")
}

fn wants_json(headers: &HeaderMap) -> bool {
    accept_header(headers).contains("application/json")
}

/// Translates an assembled XML document into the negotiated response:
/// XML as-is, or the JSON rendition when only JSON is acceptable.
fn respond_xml_or_json(headers: &HeaderMap, content: String) -> ApiResult<Response> {
    if wants_xml(headers) {
        return Ok(xml_response(content));
    }
    if wants_json(headers) {
        let value = xml_to_json(&content)
            .map_err(|e| ApiError::internal_error(e.to_string()))?;
        return Ok(Json(value).into_response());
    }
    // default media type is XML
    Ok(xml_response(content))
}

fn xml_response(content: String) -> Response {
    (
        [(header::CONTENT_TYPE, "application/xml; charset=utf-8")],
        content,
    )
        .into_response()
}

// ============================================================
// Health
// ============================================================

/// Basic liveness probe; does not check service backends.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Project resources (published archive)
// ============================================================

/// Query parameters for project listings. `modFrom`/`modUntil` select on
/// the last administrative state change (RFC 3339).
#[derive(Debug, Deserialize)]
pub struct ListProjectsQuery {
    #[serde(default)]
    pub offset: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(rename = "modFrom")]
    pub mod_from: Option<String>,
    #[serde(rename = "modUntil")]
    pub mod_until: Option<String>,
}

fn default_limit() -> usize {
    DEFAULT_LIST_LIMIT
}

fn parse_modified(value: &str) -> ApiResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ApiError::validation_error(format!("bad modification timestamp: {e}")))
}

async fn list_projects<D, S, U>(
    State(state): State<Arc<AppState<D, S, U>>>,
    headers: HeaderMap,
    Query(query): Query<ListProjectsQuery>,
) -> ApiResult<Response>
where
    D: DataStore,
    S: SearchStore,
    U: UserStore,
{
    let mut request = SearchRequest::new();
    request.offset = query.offset;
    request.limit = query.limit;
    // only published projects are exposed here
    request.states = vec![DatasetState::Published];

    if query.mod_from.is_some() || query.mod_until.is_some() {
        // recently changed first, for harvesting clients
        request.sort = SortField::StateChanged;
        if let Some(from) = &query.mod_from {
            request.modified_from = Some(parse_modified(from)?);
        }
        if let Some(until) = &query.mod_until {
            request.modified_until = Some(parse_modified(until)?);
        }
    }

    let result = state.search.search(&request).await?;
    respond_xml_or_json(&headers, xml::project_list_document(&result, false))
}

async fn get_project<D, S, U>(
    State(state): State<Arc<AppState<D, S, U>>>,
    headers: HeaderMap,
    Path(sid): Path<String>,
) -> ApiResult<Response>
where
    D: DataStore,
    S: SearchStore,
    U: UserStore,
{
    let mut request = SearchRequest::new();
    request.limit = 1;
    request.sid = Some(sid);

    // admins also see drafts
    let is_admin = authenticated_user(&headers, &state)
        .await?
        .map(|u| u.is_admin())
        .unwrap_or(false);
    if !is_admin {
        request.states = vec![DatasetState::Published];
    }

    let result = state.search.search(&request).await?;
    let hit = result
        .hits
        .first()
        .ok_or_else(|| ApiError::project_not_found("project not found"))?;
    respond_xml_or_json(&headers, xml::project_hit_document(hit, false))
}

/// The complete TRiDaS document. Downloaders get it verbatim; viewers
/// with a partial permission get it restricted to their effective level.
async fn get_project_tridas<D, S, U>(
    State(state): State<Arc<AppState<D, S, U>>>,
    headers: HeaderMap,
    Path(sid): Path<String>,
) -> ApiResult<Response>
where
    D: DataStore,
    S: SearchStore,
    U: UserStore,
{
    let user = require_user(&headers, &state).await?;
    let mut project = state.data.get_project(&sid).await?;

    if !project.is_download_allowed(&user) {
        if !project.is_viewing_allowed(&user) {
            return Err(ApiError::unauthorized());
        }
        // filter down to what would be visible
        let level = project.effective_permission_level(&user);
        PermissionRestrictor::new().restrict_to_permitted(&mut project.tridas, level);
    }

    let content = tridas::to_xml(&project.tridas)
        .map_err(|e| ApiError::internal_error(e.to_string()))?;
    // always XML, because it is TRiDaS
    Ok(xml_response(content))
}

/// The TRiDaS document cut down to a client-requested entity level; the
/// effective permission still caps what the request can widen.
async fn get_project_tridas_at_level<D, S, U>(
    State(state): State<Arc<AppState<D, S, U>>>,
    headers: HeaderMap,
    Path((sid, level)): Path<(String, String)>,
) -> ApiResult<Response>
where
    D: DataStore,
    S: SearchStore,
    U: UserStore,
{
    let requested_level: ProjectPermissionLevel = level
        .parse()
        .map_err(|_| ApiError::level_not_found(format!("unknown entity level: {level}")))?;

    let user = require_user(&headers, &state).await?;
    let mut project = state.data.get_project(&sid).await?;

    if !project.is_download_allowed(&user) {
        if !project.is_viewing_allowed(&user) {
            return Err(ApiError::unauthorized());
        }
        // first remove what was not requested
        RequestedLevelRestrictor::new()
            .restrict_to_permitted(&mut project.tridas, requested_level);

        // finally apply the permission, if more than allowed was requested
        let effective_level = project.effective_permission_level(&user);
        if !requested_level.is_permitted_by(effective_level) {
            PermissionRestrictor::new()
                .restrict_to_permitted(&mut project.tridas, effective_level);
        }
    }

    let content = tridas::to_xml(&project.tridas)
        .map_err(|e| ApiError::internal_error(e.to_string()))?;
    Ok(xml_response(content))
}

async fn list_associated_files<D, S, U>(
    State(state): State<Arc<AppState<D, S, U>>>,
    headers: HeaderMap,
    Path(sid): Path<String>,
) -> ApiResult<Response>
where
    D: DataStore,
    S: SearchStore,
    U: UserStore,
{
    require_user(&headers, &state).await?;
    let project = state.data.get_project(&sid).await?;
    // listing file names needs no download permission
    respond_xml_or_json(&headers, xml::files_document(&project.associated_files))
}

async fn get_associated_file<D, S, U>(
    State(state): State<Arc<AppState<D, S, U>>>,
    headers: HeaderMap,
    Path((sid, filename)): Path<(String, String)>,
) -> ApiResult<Response>
where
    D: DataStore,
    S: SearchStore,
    U: UserStore,
{
    let user = require_user(&headers, &state).await?;
    let project = state.data.get_project(&sid).await?;
    if !project.is_download_allowed(&user) {
        return Err(ApiError::unauthorized());
    }
    serve_file_unit(&state, &sid, &project.associated_files, &filename).await
}

async fn list_original_files<D, S, U>(
    State(state): State<Arc<AppState<D, S, U>>>,
    headers: HeaderMap,
    Path(sid): Path<String>,
) -> ApiResult<Response>
where
    D: DataStore,
    S: SearchStore,
    U: UserStore,
{
    require_user(&headers, &state).await?;
    let project = state.data.get_project(&sid).await?;
    respond_xml_or_json(&headers, xml::files_document(&project.original_files))
}

async fn get_original_file<D, S, U>(
    State(state): State<Arc<AppState<D, S, U>>>,
    headers: HeaderMap,
    Path((sid, filename)): Path<(String, String)>,
) -> ApiResult<Response>
where
    D: DataStore,
    S: SearchStore,
    U: UserStore,
{
    let user = require_user(&headers, &state).await?;
    let project = state.data.get_project(&sid).await?;
    if !project.is_download_allowed(&user) {
        return Err(ApiError::unauthorized());
    }
    serve_file_unit(&state, &sid, &project.original_files, &filename).await
}

/// Resolves a file unit by name and streams its bytes back.
async fn serve_file_unit<D, S, U>(
    state: &AppState<D, S, U>,
    sid: &str,
    units: &[FileUnit],
    filename: &str,
) -> ApiResult<Response>
where
    D: DataStore,
    S: SearchStore,
    U: UserStore,
{
    let unit = units
        .iter()
        .find(|u| u.file_name == filename)
        .ok_or_else(|| ApiError::file_not_found(format!("no such file: {filename}")))?;

    let file_url = state.data.get_file_url(sid, &unit.unit_id).await?;
    // the whole unit is buffered in memory before answering
    let bytes = url::to_byte_array(&file_url).map_err(|e| {
        error!("Cannot read stored file unit {}: {}", unit.unit_id, e);
        ApiError::internal_error("stored file unavailable")
    })?;

    Ok((
        [(header::CONTENT_TYPE, "application/octet-stream")],
        bytes,
    )
        .into_response())
}

async fn get_permission<D, S, U>(
    State(state): State<Arc<AppState<D, S, U>>>,
    headers: HeaderMap,
    Path(sid): Path<String>,
) -> ApiResult<Response>
where
    D: DataStore,
    S: SearchStore,
    U: UserStore,
{
    let user = require_user(&headers, &state).await?;
    let project = state.data.get_project(&sid).await?;
    if !(user.is_admin() || user.id == project.owner_id) {
        return Err(ApiError::not_allowed(
            "permission metadata is visible to the owner and admins only",
        ));
    }
    respond_xml_or_json(&headers, xml::permission_document(&project))
}

// ============================================================
// My-project resources (owner-scoped, drafts included)
// ============================================================

#[derive(Debug, Deserialize)]
pub struct PagingQuery {
    #[serde(default)]
    pub offset: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

async fn list_my_projects<D, S, U>(
    State(state): State<Arc<AppState<D, S, U>>>,
    headers: HeaderMap,
    Query(query): Query<PagingQuery>,
) -> ApiResult<Response>
where
    D: DataStore,
    S: SearchStore,
    U: UserStore,
{
    let user = require_user(&headers, &state).await?;

    let mut request = SearchRequest::new();
    request.offset = query.offset;
    request.limit = query.limit;
    request.owner_id = Some(user.id);

    let result = state.search.search(&request).await?;
    respond_xml_or_json(&headers, xml::project_list_document(&result, true))
}

/// Query parameters for searching one's own projects.
#[derive(Debug, Deserialize)]
pub struct MyProjectsQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub category: String,
    #[serde(rename = "objectType", default)]
    pub object_type: String,
    #[serde(rename = "elementTaxon", default)]
    pub element_taxon: String,
    #[serde(default)]
    pub offset: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

async fn query_my_projects<D, S, U>(
    State(state): State<Arc<AppState<D, S, U>>>,
    headers: HeaderMap,
    Query(query): Query<MyProjectsQuery>,
) -> ApiResult<Response>
where
    D: DataStore,
    S: SearchStore,
    U: UserStore,
{
    let user = require_user(&headers, &state).await?;

    let mut request = SearchRequest::new();
    request.offset = query.offset;
    request.limit = query.limit;
    request.owner_id = Some(user.id);
    if !query.q.is_empty() {
        request.query = Some(query.q);
    }
    if !query.category.is_empty() {
        request.category = Some(query.category);
    }
    if !query.object_type.is_empty() {
        request.object_type = Some(query.object_type);
    }
    if !query.element_taxon.is_empty() {
        request.element_taxon = Some(query.element_taxon);
    }

    let result = state.search.search(&request).await?;
    respond_xml_or_json(&headers, xml::project_list_document(&result, true))
}

async fn get_my_project<D, S, U>(
    State(state): State<Arc<AppState<D, S, U>>>,
    headers: HeaderMap,
    Path(sid): Path<String>,
) -> ApiResult<Response>
where
    D: DataStore,
    S: SearchStore,
    U: UserStore,
{
    let user = require_user(&headers, &state).await?;

    let mut request = SearchRequest::new();
    request.limit = 1;
    request.owner_id = Some(user.id);
    request.sid = Some(sid);

    let result = state.search.search(&request).await?;
    let hit = result
        .hits
        .first()
        .ok_or_else(|| ApiError::project_not_found("project not found"))?;
    respond_xml_or_json(&headers, xml::project_hit_document(hit, true))
}

async fn delete_my_project<D, S, U>(
    State(state): State<Arc<AppState<D, S, U>>>,
    headers: HeaderMap,
    Path(sid): Path<String>,
) -> ApiResult<Response>
where
    D: DataStore,
    S: SearchStore,
    U: UserStore,
{
    let user = require_user(&headers, &state).await?;
    state.data.delete_project(&sid, &user).await?;
    Ok(StatusCode::OK.into_response())
}

/// Multipart bundle upload:
///
/// ```not_rust
/// curl -u normaltestuser:testtest -F file=@project.zip http://localhost:8080/myprojects
/// ```
async fn upload_project<D, S, U>(
    State(state): State<Arc<AppState<D, S, U>>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> ApiResult<Response>
where
    D: DataStore,
    S: SearchStore,
    U: UserStore,
{
    let user = require_user(&headers, &state).await?;

    let mut upload: Option<Vec<u8>> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation_error(format!("bad multipart body: {e}")))?
    {
        if field.name() == Some("file") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::validation_error(format!("bad upload: {e}")))?;
            upload = Some(bytes.to_vec());
            break;
        }
    }
    let upload = upload
        .ok_or_else(|| ApiError::validation_error("multipart field 'file' is required"))?;

    // unpack on a blocking worker; the temp dir guard travels back so the
    // extraction lives exactly as long as the import attempt
    let import_settings = state.config.import.clone();
    let (temp_dir, data_folder) = tokio::task::spawn_blocking(
        move || -> Result<(TempDir, PathBuf), BundleError> {
            let temp_dir = bundle::create_temp_dir(&import_settings.temp_dir_prefix)?;
            bundle::unzip(Cursor::new(upload), temp_dir.path())?;
            let root = bundle::bundle_root(temp_dir.path())?;
            let data_folder = bundle::data_folder(&root, &import_settings.data_folder_name)?;
            Ok((temp_dir, data_folder))
        },
    )
    .await
    .map_err(|e| ApiError::internal_error(format!("upload worker failed: {e}")))??;

    let result = state.importer.import_project(&data_folder, &user.id).await;
    // the temp dir is deleted whatever the import outcome
    drop(temp_dir);
    let sid = result?;

    info!(sid = %sid, owner = %user.id, "project imported");
    let content = format!(
        "{}<import>{}</import>",
        xml::XML_INSTRUCTION,
        xml::xml_element("sid", &sid)
    );
    respond_xml_or_json(&headers, content)
}

// ============================================================
// User and organisation resources
// ============================================================

async fn list_users<D, S, U>(
    State(state): State<Arc<AppState<D, S, U>>>,
    headers: HeaderMap,
) -> ApiResult<Response>
where
    D: DataStore,
    S: SearchStore,
    U: UserStore,
{
    let user = require_user(&headers, &state).await?;
    if !user.is_admin() {
        return Err(ApiError::not_allowed("user listing is admin only"));
    }
    let users = state.users.list_users().await?;
    respond_xml_or_json(&headers, users_document(&users))
}

async fn get_user<D, S, U>(
    State(state): State<Arc<AppState<D, S, U>>>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
) -> ApiResult<Response>
where
    D: DataStore,
    S: SearchStore,
    U: UserStore,
{
    let requester = require_user(&headers, &state).await?;
    if !(requester.is_admin() || requester.id == user_id) {
        return Err(ApiError::not_allowed("member details are admin or self only"));
    }
    let user = state.users.get_user(&user_id).await?;
    let mut content = String::from(xml::XML_INSTRUCTION);
    append_user(&mut content, &user);
    respond_xml_or_json(&headers, content)
}

async fn list_organisations<D, S, U>(
    State(state): State<Arc<AppState<D, S, U>>>,
    headers: HeaderMap,
) -> ApiResult<Response>
where
    D: DataStore,
    S: SearchStore,
    U: UserStore,
{
    require_user(&headers, &state).await?;
    let organisations = state.users.list_organisations().await?;
    respond_xml_or_json(&headers, organisations_document(&organisations))
}

fn users_document(users: &[DccdUser]) -> String {
    let mut out = String::from(xml::XML_INSTRUCTION);
    out.push_str("<users>");
    for user in users {
        append_user(&mut out, user);
    }
    out.push_str("</users>");
    out
}

fn append_user(out: &mut String, user: &DccdUser) {
    out.push_str("<user>");
    out.push_str(&xml::xml_element("id", &user.id));
    out.push_str(&xml::xml_element("displayName", &user.display_name));
    out.push_str(&xml::xml_element_optional("email", user.email.as_deref()));
    out.push_str(&xml::xml_element_optional(
        "organisation",
        user.organisation.as_deref(),
    ));
    out.push_str("</user>");
}

fn organisations_document(organisations: &[Organisation]) -> String {
    let mut out = String::from(xml::XML_INSTRUCTION);
    out.push_str("<organisations>");
    for organisation in organisations {
        out.push_str("<organisation>");
        out.push_str(&xml::xml_element("id", &organisation.id));
        out.push_str(&xml::xml_element_optional(
            "city",
            organisation.city.as_deref(),
        ));
        out.push_str(&xml::xml_element_optional(
            "country",
            organisation.country.as_deref(),
        ));
        out.push_str("</organisation>");
    }
    out.push_str("</organisations>");
    out
}
