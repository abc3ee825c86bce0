use axum::extract::{FromRequest, Multipart, Path, Request, State};
use axum::http::{header, StatusCode};
use axum::Json;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{artifact_error, storage_error};
use crate::api::response::{ApiError, AppQuery, JSend, JSendPaginated, Pagination};
use crate::config::Config;
use crate::storage::models::{validate_version_name, Channel, VersionRecord};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct VersionResponse {
    pub channel: Channel,
    pub download_link: String,
    pub latest: bool,
    pub uploaded_at: String,
    pub version_code: i64,
    pub version_name: String,
}

#[derive(Debug, Deserialize)]
pub struct ListVersionsParams {
    #[serde(default)]
    pub channel: Option<Channel>,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

fn default_limit() -> u32 {
    20
}

// ============================================================================
// Handlers
// ============================================================================

/// Route: GET /app/:name where `name` is a channel
pub async fn get_channel_latest(
    State(state): State<Arc<AppState>>,
    Path(channel): Path<String>,
) -> Result<Json<JSend<VersionResponse>>, ApiError> {
    let channel: Channel = channel.parse().map_err(ApiError::bad_request)?;

    let record = state
        .db
        .get_latest(channel)
        .map_err(storage_error)?
        .ok_or_else(|| ApiError::not_found(format!("No latest {channel} version set")))?;

    Ok(JSend::success(version_to_response(&state.config, &record)))
}

/// Route: GET /app/versions
pub async fn list_versions(
    State(state): State<Arc<AppState>>,
    AppQuery(params): AppQuery<ListVersionsParams>,
) -> Result<Json<JSendPaginated<VersionResponse>>, ApiError> {
    if params.limit == 0 {
        return Err(ApiError::bad_request("limit must be greater than 0"));
    }

    let versions = state
        .db
        .list_versions(params.channel)
        .map_err(storage_error)?;

    let total = versions.len() as u64;
    let items: Vec<VersionResponse> = versions
        .iter()
        .skip(params.offset as usize)
        .take(params.limit as usize)
        .map(|v| version_to_response(&state.config, v))
        .collect();

    Ok(JSendPaginated::success(
        items,
        Pagination {
            limit: params.limit,
            offset: params.offset,
            total,
        },
    ))
}

/// Route: PATCH /app/:name/latest
pub async fn set_latest(
    State(state): State<Arc<AppState>>,
    Path(version_name): Path<String>,
) -> Result<(StatusCode, Json<JSend<VersionResponse>>), ApiError> {
    let channel = Channel::classify(&version_name);

    let record = state
        .db
        .set_latest(channel, &version_name)
        .map_err(storage_error)?
        .ok_or_else(|| ApiError::not_found(format!("Version '{version_name}' not found")))?;

    tracing::info!(version = %version_name, channel = %channel, "Set latest version");

    Ok((
        StatusCode::CREATED,
        JSend::success(version_to_response(&state.config, &record)),
    ))
}

/// Route: POST /app/:name/:code
///
/// Accepts the artifact either as the raw request body or as the `file`
/// field of a `multipart/form-data` body.
pub async fn upload_version(
    State(state): State<Arc<AppState>>,
    Path((version_name, version_code)): Path<(String, String)>,
    request: Request,
) -> Result<(StatusCode, Json<JSend<VersionResponse>>), ApiError> {
    validate_version_name(&version_name).map_err(ApiError::bad_request)?;
    let version_code: i64 = version_code.parse().map_err(|_| {
        ApiError::bad_request(format!(
            "version code '{version_code}' must be an integer"
        ))
    })?;

    let data = read_upload(&state, request).await?;
    if data.is_empty() {
        return Err(ApiError::bad_request("artifact body must not be empty"));
    }
    if data.len() as u64 > state.config.max_upload_size {
        return Err(ApiError::payload_too_large(format!(
            "Artifact exceeds maximum upload size of {} bytes",
            state.config.max_upload_size
        )));
    }

    let byte_size = data.len();
    let _guard = state.upload_locks.lock(&version_name).await;

    // Phase 1: publish the binary. The registry is only touched once it is in place.
    state
        .artifacts
        .put(&version_name, data)
        .await
        .map_err(artifact_error)?;

    // Phase 2: record the version
    let record = state
        .db
        .upsert_version(&version_name, version_code)
        .map_err(storage_error)?;

    tracing::info!(
        version = %version_name,
        version_code,
        channel = %record.channel,
        byte_size,
        "Uploaded artifact"
    );

    Ok((
        StatusCode::CREATED,
        JSend::success(version_to_response(&state.config, &record)),
    ))
}

// ============================================================================
// Helpers
// ============================================================================

async fn read_upload(state: &Arc<AppState>, request: Request) -> Result<Bytes, ApiError> {
    let is_multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"));

    if !is_multipart {
        return Bytes::from_request(request, state)
            .await
            .map_err(|rejection| {
                body_error(
                    &state.config,
                    rejection.status(),
                    format!("Failed to read artifact: {}", rejection.body_text()),
                )
            });
    }

    let mut multipart = Multipart::from_request(request, state)
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart data: {}", e.body_text())))?;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        body_error(
            &state.config,
            e.status(),
            format!("Invalid multipart data: {}", e.body_text()),
        )
    })? {
        if field.name() == Some("file") {
            return field.bytes().await.map_err(|e| {
                body_error(
                    &state.config,
                    e.status(),
                    format!("Failed to read file: {}", e.body_text()),
                )
            });
        }
    }

    Err(ApiError::bad_request("file field is required"))
}

/// Map a body read failure, keeping the size limit distinct from bad input.
fn body_error(config: &Config, status: StatusCode, message: String) -> ApiError {
    match status {
        StatusCode::PAYLOAD_TOO_LARGE => ApiError::payload_too_large(format!(
            "Artifact exceeds maximum upload size of {} bytes",
            config.max_upload_size
        )),
        _ => ApiError::bad_request(message),
    }
}

fn version_to_response(config: &Config, record: &VersionRecord) -> VersionResponse {
    VersionResponse {
        channel: record.channel,
        download_link: config.download_link(&record.version_name),
        latest: record.latest,
        uploaded_at: record.uploaded_at.to_rfc3339(),
        version_code: record.version_code,
        version_name: record.version_name.clone(),
    }
}
