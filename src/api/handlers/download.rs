use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::Response;
use std::sync::Arc;

use super::{artifact_error, storage_error};
use crate::api::partial;
use crate::api::response::ApiError;
use crate::storage::models::{Channel, VersionRecord};
use crate::AppState;

/// Stream an artifact, honoring `Range` for resumable downloads.
/// Route: GET /app/download/:name
///
/// `name` is either a channel (`release`, `preview`), which resolves to that
/// channel's latest version, or a version name.
pub async fn download(
    State(state): State<Arc<AppState>>,
    Path(target): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let record = resolve_target(&state, &target)?;

    let artifact = state
        .artifacts
        .open(&record.version_name)
        .await
        .map_err(artifact_error)?;

    tracing::debug!(
        version = %record.version_name,
        len = artifact.len,
        ranged = headers.contains_key(header::RANGE),
        "Serving artifact"
    );

    let mut response = partial::serve(
        artifact.reader,
        artifact.len,
        headers.get(header::RANGE),
        &state.config.storage.artifact_mime_type,
    )
    .await;

    if response.status().is_success() {
        let filename = state.artifacts.file_name(&record.version_name);
        match HeaderValue::from_str(&format!("attachment; filename=\"{filename}\"")) {
            Ok(value) => {
                response
                    .headers_mut()
                    .insert(header::CONTENT_DISPOSITION, value);
            }
            Err(e) => tracing::warn!(
                version = %record.version_name,
                error = %e,
                "Artifact file name is not a valid header value"
            ),
        }
    }

    Ok(response)
}

fn resolve_target(state: &AppState, target: &str) -> Result<VersionRecord, ApiError> {
    match target.parse::<Channel>() {
        Ok(channel) => state
            .db
            .get_latest(channel)
            .map_err(storage_error)?
            .ok_or_else(|| ApiError::not_found(format!("No latest {channel} version set"))),
        Err(_) => state
            .db
            .get_version(target)
            .map_err(storage_error)?
            .ok_or_else(|| ApiError::not_found(format!("Version '{target}' not found"))),
    }
}
