mod apps;
mod download;
mod health;

use crate::api::response::ApiError;
use crate::artifacts::ArtifactStoreError;
use crate::storage::DatabaseError;

pub use apps::{get_channel_latest, list_versions, set_latest, upload_version, VersionResponse};
pub use download::download;
pub use health::health;

/// Map a metadata store failure to a generic 500, logging the detail.
fn storage_error(e: DatabaseError) -> ApiError {
    tracing::error!(error = %e, "Metadata store failure");
    ApiError::internal("Metadata store failure")
}

/// Map an artifact store failure to an ApiError without leaking filesystem paths.
fn artifact_error(e: ArtifactStoreError) -> ApiError {
    match e {
        ArtifactStoreError::NotFound(name) => {
            ApiError::not_found(format!("Artifact binary for '{name}' not found"))
        }
        ArtifactStoreError::Io(e) => {
            tracing::error!(error = %e, "Artifact store failure");
            ApiError::internal("Artifact store failure")
        }
    }
}
