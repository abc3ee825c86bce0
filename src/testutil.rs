//! Shared test helpers for in-crate handler tests.

use std::sync::Arc;

use crate::artifacts::LocalStore;
use crate::config::{Config, ServerConfig, StorageConfig};
use crate::storage::Database;
use crate::AppState;

/// Create a test AppState with a temporary database and artifact directory.
pub fn test_state(temp_dir: &tempfile::TempDir) -> Arc<AppState> {
    let data_dir = temp_dir.path().join("data");
    let artifact_dir = temp_dir.path().join("artifacts");

    let config = Config {
        server: ServerConfig {
            bind_address: "127.0.0.1:0".to_string(),
            data_dir: data_dir.to_string_lossy().to_string(),
        },
        storage: StorageConfig {
            artifact_dir: artifact_dir.to_string_lossy().to_string(),
            ..Default::default()
        },
        max_upload_size: 1024 * 1024, // 1MB for tests
        public_url: None,
    };

    let db = Database::open(&data_dir).expect("Failed to open test database");
    let artifacts = LocalStore::new(&artifact_dir, &config.storage.artifact_extension)
        .expect("Failed to create test artifact store");

    Arc::new(AppState::new(config, db, Arc::new(artifacts)))
}
