//! app-dist - Versioned build artifact distribution
//!
//! This crate tracks uploaded build artifacts on two channels and serves them with:
//! - Release/preview channel inference from the version name
//! - A per-channel "latest" pointer driving channel download links
//! - redb embedded database for version metadata (ACID, MVCC, crash-safe)
//! - Resumable downloads through HTTP byte ranges (206 Partial Content)

pub mod api;
pub mod artifacts;
pub mod config;
pub mod range;
pub mod storage;
#[cfg(test)]
pub mod testutil;

use std::sync::Arc;

use artifacts::{ArtifactStore, KeyedLocks};
use config::Config;
use storage::Database;

/// Shared application state
pub struct AppState {
    pub artifacts: Arc<dyn ArtifactStore>,
    pub config: Config,
    pub db: Database,
    /// Serializes uploads that target the same version name
    pub upload_locks: KeyedLocks,
}

impl AppState {
    pub fn new(config: Config, db: Database, artifacts: Arc<dyn ArtifactStore>) -> Self {
        Self {
            artifacts,
            config,
            db,
            upload_locks: KeyedLocks::new(),
        }
    }
}
