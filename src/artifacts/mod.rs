mod local;
mod locks;

pub use local::LocalStore;
pub use locks::KeyedLocks;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncSeek};

#[derive(Debug, Error)]
pub enum ArtifactStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Artifact not found: {0}")]
    NotFound(String),
}

/// A byte source that can be positioned before reading.
pub trait SeekableRead: AsyncRead + AsyncSeek + Send + Unpin {}

impl<T: AsyncRead + AsyncSeek + Send + Unpin> SeekableRead for T {}

/// An opened artifact together with its length at open time.
pub struct Artifact {
    pub reader: Box<dyn SeekableRead>,
    pub len: u64,
}

/// Storage for build artifact binaries, keyed by version name.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Store `data` as the artifact for `version_name`, replacing any previous
    /// binary. Readers see either the old or the new file, never a mix.
    async fn put(&self, version_name: &str, data: Bytes) -> Result<(), ArtifactStoreError>;
    async fn open(&self, version_name: &str) -> Result<Artifact, ArtifactStoreError>;
    /// File name a client should save the artifact under.
    fn file_name(&self, version_name: &str) -> String;
}
