use async_trait::async_trait;
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use super::{Artifact, ArtifactStore, ArtifactStoreError};

/// Filesystem artifact store: one `<version_name>.<extension>` file per version.
pub struct LocalStore {
    base_path: PathBuf,
    extension: String,
}

impl LocalStore {
    pub fn new<P: AsRef<Path>>(base_path: P, extension: &str) -> Result<Self, std::io::Error> {
        let base_path = base_path.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_path)?;
        Ok(Self {
            base_path,
            extension: extension.to_string(),
        })
    }

    fn artifact_path(&self, version_name: &str) -> PathBuf {
        self.base_path.join(self.file_name(version_name))
    }

    /// Scratch path in the same directory, so the final rename stays on one filesystem.
    fn staging_path(&self, version_name: &str) -> PathBuf {
        let token = uuid::Uuid::new_v4();
        self.base_path.join(format!(".{version_name}.{token}.part"))
    }

    async fn write_staged(path: &Path, data: &[u8]) -> Result<(), std::io::Error> {
        let mut file = tokio::fs::File::create(path).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        Ok(())
    }
}

#[async_trait]
impl ArtifactStore for LocalStore {
    async fn put(&self, version_name: &str, data: Bytes) -> Result<(), ArtifactStoreError> {
        let staging = self.staging_path(version_name);

        let published = match Self::write_staged(&staging, &data).await {
            Ok(()) => tokio::fs::rename(&staging, self.artifact_path(version_name)).await,
            Err(e) => Err(e),
        };

        if let Err(e) = published {
            if let Err(cleanup) = tokio::fs::remove_file(&staging).await {
                if cleanup.kind() != ErrorKind::NotFound {
                    tracing::warn!(
                        version = %version_name,
                        error = %cleanup,
                        "Failed to remove staged upload"
                    );
                }
            }
            return Err(e.into());
        }

        Ok(())
    }

    async fn open(&self, version_name: &str) -> Result<Artifact, ArtifactStoreError> {
        let file = match tokio::fs::File::open(self.artifact_path(version_name)).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ArtifactStoreError::NotFound(version_name.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        let len = file.metadata().await?.len();

        Ok(Artifact {
            reader: Box::new(file),
            len,
        })
    }

    fn file_name(&self, version_name: &str) -> String {
        format!("{version_name}.{}", self.extension)
    }
}
