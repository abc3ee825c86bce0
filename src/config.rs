use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    /// Maximum upload size in bytes
    pub max_upload_size: u64,
    /// Prefix for generated download links, e.g. `https://dl.example.com`.
    /// Links are host-relative when unset.
    pub public_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_address: String,
    /// Directory holding the metadata database
    pub data_dir: String,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Directory holding `<version_name>.<extension>` binaries
    pub artifact_dir: String,
    pub artifact_extension: String,
    /// Content-Type served for artifacts
    pub artifact_mime_type: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8089".to_string(),
            data_dir: "./data".to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            artifact_dir: "./artifacts".to_string(),
            artifact_extension: "apk".to_string(),
            artifact_mime_type: mime_for_extension("apk"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            max_upload_size: 200 * 1024 * 1024, // 200MB
            public_url: None,
        }
    }
}

fn mime_for_extension(extension: &str) -> String {
    mime_guess::from_ext(extension)
        .first()
        .map(|m| m.to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or(defaults.server.bind_address);

        let data_dir = std::env::var("DATA_DIR").unwrap_or(defaults.server.data_dir);

        let artifact_dir =
            std::env::var("ARTIFACT_DIR").unwrap_or(defaults.storage.artifact_dir);

        let artifact_extension = std::env::var("ARTIFACT_EXTENSION")
            .map(|e| e.trim().trim_start_matches('.').to_string())
            .unwrap_or(defaults.storage.artifact_extension);

        let artifact_mime_type = std::env::var("ARTIFACT_MIME_TYPE")
            .ok()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| mime_for_extension(&artifact_extension));

        let max_upload_size = std::env::var("MAX_UPLOAD_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_upload_size);

        let public_url = std::env::var("PUBLIC_URL")
            .ok()
            .map(|u| u.trim().trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty());

        let config = Config {
            server: ServerConfig {
                bind_address,
                data_dir,
            },
            storage: StorageConfig {
                artifact_dir,
                artifact_extension,
                artifact_mime_type,
            },
            max_upload_size,
            public_url,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let ext = &self.storage.artifact_extension;
        if ext.is_empty() {
            return Err(ConfigError::ValidationError(
                "ARTIFACT_EXTENSION cannot be empty".to_string(),
            ));
        }
        if ext.contains(['/', '\\']) || ext.contains("..") {
            return Err(ConfigError::ValidationError(format!(
                "ARTIFACT_EXTENSION '{ext}' must not contain path separators"
            )));
        }

        if self.max_upload_size == 0 {
            return Err(ConfigError::ValidationError(
                "MAX_UPLOAD_SIZE must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Link a client can use to download `version_name`.
    pub fn download_link(&self, version_name: &str) -> String {
        format!(
            "{}/app/download/{version_name}",
            self.public_url.as_deref().unwrap_or("")
        )
    }
}
