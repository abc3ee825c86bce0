use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Distribution track a version belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Preview,
    Release,
}

impl Channel {
    /// Classify a version name by its shape.
    ///
    /// Any alphabetic character (`1.2.0-beta`, `2.0rc1`) marks a preview
    /// build; names made only of digits and punctuation (`1.2.0`) are
    /// releases. Non-ASCII letters count as alphabetic.
    pub fn classify(version_name: &str) -> Self {
        if version_name.chars().any(char::is_alphabetic) {
            Channel::Preview
        } else {
            Channel::Release
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Preview => "preview",
            Channel::Release => "release",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "preview" => Ok(Channel::Preview),
            "release" => Ok(Channel::Release),
            other => Err(format!("unknown channel '{other}'")),
        }
    }
}

/// A version record stored in the registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub version_name: String,
    pub version_code: i64,
    pub channel: Channel,
    #[serde(default)]
    pub latest: bool,
    pub uploaded_at: DateTime<Utc>,
}

impl VersionRecord {
    pub fn new(version_name: &str, version_code: i64) -> Self {
        Self {
            version_name: version_name.to_string(),
            version_code,
            channel: Channel::classify(version_name),
            latest: false,
            uploaded_at: Utc::now(),
        }
    }
}

/// Check that a version name can double as a file stem in the artifact directory
/// and as the quoted filename of a `Content-Disposition` header.
pub fn validate_version_name(version_name: &str) -> Result<(), String> {
    if version_name.trim().is_empty() {
        return Err("version name must not be empty".to_string());
    }
    if version_name.starts_with('.') {
        return Err("version name must not start with '.'".to_string());
    }
    if version_name.contains(['/', '\\', '\0']) || version_name.contains("..") {
        return Err(format!(
            "version name '{version_name}' contains path characters"
        ));
    }
    if version_name.contains('"') || version_name.chars().any(char::is_control) {
        return Err(format!(
            "version name {version_name:?} contains quotes or control characters"
        ));
    }
    Ok(())
}
