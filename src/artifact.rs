//! Artifact resolution.
//!
//! The artifact is either named explicitly or derived from the version
//! declared in project metadata. Either way it has to be an existing regular
//! file before the first test is launched.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::{ArtifactSource, RunConfiguration};
use crate::error::{Error, Result};

/// Placeholder substituted with the project version.
pub const VERSION_PLACEHOLDER: &str = "{version}";

/// A validated project version token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version(String);

impl Version {
    /// Validates a raw version token.
    pub fn parse(raw: &str) -> Result<Self> {
        let token = raw.trim();
        if token.is_empty() {
            return Err(Error::Config("version is empty".to_string()));
        }
        if token
            .chars()
            .any(|c| c.is_whitespace() || c == '/' || c == '\\')
        {
            return Err(Error::Config(format!("malformed version '{}'", token)));
        }
        Ok(Self(token.to_string()))
    }

    /// Returns the version string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the version carries a pre-release qualifier such as `-SNAPSHOT`.
    pub fn is_snapshot(&self) -> bool {
        self.0.contains('-')
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Supported metadata encodings, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MetadataFormat {
    Toml,
    Json,
    Yaml,
}

impl MetadataFormat {
    fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Ok(MetadataFormat::Toml),
            Some("json") => Ok(MetadataFormat::Json),
            Some("yaml") | Some("yml") => Ok(MetadataFormat::Yaml),
            _ => Err(Error::Config(format!(
                "unsupported metadata format: {} (expected .toml, .json, .yaml)",
                path.display()
            ))),
        }
    }
}

/// Reads the version declared at `field` (dotted path) in a metadata file.
pub fn read_version(metadata: &Path, field: &str) -> Result<Version> {
    let format = MetadataFormat::from_path(metadata)?;
    let content = std::fs::read_to_string(metadata).map_err(|e| {
        Error::Config(format!(
            "cannot read project metadata {}: {}",
            metadata.display(),
            e
        ))
    })?;

    // Normalize every encoding into a JSON value so lookup is shared.
    let document: serde_json::Value = match format {
        MetadataFormat::Toml => {
            let value: toml::Value = toml::from_str(&content)
                .map_err(|e| metadata_parse_error(metadata, e))?;
            serde_json::to_value(value).map_err(|e| metadata_parse_error(metadata, e))?
        }
        MetadataFormat::Json => {
            serde_json::from_str(&content).map_err(|e| metadata_parse_error(metadata, e))?
        }
        MetadataFormat::Yaml => {
            serde_yaml::from_str(&content).map_err(|e| metadata_parse_error(metadata, e))?
        }
    };

    let raw = field
        .split('.')
        .try_fold(&document, |node, key| node.get(key))
        .ok_or_else(|| {
            Error::Config(format!(
                "project metadata {} has no '{}' field",
                metadata.display(),
                field
            ))
        })?
        .as_str()
        .ok_or_else(|| {
            Error::Config(format!(
                "'{}' in {} is not a string",
                field,
                metadata.display()
            ))
        })?;

    Version::parse(raw)
}

fn metadata_parse_error(path: &Path, err: impl fmt::Display) -> Error {
    Error::Config(format!(
        "malformed project metadata {}: {}",
        path.display(),
        err
    ))
}

/// Path to an artifact that existed when it was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactReference {
    path: PathBuf,
}

impl ArtifactReference {
    /// Returns the artifact path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Resolves and verifies the artifact named by the configuration.
pub fn locate(config: &RunConfiguration) -> Result<ArtifactReference> {
    let candidate = match &config.artifact {
        ArtifactSource::Path(path) => path.clone(),
        ArtifactSource::Auto => {
            let version = read_version(&config.metadata, &config.version_field)?;
            tracing::debug!(
                version = %version,
                snapshot = version.is_snapshot(),
                metadata = ?config.metadata,
                "read project version"
            );
            PathBuf::from(
                config
                    .artifact_template
                    .replace(VERSION_PLACEHOLDER, version.as_str()),
            )
        }
    };

    verify(candidate)
}

fn verify(candidate: PathBuf) -> Result<ArtifactReference> {
    let path = if candidate.is_absolute() {
        candidate
    } else {
        std::env::current_dir()?.join(candidate)
    };

    // `metadata` follows symlinks, so a link to a jar is accepted.
    match std::fs::metadata(&path) {
        Ok(meta) if meta.is_file() => Ok(ArtifactReference { path }),
        _ => Err(Error::ArtifactNotFound(path)),
    }
}
