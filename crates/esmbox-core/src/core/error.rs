use std::path::PathBuf;
use thiserror::Error;

pub type EsmResult<T> = Result<T, EsmError>;

#[derive(Error, Debug)]
pub enum EsmError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Path error: {0}")]
    Path(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Package '{0}' not found in registry")]
    PackageNotFound(String),

    #[error("Version '{version}' of '{name}' not found in registry")]
    VersionNotFound { name: String, version: String },

    #[error("Registry unreachable: {0}")]
    RegistryUnreachable(String),

    #[error("Malformed registry document for '{name}': {reason}")]
    MalformedDocument { name: String, reason: String },

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("Integrity check failed for {name}: expected {expected}, got {actual}")]
    IntegrityMismatch {
        name: String,
        expected: String,
        actual: String,
    },

    #[error("No package.json found in {} or its immediate subdirectories", .0.display())]
    RootNotFound(PathBuf),

    #[error("No entry point found in {}", .0.display())]
    EntryNotFound(PathBuf),

    #[error("Bundle failed: {0}")]
    BundleFailed(String),

    #[error("Failed to copy asset {}: {source}", path.display())]
    AssetCopyFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write manifest: {0}")]
    ManifestWriteFailed(String),

    #[error("Failed to bind {addr}: {source}")]
    ServerBindFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{failed} of {total} packages failed to convert")]
    BatchFailed { failed: usize, total: usize },

    #[error("WalkDir error: {0}")]
    WalkDir(#[from] walkdir::Error),
}

impl EsmError {
    /// Name of the conversion stage this error belongs to, if any.
    pub fn stage(&self) -> Option<&'static str> {
        match self {
            EsmError::PackageNotFound(_)
            | EsmError::VersionNotFound { .. }
            | EsmError::RegistryUnreachable(_)
            | EsmError::MalformedDocument { .. } => Some("resolve"),
            EsmError::DownloadFailed(_) | EsmError::IntegrityMismatch { .. } => Some("download"),
            EsmError::ExtractionFailed(_) => Some("extract"),
            EsmError::RootNotFound(_) => Some("locate-root"),
            EsmError::EntryNotFound(_) => Some("resolve-entry"),
            EsmError::BundleFailed(_) => Some("bundle"),
            EsmError::AssetCopyFailed { .. } => Some("copy-assets"),
            EsmError::ManifestWriteFailed(_) => Some("manifest"),
            EsmError::ServerBindFailed { .. } => Some("serve"),
            _ => None,
        }
    }
}
