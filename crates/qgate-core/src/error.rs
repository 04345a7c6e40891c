use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Artifact not found: {}", path.display())]
    ArtifactMissing { path: PathBuf },

    #[error("Artifact {} is corrupt: {reason}", path.display())]
    ArtifactCorrupt { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::ArtifactCorrupt { path: path.into(), reason: reason.into() }
    }

    /// True for the startup failures that must keep the process from serving.
    pub fn is_artifact_failure(&self) -> bool {
        matches!(self, Error::ArtifactMissing { .. } | Error::ArtifactCorrupt { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
