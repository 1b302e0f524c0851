use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GoCqError {
    #[error("architecture \"{arch}\" is not supported. Supported: x86, x86_64, aarch64, arm")]
    UnsupportedArchitecture { arch: String },

    #[error("platform \"{os}\" is not supported. Supported: macos, linux, windows")]
    UnsupportedPlatform { os: String },

    #[error("Release not found: {tag} in {repo}")]
    NotFound { repo: String, tag: String },

    #[error("Target \"{expected}\" is not found in release {tag}. Available assets: {available}")]
    AssetNotFound {
        expected: String,
        tag: String,
        available: String,
    },

    #[error("HTTP request error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("GitHub API error: {0}")]
    GitHubApi(Box<octocrab::Error>),

    #[error("Failed to download {url}: HTTP {status}")]
    Download { url: String, status: u16 },

    #[error("Download stream interrupted: {0}")]
    Stream(#[source] std::io::Error),

    #[error("Filesystem error at {}: {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Archive extraction failed for {entry}: {reason}")]
    ArchiveExtraction { entry: String, reason: String },

    #[error("Failed to serialize release metadata: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("Failed to remove {} after error ({cause}): {source}", .path.display())]
    RollbackFailed {
        path: PathBuf,
        cause: Box<GoCqError>,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid repository format '{input}'. Expected format: owner/repo[@tag] (e.g., Mrs4s/go-cqhttp@v1.0.0)")]
    InvalidRepo { input: String },

    #[error("Configuration error at {path}: {message}")]
    Config { path: String, message: String },
}

pub type Result<T> = std::result::Result<T, GoCqError>;

impl From<octocrab::Error> for GoCqError {
    fn from(err: octocrab::Error) -> Self {
        GoCqError::GitHubApi(Box::new(err))
    }
}

impl GoCqError {
    pub(crate) fn fs(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GoCqError::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// Transport-level failures while talking to the API or streaming an asset.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            GoCqError::Network(_)
                | GoCqError::GitHubApi(_)
                | GoCqError::Download { .. }
                | GoCqError::Stream(_)
        )
    }

    /// Directory creation, write, metadata or extraction failures.
    pub fn is_filesystem(&self) -> bool {
        matches!(
            self,
            GoCqError::Filesystem { .. }
                | GoCqError::ArchiveExtraction { .. }
                | GoCqError::Metadata(_)
        )
    }
}
