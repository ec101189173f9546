//! Error types for konsync

use std::path::{Path, PathBuf};

/// Result type for konsync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading configuration or touching the filesystem
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Fatal: raised before any filesystem mutation happens
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Failed to parse {format} config at {path}: {message}")]
    ConfigParse {
        path: PathBuf,
        format: String,
        message: String,
    },

    #[error("Unsupported config format: '{extension}'")]
    UnsupportedFormat { extension: String },

    #[error("Unresolved token {token} in '{location}'")]
    UnresolvedToken { token: String, location: String },

    #[error("Trash is not available for {path}")]
    TrashPermissionDenied { path: PathBuf },

    #[error("Source not found: {0}")]
    SourceNotFound(PathBuf),

    #[error("Unsupported source type: {0}")]
    UnsupportedSourceType(PathBuf),

    #[error("Failed to create symlink {link} -> {target}: {source}")]
    SymlinkCreation {
        link: PathBuf,
        target: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Archiver not found: {0}")]
    ArchiverNotFound(String),

    #[error("Archiver failed: {0}")]
    Archive(String),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Whether the trash capability refused the path rather than failing on it
    pub fn is_trash_denied(&self) -> bool {
        matches!(self, Self::TrashPermissionDenied { .. })
    }
}

/// Attach a path to an `io::Result`
pub(crate) trait IoContext<T> {
    fn at(self, path: &Path) -> Result<T>;
}

impl<T> IoContext<T> for std::io::Result<T> {
    fn at(self, path: &Path) -> Result<T> {
        self.map_err(|e| Error::io(path, e))
    }
}
