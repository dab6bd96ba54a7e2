//! Error types for the bamboo sorter

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for bamboo sorter operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the bamboo sorter
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to apply timestamps to {path}: {message}")]
    Attributes { path: PathBuf, message: String },

    #[error("File hash computation failed for {path}: {message}")]
    HashComputation { path: PathBuf, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid path: {0}")]
    InvalidPath(PathBuf),

    #[error("Directory traversal error: {0}")]
    WalkDir(#[from] walkdir::Error),

    #[error("Failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Worker task panicked while processing {path}")]
    TaskPanicked { path: PathBuf },
}

impl Error {
    /// Stable name of the error kind, recorded in the exception log
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Io(_) => "IoError",
            Error::FileRead { .. } => "FileReadError",
            Error::FileWrite { .. } => "FileWriteError",
            Error::CreateDir { .. } => "CreateDirectoryError",
            Error::Attributes { .. } => "AttributeError",
            Error::HashComputation { .. } => "HashError",
            Error::Config(_) => "ConfigError",
            Error::InvalidPath(_) => "InvalidPathError",
            Error::WalkDir(_) => "WalkDirError",
            Error::WorkerPool(_) => "WorkerPoolError",
            Error::TaskPanicked { .. } => "TaskPanic",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_names() {
        let err = Error::Config("missing origin".into());
        assert_eq!(err.kind(), "ConfigError");
        assert_eq!(err.to_string(), "Configuration error: missing origin");

        let err = Error::FileRead {
            path: PathBuf::from("a.jpg"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert_eq!(err.kind(), "FileReadError");
        assert!(err.to_string().contains("a.jpg"));
    }
}
