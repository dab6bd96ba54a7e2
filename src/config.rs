//! Run configuration for the bamboo sorter

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default time the worker pool is given to drain at the end of a run
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 60;

/// Rule deciding where a file lands under the destination root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default, clap::ValueEnum)]
pub enum ClassificationMode {
    /// destination/YYYY/M/ using the file system creation time
    #[default]
    #[value(name = "creation-date")]
    #[serde(rename = "creation-date")]
    ByCreationDate,
    /// destination/YYYY/M/ using the creation date embedded in the file
    #[value(name = "metadata-date")]
    #[serde(rename = "metadata-date")]
    ByMetadataDate,
    /// destination/YYYY/M/ using the last modification time
    #[value(name = "modified-date")]
    #[serde(rename = "modified-date")]
    ByLastModifiedDate,
    /// destination/<extension>/
    #[value(name = "extension")]
    #[serde(rename = "extension")]
    ByExtension,
    /// destination/<category>/ (Images, Videos, Music, ...)
    #[value(name = "type")]
    #[serde(rename = "type")]
    ByType,
}

/// Parameters of one copy run
///
/// Built once before the run starts and shared read-only with every worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Directory tree to read files from
    pub origin: PathBuf,

    /// Root of the classified destination tree
    pub destination: PathBuf,

    /// Active classification rule
    #[serde(default)]
    pub mode: ClassificationMode,

    /// Rename copied files to their resolved date
    #[serde(default)]
    pub rename: bool,

    /// Send files without a date to 0_Pending/<parent folder>
    #[serde(default)]
    pub pending: bool,

    /// Overwrite existing destination files even when identical
    #[serde(default)]
    pub overwrite: bool,

    /// Number of worker threads (0 = logical CPU count)
    #[serde(default)]
    pub threads: usize,

    /// Seconds to wait for in-flight work when the run ends
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

fn default_shutdown_timeout() -> u64 {
    DEFAULT_SHUTDOWN_TIMEOUT_SECS
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            origin: PathBuf::new(),
            destination: PathBuf::from("output"),
            mode: ClassificationMode::default(),
            rename: false,
            pending: false,
            overwrite: false,
            threads: 0, // Auto-detect
            shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
        }
    }
}

impl RunConfig {
    /// Create a config with the given roots and mode, all flags off
    pub fn new(
        origin: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
        mode: ClassificationMode,
    ) -> Self {
        Self {
            origin: origin.into(),
            destination: destination.into(),
            mode,
            ..Self::default()
        }
    }

    pub fn with_rename(mut self, rename: bool) -> Self {
        self.rename = rename;
        self
    }

    pub fn with_pending(mut self, pending: bool) -> Self {
        self.pending = pending;
        self
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Resolved worker count
    pub fn worker_threads(&self) -> usize {
        if self.threads > 0 {
            self.threads
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        }
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    /// Check the roots before any file is touched
    pub fn validate(&self) -> Result<()> {
        if self.origin.as_os_str().is_empty() {
            return Err(Error::Config("origin directory is not set".into()));
        }
        if self.destination.as_os_str().is_empty() {
            return Err(Error::Config("destination directory is not set".into()));
        }

        let origin_meta = fs::metadata(&self.origin).map_err(|e| Error::FileRead {
            path: self.origin.clone(),
            source: e,
        })?;
        if !origin_meta.is_dir() {
            return Err(Error::InvalidPath(self.origin.clone()));
        }
        fs::read_dir(&self.origin).map_err(|e| {
            Error::Config(format!(
                "Can't read from origin directory {}: {}",
                self.origin.display(),
                e
            ))
        })?;

        if let Ok(dest_meta) = fs::metadata(&self.destination) {
            if !dest_meta.is_dir() {
                return Err(Error::InvalidPath(self.destination.clone()));
            }
            if dest_meta.permissions().readonly() {
                return Err(Error::Config(format!(
                    "Can't write in destination directory {}",
                    self.destination.display()
                )));
            }
        }

        // Copying into the origin tree would feed the run its own output
        let origin = self.origin.canonicalize()?;
        let destination = absolute_lexical(&self.destination)?;
        if destination.starts_with(&origin) {
            return Err(Error::Config(format!(
                "Destination {} is inside origin {}",
                self.destination.display(),
                self.origin.display()
            )));
        }

        Ok(())
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> std::result::Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Generate a sample configuration file content
    pub fn sample_config() -> String {
        r#"# Bamboo Sorter run file (TOML)

# Directory tree to copy from
origin = "D:/Camera"

# Root of the classified copy
destination = "D:/Sorted"

# Classification rule:
# - creation-date: YYYY/M/ from the file system creation time (default)
# - metadata-date: YYYY/M/ from the date embedded in the file (EXIF, XMP, ...)
# - modified-date: YYYY/M/ from the last modification time
# - extension: one folder per extension
# - type: one folder per category (Images, Videos, Music, Documents, ...)
mode = "metadata-date"

# Rename copies to their date: 2024-03-05_10-15-30..jpg
rename = false

# Files without a date go to 0_Pending/<parent folder> instead of being skipped
pending = true

# Overwrite existing files even when the content is identical
overwrite = false

# Worker threads (0 = one per logical CPU)
threads = 0

# Seconds to wait for running copies when the run ends
shutdown_timeout_secs = 60
"#
        .to_string()
    }
}

/// Make a path absolute without requiring it to exist
fn absolute_lexical(path: &Path) -> Result<PathBuf> {
    if let Ok(canonical) = path.canonicalize() {
        return Ok(canonical);
    }
    // Canonicalize the deepest existing ancestor and re-append the rest
    let mut existing = path.to_path_buf();
    let mut rest = Vec::new();
    while !existing.exists() {
        match (existing.file_name(), existing.parent()) {
            (Some(name), Some(parent)) => {
                rest.push(name.to_os_string());
                existing = parent.to_path_buf();
            }
            _ => break,
        }
    }
    let mut resolved = if existing.as_os_str().is_empty() {
        std::env::current_dir()?
    } else {
        existing.canonicalize().or_else(|_| std::path::absolute(&existing))?
    };
    for name in rest.into_iter().rev() {
        resolved.push(name);
    }
    Ok(resolved)
}

/// Errors that can occur when loading a run file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {source}", .path.display())]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{}': {source}", .path.display())]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sample_config_parses() {
        let config: RunConfig = toml::from_str(&RunConfig::sample_config()).unwrap();
        assert_eq!(config.mode, ClassificationMode::ByMetadataDate);
        assert!(config.pending);
        assert!(!config.rename);
        assert_eq!(config.shutdown_timeout_secs, 60);
    }

    #[test]
    fn test_minimal_file_uses_defaults() {
        let config: RunConfig = toml::from_str(
            r#"
origin = "in"
destination = "out"
"#,
        )
        .unwrap();
        assert_eq!(config.mode, ClassificationMode::ByCreationDate);
        assert_eq!(config.threads, 0);
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_load_from_file_reports_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "origin = ").unwrap();

        let err = RunConfig::load_from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn test_validate_rejects_missing_origin() {
        let dir = TempDir::new().unwrap();
        let config = RunConfig::new(
            dir.path().join("nope"),
            dir.path().join("out"),
            ClassificationMode::ByType,
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_destination_inside_origin() {
        let dir = TempDir::new().unwrap();
        let config = RunConfig::new(
            dir.path(),
            dir.path().join("sorted").join("deeper"),
            ClassificationMode::ByType,
        );
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("inside origin"));
    }

    #[test]
    fn test_validate_accepts_sibling_destination() {
        let dir = TempDir::new().unwrap();
        let origin = dir.path().join("in");
        fs::create_dir(&origin).unwrap();
        let config = RunConfig::new(&origin, dir.path().join("out"), ClassificationMode::ByType);
        config.validate().unwrap();
    }

    #[test]
    fn test_worker_threads() {
        let config = RunConfig::default().with_threads(3);
        assert_eq!(config.worker_threads(), 3);
        assert!(RunConfig::default().worker_threads() >= 1);
    }
}
