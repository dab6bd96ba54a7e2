//! Date resolution
//!
//! Produces the date a file is classified and renamed by. Three sources are
//! available, one per date-based classification mode:
//! - File system creation time
//! - File system modification time
//! - Creation date embedded in the file (EXIF, XMP, PDF, office, QuickTime)
//!
//! Every failure along the way resolves to "no date"; nothing here returns
//! an error to the caller.

pub mod exif;
pub mod filesystem;
pub mod metadata;
pub mod office;
pub mod quicktime;

use crate::config::ClassificationMode;
use chrono::NaiveDateTime;
use std::path::Path;
use tracing::debug;

/// Source of the resolved timestamp
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeSource {
    /// File system creation (birth) time
    FileCreation,
    /// File system last modification time
    FileModification,
    /// Embedded metadata tag, by name
    MetadataTag(&'static str),
    /// EXIF DateTimeOriginal read from the image
    ExifOriginal,
}

/// Result of date resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedTime {
    /// The resolved timestamp, in local wall-clock time
    pub timestamp: NaiveDateTime,
    /// Where the timestamp came from
    pub source: TimeSource,
}

/// Resolve the date of `path` for the given classification mode
///
/// Extension and type modes don't use a date and always yield `None`.
pub fn resolve_date(path: &Path, mode: ClassificationMode) -> Option<ExtractedTime> {
    let resolved = match mode {
        ClassificationMode::ByCreationDate => filesystem::creation_time(path).map(|timestamp| {
            ExtractedTime {
                timestamp,
                source: TimeSource::FileCreation,
            }
        }),
        ClassificationMode::ByLastModifiedDate => {
            filesystem::modified_time(path).map(|timestamp| ExtractedTime {
                timestamp,
                source: TimeSource::FileModification,
            })
        }
        ClassificationMode::ByMetadataDate => metadata::extract_metadata_time(path),
        ClassificationMode::ByExtension | ClassificationMode::ByType => None,
    };

    match &resolved {
        Some(time) => debug!(?path, timestamp = %time.timestamp, source = ?time.source, "Resolved date"),
        None => debug!(?path, ?mode, "No date resolved"),
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_non_date_modes_have_no_date() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, b"a").unwrap();

        assert!(resolve_date(&path, ClassificationMode::ByExtension).is_none());
        assert!(resolve_date(&path, ClassificationMode::ByType).is_none());
    }

    #[test]
    fn test_modified_date_is_available() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, b"a").unwrap();

        let time = resolve_date(&path, ClassificationMode::ByLastModifiedDate).unwrap();
        assert_eq!(time.source, TimeSource::FileModification);
    }

    #[test]
    fn test_missing_file_has_no_date() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.jpg");

        assert!(resolve_date(&path, ClassificationMode::ByCreationDate).is_none());
        assert!(resolve_date(&path, ClassificationMode::ByLastModifiedDate).is_none());
        assert!(resolve_date(&path, ClassificationMode::ByMetadataDate).is_none());
    }

    #[test]
    fn test_metadata_mode_without_metadata() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, b"plain text, nothing embedded").unwrap();

        assert!(resolve_date(&path, ClassificationMode::ByMetadataDate).is_none());
    }
}
