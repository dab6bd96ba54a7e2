//! Classification strategies
//!
//! Each strategy maps a source file to the destination directory it belongs
//! in. The result never depends on anything but the inputs, so the same file
//! classified twice under the same mode lands in the same place.

use crate::config::ClassificationMode;
use crate::filetype::{FileCategory, file_extension};
use chrono::{Datelike, NaiveDateTime};
use std::path::{Path, PathBuf};

/// Folder collecting files that have no usable date
pub const PENDING_DIR: &str = "0_Pending";

/// Strategy selected by the classification mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationStrategy {
    /// destination/YYYY/M, or the pending folder when there is no date
    ByDate,
    /// destination/<extension>
    ByExtension,
    /// destination/<category>
    ByType,
}

impl ClassificationStrategy {
    /// The three date modes share one strategy; they differ only in date source
    pub fn for_mode(mode: ClassificationMode) -> Self {
        match mode {
            ClassificationMode::ByCreationDate
            | ClassificationMode::ByMetadataDate
            | ClassificationMode::ByLastModifiedDate => ClassificationStrategy::ByDate,
            ClassificationMode::ByExtension => ClassificationStrategy::ByExtension,
            ClassificationMode::ByType => ClassificationStrategy::ByType,
        }
    }

    /// Destination directory for `origin_file`, or `None` if it can't be classified
    pub fn classify(
        &self,
        origin_file: &Path,
        dest_root: &Path,
        date: Option<&NaiveDateTime>,
        pending_allowed: bool,
    ) -> Option<PathBuf> {
        match self {
            ClassificationStrategy::ByDate => classify_by_date(origin_file, dest_root, date, pending_allowed),
            ClassificationStrategy::ByExtension => {
                let ext = file_extension(origin_file);
                if ext.is_empty() {
                    Some(dest_root.to_path_buf())
                } else {
                    Some(dest_root.join(ext))
                }
            }
            ClassificationStrategy::ByType => {
                let category = FileCategory::from_extension(&file_extension(origin_file));
                Some(dest_root.join(category.folder_name()))
            }
        }
    }
}

fn classify_by_date(
    origin_file: &Path,
    dest_root: &Path,
    date: Option<&NaiveDateTime>,
    pending_allowed: bool,
) -> Option<PathBuf> {
    if let Some(date) = date {
        let mut dest = dest_root.to_path_buf();
        dest.push(date.year().to_string());
        dest.push(date.month().to_string());
        return Some(dest);
    }

    if !pending_allowed {
        return None;
    }

    let mut dest = dest_root.join(PENDING_DIR);
    if let Some(parent_name) = origin_file.parent().and_then(|p| p.file_name()) {
        dest.push(parent_name);
    }
    Some(dest)
}
