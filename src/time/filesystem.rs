//! File system timestamps

use chrono::{DateTime, Local, NaiveDateTime};
use std::fs;
use std::path::Path;
use std::time::SystemTime;
use tracing::trace;

/// Creation (birth) time, if the platform and file system record one
pub fn creation_time(path: &Path) -> Option<NaiveDateTime> {
    let created = fs::metadata(path).and_then(|m| m.created());
    match created {
        Ok(time) => Some(to_local(time)),
        Err(e) => {
            trace!(?path, error = %e, "Creation time unavailable");
            None
        }
    }
}

/// Last modification time
pub fn modified_time(path: &Path) -> Option<NaiveDateTime> {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .map(to_local)
}

/// Convert a system time to local wall-clock time
pub fn to_local(time: SystemTime) -> NaiveDateTime {
    DateTime::<Local>::from(time).naive_local()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use filetime::FileTime;
    use tempfile::NamedTempFile;

    #[test]
    fn test_modified_time_follows_file() {
        let file = NamedTempFile::new().unwrap();
        let target = SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_700_000_000);
        filetime::set_file_mtime(file.path(), FileTime::from_system_time(target)).unwrap();

        let modified = modified_time(file.path()).unwrap();
        assert_eq!(modified, to_local(target));
        assert_eq!(modified.nanosecond(), 0);
    }

    #[test]
    fn test_missing_file() {
        let file = NamedTempFile::new().unwrap();
        let missing = file.path().with_extension("gone");
        assert!(creation_time(&missing).is_none());
        assert!(modified_time(&missing).is_none());
    }
}
