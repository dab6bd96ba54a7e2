//! Platform-specific file attributes

use std::io;
use std::path::Path;
use std::time::SystemTime;

/// Set the creation (birth) time of `path`
#[cfg(windows)]
pub fn set_creation_time(path: &Path, created: SystemTime) -> io::Result<()> {
    use std::fs::{FileTimes, OpenOptions};
    use std::os::windows::fs::FileTimesExt;

    let file = OpenOptions::new().write(true).open(path)?;
    file.set_times(FileTimes::new().set_created(created))
}

/// Set the creation (birth) time of `path`
///
/// Unix file systems expose birth time read-only; this is a no-op.
#[cfg(not(windows))]
pub fn set_creation_time(path: &Path, created: SystemTime) -> io::Result<()> {
    tracing::trace!(?path, ?created, "Creation time is read-only on this platform");
    Ok(())
}
