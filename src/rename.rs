//! Date-stamped renaming of destination files

use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};

/// Format of the date part of a renamed file
pub const RENAME_DATE_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Replace the file name of `dest` with its date
///
/// The new name is `<date>.<ext>` where `<ext>` keeps its own leading dot,
/// so `img.png` becomes `2024-03-05_10-15-30..png` and a file without an
/// extension ends in a single dot. Existing archives depend on this exact
/// shape. Without a date the path is returned unchanged.
pub fn rename_with_date(dest: &Path, date: Option<&NaiveDateTime>) -> PathBuf {
    let Some(date) = date else {
        return dest.to_path_buf();
    };

    let original_name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    // A dot at index 0 starts a hidden name, not an extension
    let extension = match original_name.rfind('.') {
        Some(idx) if idx > 0 => &original_name[idx..],
        _ => "",
    };

    let new_name = format!("{}.{}", date.format(RENAME_DATE_FORMAT), extension);
    dest.with_file_name(new_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_date() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(10, 15, 30)
            .unwrap()
    }

    #[test]
    fn test_rename_keeps_double_dot() {
        let dt = sample_date();
        let renamed = rename_with_date(Path::new("/dest/2024/3/img.png"), Some(&dt));
        assert_eq!(renamed, PathBuf::from("/dest/2024/3/2024-03-05_10-15-30..png"));
    }

    #[test]
    fn test_rename_without_extension_keeps_trailing_dot() {
        let dt = sample_date();
        let renamed = rename_with_date(Path::new("/dest/README"), Some(&dt));
        assert_eq!(renamed.file_name().unwrap(), "2024-03-05_10-15-30.");
    }

    #[test]
    fn test_rename_hidden_file_has_no_extension() {
        let dt = sample_date();
        let renamed = rename_with_date(Path::new("/dest/.profile"), Some(&dt));
        assert_eq!(renamed.file_name().unwrap(), "2024-03-05_10-15-30.");
    }

    #[test]
    fn test_rename_uses_last_dot() {
        let dt = sample_date();
        let renamed = rename_with_date(Path::new("/dest/backup.tar.gz"), Some(&dt));
        assert_eq!(renamed.file_name().unwrap(), "2024-03-05_10-15-30..gz");
    }

    #[test]
    fn test_no_date_leaves_path_unchanged() {
        let path = Path::new("/dest/0_Pending/trip/img.png");
        assert_eq!(rename_with_date(path, None), path.to_path_buf());
    }
}
