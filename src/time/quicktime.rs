//! QuickTime / ISO-BMFF movie header creation time
//!
//! MP4, MOV, M4V and 3GP files store their creation time in `moov/mvhd` as
//! seconds since 1904-01-01 UTC. A zero value is common for files written by
//! tools that never set it.

use chrono::{DateTime, Utc};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// Seconds between 1904-01-01 and 1970-01-01
const QT_TO_UNIX_OFFSET: i64 = 2_082_844_800;

/// Atom types that may open a QuickTime/ISO-BMFF file
const LEADING_ATOMS: &[[u8; 4]] = &[*b"ftyp", *b"moov", *b"mdat", *b"wide", *b"free", *b"skip"];

#[derive(Debug, Clone, Copy)]
struct AtomRange {
    data_start: u64,
    data_end: u64,
}

/// Movie creation time formatted as `YYYY-MM-DDTHH:MM:SSZ` (UTC)
///
/// Returns the raw tag text rather than a parsed date so that the sentinel
/// `1904-01-01T00:00:00Z` is visible to the metadata date parser.
pub fn creation_time_tag(path: &Path) -> Option<String> {
    let mut file = File::open(path).ok()?;
    let file_len = file.metadata().ok()?.len();

    if !looks_like_movie(&mut file)? {
        return None;
    }

    let moov = find_atom(&mut file, 0, file_len, *b"moov")?;
    let mvhd = find_atom(&mut file, moov.data_start, moov.data_end, *b"mvhd")?;
    let qt_seconds = read_mvhd_creation(&mut file, mvhd)?;

    let unix = i64::try_from(qt_seconds).ok()?.checked_sub(QT_TO_UNIX_OFFSET)?;
    let utc = DateTime::<Utc>::from_timestamp(unix, 0)?;
    Some(utc.format("%Y-%m-%dT%H:%M:%SZ").to_string())
}

fn looks_like_movie(file: &mut File) -> Option<bool> {
    let mut header = [0u8; 8];
    file.seek(SeekFrom::Start(0)).ok()?;
    if file.read_exact(&mut header).is_err() {
        return Some(false);
    }
    let kind = [header[4], header[5], header[6], header[7]];
    Some(LEADING_ATOMS.contains(&kind))
}

fn find_atom(file: &mut File, start: u64, end: u64, atom_type: [u8; 4]) -> Option<AtomRange> {
    let mut offset = start;
    while offset + 8 <= end {
        file.seek(SeekFrom::Start(offset)).ok()?;
        let mut header = [0u8; 8];
        file.read_exact(&mut header).ok()?;
        let mut atom_size = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as u64;
        let atom_kind = [header[4], header[5], header[6], header[7]];
        let mut header_size = 8u64;

        if atom_size == 1 {
            let mut ext = [0u8; 8];
            file.read_exact(&mut ext).ok()?;
            atom_size = u64::from_be_bytes(ext);
            header_size = 16;
        } else if atom_size == 0 {
            // Atom extends to the end of its container
            atom_size = end.saturating_sub(offset);
        }
        if atom_size < header_size {
            return None;
        }
        let atom_end = offset.saturating_add(atom_size).min(end);

        if atom_kind == atom_type {
            return Some(AtomRange {
                data_start: offset + header_size,
                data_end: atom_end,
            });
        }
        offset = atom_end;
    }
    None
}

fn read_mvhd_creation(file: &mut File, mvhd: AtomRange) -> Option<u64> {
    file.seek(SeekFrom::Start(mvhd.data_start)).ok()?;
    let mut version_flags = [0u8; 4];
    file.read_exact(&mut version_flags).ok()?;

    if version_flags[0] == 1 {
        if mvhd.data_start + 12 > mvhd.data_end {
            return None;
        }
        let mut buf = [0u8; 8];
        file.read_exact(&mut buf).ok()?;
        Some(u64::from_be_bytes(buf))
    } else {
        if mvhd.data_start + 8 > mvhd.data_end {
            return None;
        }
        let mut buf = [0u8; 4];
        file.read_exact(&mut buf).ok()?;
        Some(u32::from_be_bytes(buf) as u64)
    }
}

/// Build a minimal movie file: ftyp + moov(mvhd v0)
#[cfg(test)]
pub(crate) fn build_movie(qt_seconds: u32) -> Vec<u8> {
    let mut data = Vec::new();
    // ftyp
    data.extend_from_slice(&16u32.to_be_bytes());
    data.extend_from_slice(b"ftypisom");
    data.extend_from_slice(&[0, 0, 2, 0]);
    // mvhd: header 8 + version/flags 4 + creation 4 + modification 4
    let mut mvhd = Vec::new();
    mvhd.extend_from_slice(&20u32.to_be_bytes());
    mvhd.extend_from_slice(b"mvhd");
    mvhd.extend_from_slice(&[0, 0, 0, 0]);
    mvhd.extend_from_slice(&qt_seconds.to_be_bytes());
    mvhd.extend_from_slice(&qt_seconds.to_be_bytes());
    // moov
    data.extend_from_slice(&((8 + mvhd.len()) as u32).to_be_bytes());
    data.extend_from_slice(b"moov");
    data.extend_from_slice(&mvhd);
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn movie_file(qt_seconds: u32) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&build_movie(qt_seconds)).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_zero_creation_time_is_1904() {
        let file = movie_file(0);
        assert_eq!(
            creation_time_tag(file.path()).as_deref(),
            Some("1904-01-01T00:00:00Z")
        );
    }

    #[test]
    fn test_creation_time() {
        // 2024-03-05T10:15:30Z
        let unix = 1_709_633_730i64;
        let file = movie_file((unix + QT_TO_UNIX_OFFSET) as u32);
        assert_eq!(
            creation_time_tag(file.path()).as_deref(),
            Some("2024-03-05T10:15:30Z")
        );
    }

    #[test]
    fn test_non_movie_is_ignored() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"just some text that is not a movie").unwrap();
        file.flush().unwrap();
        assert!(creation_time_tag(file.path()).is_none());
    }

    #[test]
    fn test_truncated_movie() {
        let mut data = build_movie(100);
        data.truncate(30);
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&data).unwrap();
        file.flush().unwrap();
        assert!(creation_time_tag(file.path()).is_none());
    }
}
