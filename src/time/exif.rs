//! EXIF time extraction for images

use chrono::NaiveDateTime;
use exif::{In, Reader, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::trace;

/// Raw EXIF DateTimeOriginal string from the image container
///
/// Works for JPEG, TIFF (and TIFF-based RAW), HEIF, PNG and WebP.
pub fn read_exif_original_raw(path: &Path) -> Option<String> {
    let file = File::open(path).ok()?;
    let mut reader = BufReader::new(file);

    let exif = match Reader::new().read_from_container(&mut reader) {
        Ok(exif) => exif,
        Err(e) => {
            trace!(?path, error = %e, "No EXIF data");
            return None;
        }
    };

    let field = exif.get_field(Tag::DateTimeOriginal, In::PRIMARY)?;
    // Use the raw ASCII value; display_value() wraps it in quotes
    let raw = match &field.value {
        Value::Ascii(values) if !values.is_empty() => {
            String::from_utf8_lossy(&values[0]).into_owned()
        }
        _ => field.display_value().to_string(),
    };
    Some(raw)
}

/// Read EXIF DateTimeOriginal as a date
///
/// Files without EXIF data or with an unparseable value give `None`.
pub fn extract_exif_original(path: &Path) -> Option<NaiveDateTime> {
    let raw = read_exif_original_raw(path)?;
    let datetime = parse_exif_datetime(&raw);
    trace!(?path, raw = %raw, ?datetime, "Found EXIF DateTimeOriginal");
    datetime
}

/// Parse EXIF datetime string format: "YYYY:MM:DD HH:MM:SS"
pub fn parse_exif_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim().trim_matches('"').trim_end_matches('\0');

    // Standard EXIF format, with or without subseconds
    for format in ["%Y:%m:%d %H:%M:%S", "%Y:%m:%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt);
        }
    }

    None
}

/// Minimal JPEG with an optional EXIF DateTimeOriginal and XMP packet
#[cfg(test)]
pub(crate) fn build_jpeg(exif_datetime: Option<&str>, xmp: Option<&[u8]>) -> Vec<u8> {
    use exif::Field;
    use exif::experimental::Writer;
    use std::io::Cursor;

    fn push_segment(jpeg: &mut Vec<u8>, marker: u8, body: &[u8]) {
        jpeg.extend_from_slice(&[0xFF, marker]);
        jpeg.extend_from_slice(&((body.len() + 2) as u16).to_be_bytes());
        jpeg.extend_from_slice(body);
    }

    let mut jpeg = vec![0xFF, 0xD8];

    if let Some(datetime) = exif_datetime {
        let field = Field {
            tag: Tag::DateTimeOriginal,
            ifd_num: In::PRIMARY,
            value: Value::Ascii(vec![datetime.as_bytes().to_vec()]),
        };
        let mut writer = Writer::new();
        writer.push_field(&field);
        let mut tiff = Cursor::new(Vec::new());
        writer.write(&mut tiff, false).unwrap();

        let mut body = b"Exif\0\0".to_vec();
        body.extend_from_slice(tiff.get_ref());
        push_segment(&mut jpeg, 0xE1, &body);
    }

    if let Some(packet) = xmp {
        let mut body = b"http://ns.adobe.com/xap/1.0/\0".to_vec();
        body.extend_from_slice(packet);
        push_segment(&mut jpeg, 0xE1, &body);
    }

    jpeg.extend_from_slice(&[0xFF, 0xD9]);
    jpeg
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_exif_datetime() {
        let dt = parse_exif_datetime("2024:01:15 14:30:00").unwrap();
        assert_eq!(dt.year(), 2024);
        assert_eq!(dt.month(), 1);
        assert_eq!(dt.day(), 15);
        assert_eq!(dt.hour(), 14);
        assert_eq!(dt.minute(), 30);

        // With quotes
        let dt = parse_exif_datetime("\"2024:01:15 14:30:00\"").unwrap();
        assert_eq!(dt.year(), 2024);

        // Blank EXIF date written by some cameras
        assert!(parse_exif_datetime("0000:00:00 00:00:00").is_none());
        assert!(parse_exif_datetime("invalid").is_none());
    }

    #[test]
    fn test_reads_date_time_original_from_jpeg() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&build_jpeg(Some("2015:06:07 08:09:10"), None))
            .unwrap();
        file.flush().unwrap();

        assert_eq!(
            read_exif_original_raw(file.path()).as_deref(),
            Some("2015:06:07 08:09:10")
        );
        let dt = extract_exif_original(file.path()).unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2015, 6, 7));
        assert_eq!((dt.hour(), dt.minute(), dt.second()), (8, 9, 10));
    }

    #[test]
    fn test_corrupt_image_has_no_exif_date() {
        let mut file = NamedTempFile::new().unwrap();
        // JPEG SOI followed by garbage
        file.write_all(&[0xFF, 0xD8, 0xFF, 0xE1, 0x00, 0x02, 0x13, 0x37]).unwrap();
        file.flush().unwrap();

        assert!(extract_exif_original(file.path()).is_none());
    }
}
