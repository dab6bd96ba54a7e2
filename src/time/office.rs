//! Office document properties
//!
//! OOXML files (docx, xlsx, pptx) keep their dates in `docProps/core.xml`,
//! OpenDocument files in `meta.xml`. Both are zip archives.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::trace;
use zip::ZipArchive;

/// Local file header signature every zip archive starts with
pub const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// Property parts, in lookup order
const PROPERTY_PARTS: &[&str] = &["docProps/core.xml", "meta.xml"];

/// Property parts larger than this are truncated
const MAX_PART_SIZE: u64 = 1024 * 1024;

/// Raw XML of the document property part, if the archive has one
pub fn read_properties(path: &Path) -> Option<Vec<u8>> {
    let file = File::open(path).ok()?;
    let mut archive = match ZipArchive::new(file) {
        Ok(archive) => archive,
        Err(e) => {
            trace!(?path, error = %e, "Not a readable zip archive");
            return None;
        }
    };

    for &name in PROPERTY_PARTS {
        let Ok(part) = archive.by_name(name) else {
            continue;
        };
        let mut xml = Vec::new();
        match part.take(MAX_PART_SIZE).read_to_end(&mut xml) {
            Ok(_) => {
                trace!(?path, part = name, "Found document properties");
                return Some(xml);
            }
            Err(e) => trace!(?path, part = name, error = %e, "Failed to read document properties"),
        }
    }

    None
}

/// Zip archive holding the given parts, for tests
#[cfg(test)]
pub(crate) fn build_archive(parts: &[(&str, &str)]) -> Vec<u8> {
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;

    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    for (name, content) in parts {
        zip.start_file(*name, options).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_reads_core_properties() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(
            file.path(),
            build_archive(&[
                ("[Content_Types].xml", "<Types/>"),
                ("docProps/core.xml", "<cp:coreProperties/>"),
            ]),
        )
        .unwrap();

        let xml = read_properties(file.path()).unwrap();
        assert_eq!(xml, b"<cp:coreProperties/>");
    }

    #[test]
    fn test_archive_without_properties() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), build_archive(&[("notes.txt", "hello")])).unwrap();
        assert!(read_properties(file.path()).is_none());
    }

    #[test]
    fn test_truncated_archive_is_none() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"PK\x03\x04\x14\x00").unwrap();
        assert!(read_properties(file.path()).is_none());
    }
}
