//! Embedded metadata dates
//!
//! Collects date-like tags from the metadata embedded in a file and picks the
//! creation date by a fixed tag priority. Supported carriers:
//! - EXIF DateTimeOriginal of the image
//! - XMP packets (images, PDFs, videos)
//! - PDF document information dictionary
//! - Office document properties (OOXML and OpenDocument)
//! - QuickTime / ISO-BMFF movie header

use super::{ExtractedTime, TimeSource, exif, office, quicktime};
use chrono::{DateTime, NaiveDateTime};
use regex::bytes::Regex;
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::OnceLock;
use tracing::trace;

/// Tags consulted for the creation date, in priority order
pub const CREATION_DATE_TAGS: &[&str] = &[
    "dcterms:created",       // XMP Dublin Core terms
    "photoshop:DateCreated", // Photoshop
    "Exif:DateTimeOriginal", // EXIF mirrored into XMP
    "xmp:CreateDate",        // XMP basic creation date
    "xmp:ModifyDate",        // XMP basic modification date
    "dc:created",            // Dublin Core
    "Creation-Date",         // PDF information dictionary
    "meta:created",          // OpenDocument creation date
    "date",                  // Last-saved date of office documents
];

/// Null date written by tools that leave the QuickTime creation time at zero
pub const NULL_DATE_SENTINEL: &str = "1904-01-01T00:00:00Z";

/// Files up to this size are scanned whole for embedded metadata
const FULL_SCAN_LIMIT: u64 = 16 * 1024 * 1024;

/// Bytes scanned from the start of larger files
const HEAD_SCAN: u64 = 8 * 1024 * 1024;

/// Bytes scanned from the end of larger files (PDF trailers, appended XMP)
const TAIL_SCAN: u64 = 1024 * 1024;

fn xmp_packet_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?s)<x:xmpmeta[\s>].*?</x:xmpmeta>").expect("valid XMP packet pattern")
    })
}

fn xmp_element_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"<([A-Za-z][\w.-]*:[\w.-]+)(?:\s[^>]*)?>([^<]*)</([A-Za-z][\w.-]*:[\w.-]+)>")
            .expect("valid XMP element pattern")
    })
}

fn xmp_attribute_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"\s([A-Za-z][\w.-]*:[\w.-]+)\s*=\s*["']([^"']*)["']"#)
            .expect("valid XMP attribute pattern")
    })
}

fn pdf_creation_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"/CreationDate\s*\(D:(\d{4})(\d{2})(\d{2})(\d{2})(\d{2})(\d{2})(?:(Z)|([+-])(\d{2})'?(\d{2})'?)?",
        )
        .expect("valid PDF date pattern")
    })
}

/// Date tags found in a file's embedded metadata
///
/// Tag names are compared ASCII case-insensitively; the first carrier to
/// define a tag wins. Carriers are read in the order EXIF, XMP, PDF info,
/// office properties, QuickTime.
#[derive(Debug, Default, Clone)]
pub struct MetadataTags {
    tags: HashMap<String, String>,
}

impl MetadataTags {
    /// Collect tags from every supported carrier in the file
    pub fn read(path: &Path) -> std::io::Result<Self> {
        let bytes = read_scan_window(path)?;
        let mut tags = Self::default();
        if let Some(raw) = exif::read_exif_original_raw(path)
            && let Some(original) = exif::parse_exif_datetime(&raw)
        {
            tags.insert(
                "Exif:DateTimeOriginal",
                &original.format("%Y-%m-%dT%H:%M:%S").to_string(),
            );
        }
        tags.collect_xmp(&bytes);
        tags.collect_pdf_info(&bytes);
        if bytes.starts_with(office::ZIP_MAGIC)
            && let Some(properties) = office::read_properties(path)
        {
            tags.collect_office(&properties);
        }
        if let Some(created) = quicktime::creation_time_tag(path) {
            tags.insert("dcterms:created", &created);
        }
        Ok(tags)
    }

    /// Value of a tag, if present
    pub fn get(&self, name: &str) -> Option<&str> {
        self.tags.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    fn insert(&mut self, name: &str, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            return;
        }
        self.tags
            .entry(name.to_ascii_lowercase())
            .or_insert_with(|| value.to_string());
    }

    fn collect_xmp(&mut self, bytes: &[u8]) {
        for packet in xmp_packet_pattern().find_iter(bytes) {
            let packet = packet.as_bytes();
            for caps in xmp_element_pattern().captures_iter(packet) {
                if caps[1] != caps[3] {
                    continue;
                }
                let name = String::from_utf8_lossy(&caps[1]);
                let value = String::from_utf8_lossy(&caps[2]);
                self.insert(&name, &value);
            }
            for caps in xmp_attribute_pattern().captures_iter(packet) {
                let name = String::from_utf8_lossy(&caps[1]);
                if name.starts_with("xmlns:") {
                    continue;
                }
                let value = String::from_utf8_lossy(&caps[2]);
                self.insert(&name, &value);
            }
        }
    }

    fn collect_pdf_info(&mut self, bytes: &[u8]) {
        if !bytes.starts_with(b"%PDF") {
            return;
        }
        let Some(caps) = pdf_creation_pattern().captures(bytes) else {
            return;
        };
        let text = |i: usize| {
            caps.get(i)
                .map(|m| String::from_utf8_lossy(m.as_bytes()).into_owned())
                .unwrap_or_default()
        };
        let mut value = format!(
            "{}-{}-{}T{}:{}:{}",
            text(1),
            text(2),
            text(3),
            text(4),
            text(5),
            text(6)
        );
        if caps.get(7).is_some() {
            value.push('Z');
        } else if caps.get(8).is_some() {
            value.push_str(&format!("{}{}:{}", text(8), text(9), text(10)));
        }
        self.insert("Creation-Date", &value);
    }

    fn collect_office(&mut self, xml: &[u8]) {
        for caps in xmp_element_pattern().captures_iter(xml) {
            if caps[1] != caps[3] {
                continue;
            }
            let name = String::from_utf8_lossy(&caps[1]).to_ascii_lowercase();
            let value = String::from_utf8_lossy(&caps[2]);
            let tag = match name.as_str() {
                "meta:creation-date" => "meta:created",
                "dcterms:modified" | "dc:date" => "date",
                other => other,
            };
            self.insert(tag, &value);
        }
    }
}

/// Read the part of the file that is scanned for embedded metadata
fn read_scan_window(path: &Path) -> std::io::Result<Vec<u8>> {
    let mut file = File::open(path)?;
    let len = file.metadata()?.len();

    if len <= FULL_SCAN_LIMIT {
        let mut bytes = Vec::with_capacity(len as usize);
        file.read_to_end(&mut bytes)?;
        return Ok(bytes);
    }

    let mut bytes = vec![0u8; HEAD_SCAN as usize];
    file.read_exact(&mut bytes)?;
    file.seek(SeekFrom::Start(len - TAIL_SCAN))?;
    let mut tail = Vec::with_capacity(TAIL_SCAN as usize);
    file.read_to_end(&mut tail)?;
    bytes.extend_from_slice(&tail);
    Ok(bytes)
}

/// Creation date embedded in the file
///
/// The first tag of [`CREATION_DATE_TAGS`] present in the file decides the
/// outcome, even when its value doesn't parse. Only if none is present is
/// EXIF DateTimeOriginal read again as a last resort.
pub fn extract_metadata_time(path: &Path) -> Option<ExtractedTime> {
    let tags = match MetadataTags::read(path) {
        Ok(tags) => tags,
        Err(e) => {
            trace!(?path, error = %e, "Failed to read embedded metadata");
            return None;
        }
    };

    for &tag in CREATION_DATE_TAGS {
        if let Some(value) = tags.get(tag) {
            trace!(?path, tag, value, "Found metadata date tag");
            return parse_metadata_date(value).map(|timestamp| ExtractedTime {
                timestamp,
                source: TimeSource::MetadataTag(tag),
            });
        }
    }

    exif::extract_exif_original(path).map(|timestamp| ExtractedTime {
        timestamp,
        source: TimeSource::ExifOriginal,
    })
}

/// Parse a metadata date string
///
/// The null sentinel is rejected, a trailing `Z` is dropped, and the rest is
/// tried as ISO date-time (offsets are dropped, keeping the wall-clock time),
/// then `yyyy-MM-dd HH:mm:ss`, then `yyyy-MM-dd'T'HH:mm:ss`.
pub fn parse_metadata_date(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value == NULL_DATE_SENTINEL {
        return None;
    }
    let value = value.strip_suffix('Z').unwrap_or(value);

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_local());
    }

    let formats = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
    ];
    for format in formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt);
        }
    }

    None
}
