//! Extension to file category table used by type classification

use std::path::Path;

/// Semantic category of a file, named after the folder it is filed under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileCategory {
    Images,
    Videos,
    Music,
    Documents,
    Compressed,
    Executables,
    Code,
    Design,
    DiskImage,
    Others,
}

impl FileCategory {
    /// Get the folder name for this category
    pub fn folder_name(&self) -> &'static str {
        match self {
            FileCategory::Images => "Images",
            FileCategory::Videos => "Videos",
            FileCategory::Music => "Music",
            FileCategory::Documents => "Documents",
            FileCategory::Compressed => "Compressed",
            FileCategory::Executables => "Executables",
            FileCategory::Code => "Code",
            FileCategory::Design => "Design",
            FileCategory::DiskImage => "DiskImage",
            FileCategory::Others => "Others",
        }
    }

    /// Look up the category of an extension (case-insensitive, without dot)
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" | "png" | "gif" | "bmp" | "tiff" | "tif" | "svg" | "webp" | "ico" => {
                FileCategory::Images
            }
            "mp4" | "avi" | "mkv" | "mov" | "wmv" | "flv" | "webm" | "mpg" | "mpeg" | "3gp" => {
                FileCategory::Videos
            }
            "mp3" | "wav" | "flac" | "aac" | "ogg" | "wma" | "m4a" | "aiff" => FileCategory::Music,
            "pdf" | "doc" | "docx" | "xls" | "xlsx" | "ppt" | "pptx" | "txt" | "odt" | "rtf"
            | "md" => FileCategory::Documents,
            "zip" | "rar" | "7z" | "tar" | "gz" | "bz2" | "xz" => FileCategory::Compressed,
            "exe" | "msi" | "bat" | "sh" | "bin" | "jar" => FileCategory::Executables,
            "java" | "py" | "js" | "html" | "css" | "cpp" | "c" | "h" | "php" | "rb" | "swift"
            | "kt" | "go" | "rs" | "ts" | "xml" => FileCategory::Code,
            "dwg" | "dxf" | "ai" | "eps" => FileCategory::Design,
            "iso" | "dmg" | "vmdk" | "img" => FileCategory::DiskImage,
            _ => FileCategory::Others,
        }
    }
}

/// Text after the last '.' of the file name, or "" when there is none
///
/// Unlike `Path::extension`, a leading dot counts: `.bashrc` yields `bashrc`.
pub fn file_extension(path: &Path) -> String {
    let name = match path.file_name() {
        Some(name) => name.to_string_lossy(),
        None => return String::new(),
    };
    match name.rfind('.') {
        Some(idx) => name[idx + 1..].to_string(),
        None => String::new(),
    }
}
