//! Folder scanning - turns a directory into an ordered list of image paths

use crate::config::ScanConfig;
use crate::decode::is_supported_image;
use crate::GalleryError;
use std::fs;
use std::path::{Path, PathBuf};

/// Scan a folder for displayable images with default options
pub fn scan_folder<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>, GalleryError> {
    scan_folder_with(dir, &ScanConfig::default())
}

/// Scan a folder for displayable images, naturally ordered
///
/// Flat scan: subdirectories are not descended into. Hidden files (unless
/// configured in) and unsupported extensions are skipped, and entries that
/// cannot be read are skipped rather than failing the whole scan. Ordering
/// is natural ("img2.png" before "img10.png") so the catalog matches what a
/// file manager shows.
pub fn scan_folder_with<P: AsRef<Path>>(
    dir: P,
    config: &ScanConfig,
) -> Result<Vec<PathBuf>, GalleryError> {
    let dir = dir.as_ref();
    let mut found: Vec<(String, PathBuf)> = Vec::new();

    for entry in fs::read_dir(dir)? {
        let Ok(entry) = entry else { continue };
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let name = match path.file_name() {
            Some(n) => n.to_string_lossy().to_string(),
            None => continue,
        };
        if !config.include_hidden && is_hidden(&path, &name) {
            continue;
        }
        if !is_supported_image(&path) {
            continue;
        }

        found.push((name, path));
    }

    found.sort_by(|a, b| natural_key(&a.0).cmp(&natural_key(&b.0)));
    let paths: Vec<PathBuf> = found.into_iter().map(|(_, path)| path).collect();

    tracing::debug!(dir = %dir.display(), count = paths.len(), "scanned folder");
    Ok(paths)
}

/// Generate a natural sort key (handles numbers correctly)
/// "image2.jpg" < "image10.jpg"
fn natural_key(name: &str) -> Vec<KeyPart> {
    let mut parts = Vec::new();
    let mut buf = String::new();
    let mut numeric = false;

    for c in name.chars() {
        let digit = c.is_ascii_digit();
        if digit != numeric && !buf.is_empty() {
            parts.push(make_part(&buf, numeric));
            buf.clear();
        }
        numeric = digit;
        buf.push(c);
    }
    if !buf.is_empty() {
        parts.push(make_part(&buf, numeric));
    }

    parts
}

fn make_part(buf: &str, numeric: bool) -> KeyPart {
    if numeric {
        // Digit runs too long for u64 compare as text
        buf.parse::<u64>()
            .map(KeyPart::Number)
            .unwrap_or_else(|_| KeyPart::Text(buf.to_string()))
    } else {
        KeyPart::Text(buf.to_lowercase())
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum KeyPart {
    Number(u64),
    Text(String),
}

/// Check if a file is hidden
#[cfg(windows)]
fn is_hidden(path: &Path, _name: &str) -> bool {
    use std::os::windows::fs::MetadataExt;

    const FILE_ATTRIBUTE_HIDDEN: u32 = 0x2;

    fs::metadata(path)
        .map(|m| m.file_attributes() & FILE_ATTRIBUTE_HIDDEN != 0)
        .unwrap_or(false)
}

#[cfg(not(windows))]
fn is_hidden(_path: &Path, name: &str) -> bool {
    name.starts_with('.')
}
