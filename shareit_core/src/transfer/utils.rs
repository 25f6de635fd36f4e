use std::path::Path;

use super::constants::{MAX_FILENAME_LENGTH, STAGING_PREFIX_LEN, UUID_LEN};
use crate::error::{Result, ShareError};

/// Check for the canonical lowercase textual UUID form (8-4-4-4-12 hex).
pub fn is_canonical_uuid(s: &str) -> bool {
    s.len() == UUID_LEN
        && s.bytes().enumerate().all(|(i, b)| match i {
            8 | 13 | 18 | 23 => b == b'-',
            _ => matches!(b, b'0'..=b'9' | b'a'..=b'f'),
        })
}

/// Remove the `<uuid>_` prefix that upload staging puts in front of names.
///
/// Names that don't carry the prefix come back unchanged, so applying this
/// to an already stripped name is a no-op. The length guard counts UTF-16
/// units, and the character after the UUID is dropped whatever it is.
pub fn strip_staging_prefix(name: &str) -> &str {
    if name.encode_utf16().count() <= STAGING_PREFIX_LEN || !name.contains('_') {
        return name;
    }

    match name.get(..UUID_LEN) {
        Some(prefix) if is_canonical_uuid(prefix) => {
            // The prefix is ASCII, so UUID_LEN is a char boundary
            let mut rest = name[UUID_LEN..].chars();
            rest.next();
            rest.as_str()
        }
        _ => name,
    }
}

/// Name shown to the peer for a file on disk.
pub fn display_name(path: &Path) -> Result<String> {
    let base = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ShareError::InvalidFileName(path.to_path_buf()))?;
    Ok(strip_staging_prefix(base).to_string())
}

/// Sanitize file name to prevent path traversal attacks and ensure safety
pub fn sanitize_file_name(file_name: &str) -> String {
    // Take the last component of either separator style
    let file_name = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();

    let mut clean_name: String = file_name.chars().filter(|c| !c.is_control()).collect();

    if clean_name == ".." || clean_name == "." || clean_name.trim().is_empty() {
        return "unknown_file".to_string();
    }

    if clean_name.len() > MAX_FILENAME_LENGTH {
        let mut cut = MAX_FILENAME_LENGTH;
        while !clean_name.is_char_boundary(cut) {
            cut -= 1;
        }
        clean_name.truncate(cut);
    }

    clean_name
}
