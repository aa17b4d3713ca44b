//! Filename hygiene for client-declared names and spool artifacts.
//!
//! Client filenames are untrusted. Only the sanitized base name survives
//! into the stored filename; everything path-like is stripped or replaced
//! before any filesystem operation sees it.

use crate::{ALLOWED_EXTENSIONS, CHUNK_INDEX_WIDTH};
use time::OffsetDateTime;
use uuid::Uuid;

/// Maximum length of the sanitized base name.
const MAX_BASE_LEN: usize = 64;

/// Extract the lowercase extension of a filename, if any.
pub fn extension(name: &str) -> Option<String> {
    std::path::Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Check a declared filename against the extension allow-list.
pub fn extension_allowed(name: &str) -> bool {
    extension(name).is_some_and(|e| ALLOWED_EXTENSIONS.contains(&e.as_str()))
}

/// Sanitize the base name of a client-declared filename: strip any path,
/// keep ASCII alphanumerics, `_` and `-`, replace everything else with `_`,
/// and bound the length. Never empty.
pub fn sanitize_base(name: &str) -> String {
    let stem = std::path::Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("");

    let out: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_BASE_LEN)
        .collect();

    if out.chars().all(|c| c == '_') {
        "video".to_string()
    } else {
        out
    }
}

/// Build the stored filename for an assembled video: sanitized base plus a
/// UTC timestamp. Collision handling escalates to [`stored_name_with_suffix`].
pub fn stored_name(original: &str, now: OffsetDateTime) -> String {
    format!(
        "{}_{}.{}",
        sanitize_base(original),
        timestamp_tag(now),
        extension(original).unwrap_or_else(|| "mp4".to_string())
    )
}

/// Collision fallback: adds a short random tag on top of the timestamp.
pub fn stored_name_with_suffix(original: &str, now: OffsetDateTime) -> String {
    let tag = Uuid::new_v4().simple().to_string();
    format!(
        "{}_{}_{}.{}",
        sanitize_base(original),
        timestamp_tag(now),
        &tag[..8],
        extension(original).unwrap_or_else(|| "mp4".to_string())
    )
}

/// Chunk file name for an index, zero-padded so that lexical and numeric
/// ordering coincide during assembly.
pub fn chunk_file_name(index: u32) -> String {
    format!("chunk_{index:0width$}", width = CHUNK_INDEX_WIDTH)
}

fn timestamp_tag(now: OffsetDateTime) -> String {
    format!(
        "{:04}{:02}{:02}{:02}{:02}{:02}",
        now.year(),
        u8::from(now.month()),
        now.day(),
        now.hour(),
        now.minute(),
        now.second()
    )
}
