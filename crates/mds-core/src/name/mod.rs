//! Display-name derivation for finished artifacts.
//!
//! The delivered file is named from the caller's requested name (sanitized)
//! or the source title the engine reported, with the extension fixed by the
//! media kind.

mod sanitize;

pub use sanitize::sanitize_file_name;

use crate::job::MediaKind;

/// Fallback base name when neither the caller nor the engine provided one.
const DEFAULT_BASE_NAME: &str = "download";

/// Derives the name presented to the client on download.
///
/// Preference order: sanitized `requested` name, sanitized engine `title`,
/// then a fixed fallback. The kind's extension is always appended (a
/// trailing copy of it in the base is dropped first, so `clip.mp4` does not
/// become `clip.mp4.mp4`).
pub fn derive_display_name(
    requested: Option<&str>,
    title: Option<&str>,
    kind: MediaKind,
) -> String {
    let base = requested
        .map(sanitize_file_name)
        .filter(|s| is_usable(s))
        .or_else(|| title.map(sanitize_file_name).filter(|s| is_usable(s)))
        .unwrap_or_else(|| DEFAULT_BASE_NAME.to_string());

    let ext = kind.extension();
    let suffix = format!(".{ext}");
    let base = base.strip_suffix(&suffix).unwrap_or(&base);
    format!("{base}{suffix}")
}

fn is_usable(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".."
}
