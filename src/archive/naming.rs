//! Names used inside and for the archive.

use std::collections::HashSet;

/// Entry name used when the provider reports none.
pub const FALLBACK_ENTRY_NAME: &str = "file";

/// Make a remote file name safe as a flat archive entry name.
///
/// Path separators become `_`, control characters are dropped and leading
/// dots are stripped so entries cannot escape or hide on extraction.
pub fn sanitize_entry_name(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '/' | '\\' => '_',
            _ => c,
        })
        .collect();
    let trimmed = cleaned.trim().trim_start_matches('.').trim();
    if trimmed.is_empty() {
        FALLBACK_ENTRY_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Hands out distinct entry names for one archive.
#[derive(Debug, Default)]
pub struct EntryNamer {
    used: HashSet<String>,
}

impl EntryNamer {
    /// Sanitized, de-duplicated name: `a.jpg`, `a (2).jpg`, `a (3).jpg`, ...
    ///
    /// Comparison ignores case so archives extract cleanly on
    /// case-insensitive file systems.
    pub fn unique(&mut self, raw: Option<&str>) -> String {
        let base = sanitize_entry_name(raw.unwrap_or(FALLBACK_ENTRY_NAME));
        if self.used.insert(base.to_lowercase()) {
            return base;
        }

        let (stem, ext) = split_extension(&base);
        let mut n = 2;
        loop {
            let candidate = format!("{stem} ({n}){ext}");
            if self.used.insert(candidate.to_lowercase()) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// Split `photo.tar.gz` into (`photo.tar`, `.gz`); names without an
/// extension (or dot-only prefixes) keep an empty extension.
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => name.split_at(idx),
        _ => (name, ""),
    }
}

/// Download filename derived from a folder's display name.
pub fn archive_filename(display_name: &str, fallback: &str) -> String {
    let base: String = display_name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let base = base.trim().trim_matches('_').trim();

    if base.is_empty() {
        return fallback.to_string();
    }
    format!("{base}.zip")
}

/// Content-Disposition value for an attachment download.
///
/// Control characters, quotes and backslashes are replaced in the plain
/// `filename` parameter; non-ASCII names are also given as RFC 5987
/// `filename*`.
pub fn content_disposition(filename: &str) -> String {
    let needs_encoding = !filename.is_ascii()
        || filename
            .chars()
            .any(|c| c.is_control() || c == '"' || c == '\\');

    if !needs_encoding {
        return format!("attachment; filename=\"{filename}\"");
    }

    let ascii_fallback: String = filename
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '"' | '\\' => '_',
            c if !c.is_ascii() => '_',
            c => c,
        })
        .collect();
    let encoded = urlencoding::encode(filename);

    format!("attachment; filename=\"{ascii_fallback}\"; filename*=UTF-8''{encoded}")
}
