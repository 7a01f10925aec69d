//! Pure string helpers for map locations.
//!
//! Nothing in this module touches the filesystem. Map locations arrive as whatever the host
//! recorded: absolute or relative paths, `file:` URIs, percent-encoded or not, with forward or
//! backward slashes. The helpers here are deliberately tolerant of that mess.

use once_cell::sync::Lazy;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use regex::Regex;
use std::path::Path;
use url::Url;

pub const FILE_SCHEME: &str = "file:";
const UNC_PREFIX: &str = "\\\\";

/// Characters that may not appear verbatim in a URI path reference. Backslashes are left alone:
/// `file` URLs treat them as separators when joining.
const URI_PATH: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'|')
    .add(b'^')
    .add(b'[')
    .add(b']');

/// A URI scheme or a drive letter (`C:`), both of which make a spec absolute.
static SCHEME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:").expect("static regex"));

/// Percent-decode a URI string. Invalid UTF-8 sequences are replaced rather than rejected.
pub fn decode_uri(spec: &str) -> String {
    percent_decode_str(spec).decode_utf8_lossy().into_owned()
}

/// Percent-encode a path so it can be stored as a URI reference.
pub fn encode_for_uri(path: &str) -> String {
    utf8_percent_encode(path, URI_PATH).to_string()
}

/// Remove a leading `file:` scheme (any case).
pub fn strip_scheme(spec: &str) -> &str {
    match spec.get(..FILE_SCHEME.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(FILE_SCHEME) => &spec[FILE_SCHEME.len()..],
        _ => spec,
    }
}

/// Bring a recorded map location into the comparable form used by [points_to_same_map]:
/// scheme stripped, percent-escapes decoded, UNC prefix removed, leading `//…` collapsed to `/`.
pub fn normalize_spec(spec: &str) -> String {
    let decoded = decode_uri(strip_scheme(spec));
    let unc_stripped = decoded.strip_prefix(UNC_PREFIX).unwrap_or(&decoded);
    let trimmed = unc_stripped.trim_start_matches('/');
    if unc_stripped.len() - trimmed.len() >= 2 {
        format!("/{trimmed}")
    } else {
        unc_stripped.to_string()
    }
}

/// True when `spec` names a URI scheme or a drive.
pub fn has_scheme(spec: &str) -> bool {
    SCHEME_RE.is_match(spec)
}

/// A spec is relative when it has no scheme or drive and does not start at a root.
pub fn is_relative_spec(spec: &str) -> bool {
    !spec.is_empty() && !has_scheme(spec) && !spec.starts_with('/') && !spec.starts_with('\\')
}

/// Decide whether two recorded map locations denote the same map.
///
/// Pure string manipulation, in this order: normalize both ([normalize_spec]); equal means same;
/// when one side uses backslashes and the other forward slashes, convert forward slashes to
/// backslashes and compare again; finally a relative side matches an absolute side that ends
/// with it. There is no canonicalization, so paths that differ only through symlinks or letter
/// case on case-insensitive filesystems compare as different.
///
/// The comparison is commutative.
pub fn points_to_same_map(a: &str, b: &str) -> bool {
    let mut a = normalize_spec(a);
    let mut b = normalize_spec(b);
    if a == b {
        return true;
    }

    let mixed = (a.contains('/') && b.contains('\\')) || (a.contains('\\') && b.contains('/'));
    if mixed {
        a = a.replace('/', "\\");
        b = b.replace('/', "\\");
        if a == b {
            return true;
        }
    }

    (is_relative_spec(&b) && a.ends_with(&b)) || (is_relative_spec(&a) && b.ends_with(&a))
}

/// Collapse a path onto a single separator, dropping `.` segments, empty segments and trailing
/// separators, and folding `..` into its parent where one exists.
pub fn normalize_with_separator(path: &str, separator: &str) -> String {
    let unified = path.replace(['/', '\\'], separator);
    let rooted = unified.starts_with(separator);
    let mut parts: Vec<&str> = Vec::new();
    for segment in unified.split(separator) {
        match segment {
            "" | "." => {}
            ".." => match parts.last() {
                Some(last) if *last != ".." => {
                    parts.pop();
                }
                _ if rooted => {}
                _ => parts.push(".."),
            },
            _ => parts.push(segment),
        }
    }
    let body = parts.join(separator);
    if rooted {
        format!("{separator}{body}")
    } else {
        body
    }
}

/// Express `target` relative to the file `base`, by comparing path segments as strings.
///
/// Structured URI relativization behaves differently across platforms, so this walks the two
/// normalized segment lists instead. Returns the empty string when the paths share no leading
/// segment (different drives, or a relative target). A target equal to the base yields the
/// base's file name.
pub fn relative_path_by_string_manipulation(target: &str, base: &str, separator: &str) -> String {
    let normalized_target = normalize_with_separator(target, separator);
    let normalized_base = normalize_with_separator(base, separator);
    if normalized_target.is_empty() || normalized_base.is_empty() {
        return String::new();
    }

    let target_parts: Vec<&str> = normalized_target.split(separator).collect();
    let base_parts: Vec<&str> = normalized_base.split(separator).collect();

    if normalized_target == normalized_base {
        return target_parts.last().map(|s| s.to_string()).unwrap_or_default();
    }

    let common = target_parts
        .iter()
        .zip(base_parts.iter())
        .take_while(|(t, b)| t == b)
        .count();
    if common == 0 {
        tracing::debug!(
            "[relative_path] no common root between '{}' and '{}'",
            normalized_target,
            normalized_base
        );
        return String::new();
    }

    let common_len: usize = target_parts[..common]
        .iter()
        .map(|part| part.len() + separator.len())
        .sum();

    let mut relative = String::new();
    if base_parts.len() != common {
        // The base is a file, so its last segment is not a directory to climb out of.
        let dirs_up = base_parts.len() - common - 1;
        for _ in 0..dirs_up {
            relative.push_str("..");
            relative.push_str(separator);
        }
    }
    relative.push_str(normalized_target.get(common_len..).unwrap_or_default());
    relative
}

/// Absolute `file://` URI for an absolute path.
pub fn file_uri<P: AsRef<Path>>(path: P) -> Option<String> {
    Url::from_file_path(path.as_ref())
        .ok()
        .map(|url| url.to_string())
}

/// Last path component of a spec, decoded. Splits on either slash.
pub fn file_name_of(spec: &str) -> String {
    let decoded = decode_uri(strip_scheme(spec));
    decoded
        .rsplit(['/', '\\'])
        .find(|segment| !segment.is_empty())
        .unwrap_or_default()
        .to_string()
}

/// Split a path string at its last separator, returning the parent and the separator found.
/// A file at the root keeps the root as its parent.
pub fn split_parent(path: &str) -> Option<(&str, char)> {
    let idx = path.rfind(['/', '\\'])?;
    let separator = path[idx..].chars().next()?;
    if idx == 0 {
        Some((&path[..1], separator))
    } else {
        Some((&path[..idx], separator))
    }
}

/// Join a file name onto a parent directory string using the given separator.
pub fn join_spec(parent: &str, separator: char, name: &str) -> String {
    if parent.ends_with(['/', '\\']) {
        format!("{parent}{name}")
    } else {
        format!("{parent}{separator}{name}")
    }
}
