//! Content-type to file-extension resolution and key helpers.

use std::borrow::Cow;

use unistore_common::FOLDER_TYPE;

/// Known content types and their extensions, canonical extension first.
const EXTENSIONS: &[(&str, &[&str])] = &[
    // Text
    ("text/plain", &["txt", "text", "conf", "log"]),
    ("text/html", &["html", "htm"]),
    ("text/css", &["css"]),
    ("text/javascript", &["js", "mjs"]),
    // Application
    ("application/json", &["json"]),
    ("application/xml", &["xml"]),
    ("application/javascript", &["js"]),
    ("application/pdf", &["pdf"]),
    ("application/zip", &["zip"]),
    ("application/gzip", &["gz"]),
    ("application/x-www-form-urlencoded", &[]),
    ("application/msword", &["doc", "dot"]),
    (
        "application/vnd.ms-excel",
        &["xls", "xlm", "xla", "xlc", "xlt", "xlw"],
    ),
    ("application/vnd.ms-powerpoint", &["ppt", "pps", "pot"]),
    ("application/ogg", &["ogx"]),
    ("application/rtf", &["rtf"]),
    // Image
    ("image/jpeg", &["jpg", "jpeg", "jpe"]),
    ("image/png", &["png"]),
    ("image/gif", &["gif"]),
    ("image/bmp", &["bmp"]),
    ("image/webp", &["webp"]),
    ("image/svg+xml", &["svg", "svgz"]),
    ("image/tiff", &["tif", "tiff"]),
    // Audio
    ("audio/mpeg", &["mp3", "mpga", "mp2"]),
    ("audio/ogg", &["ogg", "oga", "spx", "opus"]),
    ("audio/wav", &["wav"]),
    ("audio/webm", &["weba"]),
    // Video
    ("video/mp4", &["mp4", "mp4v", "mpg4"]),
    ("video/mpeg", &["mpeg", "mpg", "mpe"]),
    ("video/webm", &["webm"]),
    ("video/ogg", &["ogv"]),
    // Multipart
    ("multipart/form-data", &[]),
    ("multipart/mixed", &[]),
    ("multipart/alternative", &[]),
];

/// Extensions registered for a content type, canonical first.
///
/// MIME parameters, surrounding whitespace and ASCII case are ignored.
/// Unknown types yield an empty slice.
pub fn extensions_for(content_type: &str) -> &'static [&'static str] {
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    EXTENSIONS
        .iter()
        .find(|(mime, _)| mime.eq_ignore_ascii_case(essence))
        .map(|(_, extensions)| *extensions)
        .unwrap_or(&[])
}

/// Append the canonical extension for `content_type` to an extensionless key.
///
/// The key is returned unchanged when it is a folder key, when its final
/// segment already carries an extension, or when no extension is known for
/// the content type.
pub fn normalize_key<'a>(key: &'a str, content_type: Option<&str>) -> Cow<'a, str> {
    if is_folder(key) || has_extension(key) {
        return Cow::Borrowed(key);
    }
    match content_type.map(extensions_for).and_then(|exts| exts.first()) {
        Some(extension) => Cow::Owned(format!("{}.{}", key, extension)),
        None => Cow::Borrowed(key),
    }
}

/// Trailing alphanumeric extension of a key, without the dot.
pub fn extract_extension(key: &str) -> Option<&str> {
    let (_, extension) = final_segment(key).rsplit_once('.')?;
    if !extension.is_empty() && extension.chars().all(|c| c.is_ascii_alphanumeric()) {
        Some(extension)
    } else {
        None
    }
}

/// Whether a key denotes a folder-like prefix.
pub fn is_folder(key: &str) -> bool {
    key.ends_with('/') || key.ends_with('\\')
}

/// Type to report for a key: the stored content type when known, the
/// folder sentinel for folder keys, otherwise the key's extension.
pub fn describe_type(content_type: Option<String>, key: &str) -> Option<String> {
    content_type.or_else(|| {
        if is_folder(key) {
            Some(FOLDER_TYPE.to_string())
        } else {
            extract_extension(key).map(str::to_string)
        }
    })
}

fn final_segment(key: &str) -> &str {
    key.rsplit(['/', '\\']).next().unwrap_or(key)
}

fn has_extension(key: &str) -> bool {
    final_segment(key)
        .rsplit_once('.')
        .is_some_and(|(_, extension)| !extension.is_empty())
}
