//! URL path -> filesystem mapping and directory listings.
//!
//! Behaves like a plain "simple HTTP" file handler: query and fragment are
//! ignored, `.`/`..` segments are dropped so nothing outside the root is
//! reachable, directories redirect to a trailing slash and serve their
//! `index.html` when present.
//!
//! CHANGELOG:
//! - 10/16/2026 - Initial implementation

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::path::{Path, PathBuf};

/// Index files tried, in order, when a directory is requested.
pub const INDEX_FILES: [&str; 2] = ["index.html", "index.htm"];

/// Bytes left unescaped in listing hrefs.
const HREF_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

/// What a request path resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// Serve this file.
    File(PathBuf),
    /// Directory requested without a trailing slash; value is the Location.
    Redirect(String),
    /// Directory without an index file.
    Listing {
        dir: PathBuf,
        /// Decoded request path, for the page title.
        url_path: String,
    },
    NotFound,
}

/// Split a raw request target into (path, query) with the fragment removed.
fn split_target(raw: &str) -> (&str, Option<&str>) {
    let without_fragment = raw.split('#').next().unwrap_or("");
    match without_fragment.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (without_fragment, None),
    }
}

/// Decoded URL path of a raw request target.
pub fn decoded_path(raw: &str) -> String {
    let (path, _) = split_target(raw);
    percent_decode_str(path).decode_utf8_lossy().to_string()
}

/// Map a request target onto a path under `root`.
pub fn translate_path(root: &Path, raw: &str) -> PathBuf {
    let decoded = decoded_path(raw);
    let mut path = root.to_path_buf();
    for segment in decoded.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            continue;
        }
        // Reject anything the OS would read as more than one component.
        if segment.contains('\\') || segment.contains('\0') || Path::new(segment).has_root() {
            continue;
        }
        path.push(segment);
    }
    path
}

/// Resolve a request target against `root`.
pub fn resolve(root: &Path, raw: &str) -> Resolved {
    let (raw_path, query) = split_target(raw);
    let decoded = decoded_path(raw);
    let path = translate_path(root, raw);

    if path.is_dir() {
        if !raw_path.ends_with('/') {
            let mut location = format!("{}/", raw_path);
            if let Some(query) = query {
                location.push('?');
                location.push_str(query);
            }
            return Resolved::Redirect(location);
        }
        for index in INDEX_FILES {
            let candidate = path.join(index);
            if candidate.is_file() {
                return Resolved::File(candidate);
            }
        }
        return Resolved::Listing {
            dir: path,
            url_path: decoded,
        };
    }

    // A trailing slash names a directory, never a file.
    if decoded.ends_with('/') {
        return Resolved::NotFound;
    }
    if path.is_file() {
        Resolved::File(path)
    } else {
        Resolved::NotFound
    }
}

/// Render an HTML listing of `dir`.
pub fn render_listing(dir: &Path, url_path: &str) -> std::io::Result<String> {
    let mut entries: Vec<(String, bool)> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| {
            let name = e.file_name().to_string_lossy().to_string();
            let is_dir = e.path().is_dir();
            (name, is_dir)
        })
        .collect();
    entries.sort_by_key(|(name, _)| name.to_lowercase());

    let title = format!("Directory listing for {}", escape_html(url_path));
    let mut html = String::new();
    html.push_str("<!DOCTYPE HTML>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str(&format!("<title>{}</title>\n</head>\n<body>\n", title));
    html.push_str(&format!("<h1>{}</h1>\n<hr>\n<ul>\n", title));
    for (name, is_dir) in entries {
        let display = if is_dir { format!("{}/", name) } else { name };
        let href = utf8_percent_encode(&display, HREF_SAFE).to_string();
        html.push_str(&format!(
            "<li><a href=\"{}\">{}</a></li>\n",
            href,
            escape_html(&display)
        ));
    }
    html.push_str("</ul>\n<hr>\n</body>\n</html>\n");
    Ok(html)
}

/// Escape text for inclusion in HTML.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
