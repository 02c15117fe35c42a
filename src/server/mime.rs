//! Content-type lookup with explicit per-extension overrides.
//!
//! CHANGELOG:
//! - 10/16/2026 - Initial implementation

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Extension -> content type table handed to the server at construction.
///
/// Overrides win; everything else falls back to `mime_guess`, and unknown
/// extensions to `application/octet-stream`.
#[derive(Debug, Clone, Default)]
pub struct MimeTable {
    /// Keys are lowercase, without the leading dot.
    overrides: HashMap<String, String>,
}

impl MimeTable {
    /// Empty override set: built-in defaults only.
    pub fn builtin() -> Self {
        Self::default()
    }

    /// Add or replace one override. `ext` may be given as `.js` or `js`.
    pub fn insert(&mut self, ext: &str, content_type: &str) {
        self.overrides
            .insert(normalize_ext(ext), content_type.to_string());
    }

    /// Override for `ext`, if one is configured.
    pub fn override_for(&self, ext: &str) -> Option<&str> {
        self.overrides.get(&normalize_ext(ext)).map(String::as_str)
    }

    /// Content type for a file path.
    pub fn content_type(&self, path: &Path) -> String {
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            if let Some(content_type) = self.override_for(ext) {
                return content_type.to_string();
            }
        }
        mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string()
    }

    pub fn len(&self) -> usize {
        self.overrides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }
}

/// Build a table from an `{extension -> content type}` map.
pub fn configure_mime_overrides(map: &BTreeMap<String, String>) -> MimeTable {
    let mut table = MimeTable::builtin();
    for (ext, content_type) in map {
        table.insert(ext, content_type);
    }
    table
}

fn normalize_ext(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_mime_overrides;

    fn default_table() -> MimeTable {
        configure_mime_overrides(&default_mime_overrides())
    }

    #[test]
    fn test_js_is_overridden() {
        let table = default_table();
        assert_eq!(
            table.content_type(Path::new("instances.js")),
            "application/javascript"
        );
        assert_eq!(
            table.content_type(Path::new("pkg/INSTANCES.JS")),
            "application/javascript"
        );
    }

    #[test]
    fn test_other_extensions_use_builtin_default() {
        let table = default_table();
        for name in ["index.html", "instances_bg.wasm", "style.css", "logo.png", "a.json"] {
            let expected = mime_guess::from_path(name)
                .first_or_octet_stream()
                .essence_str()
                .to_string();
            assert_eq!(table.content_type(Path::new(name)), expected, "{}", name);
        }
        assert_eq!(table.content_type(Path::new("index.html")), "text/html");
        assert_eq!(
            table.content_type(Path::new("instances_bg.wasm")),
            "application/wasm"
        );
    }

    #[test]
    fn test_unknown_extension_is_octet_stream() {
        let table = default_table();
        assert_eq!(
            table.content_type(Path::new("blob.zzzunknown")),
            "application/octet-stream"
        );
        assert_eq!(
            table.content_type(Path::new("Makefile")),
            "application/octet-stream"
        );
    }

    #[test]
    fn test_leading_dot_and_case_are_normalized() {
        let mut table = MimeTable::builtin();
        table.insert("WASM", "application/x-custom");
        assert_eq!(table.override_for(".wasm"), Some("application/x-custom"));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_tables_are_independent() {
        let js = default_table();
        let plain = MimeTable::builtin();
        assert!(plain.is_empty());
        assert_eq!(js.override_for("js"), Some("application/javascript"));
        assert_eq!(plain.override_for("js"), None);
    }
}
