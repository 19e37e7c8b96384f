//! Media type lookup by file extension.
//!
//! The registry is a fixed table built once at startup and shared by
//! reference between every connection. It is only ever read after
//! construction, so no synchronization is needed.

use std::collections::HashMap;
use std::path::Path;

/// Fallback media type for unknown extensions and in-memory bodies.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Broad category of a media type, used to decide on a charset suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaClass {
    Text,
    Image,
    Other,
}

/// A single registered media type.
#[derive(Debug, Clone)]
pub struct MimeEntry {
    /// The media type string, e.g. `text/html`
    pub mime: &'static str,
    /// Extensions mapping to this type; the first one is canonical
    pub extensions: &'static [&'static str],
    /// Text / image classification
    pub class: MediaClass,
}

static TABLE: &[MimeEntry] = &[
    MimeEntry { mime: "text/plain", extensions: &["txt"], class: MediaClass::Text },
    MimeEntry { mime: "text/html", extensions: &["html", "htm"], class: MediaClass::Text },
    MimeEntry { mime: "text/css", extensions: &["css"], class: MediaClass::Text },
    MimeEntry { mime: "text/javascript", extensions: &["js"], class: MediaClass::Text },
    MimeEntry { mime: "image/jpeg", extensions: &["jpg", "jpeg"], class: MediaClass::Image },
    MimeEntry { mime: "image/png", extensions: &["png"], class: MediaClass::Image },
    MimeEntry { mime: "image/gif", extensions: &["gif"], class: MediaClass::Image },
    MimeEntry { mime: "image/webp", extensions: &["webp"], class: MediaClass::Image },
    MimeEntry { mime: "video/mp4", extensions: &["mp4"], class: MediaClass::Other },
    MimeEntry { mime: "video/mp2t", extensions: &["ts"], class: MediaClass::Other },
    MimeEntry { mime: "video/webm", extensions: &["webm"], class: MediaClass::Other },
    MimeEntry { mime: "application/json", extensions: &["json"], class: MediaClass::Text },
    MimeEntry { mime: OCTET_STREAM, extensions: &["bin"], class: MediaClass::Other },
];

/// Bidirectional extension ↔ media type table.
#[derive(Debug, Clone)]
pub struct MimeRegistry {
    by_mime: HashMap<&'static str, &'static MimeEntry>,
    by_extension: HashMap<&'static str, &'static str>,
}

impl MimeRegistry {
    /// Builds the registry from the static table.
    pub fn new() -> Self {
        let mut by_mime = HashMap::with_capacity(TABLE.len());
        let mut by_extension = HashMap::new();

        for entry in TABLE {
            by_mime.insert(entry.mime, entry);
            for ext in entry.extensions {
                by_extension.insert(*ext, entry.mime);
            }
        }

        Self { by_mime, by_extension }
    }

    /// Media type for a bare extension (without the dot), case-insensitive.
    ///
    /// Unknown extensions resolve to `application/octet-stream`.
    pub fn mime_for_extension(&self, ext: &str) -> &'static str {
        self.by_extension
            .get(ext.to_ascii_lowercase().as_str())
            .copied()
            .unwrap_or(OCTET_STREAM)
    }

    /// Media type for a file path, based on its extension.
    ///
    /// # Example
    ///
    /// ```
    /// # use minihttp::http::mime::MimeRegistry;
    /// let mimes = MimeRegistry::new();
    /// assert_eq!(mimes.mime_for_path("site/index.HTML"), "text/html");
    /// assert_eq!(mimes.mime_for_path("archive.tar.xz"), "application/octet-stream");
    /// ```
    pub fn mime_for_path(&self, path: impl AsRef<Path>) -> &'static str {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.mime_for_extension(ext))
            .unwrap_or(OCTET_STREAM)
    }

    /// Canonical extension for a registered media type.
    ///
    /// Asking for an unregistered type is a caller bug and returns an error.
    pub fn extension_for(&self, mime: &str) -> anyhow::Result<&'static str> {
        self.by_mime
            .get(mime)
            .map(|entry| entry.extensions[0])
            .ok_or_else(|| anyhow::anyhow!("Unknown MIME type '{}'", mime))
    }

    /// All extensions (canonical first) registered for a media type.
    pub fn extensions_for(&self, mime: &str) -> Option<&'static [&'static str]> {
        self.by_mime.get(mime).map(|entry| entry.extensions)
    }

    pub fn class_of(&self, mime: &str) -> Option<MediaClass> {
        self.by_mime.get(mime).map(|entry| entry.class)
    }

    /// Whether a charset suffix belongs on this media type.
    /// Unregistered types are never text.
    pub fn is_text(&self, mime: &str) -> bool {
        self.class_of(mime) == Some(MediaClass::Text)
    }

    pub fn is_image(&self, mime: &str) -> bool {
        self.class_of(mime) == Some(MediaClass::Image)
    }
}

impl Default for MimeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
