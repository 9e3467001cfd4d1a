use std::path::Path;

use serde::Serialize;

use crate::settings::Settings;

/// What kind of metadata source a file is read with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
    Other,
}

impl MediaKind {
    /// Classify by extension (case-insensitive). Configured lists win;
    /// anything else falls back to the MIME type guessed from the name.
    pub fn from_path(path: &Path, settings: &Settings) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        if ext.is_empty() {
            return MediaKind::Other;
        }
        if settings.image_extensions.iter().any(|e| *e == ext) {
            return MediaKind::Image;
        }
        if settings.video_extensions.iter().any(|e| *e == ext) {
            return MediaKind::Video;
        }

        match mime_guess::from_ext(&ext).first() {
            Some(m) if m.type_() == mime_guess::mime::IMAGE => MediaKind::Image,
            Some(m) if m.type_() == mime_guess::mime::VIDEO => MediaKind::Video,
            _ => MediaKind::Other,
        }
    }
}
